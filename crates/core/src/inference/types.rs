//! Type nodes: statistics for one (field, type tag) pair

use std::collections::HashSet;
use std::hash::{DefaultHasher, Hash, Hasher};

use serde_json::Value;

use super::classify::{Observation, TypeTag};
use super::config::InferenceConfig;
use super::error::InferenceError;
use super::field::{Field, FieldParent, FieldSet};
use super::values::{ValueStore, ValueSummary, canonical};

/// One value kind observed for a field
#[derive(Debug, Clone)]
pub enum TypeNode {
    /// Null, Undefined, MinKey, MaxKey: nothing stored but the count
    Constant(ConstantType),
    /// Scalars that keep every observed value
    Primitive(PrimitiveType),
    Array(ArrayType),
    Document(DocumentType),
}

#[derive(Debug, Clone)]
pub struct ConstantType {
    tag: TypeTag,
    count: usize,
    probability: f64,
}

#[derive(Debug, Clone)]
pub struct PrimitiveType {
    tag: TypeTag,
    count: usize,
    probability: f64,
    values: ValueStore,
    summary: Option<ValueSummary>,
}

#[derive(Debug, Clone)]
pub struct DocumentType {
    count: usize,
    probability: f64,
    unique: usize,
    fingerprints: HashSet<u64>,
    fields: FieldSet,
}

/// Array occurrences of a field.
///
/// Elements of every array seen are pooled into one element field, so the
/// element type distribution spans all instances.
#[derive(Debug, Clone)]
pub struct ArrayType {
    count: usize,
    probability: f64,
    unique: usize,
    fingerprints: HashSet<u64>,
    lengths: Vec<usize>,
    items: Field,
}

fn fingerprint(value: &Value) -> u64 {
    let mut hasher = DefaultHasher::new();
    canonical(value).hash(&mut hasher);
    hasher.finish()
}

fn mismatch(tag: TypeTag, observation: &Observation<'_>) -> InferenceError {
    InferenceError::InvariantViolation(format!(
        "{} observation routed to a {tag} type node",
        observation.tag()
    ))
}

fn probability_of(tag: TypeTag, count: usize, total: usize) -> Result<f64, InferenceError> {
    if total == 0 {
        return Err(InferenceError::InvariantViolation(format!(
            "{tag} type finalized before its field total was known"
        )));
    }
    Ok(count as f64 / total as f64)
}

impl TypeNode {
    pub(crate) fn new(tag: TypeTag) -> Self {
        match tag {
            TypeTag::Array => TypeNode::Array(ArrayType {
                count: 0,
                probability: 0.0,
                unique: 0,
                fingerprints: HashSet::new(),
                lengths: Vec::new(),
                items: Field::new("[]", FieldParent::Array),
            }),
            TypeTag::Document => TypeNode::Document(DocumentType {
                count: 0,
                probability: 0.0,
                unique: 0,
                fingerprints: HashSet::new(),
                fields: FieldSet::new(),
            }),
            t if t.is_constant() => TypeNode::Constant(ConstantType {
                tag: t,
                count: 0,
                probability: 0.0,
            }),
            t => TypeNode::Primitive(PrimitiveType {
                tag: t,
                count: 0,
                probability: 0.0,
                values: ValueStore::new(),
                summary: None,
            }),
        }
    }

    /// The synthetic type standing for documents that lacked the field
    pub(crate) fn undefined(count: usize) -> Self {
        TypeNode::Constant(ConstantType {
            tag: TypeTag::Undefined,
            count,
            probability: 0.0,
        })
    }

    pub fn tag(&self) -> TypeTag {
        match self {
            TypeNode::Constant(c) => c.tag,
            TypeNode::Primitive(p) => p.tag,
            TypeNode::Array(_) => TypeTag::Array,
            TypeNode::Document(_) => TypeTag::Document,
        }
    }

    pub fn name(&self) -> &'static str {
        self.tag().name()
    }

    pub fn count(&self) -> usize {
        match self {
            TypeNode::Constant(c) => c.count,
            TypeNode::Primitive(p) => p.count,
            TypeNode::Array(a) => a.count,
            TypeNode::Document(d) => d.count,
        }
    }

    /// Share of the field's total occurrences, as of the last commit
    pub fn probability(&self) -> f64 {
        match self {
            TypeNode::Constant(c) => c.probability,
            TypeNode::Primitive(p) => p.probability,
            TypeNode::Array(a) => a.probability,
            TypeNode::Document(d) => d.probability,
        }
    }

    /// Distinct values, as of the last commit
    pub fn unique(&self) -> usize {
        match self {
            TypeNode::Constant(c) if c.tag == TypeTag::Undefined => 0,
            TypeNode::Constant(c) => c.count.min(1),
            TypeNode::Primitive(p) => p.values.unique(),
            TypeNode::Array(a) => a.unique,
            TypeNode::Document(d) => d.unique,
        }
    }

    pub fn is_undefined(&self) -> bool {
        self.tag() == TypeTag::Undefined
    }

    pub fn values(&self) -> Option<&ValueStore> {
        match self {
            TypeNode::Primitive(p) => Some(&p.values),
            _ => None,
        }
    }

    pub fn summary(&self) -> Option<&ValueSummary> {
        match self {
            TypeNode::Primitive(p) => p.summary.as_ref(),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&ArrayType> {
        match self {
            TypeNode::Array(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_document(&self) -> Option<&DocumentType> {
        match self {
            TypeNode::Document(d) => Some(d),
            _ => None,
        }
    }

    pub(crate) fn set_count(&mut self, count: usize) {
        if let TypeNode::Constant(c) = self {
            c.count = count;
        }
    }

    /// Absorb one occurrence whose tag matches this node.
    ///
    /// An observation of any other tag is rejected before anything is counted.
    pub(crate) fn analyze(&mut self, observation: &Observation<'_>) -> Result<(), InferenceError> {
        let tag = self.tag();
        if observation.tag() != tag {
            return Err(mismatch(tag, observation));
        }
        match (self, observation) {
            (TypeNode::Constant(c), _) => c.count += 1,
            (TypeNode::Primitive(p), _) => {
                p.values.push(observation.raw().clone());
                p.count += 1;
            }
            (TypeNode::Document(d), Observation::Document { raw, members }) => {
                for (key, member) in members {
                    d.fields.ingest(key, member)?;
                }
                d.count += 1;
                d.fingerprints.insert(fingerprint(raw));
            }
            (TypeNode::Array(a), Observation::Array { raw, items }) => {
                for item in items {
                    a.items.ingest(item)?;
                }
                a.count += 1;
                a.lengths.push(items.len());
                a.fingerprints.insert(fingerprint(raw));
            }
            (_, observation) => return Err(mismatch(tag, observation)),
        }
        Ok(())
    }

    /// Recompute probability, uniqueness and payload against the field total.
    ///
    /// Idempotent; recurses into nested fields of structural types.
    pub(crate) fn finalize(
        &mut self,
        total: usize,
        config: &InferenceConfig,
    ) -> Result<(), InferenceError> {
        let tag = self.tag();
        match self {
            TypeNode::Constant(c) => {
                c.probability = probability_of(tag, c.count, total)?;
            }
            TypeNode::Primitive(p) => {
                p.probability = probability_of(tag, p.count, total)?;
                p.values.finalize();
                p.summary = p.values.summarize(tag, config);
            }
            TypeNode::Document(d) => {
                d.probability = probability_of(tag, d.count, total)?;
                d.unique = d.fingerprints.len();
                d.fields.commit(d.count, config)?;
            }
            TypeNode::Array(a) => {
                a.probability = probability_of(tag, a.count, total)?;
                a.unique = a.fingerprints.len();
                // Only empty arrays seen so far: no element field to commit
                if a.items.count() > 0 {
                    let pooled = a.total_count();
                    a.items.commit(pooled, config)?;
                }
            }
        }
        Ok(())
    }
}

impl DocumentType {
    /// Members seen across every document occurrence
    pub fn fields(&self) -> &FieldSet {
        &self.fields
    }

    pub fn count(&self) -> usize {
        self.count
    }
}

impl ArrayType {
    pub fn count(&self) -> usize {
        self.count
    }

    /// Length of every array observed, in arrival order
    pub fn lengths(&self) -> &[usize] {
        &self.lengths
    }

    /// Pooled element count across all arrays
    pub fn total_count(&self) -> usize {
        self.lengths.iter().sum()
    }

    pub fn average_length(&self) -> Option<f64> {
        if self.lengths.is_empty() {
            None
        } else {
            Some(self.total_count() as f64 / self.lengths.len() as f64)
        }
    }

    /// The pooled element field
    pub fn items(&self) -> &Field {
        &self.items
    }

    /// Pooled element type distribution
    pub fn types(&self) -> &[TypeNode] {
        self.items.types()
    }

    pub fn get_type(&self, tag: TypeTag) -> Option<&TypeNode> {
        self.items.get_type(tag)
    }

    /// Alias to the fields of document elements
    pub fn fields(&self) -> Option<&FieldSet> {
        self.items.fields()
    }

    /// Scalar element values
    pub fn values(&self) -> Vec<&Value> {
        self.items.values()
    }
}
