//! Field nodes: statistics for one key at one nesting level

use std::collections::HashMap;

use serde_json::Value;
use tracing::debug;

use super::classify::{Observation, TypeTag};
use super::config::InferenceConfig;
use super::error::InferenceError;
use super::serialize::type_order;
use super::types::TypeNode;

/// What a field's occurrences are counted against
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldParent {
    /// Schema root or an embedded document: one chance per enclosing document
    Document,
    /// Pooled array elements: one chance per element
    Array,
}

/// One key path at one nesting level
#[derive(Debug, Clone)]
pub struct Field {
    name: String,
    title: String,
    parent: FieldParent,
    count: usize,
    probability: f64,
    total: usize,
    unique: usize,
    has_duplicates: bool,
    types: Vec<TypeNode>,
}

impl Field {
    pub(crate) fn new(name: &str, parent: FieldParent) -> Self {
        Self {
            name: name.to_string(),
            title: name.to_string(),
            parent,
            count: 0,
            probability: 0.0,
            total: 0,
            unique: 0,
            has_duplicates: false,
            types: Vec::new(),
        }
    }

    /// The key in the parent
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Human-friendly name; defaults to the key
    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
    }

    pub fn parent(&self) -> FieldParent {
        self.parent
    }

    /// Number of times the field was present
    pub fn count(&self) -> usize {
        self.count
    }

    /// Presence probability, as of the last commit
    pub fn probability(&self) -> f64 {
        self.probability
    }

    /// Occurrences expected had the field always been present
    pub fn total(&self) -> usize {
        self.total
    }

    pub fn unique(&self) -> usize {
        self.unique
    }

    pub fn has_duplicates(&self) -> bool {
        self.has_duplicates
    }

    /// Types in probability order (Undefined last), as of the last commit
    pub fn types(&self) -> &[TypeNode] {
        &self.types
    }

    pub fn get_type(&self, tag: TypeTag) -> Option<&TypeNode> {
        self.types.iter().find(|t| t.tag() == tag)
    }

    pub fn type_names(&self) -> Vec<&'static str> {
        self.types.iter().map(TypeNode::name).collect()
    }

    /// Alias to the nested fields of the Document type, if one was observed
    pub fn fields(&self) -> Option<&FieldSet> {
        self.get_type(TypeTag::Document)
            .and_then(TypeNode::as_document)
            .map(|d| d.fields())
    }

    /// Flat sample of scalar values across all primitive types
    pub fn values(&self) -> Vec<&Value> {
        self.types
            .iter()
            .filter_map(TypeNode::values)
            .flat_map(|store| store.iter())
            .collect()
    }

    /// Record one occurrence of this field
    pub(crate) fn ingest(&mut self, observation: &Observation<'_>) -> Result<(), InferenceError> {
        let tag = observation.tag();
        let index = match self.types.iter().position(|t| t.tag() == tag) {
            Some(index) => index,
            None => {
                debug!(field = %self.name, type_tag = %tag, "New type observed");
                self.types.push(TypeNode::new(tag));
                self.types.len() - 1
            }
        };
        self.types[index].analyze(observation)?;
        self.count += 1;
        Ok(())
    }

    /// Recompute every derived statistic after a document has been absorbed.
    ///
    /// `parent_count` is the number of enclosing documents (or pooled
    /// elements, for an array's element field).
    pub(crate) fn commit(
        &mut self,
        parent_count: usize,
        config: &InferenceConfig,
    ) -> Result<(), InferenceError> {
        if parent_count == 0 {
            return Err(InferenceError::InvariantViolation(format!(
                "field `{}` committed before its parent counted anything",
                self.name
            )));
        }
        if self.count > parent_count {
            return Err(InferenceError::InvariantViolation(format!(
                "field `{}` seen {} times in {} parent occurrences",
                self.name, self.count, parent_count
            )));
        }

        self.probability = self.count as f64 / parent_count as f64;
        self.total = if self.count == parent_count {
            self.count
        } else {
            match self.parent {
                FieldParent::Array => self.observed_count(),
                FieldParent::Document => parent_count,
            }
        };
        self.reconcile_undefined();

        for node in &mut self.types {
            node.finalize(self.total, config)?;
        }
        self.unique = self.types.iter().map(TypeNode::unique).sum();
        self.has_duplicates = self.unique < self.count;
        self.types.sort_by(type_order);
        Ok(())
    }

    fn observed_count(&self) -> usize {
        self.types
            .iter()
            .filter(|t| !t.is_undefined())
            .map(TypeNode::count)
            .sum()
    }

    /// Keep the Undefined type in step with `total - count`
    fn reconcile_undefined(&mut self) {
        let missing = self.total.saturating_sub(self.count);
        let position = self.types.iter().position(TypeNode::is_undefined);
        match (missing, position) {
            (0, Some(index)) => {
                debug!(field = %self.name, "Removing Undefined type");
                self.types.remove(index);
            }
            (0, None) => {}
            (missing, Some(index)) => self.types[index].set_count(missing),
            (missing, None) => {
                debug!(field = %self.name, missing, "Adding Undefined type");
                self.types.push(TypeNode::undefined(missing));
            }
        }
    }
}

/// Fields of one document level, in first-seen order
#[derive(Debug, Clone, Default)]
pub struct FieldSet {
    fields: Vec<Field>,
    index: HashMap<String, usize>,
}

impl FieldSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&Field> {
        self.index.get(name).map(|&i| &self.fields[i])
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Field> {
        self.index.get(name).map(|&i| &mut self.fields[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = &Field> {
        self.fields.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(Field::name)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Record one occurrence of `name`, creating the field on first sight
    pub(crate) fn ingest(
        &mut self,
        name: &str,
        observation: &Observation<'_>,
    ) -> Result<(), InferenceError> {
        let index = match self.index.get(name) {
            Some(&index) => index,
            None => {
                debug!(field = name, "New field observed");
                self.fields.push(Field::new(name, FieldParent::Document));
                self.index.insert(name.to_string(), self.fields.len() - 1);
                self.fields.len() - 1
            }
        };
        self.fields[index].ingest(observation)
    }

    pub(crate) fn commit(
        &mut self,
        parent_count: usize,
        config: &InferenceConfig,
    ) -> Result<(), InferenceError> {
        for field in &mut self.fields {
            field.commit(parent_count, config)?;
        }
        Ok(())
    }
}

impl<'a> IntoIterator for &'a FieldSet {
    type Item = &'a Field;
    type IntoIter = std::slice::Iter<'a, Field>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.iter()
    }
}
