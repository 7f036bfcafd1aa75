//! Deterministic ordering and the plain-tree projection of a schema

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::classify::TypeTag;
use super::config::InferenceConfig;
use super::field::{Field, FieldSet};
use super::types::TypeNode;
use super::values::ValueSummary;

/// Output format tag
pub const SCHEMA_FORMAT: &str = "docschema";
/// Output format version
pub const SCHEMA_VERSION: u32 = 1;

/// Descending probability, Undefined always last; ties keep their order
pub(crate) fn type_order(a: &TypeNode, b: &TypeNode) -> Ordering {
    match (a.is_undefined(), b.is_undefined()) {
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        _ => b.probability().total_cmp(&a.probability()),
    }
}

/// Serialized schema root
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaDocument {
    pub format: String,
    pub version: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ns: Option<String>,
    /// Documents processed
    pub count: usize,
    pub fields: Vec<FieldDocument>,
}

/// A field's type: one name, or every name when mixed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TypeName {
    Single(String),
    Multiple(Vec<String>),
}

impl TypeName {
    fn of(field: &Field) -> Self {
        let mut names = field.type_names();
        if names.len() == 1 {
            TypeName::Single(names.remove(0).to_string())
        } else {
            TypeName::Multiple(names.into_iter().map(str::to_string).collect())
        }
    }
}

/// Serialized field.
///
/// Carries nested `fields` when the field holds documents, otherwise its
/// `types` and flat `values` sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDocument {
    pub name: String,
    pub title: String,
    #[serde(rename = "type")]
    pub type_name: TypeName,
    pub count: usize,
    pub probability: f64,
    pub total: usize,
    pub unique: usize,
    pub has_duplicates: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fields: Option<Vec<FieldDocument>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub types: Option<Vec<TypeDocument>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub values: Option<Vec<Value>>,
}

/// Serialized type node with its type-specific payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeDocument {
    pub name: TypeTag,
    pub count: usize,
    pub probability: f64,
    pub unique: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<ValueSummary>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub values: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fields: Option<Vec<FieldDocument>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lengths: Option<Vec<usize>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub average_length: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_count: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub types: Option<Vec<TypeDocument>>,
}

impl TypeDocument {
    fn base(node: &TypeNode) -> Self {
        Self {
            name: node.tag(),
            count: node.count(),
            probability: node.probability(),
            unique: node.unique(),
            summary: None,
            values: None,
            fields: None,
            lengths: None,
            average_length: None,
            total_count: None,
            types: None,
        }
    }
}

fn sample(values: Vec<&Value>, config: &InferenceConfig) -> Option<Vec<Value>> {
    if !config.collect_values {
        return None;
    }
    Some(config.limit(values).into_iter().cloned().collect())
}

pub(crate) fn project_fields(fields: &FieldSet, config: &InferenceConfig) -> Vec<FieldDocument> {
    fields.iter().map(|f| project_field(f, config)).collect()
}

pub(crate) fn project_field(field: &Field, config: &InferenceConfig) -> FieldDocument {
    let mut doc = FieldDocument {
        name: field.name().to_string(),
        title: field.title().to_string(),
        type_name: TypeName::of(field),
        count: field.count(),
        probability: field.probability(),
        total: field.total(),
        unique: field.unique(),
        has_duplicates: field.has_duplicates(),
        fields: None,
        types: None,
        values: None,
    };
    match field.fields() {
        Some(nested) => doc.fields = Some(project_fields(nested, config)),
        None => {
            doc.types = Some(project_types(field.types(), config));
            doc.values = sample(field.values(), config);
        }
    }
    doc
}

fn project_types(types: &[TypeNode], config: &InferenceConfig) -> Vec<TypeDocument> {
    types.iter().map(|t| project_type(t, config)).collect()
}

pub(crate) fn project_type(node: &TypeNode, config: &InferenceConfig) -> TypeDocument {
    let mut doc = TypeDocument::base(node);
    match node {
        TypeNode::Constant(_) => {}
        TypeNode::Primitive(_) => {
            doc.summary = node.summary().cloned();
            doc.values = node
                .values()
                .and_then(|store| sample(store.iter().collect(), config));
        }
        TypeNode::Document(d) => {
            doc.fields = Some(project_fields(d.fields(), config));
        }
        TypeNode::Array(a) => {
            doc.lengths = Some(a.lengths().to_vec());
            doc.average_length = a.average_length();
            doc.total_count = Some(a.total_count());
            doc.types = Some(project_types(a.types(), config));
            doc.values = sample(a.values(), config);
            doc.fields = a.fields().map(|nested| project_fields(nested, config));
        }
    }
    doc
}
