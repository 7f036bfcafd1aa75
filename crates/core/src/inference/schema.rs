//! Schema root: drives one ingest + commit cycle per document

use serde_json::Value;
use tracing::trace;

use super::classify::{Observation, observe, value_type_name};
use super::config::InferenceConfig;
use super::error::InferenceError;
use super::field::{Field, FieldSet};
use super::serialize::{SCHEMA_FORMAT, SCHEMA_VERSION, SchemaDocument, project_fields};

/// Probabilistic schema of a document sample
///
/// Documents are absorbed one at a time and never revisited. After each
/// document every derived statistic in the tree is recomputed, so the schema
/// is consistent between any two calls to [`Schema::parse`].
#[derive(Debug, Clone)]
pub struct Schema {
    ns: Option<String>,
    count: usize,
    fields: FieldSet,
    config: InferenceConfig,
}

impl Schema {
    /// Create an empty schema with default configuration
    pub fn new() -> Self {
        Self::with_config(InferenceConfig::default())
    }

    /// Create an empty schema with custom configuration
    pub fn with_config(config: InferenceConfig) -> Self {
        Self {
            ns: None,
            count: 0,
            fields: FieldSet::new(),
            config,
        }
    }

    /// Set the namespace identifier (e.g. `db.collection`)
    pub fn with_namespace(mut self, ns: impl Into<String>) -> Self {
        self.ns = Some(ns.into());
        self
    }

    pub fn ns(&self) -> Option<&str> {
        self.ns.as_deref()
    }

    /// Documents processed so far
    pub fn count(&self) -> usize {
        self.count
    }

    pub fn fields(&self) -> &FieldSet {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.get(name)
    }

    pub fn field_mut(&mut self, name: &str) -> Option<&mut Field> {
        self.fields.get_mut(name)
    }

    pub fn config(&self) -> &InferenceConfig {
        &self.config
    }

    /// Absorb one document and recompute the whole tree.
    ///
    /// The document is classified completely before anything is counted, so
    /// a rejected document leaves the schema untouched.
    pub fn parse(&mut self, doc: &Value) -> Result<(), InferenceError> {
        if !doc.is_object() {
            return Err(InferenceError::InvalidStructure(
                value_type_name(doc).to_string(),
            ));
        }
        let Observation::Document { members, .. } = observe(doc, 0, self.config.max_depth)? else {
            // An object that reads as an Extended JSON marker is a value, not a record
            return Err(InferenceError::InvalidStructure(
                "a typed value marker".to_string(),
            ));
        };

        self.count += 1;
        for (key, observation) in &members {
            self.fields.ingest(key, observation)?;
        }
        self.commit()?;
        trace!(count = self.count, fields = self.fields.len(), "Document committed");
        Ok(())
    }

    /// Parse a JSON string and absorb it as one document
    pub fn parse_json(&mut self, json: &str) -> Result<(), InferenceError> {
        let value: Value = serde_json::from_str(json)?;
        self.parse(&value)
    }

    /// Recompute probabilities, uniqueness and ordering across the tree.
    ///
    /// Runs automatically after every parsed document. Calling it again
    /// without new input changes nothing.
    pub fn commit(&mut self) -> Result<(), InferenceError> {
        if self.count == 0 {
            return Ok(());
        }
        self.fields.commit(self.count, &self.config)
    }

    /// Project the schema into a plain serializable tree
    pub fn serialize(&self) -> SchemaDocument {
        SchemaDocument {
            format: SCHEMA_FORMAT.to_string(),
            version: SCHEMA_VERSION,
            ns: self.ns.clone(),
            count: self.count,
            fields: project_fields(&self.fields, &self.config),
        }
    }

    /// Serialized tree as a JSON value
    pub fn to_json(&self) -> Result<Value, InferenceError> {
        Ok(serde_json::to_value(self.serialize())?)
    }
}

impl Default for Schema {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::classify::TypeTag;
    use serde_json::json;

    #[test]
    fn test_parse_simple_document() {
        let mut schema = Schema::new();
        schema.parse(&json!({"foo": 1})).unwrap();
        assert!(schema.field("foo").is_some());
        assert_eq!(schema.count(), 1);
    }

    #[test]
    fn test_parse_nested_document() {
        let mut schema = Schema::new();
        schema.parse(&json!({"foo": {"bar": 1}})).unwrap();

        let foo = schema.field("foo").unwrap();
        let doc = foo
            .get_type(TypeTag::Document)
            .and_then(|t| t.as_document())
            .unwrap();
        assert_eq!(doc.count(), 1);
        assert!(doc.fields().get("bar").is_some());
    }

    #[test]
    fn test_parse_json() {
        let mut schema = Schema::new().with_namespace("db.users");
        schema.parse_json(r#"{"name": "Alice", "age": 30}"#).unwrap();
        assert_eq!(schema.ns(), Some("db.users"));
        assert_eq!(schema.fields().len(), 2);
    }

    #[test]
    fn test_parse_json_invalid() {
        let mut schema = Schema::new();
        assert!(matches!(
            schema.parse_json("{not json"),
            Err(InferenceError::JsonParse(_))
        ));
        assert_eq!(schema.count(), 0);
    }

    #[test]
    fn test_rejects_non_object_root() {
        let mut schema = Schema::new();
        assert_eq!(
            schema.parse(&json!([1, 2])).unwrap_err(),
            InferenceError::InvalidStructure("array".to_string())
        );
        assert!(matches!(
            schema.parse(&json!({"$oid": "507f1f77bcf86cd799439011"})),
            Err(InferenceError::InvalidStructure(_))
        ));
        assert_eq!(schema.count(), 0);
    }

    #[test]
    fn test_commit_on_empty_schema() {
        let mut schema = Schema::new();
        assert!(schema.commit().is_ok());
        assert!(schema.fields().is_empty());
    }

    #[test]
    fn test_max_depth_rejects_before_counting() {
        let config = InferenceConfig::builder().max_depth(1).build();
        let mut schema = Schema::with_config(config);
        schema.parse(&json!({"a": 1})).unwrap();
        assert!(matches!(
            schema.parse(&json!({"a": {"b": {"c": 1}}})),
            Err(InferenceError::MaxDepthExceeded { .. })
        ));
        assert_eq!(schema.count(), 1);
        assert_eq!(schema.field("a").unwrap().count(), 1);
    }

    #[test]
    fn test_serialize_header() {
        let mut schema = Schema::new().with_namespace("ns");
        schema.parse(&json!({"a": 1})).unwrap();
        let doc = schema.serialize();
        assert_eq!(doc.format, "docschema");
        assert_eq!(doc.version, 1);
        assert_eq!(doc.ns.as_deref(), Some("ns"));
        assert_eq!(doc.count, 1);
        assert_eq!(doc.fields.len(), 1);
    }
}
