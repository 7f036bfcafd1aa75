//! Incremental schema inference for semi-structured documents
//!
//! This module builds a probabilistic, recursive schema from a stream of
//! JSON/BSON-like documents, one document at a time.
//!
//! ## Features
//!
//! - **Type classification** - JSON types plus BSON kinds carried as Extended JSON markers
//! - **Presence accounting** - Probability of every field, with a synthetic `Undefined` type for absences
//! - **Value statistics** - Distinct counts, numeric min/max/mean, string frequencies, date ranges
//! - **Recursion** - Embedded documents and pooled array element types at any depth
//!
//! ## Example
//!
//! ```rust
//! use docschema_core::inference::{Schema, TypeTag};
//! use serde_json::json;
//!
//! let mut schema = Schema::new().with_namespace("db.users");
//! schema.parse(&json!({"name": "Alice", "age": 30})).unwrap();
//! schema.parse(&json!({"name": "Bob"})).unwrap();
//!
//! let age = schema.field("age").unwrap();
//! assert_eq!(age.probability(), 0.5);
//! assert!(age.get_type(TypeTag::Undefined).is_some());
//! ```

mod classify;
mod config;
mod error;
mod field;
mod schema;
mod serialize;
mod types;
mod values;

pub use classify::{TypeTag, classify, value_type_name};
pub use config::{InferenceConfig, InferenceConfigBuilder};
pub use error::InferenceError;
pub use field::{Field, FieldParent, FieldSet};
pub use schema::Schema;
pub use serialize::{
    FieldDocument, SCHEMA_FORMAT, SCHEMA_VERSION, SchemaDocument, TypeDocument, TypeName,
};
pub use types::{ArrayType, ConstantType, DocumentType, PrimitiveType, TypeNode};
pub use values::{ValueStore, ValueSummary};
