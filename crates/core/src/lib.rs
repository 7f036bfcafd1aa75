//! Document Schema Core - probabilistic schema inference engine
//!
//! Provides:
//! - Classification of raw values into canonical type tags
//! - Per-field and per-type running statistics
//! - The commit pass that keeps probabilities and uniqueness consistent
//! - Serialization of the schema tree

pub mod inference;

pub use inference::{
    Field, FieldSet, InferenceConfig, InferenceError, Schema, SchemaDocument, TypeNode, TypeTag,
};
