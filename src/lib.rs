//! DocSchema SDK - schema inference sessions over document streams
//!
//! Provides:
//! - Document sources (in-memory, NDJSON, JSON arrays, auto-detected readers)
//! - Sampling sessions that feed a [`Schema`] one document at a time
//! - Error policies and session reports
//!
//! The inference engine itself lives in `docschema-core` and is re-exported here.

pub mod sampler;
pub mod source;

pub use docschema_core::inference;
pub use docschema_core::{
    Field, FieldSet, InferenceConfig, InferenceError, Schema, SchemaDocument, TypeNode, TypeTag,
};

pub use sampler::{ErrorPolicy, SampleError, SampleReport, SchemaSampler, infer_schema};
pub use source::{
    DocumentSource, JsonArraySource, NdjsonSource, ReaderSource, SourceError, from_reader,
    from_values,
};
