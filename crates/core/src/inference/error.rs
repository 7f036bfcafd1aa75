//! Error types for schema inference

use thiserror::Error;

/// Errors that can occur during schema inference
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InferenceError {
    /// A raw value carried a type marker whose payload is not valid for that type
    #[error("Unrecognized type for {tag}: {reason}")]
    UnrecognizedType { tag: String, reason: String },

    /// Invalid document structure (not an object at root)
    #[error("Invalid document structure: expected object at root, found {0}")]
    InvalidStructure(String),

    /// Maximum depth exceeded
    #[error("Maximum nesting depth exceeded: {depth} > {max}")]
    MaxDepthExceeded { depth: usize, max: usize },

    /// A bookkeeping contract was broken (e.g. committing against an unknown total)
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    /// JSON parsing error
    #[error("JSON parsing error: {0}")]
    JsonParse(String),
}

impl InferenceError {
    pub(crate) fn unrecognized(tag: &str, reason: impl Into<String>) -> Self {
        InferenceError::UnrecognizedType {
            tag: tag.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for InferenceError {
    fn from(e: serde_json::Error) -> Self {
        InferenceError::JsonParse(e.to_string())
    }
}
