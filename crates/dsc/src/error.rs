//! CLI error types

use std::path::PathBuf;

use docschema_sdk::{SampleError, SourceError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{path}: {source}")]
    Input { path: String, source: SampleError },

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl CliError {
    pub fn input(path: impl Into<String>, source: impl Into<SampleError>) -> Self {
        CliError::Input {
            path: path.into(),
            source: source.into(),
        }
    }

    /// Follow-up hint for the user, if there is one
    pub fn user_message(&self) -> Option<&'static str> {
        match self {
            CliError::FileNotFound(_) => Some("Check the path, or pass - to read standard input."),
            CliError::Input {
                source: SampleError::Inference { .. },
                ..
            } => Some("Pass --skip-invalid to skip rejected documents and continue."),
            CliError::Input {
                source:
                    SampleError::Source(SourceError::Json { .. } | SourceError::NotRecordSequence(_)),
                ..
            } => Some(
                "Input must be a JSON array of objects, or one JSON object per line (NDJSON).",
            ),
            _ => None,
        }
    }
}
