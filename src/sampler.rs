//! Sampling sessions: pull documents from a source into one schema

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};

use docschema_core::inference::{InferenceError, Schema};

use crate::source::{DocumentSource, SourceError, from_values};

/// Errors recorded in a [`SampleReport`] are capped at this many
const MAX_REPORTED_ERRORS: usize = 100;

/// Errors that end a sampling session
#[derive(Error, Debug)]
pub enum SampleError {
    /// The source failed to produce a document
    #[error(transparent)]
    Source(#[from] SourceError),

    /// A document was rejected by the schema
    #[error("Document {index} rejected: {source}")]
    Inference {
        index: usize,
        #[source]
        source: InferenceError,
    },
}

/// What to do with a document the schema or the source rejects
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorPolicy {
    /// End the session at the first rejected document
    #[default]
    Abort,
    /// Count the document as skipped and carry on
    Skip,
}

/// Statistics from a sampling session
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SampleReport {
    /// Documents committed into the schema
    pub documents_processed: usize,
    /// Documents rejected and skipped
    pub documents_skipped: usize,
    /// Rejection messages (limited to first 100)
    pub errors: Vec<String>,
}

impl SampleReport {
    pub fn new() -> Self {
        Self::default()
    }

    fn add_error(&mut self, error: String) {
        self.documents_skipped += 1;
        if self.errors.len() < MAX_REPORTED_ERRORS {
            self.errors.push(error);
        }
    }
}

/// Drives one schema through a sequence of documents.
///
/// Each document gets exactly one ingest and commit cycle, in the order the
/// source yields them.
#[derive(Debug, Clone)]
pub struct SchemaSampler {
    schema: Schema,
    policy: ErrorPolicy,
    report: SampleReport,
}

impl SchemaSampler {
    pub fn new(schema: Schema) -> Self {
        Self {
            schema,
            policy: ErrorPolicy::default(),
            report: SampleReport::new(),
        }
    }

    pub fn with_policy(mut self, policy: ErrorPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn report(&self) -> &SampleReport {
        &self.report
    }

    /// Absorb a single document
    pub fn feed(&mut self, doc: &Value) -> Result<(), InferenceError> {
        self.schema.parse(doc)?;
        self.report.documents_processed += 1;
        Ok(())
    }

    /// Pull documents until the source is exhausted
    pub fn consume<S>(&mut self, source: &mut S) -> Result<(), SampleError>
    where
        S: DocumentSource + ?Sized,
    {
        self.consume_with(source, |_, _, _| {})
    }

    /// Pull documents until the source is exhausted, acknowledging each one.
    ///
    /// `ack` runs after a document is committed, with its position in the
    /// source and the updated schema. Rejected documents are never acknowledged.
    pub fn consume_with<S, F>(&mut self, source: &mut S, mut ack: F) -> Result<(), SampleError>
    where
        S: DocumentSource + ?Sized,
        F: FnMut(usize, &Value, &Schema),
    {
        let mut index = 0;
        while let Some(next) = source.next_document() {
            match next {
                Ok(doc) => match self.schema.parse(&doc) {
                    Ok(()) => {
                        self.report.documents_processed += 1;
                        ack(index, &doc, &self.schema);
                    }
                    Err(e) => self.reject(SampleError::Inference { index, source: e })?,
                },
                // A broken stream cannot be skipped past
                Err(e @ SourceError::Io(_)) => return Err(e.into()),
                Err(e) => self.reject(e.into())?,
            }
            index += 1;
        }

        info!(
            processed = self.report.documents_processed,
            skipped = self.report.documents_skipped,
            fields = self.schema.fields().len(),
            "Sampling complete"
        );
        Ok(())
    }

    fn reject(&mut self, error: SampleError) -> Result<(), SampleError> {
        match self.policy {
            ErrorPolicy::Abort => {
                debug!(%error, "Aborting session");
                Err(error)
            }
            ErrorPolicy::Skip => {
                warn!(%error, "Skipping document");
                self.report.add_error(error.to_string());
                Ok(())
            }
        }
    }

    /// End the session
    pub fn finish(self) -> (Schema, SampleReport) {
        (self.schema, self.report)
    }
}

/// Infer a schema from in-memory documents, stopping at the first rejection
pub fn infer_schema<I>(ns: Option<&str>, docs: I) -> Result<Schema, SampleError>
where
    I: IntoIterator<Item = Value>,
{
    let mut schema = Schema::new();
    if let Some(ns) = ns {
        schema = schema.with_namespace(ns);
    }
    let mut sampler = SchemaSampler::new(schema);
    sampler.consume(&mut from_values(docs))?;
    Ok(sampler.finish().0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_feed_counts_processed() {
        let mut sampler = SchemaSampler::new(Schema::new());
        sampler.feed(&json!({"a": 1})).unwrap();
        assert!(sampler.feed(&json!([1])).is_err());
        assert_eq!(sampler.report().documents_processed, 1);
        assert_eq!(sampler.schema().count(), 1);
    }

    #[test]
    fn test_report_caps_errors() {
        let mut report = SampleReport::new();
        for i in 0..150 {
            report.add_error(format!("error {i}"));
        }
        assert_eq!(report.documents_skipped, 150);
        assert_eq!(report.errors.len(), MAX_REPORTED_ERRORS);
    }

    #[test]
    fn test_policy_serde() {
        assert_eq!(serde_json::to_value(ErrorPolicy::Skip).unwrap(), json!("skip"));
        assert_eq!(ErrorPolicy::default(), ErrorPolicy::Abort);
    }

    #[test]
    fn test_infer_schema() {
        let schema = infer_schema(Some("db.c"), vec![json!({"a": 1}), json!({"b": 2})]).unwrap();
        assert_eq!(schema.ns(), Some("db.c"));
        assert_eq!(schema.count(), 2);
        assert_eq!(schema.field("a").unwrap().probability(), 0.5);
    }
}
