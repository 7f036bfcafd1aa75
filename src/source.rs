//! Document sources: where a sampling session pulls its records from

use std::io::{BufRead, BufReader, Lines, Read};

use serde_json::Value;
use thiserror::Error;

use docschema_core::inference::value_type_name;

/// Errors raised while reading documents from a source
#[derive(Error, Debug)]
pub enum SourceError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A record is not valid JSON. `record` is 1-based; 0 means the whole input.
    #[error("JSON parsing error at record {record}: {error}")]
    Json { record: usize, error: String },

    /// Input parsed, but is not a sequence of records
    #[error("Input is not a sequence of records: expected a JSON array, found {0}")]
    NotRecordSequence(String),
}

/// A sequential supply of raw documents.
///
/// `None` signals the end of the sequence.
pub trait DocumentSource {
    fn next_document(&mut self) -> Option<Result<Value, SourceError>>;
}

impl<I> DocumentSource for I
where
    I: Iterator<Item = Result<Value, SourceError>>,
{
    fn next_document(&mut self) -> Option<Result<Value, SourceError>> {
        self.next()
    }
}

/// Wrap in-memory documents as a source
pub fn from_values<I>(values: I) -> impl DocumentSource
where
    I: IntoIterator<Item = Value>,
{
    values.into_iter().map(Ok)
}

/// Newline-delimited JSON, one document per line.
///
/// A line that ends mid-document is continued on the following lines, so
/// pretty-printed documents written back to back are read as well. Errors
/// report the line a document starts on.
pub struct NdjsonSource<R: BufRead> {
    lines: Lines<R>,
    line: usize,
    failed: bool,
}

impl<R: BufRead> NdjsonSource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            line: 0,
            failed: false,
        }
    }
}

impl<R: BufRead> Iterator for NdjsonSource<R> {
    type Item = Result<Value, SourceError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        let mut pending = String::new();
        let mut start = 0;
        loop {
            let text = match self.lines.next() {
                Some(Ok(text)) => text,
                Some(Err(e)) => {
                    // The stream cannot be resumed after a read failure
                    self.failed = true;
                    return Some(Err(SourceError::Io(e)));
                }
                None if pending.is_empty() => return None,
                None => {
                    return Some(serde_json::from_str(&pending).map_err(|e| {
                        SourceError::Json {
                            record: start,
                            error: e.to_string(),
                        }
                    }));
                }
            };
            self.line += 1;

            let trimmed = text.trim();
            if pending.is_empty() {
                if trimmed.is_empty() {
                    continue;
                }
                start = self.line;
            } else {
                pending.push('\n');
            }
            pending.push_str(trimmed);

            match serde_json::from_str(&pending) {
                Ok(value) => return Some(Ok(value)),
                // Incomplete so far: keep reading
                Err(e) if e.is_eof() => continue,
                Err(e) => {
                    return Some(Err(SourceError::Json {
                        record: start,
                        error: e.to_string(),
                    }));
                }
            }
        }
    }
}

/// A single JSON array whose elements are the documents
pub struct JsonArraySource {
    items: std::vec::IntoIter<Value>,
}

impl JsonArraySource {
    /// Read and parse the whole input up front
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, SourceError> {
        let value: Value = serde_json::from_reader(reader).map_err(|e| {
            if e.is_io() {
                SourceError::Io(e.into())
            } else {
                SourceError::Json {
                    record: 0,
                    error: e.to_string(),
                }
            }
        })?;
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> Result<Self, SourceError> {
        match value {
            Value::Array(items) => Ok(Self {
                items: items.into_iter(),
            }),
            other => Err(SourceError::NotRecordSequence(
                value_type_name(&other).to_string(),
            )),
        }
    }
}

impl Iterator for JsonArraySource {
    type Item = Result<Value, SourceError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.items.next().map(Ok)
    }
}

/// Source picked by [`from_reader`] from the shape of the input
pub enum ReaderSource<R: Read> {
    Array(JsonArraySource),
    Lines(NdjsonSource<BufReader<R>>),
}

impl<R: Read> Iterator for ReaderSource<R> {
    type Item = Result<Value, SourceError>;

    fn next(&mut self) -> Option<Self::Item> {
        match self {
            ReaderSource::Array(source) => source.next(),
            ReaderSource::Lines(source) => source.next(),
        }
    }
}

/// Open a reader as a JSON array when its first non-whitespace byte is `[`,
/// otherwise as NDJSON. A single pretty-printed object reads as one document.
pub fn from_reader<R: Read>(reader: R) -> Result<ReaderSource<R>, SourceError> {
    let mut reader = BufReader::new(reader);
    loop {
        let buf = reader.fill_buf()?;
        if buf.is_empty() {
            break;
        }
        match buf.iter().position(|b| !b.is_ascii_whitespace()) {
            Some(index) => {
                if buf[index] == b'[' {
                    return Ok(ReaderSource::Array(JsonArraySource::from_reader(reader)?));
                }
                break;
            }
            None => {
                let len = buf.len();
                reader.consume(len);
            }
        }
    }
    Ok(ReaderSource::Lines(NdjsonSource::new(reader)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Cursor;

    fn drain<S: DocumentSource>(mut source: S) -> Vec<Result<Value, SourceError>> {
        let mut out = Vec::new();
        while let Some(doc) = source.next_document() {
            out.push(doc);
        }
        out
    }

    #[test]
    fn test_from_values() {
        let docs = drain(from_values(vec![json!({"a": 1}), json!({"a": 2})]));
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[1].as_ref().unwrap(), &json!({"a": 2}));
    }

    #[test]
    fn test_ndjson_skips_blank_lines() {
        let input = "{\"a\": 1}\n\n   \n{\"a\": 2}\n";
        let docs = drain(NdjsonSource::new(Cursor::new(input)));
        assert_eq!(docs.len(), 2);
        assert!(docs.iter().all(Result::is_ok));
    }

    #[test]
    fn test_ndjson_reports_line_number() {
        let input = "{\"a\": 1}\n\n{broken\n{\"a\": 3}\n";
        let docs = drain(NdjsonSource::new(Cursor::new(input)));
        assert_eq!(docs.len(), 3);
        match &docs[1] {
            Err(SourceError::Json { record, .. }) => assert_eq!(*record, 3),
            other => panic!("Expected JSON error, got {other:?}"),
        }
        assert!(docs[2].is_ok());
    }

    #[test]
    fn test_ndjson_truncated_document_at_end() {
        let input = "{\"a\": 1}\n\n{\"a\": 2,\n  \"b\": [1,\n";
        let docs = drain(NdjsonSource::new(Cursor::new(input)));
        assert_eq!(docs.len(), 2);
        assert!(docs[0].is_ok());
        match &docs[1] {
            Err(SourceError::Json { record, .. }) => assert_eq!(*record, 3),
            other => panic!("Expected JSON error, got {other:?}"),
        }
    }

    #[test]
    fn test_ndjson_reads_multi_line_documents() {
        let input = "{\n  \"a\": 1,\n  \"b\": {\n    \"c\": \"x\"\n  }\n}\n\n{\n  \"a\": 2\n}\n{\"a\": 3}\n";
        let docs = drain(NdjsonSource::new(Cursor::new(input)));
        assert_eq!(docs.len(), 3);
        assert_eq!(docs[0].as_ref().unwrap(), &json!({"a": 1, "b": {"c": "x"}}));
        assert_eq!(docs[1].as_ref().unwrap(), &json!({"a": 2}));
        assert_eq!(docs[2].as_ref().unwrap(), &json!({"a": 3}));
    }

    #[test]
    fn test_json_array_source() {
        let source = JsonArraySource::from_reader(Cursor::new(r#"[{"a": 1}, {"b": 2}]"#)).unwrap();
        assert_eq!(drain(source).len(), 2);
    }

    #[test]
    fn test_json_array_rejects_object() {
        let result = JsonArraySource::from_reader(Cursor::new(r#"{"a": 1}"#));
        match result {
            Err(SourceError::NotRecordSequence(found)) => assert_eq!(found, "object"),
            _ => panic!("Expected NotRecordSequence"),
        }
    }

    #[test]
    fn test_from_reader_detects_array() {
        let source = from_reader(Cursor::new("  \n [{\"a\": 1}]")).unwrap();
        assert!(matches!(source, ReaderSource::Array(_)));
        assert_eq!(drain(source).len(), 1);
    }

    #[test]
    fn test_from_reader_defaults_to_lines() {
        let source = from_reader(Cursor::new("{\"a\": 1}\n{\"a\": 2}")).unwrap();
        assert!(matches!(source, ReaderSource::Lines(_)));
        assert_eq!(drain(source).len(), 2);
    }

    #[test]
    fn test_from_reader_pretty_printed_object() {
        let input = "{\n  \"name\": \"Ada\",\n  \"tags\": [\n    \"x\"\n  ]\n}\n";
        let source = from_reader(Cursor::new(input)).unwrap();
        assert!(matches!(source, ReaderSource::Lines(_)));
        let docs = drain(source);
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].as_ref().unwrap(), &json!({"name": "Ada", "tags": ["x"]}));
    }

    #[test]
    fn test_from_reader_empty_input() {
        let source = from_reader(Cursor::new("   ")).unwrap();
        assert!(drain(source).is_empty());
    }
}
