//! Output formatting for CLI

use clap::ValueEnum;
use docschema_sdk::{Field, FieldSet, Schema, TypeNode};

use crate::error::CliError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Serialized schema as pretty-printed JSON
    Json,
    /// Serialized schema as YAML
    Yaml,
    /// One line per field path
    Summary,
}

/// Render a schema in the requested format
pub fn render(schema: &Schema, format: OutputFormat) -> Result<String, CliError> {
    match format {
        OutputFormat::Json => serde_json::to_string_pretty(&schema.serialize())
            .map_err(|e| CliError::Serialization(e.to_string())),
        OutputFormat::Yaml => serde_yaml::to_string(&schema.serialize())
            .map_err(|e| CliError::Serialization(e.to_string())),
        OutputFormat::Summary => Ok(format_summary(schema)),
    }
}

/// A field with its full path
struct SummaryRow {
    path: String,
    probability: f64,
    types: String,
}

impl SummaryRow {
    fn new(path: String, field: &Field) -> Self {
        let types = field
            .types()
            .iter()
            .map(|t| format!("{} {:.1}%", t.name(), t.probability() * 100.0))
            .collect::<Vec<_>>()
            .join(", ");
        Self {
            path,
            probability: field.probability(),
            types,
        }
    }
}

fn flatten_fields(fields: &FieldSet, prefix: Option<&str>, rows: &mut Vec<SummaryRow>) {
    for field in fields {
        let path = match prefix {
            Some(prefix) => format!("{}.{}", prefix, field.name()),
            None => field.name().to_string(),
        };
        rows.push(SummaryRow::new(path.clone(), field));
        flatten_types(field, &path, rows);
    }
}

fn flatten_types(field: &Field, path: &str, rows: &mut Vec<SummaryRow>) {
    for node in field.types() {
        match node {
            TypeNode::Document(doc) => flatten_fields(doc.fields(), Some(path), rows),
            TypeNode::Array(array) if array.items().count() > 0 => {
                let items_path = format!("{}[]", path);
                rows.push(SummaryRow::new(items_path.clone(), array.items()));
                flatten_types(array.items(), &items_path, rows);
            }
            _ => {}
        }
    }
}

/// Format the schema as an aligned table of field paths
pub fn format_summary(schema: &Schema) -> String {
    let mut rows = Vec::new();
    flatten_fields(schema.fields(), None, &mut rows);

    let mut output = String::new();
    if let Some(ns) = schema.ns() {
        output.push_str(&format!("Namespace: {}\n", ns));
    }
    output.push_str(&format!("Documents: {}\n", schema.count()));
    if rows.is_empty() {
        return output;
    }

    let width = rows
        .iter()
        .map(|r| r.path.len())
        .chain(std::iter::once("PATH".len()))
        .max()
        .unwrap_or(0);

    output.push('\n');
    output.push_str(&format!("{:<width$}  {:>7}  TYPES\n", "PATH", "PRESENT"));
    for row in &rows {
        output.push_str(&format!(
            "{:<width$}  {:>6.1}%  {}\n",
            row.path,
            row.probability * 100.0,
            row.types
        ));
    }
    output
}
