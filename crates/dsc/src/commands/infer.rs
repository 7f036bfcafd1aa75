//! CLI command for schema inference

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use docschema_sdk::{
    DocumentSource, ErrorPolicy, InferenceConfig, Schema, SchemaSampler, from_reader,
};
use tracing::{debug, info};

use crate::error::CliError;
use crate::output::{OutputFormat, render};

/// Progress is reported every this many documents
const PROGRESS_INTERVAL: usize = 10_000;

/// Arguments for the `infer` command
pub struct InferArgs {
    /// Input files; standard input when empty or `-`
    pub files: Vec<PathBuf>,
    /// Namespace recorded in the schema
    pub ns: Option<String>,
    /// Output format
    pub format: OutputFormat,
    /// Output file path (stdout if not provided)
    pub output: Option<PathBuf>,
    /// Maximum nesting depth
    pub max_depth: usize,
    /// Maximum values emitted per sample (0 = all)
    pub max_values: usize,
    /// Compute numeric medians
    pub median: bool,
    /// Skip rejected documents instead of stopping
    pub skip_invalid: bool,
}

/// Handle the `infer` command
pub fn handle_infer(args: &InferArgs) -> Result<(), CliError> {
    let config = InferenceConfig::builder()
        .max_depth(args.max_depth)
        .max_values(args.max_values)
        .compute_median(args.median)
        .build();

    let mut schema = Schema::with_config(config);
    if let Some(ns) = &args.ns {
        schema = schema.with_namespace(ns);
    }
    let policy = if args.skip_invalid {
        ErrorPolicy::Skip
    } else {
        ErrorPolicy::Abort
    };
    let mut sampler = SchemaSampler::new(schema).with_policy(policy);

    eprintln!("Inferring schema...");
    eprintln!("  Max depth: {}", args.max_depth);
    eprintln!("  Skip invalid: {}", args.skip_invalid);

    let stdin = [PathBuf::from("-")];
    let inputs = if args.files.is_empty() {
        &stdin[..]
    } else {
        &args.files[..]
    };
    for path in inputs {
        consume_input(&mut sampler, path)?;
    }

    let (schema, report) = sampler.finish();
    info!(
        inputs = inputs.len(),
        processed = report.documents_processed,
        skipped = report.documents_skipped,
        "Inference complete"
    );

    eprintln!();
    eprintln!("Inference complete:");
    eprintln!("  Documents processed: {}", report.documents_processed);
    eprintln!("  Documents skipped: {}", report.documents_skipped);
    eprintln!("  Fields discovered: {}", schema.fields().len());
    for error in &report.errors {
        eprintln!("  - {}", error);
    }
    if report.documents_skipped > report.errors.len() {
        eprintln!(
            "  ... and {} more",
            report.documents_skipped - report.errors.len()
        );
    }

    let output_str = render(&schema, args.format)?;

    if let Some(ref output_path) = args.output {
        std::fs::write(output_path, &output_str)?;
        debug!(path = %output_path.display(), bytes = output_str.len(), "Schema written");
        eprintln!();
        eprintln!("Schema written to: {}", output_path.display());
    } else {
        println!("{}", output_str);
    }

    Ok(())
}

fn consume_input(sampler: &mut SchemaSampler, path: &Path) -> Result<(), CliError> {
    let name = path.display().to_string();
    info!(input = %name, "Reading input");
    if path == Path::new("-") {
        eprintln!("  Reading standard input");
        let mut source = from_reader(io::stdin().lock()).map_err(|e| CliError::input(&name, e))?;
        return consume_source(sampler, &mut source, &name);
    }

    if !path.exists() {
        return Err(CliError::FileNotFound(path.to_path_buf()));
    }
    eprintln!("  Reading {}", name);
    let file = File::open(path)?;
    let mut source = from_reader(file).map_err(|e| CliError::input(&name, e))?;
    consume_source(sampler, &mut source, &name)
}

fn consume_source<S: DocumentSource>(
    sampler: &mut SchemaSampler,
    source: &mut S,
    name: &str,
) -> Result<(), CliError> {
    sampler
        .consume_with(source, |index, _, schema| {
            if (index + 1) % PROGRESS_INTERVAL == 0 {
                eprintln!("    {} documents ({} in total)", index + 1, schema.count());
            }
        })
        .map_err(|e| CliError::input(name, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn args(files: Vec<PathBuf>, output: Option<PathBuf>) -> InferArgs {
        InferArgs {
            files,
            ns: Some("test.docs".to_string()),
            format: OutputFormat::Json,
            output,
            max_depth: 100,
            max_values: 0,
            median: false,
            skip_invalid: false,
        }
    }

    #[test]
    fn test_infer_to_file() {
        let dir = TempDir::new().unwrap();
        let first = dir.path().join("a.jsonl");
        let second = dir.path().join("b.json");
        std::fs::write(&first, "{\"a\": 1}\n{\"a\": 2}\n").unwrap();
        std::fs::write(&second, "[{\"b\": \"x\"}]").unwrap();
        let out = dir.path().join("schema.json");

        handle_infer(&args(vec![first, second], Some(out.clone()))).unwrap();

        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&out).unwrap()).unwrap();
        assert_eq!(written["ns"], "test.docs");
        assert_eq!(written["count"], 3);
        assert_eq!(written["fields"][0]["name"], "a");
        assert_eq!(written["fields"][1]["name"], "b");
    }

    #[test]
    fn test_missing_file() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("missing.json");
        let err = handle_infer(&args(vec![missing], None)).unwrap_err();
        assert!(matches!(err, CliError::FileNotFound(_)));
        assert!(err.user_message().is_some());
    }

    #[test]
    fn test_rejected_document_names_the_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.jsonl");
        std::fs::write(&path, "{\"a\": 1}\n42\n").unwrap();

        let err = handle_infer(&args(vec![path], None)).unwrap_err();
        assert!(err.to_string().contains("bad.jsonl"));
        assert_eq!(
            err.user_message(),
            Some("Pass --skip-invalid to skip rejected documents and continue.")
        );
    }
}
