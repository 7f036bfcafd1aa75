//! dsc - infer probabilistic schemas from JSON and Extended JSON documents
//!
//! ```bash
//! dsc infer users.jsonl --ns app.users --format summary
//! cat export.json | dsc infer --skip-invalid -o schema.json
//! ```

mod commands;
mod error;
mod output;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::infer::{InferArgs, handle_infer};
use output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "dsc", version)]
#[command(about = "Infer probabilistic schemas from JSON document collections")]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Infer a schema from JSON arrays or NDJSON files
    Infer {
        /// Input files (reads standard input when omitted or `-`)
        files: Vec<PathBuf>,

        /// Namespace recorded in the schema, e.g. `db.collection`
        #[arg(long)]
        ns: Option<String>,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,

        /// Output file path (stdout if not provided)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Maximum nesting depth for documents and arrays
        #[arg(long, default_value_t = 100)]
        max_depth: usize,

        /// Maximum values emitted per sample (0 = all)
        #[arg(long, default_value_t = 0)]
        max_values: usize,

        /// Compute the median of numeric fields
        #[arg(long)]
        median: bool,

        /// Skip rejected documents instead of stopping at the first one
        #[arg(long)]
        skip_invalid: bool,
    },
}

/// Logging stays off unless `--verbose` or `RUST_LOG` asks for it
fn init_logging(verbose: bool) {
    let filter = if verbose {
        Some(EnvFilter::new("docschema_core=debug,docschema_sdk=debug,dsc=debug"))
    } else {
        EnvFilter::try_from_default_env().ok()
    };
    if let Some(filter) = filter {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Infer {
            files,
            ns,
            format,
            output,
            max_depth,
            max_values,
            median,
            skip_invalid,
        } => handle_infer(&InferArgs {
            files,
            ns,
            format,
            output,
            max_depth,
            max_values,
            median,
            skip_invalid,
        }),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            if let Some(hint) = e.user_message() {
                eprintln!("Hint: {}", hint);
            }
            ExitCode::FAILURE
        }
    }
}
