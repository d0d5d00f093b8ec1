use clap::Args;
use serde_json::Value;

use evm_core::import::{self, ImportInput};
use evm_core::EngineConfig;

use super::read_document;

/// Arguments for the monthly series import
#[derive(Args)]
pub struct ImportArgs {
    /// Path to JSON input file: { book, import: { progress, year, progress_series, cost_series }, config? }
    #[arg(long)]
    pub input: Option<String>,

    /// Year of the series (overrides the document)
    #[arg(long)]
    pub year: Option<i32>,

    /// Revision stamped on the generated events (overrides the document)
    #[arg(long)]
    pub revision: Option<u64>,

    /// Print only the generated events, ready to append to a reconcile document
    #[arg(long)]
    pub events_only: bool,
}

pub fn run_import(args: ImportArgs, config: Option<&EngineConfig>) -> Result<Value, Box<dyn std::error::Error>> {
    let mut doc: ImportInput = read_document(args.input.as_deref(), "import")?;
    if let Some(year) = args.year {
        doc.import.year = year;
    }
    if let Some(revision) = args.revision {
        doc.import.revision = revision;
    }
    let result = import::import_series(&doc, config)?;
    if args.events_only {
        return Ok(serde_json::to_value(result.result.events)?);
    }
    Ok(serde_json::to_value(result)?)
}
