use clap::Args;
use serde_json::Value;

use evm_core::reconcile::{self, ExplainInput};
use evm_core::EngineConfig;

use super::read_document;

/// Arguments for the match report
#[derive(Args)]
pub struct ExplainArgs {
    /// Path to JSON input file: { book, records, config? }
    #[arg(long)]
    pub input: Option<String>,

    /// Print only the human readable report lines
    #[arg(long)]
    pub report: bool,
}

pub fn run_explain(args: ExplainArgs, config: Option<&EngineConfig>) -> Result<Value, Box<dyn std::error::Error>> {
    let doc: ExplainInput = read_document(args.input.as_deref(), "explain")?;
    let result = reconcile::explain_records(&doc, config)?;
    if args.report {
        let lines: Vec<String> = result
            .result
            .iter()
            .flat_map(|e| e.report.iter().cloned().chain(std::iter::once(String::new())))
            .collect();
        return Ok(serde_json::to_value(lines)?);
    }
    Ok(serde_json::to_value(result)?)
}
