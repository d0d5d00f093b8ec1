use chrono::NaiveDate;
use clap::{Args, ValueEnum};
use serde_json::Value;

use evm_core::reconcile::{self, ReconcileInput};
use evm_core::types::ProgressId;
use evm_core::EngineConfig;

use super::{narrow, read_document};

/// Selection shared by the reconcile family of commands
#[derive(Args)]
pub struct ReplayArgs {
    /// Path to JSON input file: { book, events, config?, as_of?, progress? }
    #[arg(long)]
    pub input: Option<String>,

    /// Confirm progresses whose project ended on or before this date (YYYY-MM-DD)
    #[arg(long)]
    pub as_of: Option<NaiveDate>,

    /// Report a single progress
    #[arg(long)]
    pub progress: Option<u64>,
}

impl ReplayArgs {
    fn run(&self, config: Option<&EngineConfig>, command: &str) -> Result<Value, Box<dyn std::error::Error>> {
        let mut doc: ReconcileInput = read_document(self.input.as_deref(), command)?;
        if self.as_of.is_some() {
            doc.as_of = self.as_of;
        }
        if let Some(id) = self.progress {
            doc.progress = Some(ProgressId(id));
        }
        let result = reconcile::reconcile(&doc, config)?;
        Ok(serde_json::to_value(result)?)
    }
}

/// Arguments for a full reconciliation
#[derive(Args)]
pub struct ReconcileArgs {
    #[command(flatten)]
    pub replay: ReplayArgs,
}

pub fn run_reconcile(args: ReconcileArgs, config: Option<&EngineConfig>) -> Result<Value, Box<dyn std::error::Error>> {
    args.replay.run(config, "reconcile")
}

/// Arguments for axis lines
#[derive(Args)]
pub struct AxisLinesArgs {
    #[command(flatten)]
    pub replay: ReplayArgs,

    /// Also report the budget lines
    #[arg(long)]
    pub budgets: bool,
}

pub fn run_axis_lines(args: AxisLinesArgs, config: Option<&EngineConfig>) -> Result<Value, Box<dyn std::error::Error>> {
    let value = args.replay.run(config, "axis-lines")?;
    let keys: &[&str] = if args.budgets {
        &["axis_lines", "budget_lines"]
    } else {
        &["axis_lines"]
    };
    Ok(narrow(value, keys))
}

#[derive(Debug, Clone, ValueEnum)]
pub enum KpiLevel {
    Axis,
    Project,
    Both,
}

/// Arguments for monthly KPI rows
#[derive(Args)]
pub struct KpiArgs {
    #[command(flatten)]
    pub replay: ReplayArgs,

    /// Per axis, per project or both
    #[arg(long, default_value = "project")]
    pub level: KpiLevel,
}

pub fn run_kpi(args: KpiArgs, config: Option<&EngineConfig>) -> Result<Value, Box<dyn std::error::Error>> {
    let value = args.replay.run(config, "kpi")?;
    let keys: &[&str] = match args.level {
        KpiLevel::Axis => &["monthly_kpis"],
        KpiLevel::Project => &["project_kpis"],
        KpiLevel::Both => &["monthly_kpis", "project_kpis"],
    };
    Ok(narrow(value, keys))
}

/// Arguments for project metrics
#[derive(Args)]
pub struct MetricsArgs {
    #[command(flatten)]
    pub replay: ReplayArgs,
}

pub fn run_metrics(args: MetricsArgs, config: Option<&EngineConfig>) -> Result<Value, Box<dyn std::error::Error>> {
    let value = args.replay.run(config, "metrics")?;
    Ok(narrow(value, &["metrics", "states", "counts"]))
}
