mod commands;
mod config;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;

use commands::book::{CategoriesArgs, TemplateArgs, ValidateArgs};
use commands::explain::ExplainArgs;
use commands::import::ImportArgs;
use commands::reconcile::{AxisLinesArgs, KpiArgs, MetricsArgs, ReconcileArgs};

/// Earned-value reconciliation of project cost axes
#[derive(Parser)]
#[command(
    name = "evm",
    version,
    about = "Earned-value reconciliation of project cost axes",
    long_about = "Replays timesheet, vendor invoice, stock and manual ledger events against \
                  the financial axes of construction projects and reports axis lines, \
                  monthly cumulative KPIs (PV, EV, AC, CPI, SPI) and project metrics."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,

    /// Engine configuration file (.yaml, .yml or .json); falls back to $EVM_CONFIG.
    /// Takes precedence over a configuration embedded in the input document
    #[arg(long, global = true)]
    config: Option<String>,

    /// Log classification and ledger details
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay ledger events and report lines, KPIs and metrics
    Reconcile(ReconcileArgs),
    /// Per-axis-per-date earned value, cost and budget lines
    AxisLines(AxisLinesArgs),
    /// Monthly cumulative PV / EV / AC with CPI and SPI
    Kpi(KpiArgs),
    /// Project-level EVM indicators
    Metrics(MetricsArgs),
    /// Explain how source rows match the axes
    Explain(ExplainArgs),
    /// Check a book for reference and overlap errors
    Validate(ValidateArgs),
    /// Fill an empty progress with the standard axes
    Template(TemplateArgs),
    /// List or search the axis categories of a book
    Categories(CategoriesArgs),
    /// Turn monthly progress and cost series into ledger events
    Import(ImportArgs),
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

fn init_logging(verbose: bool, quiet: bool) {
    let level = if quiet {
        "error"
    } else if verbose {
        "debug"
    } else {
        "warn"
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    let engine_config = match config::load(cli.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    };

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Reconcile(args) => commands::reconcile::run_reconcile(args, engine_config.as_ref()),
        Commands::AxisLines(args) => commands::reconcile::run_axis_lines(args, engine_config.as_ref()),
        Commands::Kpi(args) => commands::reconcile::run_kpi(args, engine_config.as_ref()),
        Commands::Metrics(args) => commands::reconcile::run_metrics(args, engine_config.as_ref()),
        Commands::Explain(args) => commands::explain::run_explain(args, engine_config.as_ref()),
        Commands::Validate(args) => commands::book::run_validate(args, engine_config.as_ref()),
        Commands::Template(args) => commands::book::run_template(args, engine_config.as_ref()),
        Commands::Categories(args) => commands::book::run_categories(args),
        Commands::Import(args) => commands::import::run_import(args, engine_config.as_ref()),
        Commands::Version => {
            println!("evm {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
