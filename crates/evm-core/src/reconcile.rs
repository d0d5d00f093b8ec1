use chrono::NaiveDate;
use log::warn;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::axis::category::search_categories;
use crate::axis::AxisCategory;
use crate::config::EngineConfig;
use crate::engine::{Book, Engine, Explanation};
use crate::kpi::{AxisLine, BudgetLine, MonthlyKpi};
use crate::ledger::{ApplyStatus, LedgerEvent};
use crate::progress::{ProgressState, ProjectMetrics};
use crate::sources::SourceRecord;
use crate::types::*;
use crate::EvmResult;

// ---------------------------------------------------------------------------
// Input / Output types
// ---------------------------------------------------------------------------

/// A book plus the source events observed since it was configured.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcileInput {
    pub book: Book,
    #[serde(default)]
    pub events: Vec<LedgerEvent>,
    /// Used when the caller has no configuration file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<EngineConfig>,
    /// Confirm progresses whose project has ended on or before this date
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub as_of: Option<NaiveDate>,
    /// Restrict the reported rows to one progress
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<ProgressId>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventCounts {
    pub applied: usize,
    pub retracted: usize,
    /// Older than or equal to the revision already held
    pub stale: usize,
    /// Refused with an error, see warnings
    pub rejected: usize,
    pub live_records: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressSummary {
    pub progress: ProgressId,
    pub name: String,
    pub state: ProgressState,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcileOutput {
    pub axis_lines: Vec<AxisLine>,
    pub budget_lines: Vec<BudgetLine>,
    pub monthly_kpis: Vec<MonthlyKpi>,
    pub project_kpis: Vec<MonthlyKpi>,
    pub metrics: Vec<ProjectMetrics>,
    pub states: Vec<ProgressSummary>,
    pub counts: EventCounts,
    /// Progresses confirmed because their project ended
    pub closed: Vec<ProgressId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExplainInput {
    pub book: Book,
    pub records: Vec<SourceRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<EngineConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookReport {
    pub valid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub projects: usize,
    pub progresses: usize,
    pub axes: usize,
    pub axis_categories: usize,
}

#[cfg(feature = "templates")]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateInput {
    pub book: Book,
    pub progress: ProgressId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<EngineConfig>,
}

#[cfg(feature = "templates")]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateOutput {
    /// `None` when the progress already had axes
    pub outcome: Option<crate::axis::template::TemplateOutcome>,
    pub book: Book,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Replay `events` on a fresh engine and report lines, KPIs and metrics.
/// `config` is the caller's configuration file; it takes precedence over
/// the configuration embedded in `input`.
///
/// Events that fail to classify (locked earned value, rate outside [0, 1],
/// ...) are counted as rejected and reported as warnings; the rest of the
/// batch is still applied.
pub fn reconcile(
    input: &ReconcileInput,
    config: Option<&EngineConfig>,
) -> EvmResult<ComputationOutput<ReconcileOutput>> {
    let start = Instant::now();
    let config = EngineConfig::resolve(config, input.config.as_ref());
    let mut engine = Engine::new(input.book.clone(), config)?;
    let mut warnings: Vec<String> = Vec::new();
    let mut counts = EventCounts::default();

    for event in &input.events {
        let key = event.key();
        match engine.apply(event.clone()) {
            Ok(outcome) => {
                match outcome.status {
                    ApplyStatus::Applied => counts.applied += 1,
                    ApplyStatus::Retracted => counts.retracted += 1,
                    ApplyStatus::Stale => counts.stale += 1,
                }
                if let Some(c) = outcome.classification {
                    warnings.extend(c.warnings);
                }
            }
            Err(e) => {
                warn!("{key} rejected: {e}");
                counts.rejected += 1;
                warnings.push(format!("{key} rejected: {e}"));
            }
        }
    }

    let closed = match input.as_of {
        Some(today) => engine.close_due(today)?,
        None => Vec::new(),
    };
    counts.live_records = engine.ledger().live_count();

    let metrics = match input.progress {
        Some(id) => vec![engine.project_metrics(id)?],
        None => engine.all_metrics(),
    };
    let book = engine.book();
    let states = book
        .progresses
        .iter()
        .filter(|p| input.progress.map_or(true, |id| id == p.id))
        .map(|p| ProgressSummary {
            progress: p.id,
            name: p.name(book.project(p.project)),
            state: p.state,
        })
        .collect();

    let output = ReconcileOutput {
        axis_lines: engine.axis_lines(input.progress)?,
        budget_lines: engine.budget_lines(input.progress)?,
        monthly_kpis: engine.monthly_kpis(input.progress)?,
        project_kpis: engine.project_kpis(input.progress)?,
        metrics,
        states,
        counts,
        closed,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Earned value reconciliation: event-sourced axis ledger with monthly cumulative KPIs",
        &serde_json::json!({
            "events": input.events.len(),
            "as_of": input.as_of,
            "currency": engine.config().currency,
            "index_scale": engine.config().index_scale,
        }),
        warnings,
        elapsed,
        output,
    ))
}

/// Match report for each record, without recording anything.
pub fn explain_records(
    input: &ExplainInput,
    config: Option<&EngineConfig>,
) -> EvmResult<ComputationOutput<Vec<Explanation>>> {
    let start = Instant::now();
    let config = EngineConfig::resolve(config, input.config.as_ref());
    let engine = Engine::new(input.book.clone(), config)?;
    let mut warnings = Vec::new();
    let mut explanations = Vec::with_capacity(input.records.len());
    for record in &input.records {
        match engine.explain(record) {
            Ok(e) => explanations.push(e),
            Err(e) => warnings.push(format!("{} cannot be classified: {e}", record.key())),
        }
    }

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Axis matching report",
        &serde_json::json!({ "records": input.records.len() }),
        warnings,
        elapsed,
        explanations,
    ))
}

/// Validate a book without failing: the first problem found is reported.
pub fn validate_book(book: &Book, config: &EngineConfig) -> ComputationOutput<BookReport> {
    let start = Instant::now();
    let error = book.validate(config).err().map(|e| e.to_string());
    let report = BookReport {
        valid: error.is_none(),
        error,
        projects: book.projects.len(),
        progresses: book.progresses.len(),
        axes: book.progresses.iter().map(|p| p.axes.len()).sum(),
        axis_categories: book.axis_categories.len(),
    };
    let elapsed = start.elapsed().as_micros() as u64;
    with_metadata(
        "Book validation: references, overlaps and state",
        &serde_json::json!({ "hierarchical_overlap": config.hierarchical_overlap }),
        Vec::new(),
        elapsed,
        report,
    )
}

/// Axis categories of a book, filtered on code or name when `term` is
/// given.
pub fn list_axis_categories(book: &Book, term: Option<&str>) -> ComputationOutput<Vec<AxisCategory>> {
    let start = Instant::now();
    let found: Vec<AxisCategory> = match term {
        Some(t) => search_categories(&book.axis_categories, t).into_iter().cloned().collect(),
        None => book.axis_categories.clone(),
    };
    let mut warnings = Vec::new();
    if found.is_empty() {
        warnings.push(match term {
            Some(t) => format!("no axis category matches '{t}'"),
            None => "book has no axis categories".to_string(),
        });
    }
    let elapsed = start.elapsed().as_micros() as u64;
    with_metadata(
        "Axis category lookup on code or name",
        &serde_json::json!({ "search": term }),
        warnings,
        elapsed,
        found,
    )
}

/// Fill an empty progress with the standard axes.
#[cfg(feature = "templates")]
pub fn apply_template(
    input: &TemplateInput,
    config: Option<&EngineConfig>,
) -> EvmResult<ComputationOutput<TemplateOutput>> {
    let start = Instant::now();
    let config = EngineConfig::resolve(config, input.config.as_ref());
    let mut engine = Engine::new(input.book.clone(), config)?;
    let outcome = engine.apply_template(input.progress)?;
    let mut warnings = Vec::new();
    if outcome.is_none() {
        warnings.push(format!(
            "progress {} already has axes, template not applied",
            input.progress
        ));
    }

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Standard steel construction axis template",
        &serde_json::json!({ "progress": input.progress }),
        warnings,
        elapsed,
        TemplateOutput {
            outcome,
            book: engine.into_book(),
        },
    ))
}
