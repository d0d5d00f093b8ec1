use chrono::NaiveDate;
use log::{debug, info, warn};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::axis::category::validate_categories;
use crate::axis::validation::validate_axes;
use crate::axis::{AxisCategory, FinancialAxis};
use crate::catalog::Catalog;
use crate::config::EngineConfig;
use crate::error::EvmError;
use crate::kpi::{self, AxisLine, BudgetLine, MonthlyKpi};
use crate::ledger::{
    ApplyOutcome, Classification, Classifier, DeltaKind, Ledger, LedgerEvent, Rejection,
};
use crate::period::{month_end, month_start};
use crate::progress::metrics::compute_metrics;
use crate::progress::{
    FinancialProgress, ProgressState, Project, ProjectFigures, ProjectMetrics, SalesFigures,
};
use crate::sources::manual::{derived_id, GRID_TAG, MAX_AXIS_ID};
use crate::sources::{ManualEntry, ManualValue, SourceKey, SourceLedger, SourceRecord};
use crate::types::{AxisId, Money, ProgressId};
use crate::EvmResult;

// ---------------------------------------------------------------------------
// Book
// ---------------------------------------------------------------------------

/// Configuration side of the engine: master data, projects and their axes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Book {
    #[serde(default)]
    pub catalog: Catalog,
    #[serde(default)]
    pub axis_categories: Vec<AxisCategory>,
    #[serde(default)]
    pub projects: Vec<Project>,
    #[serde(default)]
    pub progresses: Vec<FinancialProgress>,
}

impl Book {
    pub fn project(&self, id: crate::types::ProjectId) -> Option<&Project> {
        self.projects.iter().find(|p| p.id == id)
    }

    pub fn progress(&self, id: ProgressId) -> Option<&FinancialProgress> {
        self.progresses.iter().find(|p| p.id == id)
    }

    fn progress_mut(&mut self, id: ProgressId) -> EvmResult<&mut FinancialProgress> {
        self.progresses
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| EvmError::NotFound {
                entity: "progress".into(),
                id: id.to_string(),
            })
    }

    /// The axis together with the progress that owns it.
    pub fn axis(&self, id: AxisId) -> Option<(&FinancialProgress, &FinancialAxis)> {
        self.progresses
            .iter()
            .find_map(|p| p.axis(id).map(|a| (p, a)))
    }

    /// Smallest id greater than every axis id in use.
    pub fn next_axis_id(&self) -> AxisId {
        let max = self
            .progresses
            .iter()
            .flat_map(|p| p.axes.iter().map(|a| a.id.0))
            .max()
            .unwrap_or(0);
        AxisId(max + 1)
    }

    pub fn validate(&self, config: &EngineConfig) -> EvmResult<()> {
        config.validate()?;
        validate_categories(&self.axis_categories)?;

        let mut project_ids = BTreeSet::new();
        let mut accounts = BTreeSet::new();
        for p in &self.projects {
            if !project_ids.insert(p.id) {
                return Err(EvmError::InvalidInput {
                    field: "projects".into(),
                    reason: format!("duplicate project id {}", p.id),
                });
            }
            if let (Some(start), Some(end)) = (p.date_start, p.date_end) {
                if end < start {
                    return Err(EvmError::InvalidInput {
                        field: format!("project '{}'", p.name),
                        reason: format!("ends on {end}, before its start on {start}"),
                    });
                }
            }
            if let Some(account) = p.analytic_account {
                if !accounts.insert(account) {
                    return Err(EvmError::InvalidInput {
                        field: format!("project '{}'", p.name),
                        reason: format!("analytic account {account} is shared with another project"),
                    });
                }
            }
        }

        let mut progress_ids = BTreeSet::new();
        let mut owned_projects = BTreeSet::new();
        let mut axis_ids = BTreeSet::new();
        for progress in &self.progresses {
            if !progress_ids.insert(progress.id) {
                return Err(EvmError::InvalidInput {
                    field: "progresses".into(),
                    reason: format!("duplicate progress id {}", progress.id),
                });
            }
            if self.project(progress.project).is_none() {
                return Err(EvmError::NotFound {
                    entity: format!("project of progress {}", progress.id),
                    id: progress.project.to_string(),
                });
            }
            if !owned_projects.insert(progress.project) {
                return Err(EvmError::InvalidInput {
                    field: "progresses".into(),
                    reason: format!("project {} has more than one progress", progress.project),
                });
            }
            for axis in &progress.axes {
                if axis.id.0 > MAX_AXIS_ID {
                    return Err(EvmError::InvalidInput {
                        field: format!("axis '{}'", axis.name),
                        reason: format!("id {} exceeds the largest axis id {MAX_AXIS_ID}", axis.id),
                    });
                }
                if !axis_ids.insert(axis.id) {
                    return Err(EvmError::InvalidInput {
                        field: "axes".into(),
                        reason: format!("axis id {} is used by more than one progress", axis.id),
                    });
                }
            }
            validate_axes(&progress.axes, &self.catalog, &self.axis_categories, config)?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateChange {
    pub progress: ProgressId,
    pub from: ProgressState,
    pub to: ProgressState,
}

/// Cell of the planning grid a user edits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GridField {
    ActualCost,
    EarnedQuantity,
    PlannedBudget,
}

impl GridField {
    fn slot(self) -> u8 {
        match self {
            GridField::ActualCost => 0,
            GridField::EarnedQuantity => 1,
            GridField::PlannedBudget => 2,
        }
    }

    fn wrap(self, amount: Decimal) -> ManualValue {
        match self {
            GridField::ActualCost => ManualValue::ActualCost(amount),
            GridField::EarnedQuantity => ManualValue::EarnedQuantity(amount),
            GridField::PlannedBudget => ManualValue::PlannedBudget(amount),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchedAxis {
    pub axis: AxisId,
    pub complete_name: String,
    pub kind: DeltaKind,
    pub amount: Decimal,
}

/// Why a source row lands, or does not land, on each axis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Explanation {
    pub key: SourceKey,
    pub date: NaiveDate,
    pub eligible: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<String>,
    pub matched: Vec<MatchedAxis>,
    pub rejections: Vec<Rejection>,
    pub warnings: Vec<String>,
    /// Human readable summary, one line per fact
    pub report: Vec<String>,
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Book, configuration and ledger, kept consistent with each other.
#[derive(Debug, Clone)]
pub struct Engine {
    book: Book,
    config: EngineConfig,
    ledger: Ledger,
}

impl Engine {
    pub fn new(book: Book, config: EngineConfig) -> EvmResult<Self> {
        book.validate(&config)?;
        info!(
            "engine ready: {} project(s), {} progress(es), {} axis(es)",
            book.projects.len(),
            book.progresses.len(),
            book.progresses.iter().map(|p| p.axes.len()).sum::<usize>()
        );
        let mut engine = Engine {
            book,
            config,
            ledger: Ledger::default(),
        };
        engine.refresh_states();
        Ok(engine)
    }

    pub fn book(&self) -> &Book {
        &self.book
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn into_book(self) -> Book {
        self.book
    }

    // -- ingestion ---------------------------------------------------------

    /// Apply one source event, then re-evaluate progress states.
    pub fn apply(&mut self, event: LedgerEvent) -> EvmResult<ApplyOutcome> {
        let classifier = Classifier::new(&self.book, &self.config);
        let outcome = self.ledger.apply(event, &classifier)?;
        self.refresh_states();
        Ok(outcome)
    }

    /// Apply events in order as one batch. The first error discards the
    /// whole batch: the ledger and the progress states are left as they were.
    pub fn apply_all<I>(&mut self, events: I) -> EvmResult<Vec<ApplyOutcome>>
    where
        I: IntoIterator<Item = LedgerEvent>,
    {
        let classifier = Classifier::new(&self.book, &self.config);
        let mut staged = self.ledger.clone();
        let mut outcomes = Vec::new();
        for event in events {
            let key = event.key();
            match staged.apply(event, &classifier) {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => {
                    warn!("batch of {} event(s) discarded at {key}: {e}", outcomes.len() + 1);
                    return Err(e);
                }
            }
        }
        self.ledger = staged;
        self.refresh_states();
        Ok(outcomes)
    }

    /// Recompute every aggregate from the live records.
    pub fn rebuild(&mut self) -> Vec<String> {
        let classifier = Classifier::new(&self.book, &self.config);
        let warnings = self.ledger.rebuild(&classifier);
        self.refresh_states();
        warnings
    }

    /// Classify a row against the current book without recording it.
    pub fn classify(&self, record: &SourceRecord) -> EvmResult<Classification> {
        Classifier::new(&self.book, &self.config).classify(record)
    }

    // -- read models -------------------------------------------------------

    fn selected(&self, progress: Option<ProgressId>) -> EvmResult<Vec<&FinancialProgress>> {
        match progress {
            None => Ok(self.book.progresses.iter().collect()),
            Some(id) => self
                .book
                .progress(id)
                .map(|p| vec![p])
                .ok_or_else(|| EvmError::NotFound {
                    entity: "progress".into(),
                    id: id.to_string(),
                }),
        }
    }

    pub fn axis_lines(&self, progress: Option<ProgressId>) -> EvmResult<Vec<AxisLine>> {
        let aggregates = self.ledger.aggregates();
        Ok(self
            .selected(progress)?
            .into_iter()
            .flat_map(|p| kpi::axis_lines(p, aggregates, self.config.index_scale))
            .collect())
    }

    pub fn budget_lines(&self, progress: Option<ProgressId>) -> EvmResult<Vec<BudgetLine>> {
        let aggregates = self.ledger.aggregates();
        Ok(self
            .selected(progress)?
            .into_iter()
            .flat_map(|p| kpi::budget_lines(p, aggregates))
            .collect())
    }

    /// Monthly cumulative rows per axis.
    pub fn monthly_kpis(&self, progress: Option<ProgressId>) -> EvmResult<Vec<MonthlyKpi>> {
        let mut rows = Vec::new();
        for p in self.selected(progress)? {
            rows.extend(kpi::axis_monthly(
                p,
                self.book.project(p.project),
                self.ledger.aggregates(),
                self.config.index_scale,
            )?);
        }
        Ok(rows)
    }

    /// Monthly cumulative rows per progress, all axes together.
    pub fn project_kpis(&self, progress: Option<ProgressId>) -> EvmResult<Vec<MonthlyKpi>> {
        let mut rows = Vec::new();
        for p in self.selected(progress)? {
            rows.extend(kpi::project_monthly(
                p,
                self.book.project(p.project),
                self.ledger.aggregates(),
                self.config.index_scale,
            )?);
        }
        Ok(rows)
    }

    pub fn project_metrics(&self, progress: ProgressId) -> EvmResult<ProjectMetrics> {
        let p = self.book.progress(progress).ok_or_else(|| EvmError::NotFound {
            entity: "progress".into(),
            id: progress.to_string(),
        })?;
        Ok(compute_metrics(
            p.id,
            &self.figures(p),
            self.config.index_scale,
        ))
    }

    pub fn all_metrics(&self) -> Vec<ProjectMetrics> {
        self.book
            .progresses
            .iter()
            .map(|p| compute_metrics(p.id, &self.figures(p), self.config.index_scale))
            .collect()
    }

    fn figures(&self, progress: &FinancialProgress) -> ProjectFigures {
        let aggregates = self.ledger.aggregates();
        let mut figures = ProjectFigures::default();
        for axis in &progress.axes {
            for (_, cell) in aggregates.lines_of(axis.id) {
                figures.earned_value += axis.earned_amount(cell.earned_value);
                figures.actual_cost += cell.actual_cost;
            }
            for (_, cell) in aggregates.budgets_of(axis.id) {
                figures.budget_line_total += cell.planned_budget;
            }
            figures.axis_budget_total += axis.planned_budget;
        }
        figures.sales = self.sales_of(progress);
        figures
    }

    fn sales_of(&self, progress: &FinancialProgress) -> SalesFigures {
        let mut sales = SalesFigures::default();
        for record in self.ledger.records() {
            if let SourceRecord::Sales(invoice) = record {
                if invoice.project == progress.project && invoice.counts() {
                    sales.untaxed_total += invoice.amount_untaxed;
                    sales.paid += invoice.paid_amount();
                    sales.unpaid += invoice.unpaid_amount();
                }
            }
        }
        sales
    }

    // -- lifecycle ---------------------------------------------------------

    /// Re-evaluate the automatic state of every progress.
    pub fn refresh_states(&mut self) -> Vec<StateChange> {
        let aggregates = self.ledger.aggregates();
        let mut changes = Vec::new();
        for progress in &mut self.book.progresses {
            let has_activity = progress.axes.iter().any(|axis| {
                aggregates.lines_of(axis.id).any(|(_, cell)| {
                    cell.actual_cost > Decimal::ZERO
                        || cell.earned_value > Decimal::ZERO
                        || axis.earned_amount(cell.earned_value) > Decimal::ZERO
                })
            });
            let all_budgeted = !progress.axes.is_empty()
                && progress.axes.iter().all(|axis| {
                    axis.planned_budget > Decimal::ZERO
                        || aggregates
                            .budgets_of(axis.id)
                            .map(|(_, c)| c.planned_budget)
                            .sum::<Decimal>()
                            > Decimal::ZERO
                });
            let next = progress.state.evaluate(has_activity, all_budgeted);
            if next != progress.state {
                info!("progress {}: {} -> {}", progress.id, progress.state, next);
                changes.push(StateChange {
                    progress: progress.id,
                    from: progress.state,
                    to: next,
                });
                progress.state = next;
            }
        }
        changes
    }

    /// Confirm every running progress whose project has ended on or before
    /// `today`, and close its axes at the project end date.
    pub fn close_due(&mut self, today: NaiveDate) -> EvmResult<Vec<ProgressId>> {
        let mut closed = Vec::new();
        for idx in 0..self.book.progresses.len() {
            let progress = &self.book.progresses[idx];
            if progress.state != ProgressState::InProgress {
                continue;
            }
            let Some(end) = self.book.project(progress.project).and_then(|p| p.date_end) else {
                continue;
            };
            if end > today {
                continue;
            }
            let progress = &mut self.book.progresses[idx];
            progress.state = progress.state.confirm()?;
            for axis in &mut progress.axes {
                axis.active = false;
                axis.closed_on = Some(end);
            }
            info!("progress {} confirmed at project end {end}", progress.id);
            closed.push(progress.id);
        }
        if !closed.is_empty() {
            self.rebuild();
        }
        Ok(closed)
    }

    /// Cancel a progress. Its rows stop contributing.
    pub fn cancel(&mut self, progress: ProgressId) -> EvmResult<Vec<String>> {
        let p = self.book.progress_mut(progress)?;
        p.state = p.state.cancel()?;
        info!("progress {progress} cancelled");
        Ok(self.rebuild())
    }

    /// Bring a cancelled progress back to draft and let the automatic rules
    /// place it again.
    pub fn reset_to_draft(&mut self, progress: ProgressId) -> EvmResult<Vec<String>> {
        let p = self.book.progress_mut(progress)?;
        p.state = p.state.reset_to_draft()?;
        info!("progress {progress} reset to draft");
        Ok(self.rebuild())
    }

    // -- axis configuration --------------------------------------------------

    /// Validate a modified copy of the book, swap it in and refold.
    fn reconfigure<F>(&mut self, change: F) -> EvmResult<Vec<String>>
    where
        F: FnOnce(&mut Book) -> EvmResult<()>,
    {
        let mut book = self.book.clone();
        change(&mut book)?;
        book.validate(&self.config)?;
        self.book = book;
        Ok(self.rebuild())
    }

    pub fn add_axis(&mut self, progress: ProgressId, mut axis: FinancialAxis) -> EvmResult<Vec<String>> {
        axis.price_budget();
        axis.sync_category_ratios();
        debug!("adding axis '{}' to progress {progress}", axis.name);
        self.reconfigure(|book| {
            book.progress_mut(progress)?.axes.push(axis);
            Ok(())
        })
    }

    pub fn update_axis(&mut self, mut axis: FinancialAxis) -> EvmResult<Vec<String>> {
        axis.price_budget();
        axis.sync_category_ratios();
        self.reconfigure(|book| {
            let slot = book
                .progresses
                .iter_mut()
                .flat_map(|p| p.axes.iter_mut())
                .find(|a| a.id == axis.id)
                .ok_or_else(|| EvmError::NotFound {
                    entity: "axis".into(),
                    id: axis.id.to_string(),
                })?;
            *slot = axis;
            Ok(())
        })
    }

    /// Remove an axis. Rows that fed it are kept and stop contributing.
    pub fn remove_axis(&mut self, axis: AxisId) -> EvmResult<Vec<String>> {
        self.reconfigure(|book| {
            for p in &mut book.progresses {
                if let Some(pos) = p.axes.iter().position(|a| a.id == axis) {
                    p.axes.remove(pos);
                    return Ok(());
                }
            }
            Err(EvmError::NotFound {
                entity: "axis".into(),
                id: axis.to_string(),
            })
        })
    }

    #[cfg(feature = "templates")]
    pub fn apply_template(
        &mut self,
        progress: ProgressId,
    ) -> EvmResult<Option<crate::axis::template::TemplateOutcome>> {
        let first_id = self.book.next_axis_id();
        let mut outcome = None;
        self.reconfigure(|book| {
            let mut registry = std::mem::take(&mut book.axis_categories);
            let result = book
                .progress_mut(progress)
                .map(|p| crate::axis::template::apply_standard_template(p, &mut registry, first_id));
            book.axis_categories = registry;
            outcome = result?;
            Ok(())
        })?;
        Ok(outcome)
    }

    // -- planning grid -------------------------------------------------------

    /// Add `change` to a cell of the monthly planning grid and return the new
    /// month total of that field. Edits of one cell accumulate in a single
    /// manual entry dated on the first of the month.
    pub fn adjust_cell(
        &mut self,
        axis: AxisId,
        date: NaiveDate,
        field: GridField,
        change: Decimal,
    ) -> EvmResult<Decimal> {
        if self.book.axis(axis).is_none() {
            return Err(EvmError::NotFound {
                entity: "axis".into(),
                id: axis.to_string(),
            });
        }
        let month = month_start(date);
        let key = SourceKey::new(
            SourceLedger::Manual,
            derived_id(GRID_TAG, axis, month, field.slot()),
        );
        let previous = match self.ledger.record(&key) {
            Some(SourceRecord::Manual(entry)) => manual_amount(&entry.value),
            _ => Decimal::ZERO,
        };
        let revision = self.ledger.revision(&key).unwrap_or(0) + 1;
        let entry = ManualEntry {
            id: key.id,
            axis,
            date: month,
            value: field.wrap(previous + change),
            description: Some("grid adjustment".into()),
        };
        self.apply(LedgerEvent::upsert(revision, SourceRecord::Manual(entry)))?;
        self.month_total(axis, month, field)
    }

    /// Sum of one field of an axis over the month containing `date`.
    pub fn month_total(&self, axis: AxisId, date: NaiveDate, field: GridField) -> EvmResult<Money> {
        let first = month_start(date);
        let last = month_end(date)?;
        let aggregates = self.ledger.aggregates();
        let total = match field {
            GridField::PlannedBudget => aggregates
                .budgets_of(axis)
                .filter(|(d, _)| *d >= first && *d <= last)
                .map(|(_, c)| c.planned_budget)
                .sum(),
            GridField::ActualCost => aggregates
                .lines_of(axis)
                .filter(|(d, _)| *d >= first && *d <= last)
                .map(|(_, c)| c.actual_cost)
                .sum(),
            GridField::EarnedQuantity => aggregates
                .lines_of(axis)
                .filter(|(d, _)| *d >= first && *d <= last)
                .map(|(_, c)| c.earned_value)
                .sum(),
        };
        Ok(total)
    }

    // -- diagnostics -----------------------------------------------------------

    /// Explain how a row is (or would be) matched to axes.
    pub fn explain(&self, record: &SourceRecord) -> EvmResult<Explanation> {
        let c = self.classify(record)?;
        let progress = c.progress.and_then(|id| self.book.progress(id));
        let project = progress.and_then(|p| self.book.project(p.project));
        let code = project.and_then(|p| p.code.as_deref());

        let matched: Vec<MatchedAxis> = c
            .deltas
            .iter()
            .map(|d| MatchedAxis {
                axis: d.axis,
                complete_name: self
                    .book
                    .axis(d.axis)
                    .map(|(_, a)| a.complete_name(code))
                    .unwrap_or_else(|| format!("#{}", d.axis)),
                kind: d.kind,
                amount: d.amount,
            })
            .collect();

        let mut report = vec![
            format!("Row {}", c.key),
            format!("Date: {}", c.date),
        ];
        if let Some(p) = progress {
            report.push(format!("Progress: {} ({})", p.name(project), p.state));
        }
        match &c.ineligible {
            Some(reason) => report.push(format!("Eligible: no ({reason})")),
            None => report.push("Eligible: yes".into()),
        }
        if matched.is_empty() {
            report.push("No axis found".into());
        } else {
            report.push(format!("Axes found ({}):", matched.len()));
            for m in &matched {
                report.push(format!("  - {} ({}: {})", m.complete_name, m.kind, m.amount));
            }
        }
        for r in &c.rejections {
            report.push(format!("  x {} ({})", r.axis_name, r.reason));
        }

        Ok(Explanation {
            key: c.key,
            date: c.date,
            eligible: c.ineligible.is_none(),
            progress: progress.map(|p| p.name(project)),
            matched,
            rejections: c.rejections,
            warnings: c.warnings,
            report,
        })
    }
}

fn manual_amount(value: &ManualValue) -> Decimal {
    match *value {
        ManualValue::EarnedQuantity(v)
        | ManualValue::ProgressRate(v)
        | ManualValue::PlannedBudget(v)
        | ManualValue::ActualCost(v) => v,
    }
}
