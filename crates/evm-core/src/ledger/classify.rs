use chrono::NaiveDate;
use log::debug;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::event::{Delta, DeltaKind};
use crate::axis::{CostSource, CriteriaMiss, EarnedSource, FinancialAxis, Phase};
use crate::catalog::LocationUsage;
use crate::config::EngineConfig;
use crate::engine::Book;
use crate::error::EvmError;
use crate::progress::FinancialProgress;
use crate::sources::manual::RESERVED_ID_FLOOR;
use crate::sources::{
    AnalyticLine, InvoiceKind, LineDisplay, ManualEntry, ManualValue, MoveOrigin, MoveState,
    PostingState, SourceKey, SourceRecord, StockMove, VendorInvoiceLine,
};
use crate::types::{AccountId, AxisId, ProgressId, ProjectId};
use crate::EvmResult;

// ---------------------------------------------------------------------------
// Output types
// ---------------------------------------------------------------------------

/// An axis that was considered for a row and turned down.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rejection {
    pub axis: AxisId,
    pub axis_name: String,
    pub reason: String,
}

/// Everything the engine decided about one source row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub key: SourceKey,
    pub date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<ProgressId>,
    /// Set when the row cannot feed any axis at all
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ineligible: Option<String>,
    pub deltas: Vec<Delta>,
    pub rejections: Vec<Rejection>,
    pub warnings: Vec<String>,
}

impl Classification {
    fn new(key: SourceKey, date: NaiveDate) -> Self {
        Classification {
            key,
            date,
            progress: None,
            ineligible: None,
            deltas: Vec::new(),
            rejections: Vec::new(),
            warnings: Vec::new(),
        }
    }

    fn ineligible(mut self, reason: impl Into<String>) -> Self {
        self.ineligible = Some(reason.into());
        self
    }

    pub fn matched_axes(&self) -> Vec<AxisId> {
        let mut axes: Vec<AxisId> = self.deltas.iter().map(|d| d.axis).collect();
        axes.dedup();
        axes
    }
}

// ---------------------------------------------------------------------------
// Classifier
// ---------------------------------------------------------------------------

/// Read-only view of a book, indexed for matching source rows to axes.
pub struct Classifier<'a> {
    book: &'a Book,
    config: &'a EngineConfig,
    by_project: BTreeMap<ProjectId, usize>,
    by_account: BTreeMap<AccountId, usize>,
    by_axis: BTreeMap<AxisId, usize>,
}

impl<'a> Classifier<'a> {
    pub fn new(book: &'a Book, config: &'a EngineConfig) -> Self {
        let mut by_project = BTreeMap::new();
        let mut by_account = BTreeMap::new();
        let mut by_axis = BTreeMap::new();
        for (idx, progress) in book.progresses.iter().enumerate() {
            by_project.insert(progress.project, idx);
            if let Some(account) = book.project(progress.project).and_then(|p| p.analytic_account) {
                by_account.insert(account, idx);
            }
            for axis in &progress.axes {
                by_axis.insert(axis.id, idx);
            }
        }
        Classifier {
            book,
            config,
            by_project,
            by_account,
            by_axis,
        }
    }

    /// Turn a source row into signed axis deltas.
    ///
    /// Rows that do not qualify come back with `ineligible` set. Manual
    /// entries that break an input rule (locked axis, rate outside [0, 1])
    /// are errors.
    pub fn classify(&self, record: &SourceRecord) -> EvmResult<Classification> {
        let key = record.key();
        let c = Classification::new(key, record.booking_date());
        let mut c = match record {
            SourceRecord::Timesheet(line) => self.classify_analytic(c, line)?,
            SourceRecord::VendorInvoice(line) => self.classify_invoice(c, line)?,
            SourceRecord::Stock(mv) => self.classify_stock(c, mv)?,
            SourceRecord::Manual(entry) => self.classify_manual(c, entry)?,
            SourceRecord::Sales(_) => c.ineligible("customer invoices only feed project metrics"),
        };
        c.deltas.retain(|d| !d.amount.is_zero());

        let matched = c.matched_axes();
        if matched.len() > 1 {
            let names: Vec<String> = matched.iter().map(|a| self.axis_name(*a)).collect();
            c.warnings
                .push(format!("{key} credited to {} axes: {}", matched.len(), names.join(", ")));
        }
        debug!(
            "classified {key}: {} delta(s), {} rejection(s){}",
            c.deltas.len(),
            c.rejections.len(),
            c.ineligible
                .as_deref()
                .map(|r| format!(", ineligible: {r}"))
                .unwrap_or_default()
        );
        Ok(c)
    }

    fn progress_at(&self, idx: Option<usize>) -> Option<&'a FinancialProgress> {
        idx.and_then(|i| self.book.progresses.get(i))
    }

    fn axis_name(&self, id: AxisId) -> String {
        self.by_axis
            .get(&id)
            .and_then(|i| self.book.progresses.get(*i))
            .and_then(|p| p.axis(id))
            .map(|a| a.name.clone())
            .unwrap_or_else(|| format!("#{id}"))
    }

    /// Resolve the owning progress, or explain why there is none.
    fn open_progress(
        &self,
        c: Classification,
        progress: Option<&'a FinancialProgress>,
        missing: &str,
    ) -> Result<(Classification, &'a FinancialProgress), Classification> {
        match progress {
            None => Err(c.ineligible(missing.to_string())),
            Some(p) if !p.accepts_activity() => {
                Err(c.ineligible(format!("progress {} is {} or archived", p.id, p.state)))
            }
            Some(p) => {
                let mut c = c;
                c.progress = Some(p.id);
                Ok((c, p))
            }
        }
    }

    /// Offer a row to every candidate axis of a progress. `value` gives the
    /// deltas an accepted axis receives.
    fn credit<P, F, V>(
        &self,
        c: &mut Classification,
        progress: &FinancialProgress,
        candidate: P,
        check: F,
        value: V,
    ) -> EvmResult<()>
    where
        P: Fn(&FinancialAxis) -> bool,
        F: Fn(&FinancialAxis) -> EvmResult<Option<CriteriaMiss>>,
        V: Fn(&FinancialAxis) -> EvmResult<Vec<(DeltaKind, Decimal)>>,
    {
        let mut considered = 0usize;
        for axis in progress.axes.iter().filter(|a| candidate(a)) {
            considered += 1;
            if !axis.accepts(c.date) {
                c.rejections.push(Rejection {
                    axis: axis.id,
                    axis_name: axis.name.clone(),
                    reason: match axis.closed_on {
                        Some(day) => format!("axis closed on {day}"),
                        None => "axis is archived".into(),
                    },
                });
                continue;
            }
            match check(axis)? {
                Some(miss) => c.rejections.push(Rejection {
                    axis: axis.id,
                    axis_name: axis.name.clone(),
                    reason: miss.to_string(),
                }),
                None => {
                    for (kind, amount) in value(axis)? {
                        c.deltas.push(Delta {
                            axis: axis.id,
                            date: c.date,
                            kind,
                            amount,
                        });
                    }
                }
            }
        }
        if c.deltas.is_empty() {
            c.warnings.push(if considered == 0 {
                format!("{}: progress {} has no candidate axis", c.key, progress.id)
            } else {
                format!("{}: no axis matched among {considered} candidate(s)", c.key)
            });
        }
        Ok(())
    }

    // -- timesheets -------------------------------------------------------

    fn classify_analytic(&self, c: Classification, line: &AnalyticLine) -> EvmResult<Classification> {
        if !line.is_cost() {
            return Ok(c.ineligible("revenue line (positive amount)"));
        }
        let Some(account) = line.account else {
            return Ok(c.ineligible("no analytic account"));
        };
        let progress = self.progress_at(self.by_account.get(&account).copied());
        let (mut c, progress) =
            match self.open_progress(c, progress, &format!("no progress for account {account}")) {
                Ok(found) => found,
                Err(c) => return Ok(c),
            };
        let catalog = &self.book.catalog;
        let depth = self.config.max_category_depth;
        let cost = line.amount.abs();
        self.credit(
            &mut c,
            progress,
            |a| a.cost_source == CostSource::Timesheet,
            |a| {
                if let Some(miss) = a.criteria.check_product_exclusive(catalog, line.product, depth)? {
                    return Ok(Some(miss));
                }
                Ok(a.criteria.check_people(catalog, line.employee))
            },
            |a| {
                let mut deltas = vec![(DeltaKind::ActualCost, cost)];
                if a.earned_source == EarnedSource::TimesheetHours {
                    deltas.push((DeltaKind::EarnedQuantity, line.unit_amount));
                }
                Ok(deltas)
            },
        )?;
        Ok(c)
    }

    // -- vendor invoices --------------------------------------------------

    fn classify_invoice(
        &self,
        c: Classification,
        line: &VendorInvoiceLine,
    ) -> EvmResult<Classification> {
        if line.state != PostingState::Posted {
            return Ok(c.ineligible(format!("invoice is not posted ({:?})", line.state)));
        }
        if !matches!(line.kind, InvoiceKind::VendorBill | InvoiceKind::VendorRefund) {
            return Ok(c.ineligible("not a vendor bill or refund"));
        }
        if line.display != LineDisplay::Product {
            return Ok(c.ineligible("not a product line"));
        }
        let Some(project) = line.project else {
            return Ok(c.ineligible("invoice has no project"));
        };
        if line.product.is_none() {
            return Ok(c.ineligible("line has no product"));
        }
        let progress = self.progress_at(self.by_project.get(&project).copied());
        let (mut c, progress) =
            match self.open_progress(c, progress, &format!("no progress for project {project}")) {
                Ok(found) => found,
                Err(c) => return Ok(c),
            };
        let catalog = &self.book.catalog;
        let depth = self.config.max_category_depth;
        self.credit(
            &mut c,
            progress,
            |a| a.cost_source == CostSource::VendorInvoice,
            |a| a.criteria.check_product_required(catalog, line.product, depth),
            fixed(DeltaKind::ActualCost, line.signed_cost()),
        )?;
        Ok(c)
    }

    // -- stock ------------------------------------------------------------

    fn classify_stock(&self, c: Classification, mv: &StockMove) -> EvmResult<Classification> {
        if mv.state != MoveState::Done {
            return Ok(c.ineligible(format!("move is not done ({:?})", mv.state)));
        }
        if mv.quantity <= Decimal::ZERO {
            return Ok(c.ineligible("non-positive quantity"));
        }
        let catalog = &self.book.catalog;
        let depth = self.config.max_category_depth;

        match &mv.origin {
            MoveOrigin::Picking {
                project,
                state,
                source_location,
                destination_location,
                is_return,
                ..
            } => {
                if *state != MoveState::Done {
                    return Ok(c.ineligible("picking is not done"));
                }
                let (Some(project), Some(source), Some(destination)) =
                    (project, source_location, destination_location)
                else {
                    return Ok(c.ineligible("picking lacks a project or a location"));
                };
                // A return takes back what was delivered to its source location.
                let (target, sign) = if *is_return {
                    (*source, Decimal::NEGATIVE_ONE)
                } else {
                    (*destination, Decimal::ONE)
                };
                let progress = self.progress_at(self.by_project.get(project).copied());
                let (mut c, progress) = match self.open_progress(
                    c,
                    progress,
                    &format!("no progress for project {project}"),
                ) {
                    Ok(found) => found,
                    Err(c) => return Ok(c),
                };
                self.credit(
                    &mut c,
                    progress,
                    |a| a.earned_source.is_stock_driven(),
                    |a| {
                        if let Some(miss) = a.criteria.check_destination(Some(target)) {
                            return Ok(Some(miss));
                        }
                        a.criteria.check_product_required(catalog, Some(mv.product), depth)
                    },
                    |a| {
                        let earned = a.moved_quantity(catalog, mv.product, mv.quantity)?;
                        Ok(vec![(DeltaKind::EarnedQuantity, earned * sign)])
                    },
                )?;
                Ok(c)
            }
            MoveOrigin::ProductionComponent {
                state,
                analytic_account,
                operation,
                ..
            } => {
                if *state != MoveState::Done {
                    return Ok(c.ineligible("manufacturing order is not done"));
                }
                if self.destination_usage(mv) != Some(LocationUsage::Production) {
                    return Ok(c.ineligible("component does not go to a production location"));
                }
                if !self.config.accepts_operation(operation.as_deref()) {
                    return Ok(c.ineligible(format!(
                        "operation {} is not costed",
                        operation.as_deref().unwrap_or("(none)")
                    )));
                }
                let cost = mv.quantity * self.unit_cost(mv)?;
                self.credit_component(c, mv, *analytic_account, cost)
            }
            MoveOrigin::ProductionOutput {
                state,
                analytic_account,
                operation,
                ..
            } => {
                if *state != MoveState::Done {
                    return Ok(c.ineligible("manufacturing order is not done"));
                }
                let Some(phase) = operation.as_deref().and_then(Phase::parse) else {
                    return Ok(c.ineligible(format!(
                        "operation {} is not a manufacturing phase",
                        operation.as_deref().unwrap_or("(none)")
                    )));
                };
                self.credit_phase(c, mv, *analytic_account, phase)
            }
            MoveOrigin::UnbuildComponent {
                analytic_account, ..
            } => {
                if self.destination_usage(mv) != Some(LocationUsage::Internal) {
                    return Ok(c.ineligible("component does not return to an internal location"));
                }
                let cost = -(mv.quantity * self.unit_cost(mv)?);
                self.credit_component(c, mv, *analytic_account, cost)
            }
        }
    }

    fn destination_usage(&self, mv: &StockMove) -> Option<LocationUsage> {
        mv.destination_location
            .and_then(|l| self.book.catalog.location_usage(l))
    }

    fn unit_cost(&self, mv: &StockMove) -> EvmResult<Decimal> {
        if let Some(cost) = mv.unit_cost {
            return Ok(cost);
        }
        self.book
            .catalog
            .product(mv.product)
            .map(|p| p.standard_price)
            .ok_or_else(|| EvmError::NotFound {
                entity: "product".into(),
                id: mv.product.to_string(),
            })
    }

    fn credit_component(
        &self,
        c: Classification,
        mv: &StockMove,
        account: Option<AccountId>,
        cost: Decimal,
    ) -> EvmResult<Classification> {
        let Some(account) = account else {
            return Ok(c.ineligible("manufacturing order has no analytic account"));
        };
        let progress = self.progress_at(self.by_account.get(&account).copied());
        let (mut c, progress) =
            match self.open_progress(c, progress, &format!("no progress for account {account}")) {
                Ok(found) => found,
                Err(c) => return Ok(c),
            };
        let catalog = &self.book.catalog;
        let depth = self.config.max_category_depth;
        self.credit(
            &mut c,
            progress,
            |a| a.cost_source == CostSource::StockIssue,
            |a| a.criteria.check_product_required(catalog, Some(mv.product), depth),
            fixed(DeltaKind::ActualCost, cost),
        )?;
        Ok(c)
    }

    /// Credit the share of a finished product its phase earns on the
    /// progress-rate axes of the order's account.
    fn credit_phase(
        &self,
        c: Classification,
        mv: &StockMove,
        account: Option<AccountId>,
        phase: Phase,
    ) -> EvmResult<Classification> {
        let Some(account) = account else {
            return Ok(c.ineligible("manufacturing order has no analytic account"));
        };
        let progress = self.progress_at(self.by_account.get(&account).copied());
        let (mut c, progress) =
            match self.open_progress(c, progress, &format!("no progress for account {account}")) {
                Ok(found) => found,
                Err(c) => return Ok(c),
            };
        let catalog = &self.book.catalog;
        let depth = self.config.max_category_depth;
        let category = catalog.product_category(mv.product);
        self.credit(
            &mut c,
            progress,
            |a| a.earned_source == EarnedSource::ProgressRate,
            |a| {
                if let Some(miss) = a.criteria.check_product_required(catalog, Some(mv.product), depth)? {
                    return Ok(Some(miss));
                }
                let share = match category {
                    Some(cat) => a.phase_share(catalog, cat, phase, depth)?,
                    None => None,
                };
                Ok(share.is_none().then_some(CriteriaMiss::NoPhaseRatio))
            },
            |a| {
                let share = match category {
                    Some(cat) => a.phase_share(catalog, cat, phase, depth)?.unwrap_or_default(),
                    None => Decimal::ZERO,
                };
                let earned = a.moved_quantity(catalog, mv.product, mv.quantity)?;
                Ok(vec![(DeltaKind::EarnedQuantity, earned * share)])
            },
        )?;
        Ok(c)
    }

    // -- manual entries ---------------------------------------------------

    fn classify_manual(&self, c: Classification, entry: &ManualEntry) -> EvmResult<Classification> {
        if !entry.has_valid_id() {
            return Err(EvmError::InvalidInput {
                field: format!("manual entry {}", entry.id),
                reason: format!("ids from {RESERVED_ID_FLOOR} up are reserved for grid edits and imports"),
            });
        }
        let progress = self.progress_at(self.by_axis.get(&entry.axis).copied());
        let (mut c, progress) =
            match self.open_progress(c, progress, &format!("unknown axis {}", entry.axis)) {
                Ok(found) => found,
                Err(c) => return Ok(c),
            };
        let Some(axis) = progress.axis(entry.axis) else {
            return Ok(c.ineligible(format!("unknown axis {}", entry.axis)));
        };

        let (kind, amount) = match entry.value {
            ManualValue::EarnedQuantity(q) => {
                self.check_unlocked(axis)?;
                (DeltaKind::EarnedQuantity, q)
            }
            ManualValue::ProgressRate(rate) => {
                self.check_unlocked(axis)?;
                if rate < Decimal::ZERO || rate > Decimal::ONE {
                    return Err(EvmError::InvalidInput {
                        field: format!("progress rate of axis '{}'", axis.name),
                        reason: format!("{rate} is outside [0, 1]"),
                    });
                }
                (DeltaKind::EarnedQuantity, rate * axis.planned_quantity)
            }
            ManualValue::PlannedBudget(b) => (DeltaKind::PlannedBudget, b),
            ManualValue::ActualCost(m) => (DeltaKind::ActualCost, m),
        };

        let target = axis.id;
        self.credit(&mut c, progress, |a| a.id == target, |_| Ok(None), fixed(kind, amount))?;
        Ok(c)
    }

    fn check_unlocked(&self, axis: &FinancialAxis) -> EvmResult<()> {
        if self.config.lock_automatic_earned_value && axis.earned_source.is_automatic() {
            return Err(EvmError::LockedEarnedValue {
                axis: axis.name.clone(),
                driver: axis.earned_source.to_string(),
            });
        }
        Ok(())
    }
}

/// The same delta for every accepted axis.
fn fixed(
    kind: DeltaKind,
    amount: Decimal,
) -> impl Fn(&FinancialAxis) -> EvmResult<Vec<(DeltaKind, Decimal)>> {
    move |_| Ok(vec![(kind, amount)])
}
