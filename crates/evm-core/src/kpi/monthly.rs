use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::axis::FinancialAxis;
use crate::ledger::Aggregates;
use crate::period::{month_label, month_range, month_start};
use crate::progress::{FinancialProgress, Project};
use crate::types::{safe_ratio, AxisId, Money, ProgressId, Rate};
use crate::EvmResult;

// ---------------------------------------------------------------------------
// Output types
// ---------------------------------------------------------------------------

/// Monthly and cumulative EVM figures of one axis, or of the whole progress
/// when `axis` is `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyKpi {
    pub progress: ProgressId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub axis: Option<AxisId>,
    /// "MO Fab - March 2024"
    pub display_name: String,
    pub month: NaiveDate,
    pub monthly_planned_value: Money,
    pub monthly_earned_value: Money,
    pub monthly_actual_cost: Money,
    pub cumulative_planned_value: Money,
    pub cumulative_earned_value: Money,
    pub cumulative_actual_cost: Money,
    /// Cumulative EV / cumulative AC
    pub cost_performance_index: Rate,
    /// Cumulative EV / cumulative PV
    pub schedule_performance_index: Rate,
    /// Cumulative EV − cumulative AC
    pub cost_variance: Money,
    /// Cumulative EV − cumulative PV
    pub schedule_variance: Money,
}

#[derive(Debug, Clone, Copy, Default)]
struct MonthSums {
    planned: Money,
    earned: Money,
    cost: Money,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// First and last month to report for a progress: the project dates,
/// widened to cover every dated line. `None` when there is nothing to date.
pub fn reporting_window(
    progress: &FinancialProgress,
    project: Option<&Project>,
    aggregates: &Aggregates,
) -> Option<(NaiveDate, NaiveDate)> {
    let mut dates: Vec<NaiveDate> = Vec::new();
    if let Some(p) = project {
        dates.extend(p.date_start);
        dates.extend(p.date_end);
    }
    for axis in &progress.axes {
        dates.extend(aggregates.lines_of(axis.id).map(|(d, _)| d));
        dates.extend(aggregates.budgets_of(axis.id).map(|(d, _)| d));
    }
    let first = dates.iter().min().copied()?;
    let last = dates.iter().max().copied()?;
    Some((month_start(first), month_start(last)))
}

/// One row per axis and month of the reporting window, axes in sequence
/// order.
pub fn axis_monthly(
    progress: &FinancialProgress,
    project: Option<&Project>,
    aggregates: &Aggregates,
    scale: u32,
) -> EvmResult<Vec<MonthlyKpi>> {
    let Some((first, last)) = reporting_window(progress, project, aggregates) else {
        return Ok(Vec::new());
    };
    let months = month_range(first, last)?;

    let mut axes: Vec<_> = progress.axes.iter().collect();
    axes.sort_by_key(|a| (a.sequence, a.id));

    let mut rows = Vec::with_capacity(axes.len() * months.len());
    for axis in axes {
        let mut by_month = BTreeMap::new();
        add_axis_months(axis, aggregates, &mut by_month);
        rows.extend(cumulate(
            progress.id,
            Some(axis.id),
            &axis.name,
            &months,
            &by_month,
            scale,
        ));
    }
    Ok(rows)
}

/// Project-level rows: the sum of every axis per month.
pub fn project_monthly(
    progress: &FinancialProgress,
    project: Option<&Project>,
    aggregates: &Aggregates,
    scale: u32,
) -> EvmResult<Vec<MonthlyKpi>> {
    let Some((first, last)) = reporting_window(progress, project, aggregates) else {
        return Ok(Vec::new());
    };
    let months = month_range(first, last)?;

    let mut by_month: BTreeMap<NaiveDate, MonthSums> = BTreeMap::new();
    for axis in &progress.axes {
        add_axis_months(axis, aggregates, &mut by_month);
    }
    let label = progress.name(project);
    Ok(cumulate(progress.id, None, &label, &months, &by_month, scale))
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

fn add_axis_months(
    axis: &FinancialAxis,
    aggregates: &Aggregates,
    by_month: &mut BTreeMap<NaiveDate, MonthSums>,
) {
    for (date, cell) in aggregates.lines_of(axis.id) {
        let sums = by_month.entry(month_start(date)).or_default();
        sums.earned += axis.earned_amount(cell.earned_value);
        sums.cost += cell.actual_cost;
    }
    for (date, cell) in aggregates.budgets_of(axis.id) {
        by_month.entry(month_start(date)).or_default().planned += cell.planned_budget;
    }
}

fn cumulate(
    progress: ProgressId,
    axis: Option<AxisId>,
    label: &str,
    months: &[NaiveDate],
    by_month: &BTreeMap<NaiveDate, MonthSums>,
    scale: u32,
) -> Vec<MonthlyKpi> {
    let mut cum = MonthSums::default();
    months
        .iter()
        .map(|month| {
            let m = by_month.get(month).copied().unwrap_or_default();
            cum.planned += m.planned;
            cum.earned += m.earned;
            cum.cost += m.cost;
            MonthlyKpi {
                progress,
                axis,
                display_name: format!("{label} - {}", month_label(*month)),
                month: *month,
                monthly_planned_value: m.planned,
                monthly_earned_value: m.earned,
                monthly_actual_cost: m.cost,
                cumulative_planned_value: cum.planned,
                cumulative_earned_value: cum.earned,
                cumulative_actual_cost: cum.cost,
                cost_performance_index: safe_ratio(cum.earned, cum.cost).round_dp(scale),
                schedule_performance_index: safe_ratio(cum.earned, cum.planned).round_dp(scale),
                cost_variance: cum.earned - cum.cost,
                schedule_variance: cum.earned - cum.planned,
            }
        })
        .collect()
}
