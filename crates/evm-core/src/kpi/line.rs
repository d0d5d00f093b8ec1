use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::ledger::Aggregates;
use crate::progress::FinancialProgress;
use crate::types::{safe_ratio, AxisId, Money, ProgressId, Quantity, Rate};

/// One `(axis, date)` axis line as reported.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AxisLine {
    pub progress: ProgressId,
    pub axis: AxisId,
    pub axis_name: String,
    pub date: NaiveDate,
    pub earned_value: Quantity,
    pub actual_cost: Money,
    /// earned_value × axis unit price
    pub earned_amount: Money,
    /// earned_value / planned quantity
    pub acquisition_rate: Rate,
    /// earned_amount / actual_cost
    pub cost_performance_index: Rate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetLine {
    pub progress: ProgressId,
    pub axis: AxisId,
    pub axis_name: String,
    pub date: NaiveDate,
    pub planned_budget: Money,
}

/// Axis lines of a progress, ordered by axis sequence then date.
pub fn axis_lines(progress: &FinancialProgress, aggregates: &Aggregates, scale: u32) -> Vec<AxisLine> {
    let mut axes: Vec<_> = progress.axes.iter().collect();
    axes.sort_by_key(|a| (a.sequence, a.id));

    let mut out = Vec::new();
    for axis in axes {
        for (date, cell) in aggregates.lines_of(axis.id) {
            let earned_amount = axis.earned_amount(cell.earned_value);
            out.push(AxisLine {
                progress: progress.id,
                axis: axis.id,
                axis_name: axis.name.clone(),
                date,
                earned_value: cell.earned_value,
                actual_cost: cell.actual_cost,
                earned_amount,
                acquisition_rate: axis.acquisition_rate(cell.earned_value).round_dp(scale),
                cost_performance_index: safe_ratio(earned_amount, cell.actual_cost).round_dp(scale),
            });
        }
    }
    out
}

pub fn budget_lines(progress: &FinancialProgress, aggregates: &Aggregates) -> Vec<BudgetLine> {
    let mut axes: Vec<_> = progress.axes.iter().collect();
    axes.sort_by_key(|a| (a.sequence, a.id));

    axes.into_iter()
        .flat_map(|axis| {
            aggregates.budgets_of(axis.id).map(move |(date, cell)| BudgetLine {
                progress: progress.id,
                axis: axis.id,
                axis_name: axis.name.clone(),
                date,
                planned_budget: cell.planned_budget,
            })
        })
        .collect()
}
