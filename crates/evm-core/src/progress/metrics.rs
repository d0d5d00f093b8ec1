use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::types::{safe_ratio, Money, ProgressId, Rate};

// ---------------------------------------------------------------------------
// Input / Output types
// ---------------------------------------------------------------------------

/// Totals a progress' metrics are computed from.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectFigures {
    /// Σ earned amount of the axis lines
    pub earned_value: Money,
    /// Σ actual cost of the axis lines
    pub actual_cost: Money,
    /// Σ planned budget of the budget lines
    pub budget_line_total: Money,
    /// Σ planned budget declared on the axes
    pub axis_budget_total: Money,
    #[serde(default)]
    pub sales: SalesFigures,
}

/// Customer invoicing of the project.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SalesFigures {
    /// Σ untaxed amount of posted customer invoices
    pub untaxed_total: Money,
    /// Σ total of paid invoices
    pub paid: Money,
    /// Σ residual of unpaid and partially paid invoices
    pub unpaid: Money,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PerformanceState {
    Good,
    Warning,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BudgetBasis {
    BudgetLines,
    AxisBudgets,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectMetrics {
    pub progress: ProgressId,
    pub planned_value: Money,
    pub earned_value: Money,
    pub actual_cost: Money,
    /// EV / AC
    pub cost_performance_index: Rate,
    /// EV / PV
    pub schedule_performance_index: Rate,
    /// EV − AC
    pub cost_variance: Money,
    /// EV − PV
    pub schedule_variance: Money,
    /// EV / Σ axis planned budget × 100
    pub completion_rate: Decimal,
    pub performance_state: PerformanceState,
    pub budget_basis: BudgetBasis,
    pub sales_untaxed: Money,
    /// Untaxed sales − actual cost
    pub sales_margin: Money,
    /// (paid − unpaid) / paid
    pub receivable_index: Rate,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Derive the project-level EVM indicators. Budget lines define the planned
/// value as soon as one of them is positive; the axis budgets are the
/// fallback. Completion is always measured against the axis budgets.
pub fn compute_metrics(progress: ProgressId, figures: &ProjectFigures, scale: u32) -> ProjectMetrics {
    let (planned_value, budget_basis) = if figures.budget_line_total > Decimal::ZERO {
        (figures.budget_line_total, BudgetBasis::BudgetLines)
    } else {
        (figures.axis_budget_total, BudgetBasis::AxisBudgets)
    };
    let ev = figures.earned_value;
    let ac = figures.actual_cost;

    let cpi = safe_ratio(ev, ac).round_dp(scale);
    let spi = safe_ratio(ev, planned_value).round_dp(scale);
    let completion_rate = (safe_ratio(ev, figures.axis_budget_total) * dec!(100)).round_dp(scale);
    let performance_state = if cpi >= Decimal::ONE {
        PerformanceState::Good
    } else {
        PerformanceState::Warning
    };

    let sales = &figures.sales;
    let receivable_index = safe_ratio(sales.paid - sales.unpaid, sales.paid).round_dp(scale);

    ProjectMetrics {
        progress,
        planned_value,
        earned_value: ev,
        actual_cost: ac,
        cost_performance_index: cpi,
        schedule_performance_index: spi,
        cost_variance: ev - ac,
        schedule_variance: ev - planned_value,
        completion_rate,
        performance_state,
        budget_basis,
        sales_untaxed: sales.untaxed_total,
        sales_margin: sales.untaxed_total - ac,
        receivable_index,
    }
}
