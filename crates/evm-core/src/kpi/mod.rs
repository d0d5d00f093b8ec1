//! Read models derived from the ledger aggregates: axis lines, budget lines
//! and monthly cumulative indicators. They are recomputed on demand and
//! never stored.

pub mod line;
pub mod monthly;

pub use line::{axis_lines, budget_lines, AxisLine, BudgetLine};
pub use monthly::{axis_monthly, project_monthly, reporting_window, MonthlyKpi};
