use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::event::{Delta, DeltaKind};
use crate::types::{AxisId, Money, Quantity};

/// Aggregate of one `(axis, date)` axis line.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineCell {
    pub earned_value: Quantity,
    pub actual_cost: Money,
    /// Number of live deltas folded into the cell
    pub contributions: u32,
}

/// Aggregate of one `(axis, date)` budget line.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BudgetCell {
    pub planned_budget: Money,
    pub contributions: u32,
}

/// Per-axis-per-date sums of every live delta.
///
/// Folding is pure addition, so any order of `add` and `remove` calls that
/// leaves the same set of live deltas produces the same cells. A cell left
/// without contributions is dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Aggregates {
    lines: BTreeMap<(AxisId, NaiveDate), LineCell>,
    budgets: BTreeMap<(AxisId, NaiveDate), BudgetCell>,
}

impl Aggregates {
    pub fn add(&mut self, delta: &Delta) {
        self.fold(delta, delta.amount, true);
    }

    pub fn remove(&mut self, delta: &Delta) {
        self.fold(delta, -delta.amount, false);
    }

    fn fold(&mut self, delta: &Delta, amount: Decimal, adding: bool) {
        let key = (delta.axis, delta.date);
        match delta.kind {
            DeltaKind::PlannedBudget => {
                let cell = self.budgets.entry(key).or_default();
                cell.planned_budget += amount;
                cell.contributions = step(cell.contributions, adding);
                if cell.contributions == 0 {
                    self.budgets.remove(&key);
                }
            }
            DeltaKind::EarnedQuantity | DeltaKind::ActualCost => {
                let cell = self.lines.entry(key).or_default();
                if delta.kind == DeltaKind::EarnedQuantity {
                    cell.earned_value += amount;
                } else {
                    cell.actual_cost += amount;
                }
                cell.contributions = step(cell.contributions, adding);
                if cell.contributions == 0 {
                    self.lines.remove(&key);
                }
            }
        }
    }

    pub fn clear(&mut self) {
        self.lines.clear();
        self.budgets.clear();
    }

    pub fn line(&self, axis: AxisId, date: NaiveDate) -> Option<&LineCell> {
        self.lines.get(&(axis, date))
    }

    pub fn budget(&self, axis: AxisId, date: NaiveDate) -> Option<&BudgetCell> {
        self.budgets.get(&(axis, date))
    }

    /// Lines of one axis in date order.
    pub fn lines_of(&self, axis: AxisId) -> impl Iterator<Item = (NaiveDate, &LineCell)> {
        self.lines
            .range((axis, NaiveDate::MIN)..=(axis, NaiveDate::MAX))
            .map(|((_, date), cell)| (*date, cell))
    }

    pub fn budgets_of(&self, axis: AxisId) -> impl Iterator<Item = (NaiveDate, &BudgetCell)> {
        self.budgets
            .range((axis, NaiveDate::MIN)..=(axis, NaiveDate::MAX))
            .map(|((_, date), cell)| (*date, cell))
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    pub fn budget_count(&self) -> usize {
        self.budgets.len()
    }
}

fn step(count: u32, adding: bool) -> u32 {
    if adding {
        count + 1
    } else {
        count.saturating_sub(1)
    }
}
