use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::types::{AxisId, Money, Quantity, Rate};

/// Ids at or above this value are reserved for entries the engine derives
/// itself (grid edits and imports).
pub const RESERVED_ID_FLOOR: u64 = 1 << 62;
pub(crate) const GRID_TAG: u64 = 1 << 62;
pub(crate) const IMPORT_TAG: u64 = 1 << 63;

/// Largest axis id that fits the axis field of a derived id.
pub const MAX_AXIS_ID: u64 = (1 << 38) - 1;

/// Value carried by a manual entry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ManualValue {
    /// Physical progress in the axis unit
    EarnedQuantity(Quantity),
    /// Fraction of the planned quantity, between 0 and 1
    ProgressRate(Rate),
    PlannedBudget(Money),
    ActualCost(Money),
}

/// Progress, budget or cost typed in by a user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManualEntry {
    pub id: u64,
    pub axis: AxisId,
    pub date: NaiveDate,
    pub value: ManualValue,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Stable id for an engine-derived entry of `axis` in the month of `date`.
/// `slot` distinguishes the value kinds sharing a month.
pub(crate) fn derived_id(tag: u64, axis: AxisId, date: NaiveDate, slot: u8) -> u64 {
    let year = (date.year().max(0) as u64) & 0xFFFF;
    let month = u64::from(date.month());
    tag | (axis.0 << 24) | (year << 8) | (month << 2) | u64::from(slot & 0b11)
}

impl ManualEntry {
    /// An entry in the reserved id range is only accepted when its id is
    /// the one the engine would derive for its axis and month.
    pub fn has_valid_id(&self) -> bool {
        if self.id < RESERVED_ID_FLOOR {
            return true;
        }
        [GRID_TAG, IMPORT_TAG].into_iter().any(|tag| {
            (0..4).any(|slot| derived_id(tag, self.axis, self.date, slot) == self.id)
        })
    }
}
