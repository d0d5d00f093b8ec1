use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::types::{AccountId, LocationId, Money, ProductId, ProjectId, Quantity};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MoveState {
    #[default]
    Draft,
    Waiting,
    Confirmed,
    Assigned,
    Done,
    Cancel,
}

/// What produced a stock move.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MoveOrigin {
    /// Transfer attached to a project (receipt, site delivery or return)
    Picking {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        project: Option<ProjectId>,
        state: MoveState,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        source_location: Option<LocationId>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        destination_location: Option<LocationId>,
        scheduled_date: NaiveDate,
        /// Return of an earlier transfer: quantities come back out
        #[serde(default)]
        is_return: bool,
    },
    /// Raw material consumed by a manufacturing order
    ProductionComponent {
        state: MoveState,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        analytic_account: Option<AccountId>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        operation: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        finished_on: Option<NaiveDate>,
    },
    /// Finished product of a manufacturing order; the operation names the
    /// phase it completes
    ProductionOutput {
        state: MoveState,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        analytic_account: Option<AccountId>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        operation: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        finished_on: Option<NaiveDate>,
    },
    /// Component returned to stock by an unbuild order
    UnbuildComponent {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        analytic_account: Option<AccountId>,
        unbuilt_on: NaiveDate,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockMove {
    pub id: u64,
    pub product: ProductId,
    pub quantity: Quantity,
    #[serde(default)]
    pub state: MoveState,
    /// Date of the move itself
    pub date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination_location: Option<LocationId>,
    /// Valuation per unit; the product standard price when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit_cost: Option<Money>,
    pub origin: MoveOrigin,
}

impl StockMove {
    /// Date the move is reported on: the picking's scheduled date, the
    /// production's finish date or the unbuild date.
    pub fn booking_date(&self) -> NaiveDate {
        match &self.origin {
            MoveOrigin::Picking { scheduled_date, .. } => *scheduled_date,
            MoveOrigin::ProductionComponent { finished_on, .. }
            | MoveOrigin::ProductionOutput { finished_on, .. } => finished_on.unwrap_or(self.date),
            MoveOrigin::UnbuildComponent { unbuilt_on, .. } => *unbuilt_on,
        }
    }
}
