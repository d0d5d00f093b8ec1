use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{AccountId, EmployeeId, Money, ProductId, Quantity};

/// A timesheet or other analytic (cost-center) entry. Costs are negative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticLine {
    pub id: u64,
    pub date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account: Option<AccountId>,
    pub amount: Money,
    /// Hours or units behind the amount
    #[serde(default)]
    pub unit_amount: Quantity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product: Option<ProductId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub employee: Option<EmployeeId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl AnalyticLine {
    pub fn is_cost(&self) -> bool {
        self.amount <= Decimal::ZERO
    }
}
