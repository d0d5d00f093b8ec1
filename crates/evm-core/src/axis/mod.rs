pub mod category;
pub mod criteria;
pub mod ratio;
#[cfg(feature = "templates")]
pub mod template;
pub mod uom;
pub mod validation;

pub use category::AxisCategory;
pub use criteria::{AxisCriteria, CriteriaMiss};
pub use ratio::{CategoryRatio, Phase, PhaseRatios};
pub use uom::UnitOfMeasure;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::catalog::Catalog;
use crate::error::EvmError;
use crate::types::{safe_ratio, AxisId, Money, ProductId, Quantity, Rate};
use crate::EvmResult;

// ---------------------------------------------------------------------------
// Sources of earned value and actual cost
// ---------------------------------------------------------------------------

/// Where an axis' earned value (physical progress) comes from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EarnedSource {
    /// Progress entered by hand
    #[default]
    Manual,
    /// Quantities received from suppliers
    #[serde(alias = "stock")]
    StockReceipt,
    /// Quantities delivered to the construction site
    #[serde(alias = "move")]
    SiteDelivery,
    /// Progress rate (fraction of the planned quantity)
    #[serde(alias = "rate")]
    ProgressRate,
    /// Hours booked on timesheets
    #[serde(alias = "hours")]
    TimesheetHours,
}

impl EarnedSource {
    /// Earned value is produced by pickings, not by people.
    pub fn is_stock_driven(self) -> bool {
        matches!(self, EarnedSource::StockReceipt | EarnedSource::SiteDelivery)
    }

    /// Earned value is computed from source rows rather than entered.
    pub fn is_automatic(self) -> bool {
        self.is_stock_driven() || self == EarnedSource::TimesheetHours
    }
}

impl fmt::Display for EarnedSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EarnedSource::Manual => "manual entry",
            EarnedSource::StockReceipt => "stock receipts",
            EarnedSource::SiteDelivery => "site deliveries",
            EarnedSource::ProgressRate => "progress rate",
            EarnedSource::TimesheetHours => "timesheet hours",
        };
        f.write_str(s)
    }
}

/// Where an axis' actual cost comes from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CostSource {
    #[default]
    #[serde(alias = "invoice")]
    VendorInvoice,
    #[serde(alias = "analytic")]
    Timesheet,
    /// Components consumed by manufacturing orders
    #[serde(alias = "mrp")]
    StockIssue,
}

impl fmt::Display for CostSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CostSource::VendorInvoice => "vendor invoices",
            CostSource::Timesheet => "timesheets",
            CostSource::StockIssue => "stock issues",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// Financial axis
// ---------------------------------------------------------------------------

fn default_sequence() -> u32 {
    1
}

fn default_planned_quantity() -> Quantity {
    Decimal::ONE
}

fn default_active() -> bool {
    true
}

/// A cost-tracking dimension of a project, e.g. "MO Fab" or
/// "Toles et profilés".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinancialAxis {
    pub id: AxisId,
    pub name: String,
    #[serde(default = "default_sequence")]
    pub sequence: u32,
    /// Code of the reporting category (e.g. "DS2")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default)]
    pub earned_source: EarnedSource,
    #[serde(default)]
    pub cost_source: CostSource,
    /// Unit of the planned quantity; stock moves are converted into it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uom: Option<UnitOfMeasure>,
    #[serde(default = "default_planned_quantity")]
    pub planned_quantity: Quantity,
    /// Budgeted price per unit; earned amount = earned value × unit price
    #[serde(default)]
    pub unit_price: Money,
    #[serde(default)]
    pub planned_budget: Money,
    #[serde(default)]
    pub criteria: AxisCriteria,
    /// Phase ratios per product category, progress-rate axes only
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub category_ratios: Vec<CategoryRatio>,
    #[serde(default = "default_active")]
    pub active: bool,
    /// Set when the project was closed: rows dated on or before this day
    /// still count, later rows are rejected
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub closed_on: Option<NaiveDate>,
}

impl FinancialAxis {
    pub fn new(id: AxisId, name: impl Into<String>) -> Self {
        FinancialAxis {
            id,
            name: name.into(),
            sequence: default_sequence(),
            category: None,
            earned_source: EarnedSource::default(),
            cost_source: CostSource::default(),
            uom: None,
            planned_quantity: default_planned_quantity(),
            unit_price: Decimal::ZERO,
            planned_budget: Decimal::ZERO,
            criteria: AxisCriteria::default(),
            category_ratios: Vec::new(),
            active: true,
            closed_on: None,
        }
    }

    /// "P-042-PGP/MO Fab" when the project has a code.
    pub fn complete_name(&self, project_code: Option<&str>) -> String {
        match project_code {
            Some(code) if !code.is_empty() => format!("{code}-PGP/{}", self.name),
            _ => self.name.clone(),
        }
    }

    /// Derive the planned budget from quantity and unit price. A zero unit
    /// price leaves the budget untouched.
    pub fn price_budget(&mut self) {
        if !self.unit_price.is_zero() {
            self.planned_budget = self.planned_quantity * self.unit_price;
        }
    }

    pub fn earned_amount(&self, earned_value: Quantity) -> Money {
        earned_value * self.unit_price
    }

    /// Share of the planned quantity represented by `earned_value`.
    pub fn acquisition_rate(&self, earned_value: Quantity) -> Rate {
        safe_ratio(earned_value, self.planned_quantity)
    }

    /// Express a moved quantity of `product` in the axis unit. Axes without
    /// a unit, or counting units, take the quantity as is.
    pub fn moved_quantity(
        &self,
        catalog: &Catalog,
        product: ProductId,
        quantity: Quantity,
    ) -> EvmResult<Quantity> {
        match self.uom {
            None | Some(UnitOfMeasure::Unit) => Ok(quantity),
            Some(uom) => {
                let product = catalog.product(product).ok_or_else(|| EvmError::InvalidInput {
                    field: format!("axis '{}'", self.name),
                    reason: format!("unknown product {product}, cannot convert to {uom}"),
                })?;
                uom.convert(quantity, product, &self.name)
            }
        }
    }

    /// Whether rows dated `date` may still be credited to this axis.
    pub fn accepts(&self, date: NaiveDate) -> bool {
        self.active || self.closed_on.is_some_and(|closed| date <= closed)
    }
}
