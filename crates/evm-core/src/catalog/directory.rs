use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{CategoryId, DepartmentId, EmployeeId, LocationId, Money, ProductId};

/// A stockable or purchasable product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<CategoryId>,
    /// Valuation price used to cost component consumption
    #[serde(default)]
    pub standard_price: Money,
    /// Per unit, in kg
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<Decimal>,
    /// Per unit, in m
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<Decimal>,
    /// Per unit, in m²
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "volume")]
    pub area: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Department {
    pub id: DepartmentId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Employee {
    pub id: EmployeeId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<DepartmentId>,
}

/// What a stock location represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationUsage {
    Supplier,
    Customer,
    Internal,
    Transit,
    Production,
    Inventory,
    View,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub id: LocationId,
    pub name: String,
    pub usage: LocationUsage,
}
