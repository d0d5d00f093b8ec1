use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use crate::catalog::Catalog;
use crate::types::{CategoryId, DepartmentId, EmployeeId, LocationId, ProductId};
use crate::EvmResult;

/// Match keys of an axis. Empty sets do not restrict, except where a rule
/// says otherwise.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AxisCriteria {
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub product_categories: BTreeSet<CategoryId>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub departments: BTreeSet<DepartmentId>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub employees: BTreeSet<EmployeeId>,
    /// Location the axis claims for the project (unique per progress)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_location: Option<LocationId>,
    /// Receiving location whose pickings feed the axis
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination_location: Option<LocationId>,
}

/// Why a source row did not satisfy an axis' criteria.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CriteriaMiss {
    NoCategories,
    NoProduct,
    Uncategorised,
    CategoryOutside,
    CategoryRestricted,
    EmployeeOutside,
    DepartmentOutside,
    DepartmentRestricted,
    LocationMismatch,
    NoPhaseRatio,
}

impl fmt::Display for CriteriaMiss {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            CriteriaMiss::NoCategories => "axis has no product categories",
            CriteriaMiss::NoProduct => "row has no product",
            CriteriaMiss::Uncategorised => "product has no category",
            CriteriaMiss::CategoryOutside => "product category outside the axis categories",
            CriteriaMiss::CategoryRestricted => "axis is restricted to product categories",
            CriteriaMiss::EmployeeOutside => "employee not assigned to the axis",
            CriteriaMiss::DepartmentOutside => "employee department not assigned to the axis",
            CriteriaMiss::DepartmentRestricted => "axis is restricted to departments",
            CriteriaMiss::LocationMismatch => "location does not match the axis",
            CriteriaMiss::NoPhaseRatio => "no phase ratio for the product category",
        };
        f.write_str(text)
    }
}

impl AxisCriteria {
    /// Invoice and stock rule: the axis must list categories and the
    /// product's category, or one of its ancestors, must be among them.
    pub fn check_product_required(
        &self,
        catalog: &Catalog,
        product: Option<ProductId>,
        max_depth: usize,
    ) -> EvmResult<Option<CriteriaMiss>> {
        if self.product_categories.is_empty() {
            return Ok(Some(CriteriaMiss::NoCategories));
        }
        let Some(product) = product else {
            return Ok(Some(CriteriaMiss::NoProduct));
        };
        let Some(category) = catalog.product_category(product) else {
            return Ok(Some(CriteriaMiss::Uncategorised));
        };
        if catalog.category_within(category, &self.product_categories, max_depth)? {
            Ok(None)
        } else {
            Ok(Some(CriteriaMiss::CategoryOutside))
        }
    }

    /// Timesheet rule: a row with a categorised product only matches axes
    /// listing one of its ancestors; a row without one only matches axes
    /// without categories. A row therefore never lands on both a category
    /// axis and a catch-all axis.
    pub fn check_product_exclusive(
        &self,
        catalog: &Catalog,
        product: Option<ProductId>,
        max_depth: usize,
    ) -> EvmResult<Option<CriteriaMiss>> {
        let category = product.and_then(|p| catalog.product_category(p));
        match category {
            Some(category) if !self.product_categories.is_empty() => {
                if catalog.category_within(category, &self.product_categories, max_depth)? {
                    Ok(None)
                } else {
                    Ok(Some(CriteriaMiss::CategoryOutside))
                }
            }
            Some(_) => Ok(Some(CriteriaMiss::NoCategories)),
            None if self.product_categories.is_empty() => Ok(None),
            None => Ok(Some(CriteriaMiss::CategoryRestricted)),
        }
    }

    /// Timesheet people rule. The employee set restricts when non-empty.
    /// Departments are exclusive like categories: an employee with a
    /// department only matches axes listing it, and a row without one only
    /// matches axes listing no department.
    pub fn check_people(&self, catalog: &Catalog, employee: Option<EmployeeId>) -> Option<CriteriaMiss> {
        if !self.employees.is_empty() && !employee.is_some_and(|e| self.employees.contains(&e)) {
            return Some(CriteriaMiss::EmployeeOutside);
        }
        match employee.and_then(|e| catalog.employee_department(e)) {
            Some(d) if self.departments.contains(&d) => None,
            Some(_) => Some(CriteriaMiss::DepartmentOutside),
            None if self.departments.is_empty() => None,
            None => Some(CriteriaMiss::DepartmentRestricted),
        }
    }

    pub fn check_destination(&self, location: Option<LocationId>) -> Option<CriteriaMiss> {
        match (self.destination_location, location) {
            (Some(expected), Some(actual)) if expected == actual => None,
            _ => Some(CriteriaMiss::LocationMismatch),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.product_categories.is_empty()
            && self.departments.is_empty()
            && self.employees.is_empty()
            && self.source_location.is_none()
            && self.destination_location.is_none()
    }
}
