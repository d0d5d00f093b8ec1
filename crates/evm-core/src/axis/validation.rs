use std::collections::{BTreeMap, BTreeSet};

use super::ratio::validate_ratios;
use super::{AxisCategory, FinancialAxis, UnitOfMeasure};
use crate::catalog::Catalog;
use crate::config::EngineConfig;
use crate::error::EvmError;
use crate::types::{CategoryId, EmployeeId, LocationId};
use crate::EvmResult;

/// Check the axes of one progress against each other and against master
/// data.
///
/// - names are non-empty and ids unique
/// - referenced categories, employees, departments and locations exist
/// - no product category is listed by two axes (optionally no
///   ancestor/descendant pair either)
/// - no employee is listed by two axes
/// - no source location is claimed by two axes
/// - axis category codes resolve in the registry
/// - stock-driven axes count in a unit stock can be converted to
/// - phase ratios are consistent (see [`validate_ratios`])
pub fn validate_axes(
    axes: &[FinancialAxis],
    catalog: &Catalog,
    registry: &[AxisCategory],
    config: &EngineConfig,
) -> EvmResult<()> {
    let mut ids = BTreeSet::new();
    for axis in axes {
        if axis.name.trim().is_empty() {
            return Err(EvmError::InvalidInput {
                field: format!("axis {}", axis.id),
                reason: "name must not be empty".into(),
            });
        }
        if !ids.insert(axis.id) {
            return Err(EvmError::InvalidInput {
                field: "axes".into(),
                reason: format!("duplicate axis id {}", axis.id),
            });
        }
        if axis.planned_quantity < rust_decimal::Decimal::ZERO {
            return Err(EvmError::InvalidInput {
                field: format!("axis '{}'.planned_quantity", axis.name),
                reason: "must not be negative".into(),
            });
        }
        if axis.earned_source.is_stock_driven() && axis.uom == Some(UnitOfMeasure::LumpSum) {
            return Err(EvmError::InvalidInput {
                field: format!("axis '{}'.uom", axis.name),
                reason: format!("{} cannot be counted in {}", axis.earned_source, UnitOfMeasure::LumpSum),
            });
        }
        check_references(axis, catalog, registry)?;
        validate_ratios(axis, catalog)?;
    }

    check_category_overlap(axes, catalog, config)?;
    check_employee_overlap(axes, catalog)?;
    check_location_claims(axes, catalog)?;
    Ok(())
}

fn check_references(
    axis: &FinancialAxis,
    catalog: &Catalog,
    registry: &[AxisCategory],
) -> EvmResult<()> {
    let missing = |entity: &str, id: String| EvmError::NotFound {
        entity: format!("{entity} of axis '{}'", axis.name),
        id,
    };
    for c in &axis.criteria.product_categories {
        if catalog.category(*c).is_none() {
            return Err(missing("product category", c.to_string()));
        }
    }
    for e in &axis.criteria.employees {
        if catalog.employee(*e).is_none() {
            return Err(missing("employee", e.to_string()));
        }
    }
    for d in &axis.criteria.departments {
        if catalog.department(*d).is_none() {
            return Err(missing("department", d.to_string()));
        }
    }
    for loc in [
        axis.criteria.source_location,
        axis.criteria.destination_location,
    ]
    .into_iter()
    .flatten()
    {
        if catalog.location(loc).is_none() {
            return Err(missing("location", loc.to_string()));
        }
    }
    if let Some(code) = &axis.category {
        if !registry.iter().any(|c| &c.code == code) {
            return Err(missing("axis category", code.clone()));
        }
    }
    Ok(())
}

fn check_category_overlap(
    axes: &[FinancialAxis],
    catalog: &Catalog,
    config: &EngineConfig,
) -> EvmResult<()> {
    let mut owner: BTreeMap<CategoryId, &FinancialAxis> = BTreeMap::new();
    for axis in axes {
        for c in &axis.criteria.product_categories {
            if let Some(other) = owner.insert(*c, axis) {
                return Err(EvmError::CategoryOverlap {
                    category: catalog.category_name(*c),
                    axis: axis.name.clone(),
                    other_axis: other.name.clone(),
                });
            }
        }
    }
    if !config.hierarchical_overlap {
        return Ok(());
    }
    // A category whose ancestor is owned by a different axis overlaps it.
    for (category, axis) in &owner {
        let chain = catalog.category_chain(*category, config.max_category_depth)?;
        for ancestor in chain.iter().skip(1) {
            if let Some(other) = owner.get(ancestor) {
                if other.id != axis.id {
                    return Err(EvmError::CategoryOverlap {
                        category: catalog.category_name(*category),
                        axis: axis.name.clone(),
                        other_axis: other.name.clone(),
                    });
                }
            }
        }
    }
    Ok(())
}

fn check_employee_overlap(axes: &[FinancialAxis], catalog: &Catalog) -> EvmResult<()> {
    let mut owner: BTreeMap<EmployeeId, &str> = BTreeMap::new();
    for axis in axes {
        for e in &axis.criteria.employees {
            if let Some(other) = owner.insert(*e, &axis.name) {
                return Err(EvmError::EmployeeOverlap {
                    employee: catalog.employee_name(*e),
                    axis: axis.name.clone(),
                    other_axis: other.to_string(),
                });
            }
        }
    }
    Ok(())
}

fn check_location_claims(axes: &[FinancialAxis], catalog: &Catalog) -> EvmResult<()> {
    let mut owner: BTreeMap<LocationId, &str> = BTreeMap::new();
    for axis in axes {
        if let Some(loc) = axis.criteria.source_location {
            if let Some(other) = owner.insert(loc, &axis.name) {
                return Err(EvmError::LocationConflict {
                    location: catalog.location_name(loc),
                    axis: axis.name.clone(),
                    other_axis: other.to_string(),
                });
            }
        }
    }
    Ok(())
}
