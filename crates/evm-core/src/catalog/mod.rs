//! Master data the engine reads as match keys: the product category tree,
//! products, departments, employees and stock locations.

pub mod category;
pub mod directory;

pub use category::ProductCategory;
pub use directory::{Department, Employee, Location, LocationUsage, Product};

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::error::EvmError;
use crate::types::{CategoryId, DepartmentId, EmployeeId, LocationId, ProductId};
use crate::EvmResult;

/// Serialised form of the catalog: flat lists, validated on load.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogSpec {
    #[serde(default)]
    pub categories: Vec<ProductCategory>,
    #[serde(default)]
    pub products: Vec<Product>,
    #[serde(default)]
    pub departments: Vec<Department>,
    #[serde(default)]
    pub employees: Vec<Employee>,
    #[serde(default)]
    pub locations: Vec<Location>,
}

/// Indexed, validated master data.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    categories: BTreeMap<CategoryId, ProductCategory>,
    products: BTreeMap<ProductId, Product>,
    departments: BTreeMap<DepartmentId, Department>,
    employees: BTreeMap<EmployeeId, Employee>,
    locations: BTreeMap<LocationId, Location>,
}

fn index<K: Ord + Copy + std::fmt::Display, V>(
    entity: &str,
    items: Vec<V>,
    key: impl Fn(&V) -> K,
) -> EvmResult<BTreeMap<K, V>> {
    let mut map = BTreeMap::new();
    for item in items {
        let k = key(&item);
        if map.insert(k, item).is_some() {
            return Err(EvmError::InvalidInput {
                field: entity.into(),
                reason: format!("duplicate id {k}"),
            });
        }
    }
    Ok(map)
}

impl Catalog {
    pub fn new(spec: CatalogSpec) -> EvmResult<Self> {
        let catalog = Catalog {
            categories: index("categories", spec.categories, |c| c.id)?,
            products: index("products", spec.products, |p| p.id)?,
            departments: index("departments", spec.departments, |d| d.id)?,
            employees: index("employees", spec.employees, |e| e.id)?,
            locations: index("locations", spec.locations, |l| l.id)?,
        };
        catalog.check_references()?;
        category::check_acyclic(&catalog.categories)?;
        Ok(catalog)
    }

    fn check_references(&self) -> EvmResult<()> {
        for c in self.categories.values() {
            if let Some(parent) = c.parent {
                if !self.categories.contains_key(&parent) {
                    return Err(EvmError::NotFound {
                        entity: format!("parent of category '{}'", c.name),
                        id: parent.to_string(),
                    });
                }
            }
        }
        for p in self.products.values() {
            if let Some(cat) = p.category {
                if !self.categories.contains_key(&cat) {
                    return Err(EvmError::NotFound {
                        entity: format!("category of product '{}'", p.name),
                        id: cat.to_string(),
                    });
                }
            }
        }
        for e in self.employees.values() {
            if let Some(dep) = e.department {
                if !self.departments.contains_key(&dep) {
                    return Err(EvmError::NotFound {
                        entity: format!("department of employee '{}'", e.name),
                        id: dep.to_string(),
                    });
                }
            }
        }
        Ok(())
    }

    pub fn category(&self, id: CategoryId) -> Option<&ProductCategory> {
        self.categories.get(&id)
    }

    pub fn product(&self, id: ProductId) -> Option<&Product> {
        self.products.get(&id)
    }

    pub fn department(&self, id: DepartmentId) -> Option<&Department> {
        self.departments.get(&id)
    }

    pub fn employee(&self, id: EmployeeId) -> Option<&Employee> {
        self.employees.get(&id)
    }

    pub fn location(&self, id: LocationId) -> Option<&Location> {
        self.locations.get(&id)
    }

    pub fn product_category(&self, id: ProductId) -> Option<CategoryId> {
        self.products.get(&id).and_then(|p| p.category)
    }

    pub fn employee_department(&self, id: EmployeeId) -> Option<DepartmentId> {
        self.employees.get(&id).and_then(|e| e.department)
    }

    pub fn location_usage(&self, id: LocationId) -> Option<LocationUsage> {
        self.locations.get(&id).map(|l| l.usage)
    }

    /// The category followed by all of its ancestors.
    pub fn category_chain(&self, id: CategoryId, max_depth: usize) -> EvmResult<Vec<CategoryId>> {
        category::ancestry(&self.categories, id, max_depth)
    }

    /// True when `id` or one of its ancestors belongs to `set`.
    pub fn category_within(
        &self,
        id: CategoryId,
        set: &BTreeSet<CategoryId>,
        max_depth: usize,
    ) -> EvmResult<bool> {
        if set.is_empty() {
            return Ok(false);
        }
        Ok(self
            .category_chain(id, max_depth)?
            .iter()
            .any(|c| set.contains(c)))
    }

    pub fn category_name(&self, id: CategoryId) -> String {
        self.categories
            .get(&id)
            .map(|c| c.name.clone())
            .unwrap_or_else(|| format!("#{id}"))
    }

    pub fn employee_name(&self, id: EmployeeId) -> String {
        self.employees
            .get(&id)
            .map(|e| e.name.clone())
            .unwrap_or_else(|| format!("#{id}"))
    }

    pub fn location_name(&self, id: LocationId) -> String {
        self.locations
            .get(&id)
            .map(|l| l.name.clone())
            .unwrap_or_else(|| format!("#{id}"))
    }
}

impl From<Catalog> for CatalogSpec {
    fn from(c: Catalog) -> Self {
        CatalogSpec {
            categories: c.categories.into_values().collect(),
            products: c.products.into_values().collect(),
            departments: c.departments.into_values().collect(),
            employees: c.employees.into_values().collect(),
            locations: c.locations.into_values().collect(),
        }
    }
}

impl Serialize for Catalog {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        CatalogSpec::from(self.clone()).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Catalog {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let spec = CatalogSpec::deserialize(deserializer)?;
        Catalog::new(spec).map_err(serde::de::Error::custom)
    }
}
