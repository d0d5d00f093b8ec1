use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::error::EvmError;
use crate::EvmResult;

/// Reporting group of axes ("DS2 : Appro").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AxisCategory {
    /// Short unique code, e.g. "MO", "MAT", "DS1"
    pub code: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl AxisCategory {
    pub fn new(code: impl Into<String>, name: impl Into<String>) -> Self {
        AxisCategory {
            code: code.into(),
            name: name.into(),
            description: None,
        }
    }

    pub fn display_name(&self) -> String {
        format!("{} : {}", self.code, self.name)
    }
}

/// Codes and names must both be unique.
pub fn validate_categories(categories: &[AxisCategory]) -> EvmResult<()> {
    let mut codes = BTreeSet::new();
    let mut names = BTreeSet::new();
    for c in categories {
        if c.code.trim().is_empty() || c.code.len() > 10 {
            return Err(EvmError::InvalidInput {
                field: "axis_categories.code".into(),
                reason: format!("'{}' must be 1 to 10 characters", c.code),
            });
        }
        if !codes.insert(c.code.as_str()) {
            return Err(EvmError::DuplicateAxisCategory(format!("code {}", c.code)));
        }
        if !names.insert(c.name.as_str()) {
            return Err(EvmError::DuplicateAxisCategory(format!("name {}", c.name)));
        }
    }
    Ok(())
}

/// Case-insensitive search on code or name.
pub fn search_categories<'a>(categories: &'a [AxisCategory], term: &str) -> Vec<&'a AxisCategory> {
    let needle = term.to_lowercase();
    categories
        .iter()
        .filter(|c| {
            c.code.to_lowercase().contains(&needle) || c.name.to_lowercase().contains(&needle)
        })
        .collect()
}
