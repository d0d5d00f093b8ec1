use serde::{Deserialize, Serialize};

use crate::error::EvmError;
use crate::types::Currency;
use crate::EvmResult;

/// Engine-wide settings. Every field has a default so partial
/// configuration files are accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Reporting currency of all monetary amounts
    pub currency: Currency,
    /// Decimal places kept on performance indices and ratios
    pub index_scale: u32,
    /// Upper bound on product-category hierarchy walks
    pub max_category_depth: usize,
    /// Reject manual progress on axes whose earned value comes from stock
    pub lock_automatic_earned_value: bool,
    /// Also reject axes whose categories are ancestor/descendant of each other
    pub hierarchical_overlap: bool,
    /// Manufacturing operation types whose component consumption is a cost.
    /// `None` accepts every operation.
    pub production_operations: Option<Vec<String>>,
    /// Day of month used when importing monthly series
    pub import_day: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            currency: Currency::MAD,
            index_scale: 4,
            max_category_depth: 32,
            lock_automatic_earned_value: true,
            hierarchical_overlap: false,
            production_operations: None,
            import_day: 1,
        }
    }
}

impl EngineConfig {
    /// Settings in effect for a run: the configuration file when one was
    /// given, else the configuration embedded in the input document, else
    /// the defaults.
    pub fn resolve(file: Option<&EngineConfig>, inline: Option<&EngineConfig>) -> EngineConfig {
        file.or(inline).cloned().unwrap_or_default()
    }

    pub fn validate(&self) -> EvmResult<()> {
        if self.index_scale > 28 {
            return Err(EvmError::InvalidInput {
                field: "index_scale".into(),
                reason: "Decimal supports at most 28 fractional digits".into(),
            });
        }
        if self.max_category_depth == 0 {
            return Err(EvmError::InvalidInput {
                field: "max_category_depth".into(),
                reason: "must be at least 1".into(),
            });
        }
        if !(1..=28).contains(&self.import_day) {
            return Err(EvmError::InvalidInput {
                field: "import_day".into(),
                reason: "must be between 1 and 28".into(),
            });
        }
        Ok(())
    }

    /// Whether component consumption of this operation type counts as cost.
    pub fn accepts_operation(&self, operation: Option<&str>) -> bool {
        match (&self.production_operations, operation) {
            (None, _) => true,
            (Some(allowed), Some(op)) => allowed.iter().any(|a| a == op),
            (Some(_), None) => false,
        }
    }
}
