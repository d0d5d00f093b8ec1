//! Manufacturing phase ratios of progress-rate axes.
//!
//! For each product category of the axis, the ratios give the share of the
//! category's progress earned when a manufacturing order completes a
//! phase. A finished quantity of 10 t produced by a welding order, with a
//! welding ratio of 30 %, earns 3 t.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use super::{EarnedSource, FinancialAxis};
use crate::catalog::Catalog;
use crate::error::EvmError;
use crate::types::{CategoryId, Rate};
use crate::EvmResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Cutting
    #[serde(alias = "debutage")]
    Debitage,
    Assemblage,
    /// Welding
    Soudage,
    Finition,
    Peinture,
}

impl Phase {
    /// Recognise the operation type of a manufacturing order.
    pub fn parse(operation: &str) -> Option<Phase> {
        let phase = match operation.trim().to_lowercase().as_str() {
            "debitage" | "débitage" | "debutage" | "cutting" => Phase::Debitage,
            "assemblage" | "assembly" => Phase::Assemblage,
            "soudage" | "welding" => Phase::Soudage,
            "finition" | "finishing" => Phase::Finition,
            "peinture" | "painting" => Phase::Peinture,
            _ => return None,
        };
        Some(phase)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Phase::Debitage => "débitage",
            Phase::Assemblage => "assemblage",
            Phase::Soudage => "soudage",
            Phase::Finition => "finition",
            Phase::Peinture => "peinture",
        };
        f.write_str(s)
    }
}

/// Percentages per phase. Their sum may not exceed 100.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhaseRatios {
    pub debitage: Decimal,
    pub assemblage: Decimal,
    pub soudage: Decimal,
    pub finition: Decimal,
    pub peinture: Decimal,
}

impl PhaseRatios {
    pub fn get(&self, phase: Phase) -> Decimal {
        match phase {
            Phase::Debitage => self.debitage,
            Phase::Assemblage => self.assemblage,
            Phase::Soudage => self.soudage,
            Phase::Finition => self.finition,
            Phase::Peinture => self.peinture,
        }
    }

    pub fn total(&self) -> Decimal {
        self.debitage + self.assemblage + self.soudage + self.finition + self.peinture
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRatio {
    pub category: CategoryId,
    #[serde(default)]
    pub phases: PhaseRatios,
}

impl FinancialAxis {
    /// Keep one ratio row per listed product category: rows are added at
    /// zero for new categories and dropped for categories no longer listed.
    /// Only progress-rate axes carry ratios.
    pub fn sync_category_ratios(&mut self) {
        if self.earned_source != EarnedSource::ProgressRate {
            self.category_ratios.clear();
            return;
        }
        let listed = &self.criteria.product_categories;
        self.category_ratios.retain(|r| listed.contains(&r.category));
        let present: BTreeSet<CategoryId> = self.category_ratios.iter().map(|r| r.category).collect();
        for category in listed.difference(&present) {
            self.category_ratios.push(CategoryRatio {
                category: *category,
                phases: PhaseRatios::default(),
            });
        }
        self.category_ratios.sort_by_key(|r| r.category);
    }

    /// Fraction of a finished product's quantity earned for `phase`. The
    /// nearest category of the product chain that has ratios decides.
    pub fn phase_share(
        &self,
        catalog: &Catalog,
        category: CategoryId,
        phase: Phase,
        max_depth: usize,
    ) -> EvmResult<Option<Rate>> {
        for c in catalog.category_chain(category, max_depth)? {
            if let Some(row) = self.category_ratios.iter().find(|r| r.category == c) {
                return Ok(Some(row.phases.get(phase) / Decimal::ONE_HUNDRED));
            }
        }
        Ok(None)
    }
}

/// Ratios belong to progress-rate axes, name a listed category once, and
/// stay between 0 and 100 in total.
pub fn validate_ratios(axis: &FinancialAxis, catalog: &Catalog) -> EvmResult<()> {
    if axis.category_ratios.is_empty() {
        return Ok(());
    }
    let field = || format!("axis '{}'.category_ratios", axis.name);
    if axis.earned_source != EarnedSource::ProgressRate {
        return Err(EvmError::InvalidInput {
            field: field(),
            reason: format!("only progress rate axes take phase ratios, not {}", axis.earned_source),
        });
    }
    let mut seen = BTreeSet::new();
    for row in &axis.category_ratios {
        let name = catalog.category_name(row.category);
        if !axis.criteria.product_categories.contains(&row.category) {
            return Err(EvmError::InvalidInput {
                field: field(),
                reason: format!("category '{name}' is not listed by the axis"),
            });
        }
        if !seen.insert(row.category) {
            return Err(EvmError::InvalidInput {
                field: field(),
                reason: format!("category '{name}' already has ratios"),
            });
        }
        let p = &row.phases;
        if [p.debitage, p.assemblage, p.soudage, p.finition, p.peinture]
            .iter()
            .any(|r| *r < Decimal::ZERO)
        {
            return Err(EvmError::InvalidInput {
                field: field(),
                reason: format!("negative ratio for category '{name}'"),
            });
        }
        if p.total() > Decimal::ONE_HUNDRED {
            return Err(EvmError::InvalidInput {
                field: field(),
                reason: format!("ratios of category '{name}' add up to {}%", p.total()),
            });
        }
    }
    Ok(())
}
