//! Standard breakdown of a steel construction project: sixteen axes in five
//! reporting categories.

use serde::{Deserialize, Serialize};

use super::{AxisCategory, CostSource, EarnedSource, FinancialAxis, UnitOfMeasure};
use crate::progress::FinancialProgress;
use crate::types::AxisId;

struct StandardAxis {
    name: &'static str,
    category: &'static str,
    earned: EarnedSource,
    cost: CostSource,
    uom: Option<UnitOfMeasure>,
    sequence: u32,
}

const CATEGORIES: [(&str, &str); 5] = [
    ("DS1", "Etudes et Methodes"),
    ("DS2", "Appro"),
    ("DS3", "Fabrication"),
    ("DS4", "Montage"),
    ("DS5", "Prestations"),
];

#[rustfmt::skip]
const STANDARD_AXES: [StandardAxis; 16] = [
    StandardAxis { name: "Études d'execution", category: "DS1", earned: EarnedSource::Manual, cost: CostSource::VendorInvoice, uom: Some(UnitOfMeasure::LumpSum), sequence: 10 },
    StandardAxis { name: "Méthodes et préparation", category: "DS1", earned: EarnedSource::Manual, cost: CostSource::Timesheet, uom: Some(UnitOfMeasure::LumpSum), sequence: 20 },
    StandardAxis { name: "Toles et profilés", category: "DS2", earned: EarnedSource::StockReceipt, cost: CostSource::StockIssue, uom: Some(UnitOfMeasure::Kilogram), sequence: 30 },
    StandardAxis { name: "Couverture et Bardage", category: "DS2", earned: EarnedSource::StockReceipt, cost: CostSource::VendorInvoice, uom: Some(UnitOfMeasure::SquareMeter), sequence: 40 },
    StandardAxis { name: "Planchers", category: "DS2", earned: EarnedSource::StockReceipt, cost: CostSource::VendorInvoice, uom: Some(UnitOfMeasure::SquareMeter), sequence: 50 },
    StandardAxis { name: "Boulonnerie et Accessoires", category: "DS2", earned: EarnedSource::Manual, cost: CostSource::VendorInvoice, uom: Some(UnitOfMeasure::Kilogram), sequence: 60 },
    StandardAxis { name: "Tuyauterie", category: "DS2", earned: EarnedSource::StockReceipt, cost: CostSource::VendorInvoice, uom: Some(UnitOfMeasure::Meter), sequence: 70 },
    StandardAxis { name: "Peinture", category: "DS2", earned: EarnedSource::StockReceipt, cost: CostSource::VendorInvoice, uom: Some(UnitOfMeasure::Kilogram), sequence: 80 },
    StandardAxis { name: "MO Fab", category: "DS3", earned: EarnedSource::ProgressRate, cost: CostSource::Timesheet, uom: None, sequence: 100 },
    StandardAxis { name: "MO Peinture", category: "DS3", earned: EarnedSource::ProgressRate, cost: CostSource::Timesheet, uom: None, sequence: 110 },
    StandardAxis { name: "MO Pose", category: "DS4", earned: EarnedSource::Manual, cost: CostSource::Timesheet, uom: None, sequence: 120 },
    StandardAxis { name: "Transport", category: "DS4", earned: EarnedSource::SiteDelivery, cost: CostSource::VendorInvoice, uom: Some(UnitOfMeasure::Unit), sequence: 130 },
    StandardAxis { name: "Manutention", category: "DS4", earned: EarnedSource::SiteDelivery, cost: CostSource::VendorInvoice, uom: Some(UnitOfMeasure::Unit), sequence: 140 },
    StandardAxis { name: "Bureau de contrôle", category: "DS5", earned: EarnedSource::Manual, cost: CostSource::VendorInvoice, uom: Some(UnitOfMeasure::LumpSum), sequence: 150 },
    StandardAxis { name: "Galvanisation", category: "DS5", earned: EarnedSource::Manual, cost: CostSource::VendorInvoice, uom: Some(UnitOfMeasure::Kilogram), sequence: 160 },
    StandardAxis { name: "Autres Sous traitance", category: "DS5", earned: EarnedSource::Manual, cost: CostSource::VendorInvoice, uom: Some(UnitOfMeasure::LumpSum), sequence: 170 },
];

/// Outcome of applying the template.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateOutcome {
    pub created_axes: Vec<AxisId>,
    pub created_categories: Vec<String>,
}

pub fn standard_categories() -> Vec<AxisCategory> {
    CATEGORIES
        .iter()
        .map(|(code, name)| AxisCategory::new(*code, *name))
        .collect()
}

/// The sixteen standard axes, numbered from `first_id`.
pub fn standard_axes(first_id: AxisId) -> Vec<FinancialAxis> {
    STANDARD_AXES
        .iter()
        .zip(first_id.0..)
        .map(|(spec, id)| {
            let mut axis = FinancialAxis::new(AxisId(id), spec.name);
            axis.category = Some(spec.category.to_string());
            axis.earned_source = spec.earned;
            axis.cost_source = spec.cost;
            axis.uom = spec.uom;
            axis.sequence = spec.sequence;
            axis
        })
        .collect()
}

/// Populate an empty progress with the standard axes, registering missing
/// axis categories. A category already present under the same code or the
/// same name is reused. Returns `None` when the progress already has axes.
pub fn apply_standard_template(
    progress: &mut FinancialProgress,
    registry: &mut Vec<AxisCategory>,
    first_id: AxisId,
) -> Option<TemplateOutcome> {
    if !progress.axes.is_empty() {
        return None;
    }

    let mut created_categories = Vec::new();
    let mut resolved: Vec<(&str, String)> = Vec::with_capacity(CATEGORIES.len());
    for (code, name) in CATEGORIES {
        let existing = registry
            .iter()
            .find(|c| c.code == code || c.name == name)
            .map(|c| c.code.clone());
        let resolved_code = match existing {
            Some(found) => found,
            None => {
                registry.push(AxisCategory::new(code, name));
                created_categories.push(code.to_string());
                code.to_string()
            }
        };
        resolved.push((code, resolved_code));
    }

    let mut axes = standard_axes(first_id);
    for axis in &mut axes {
        if let Some(code) = axis.category.as_deref() {
            if let Some((_, actual)) = resolved.iter().find(|(c, _)| *c == code) {
                axis.category = Some(actual.clone());
            }
        }
    }
    let created_axes = axes.iter().map(|a| a.id).collect();
    progress.axes = axes;

    Some(TemplateOutcome {
        created_axes,
        created_categories,
    })
}
