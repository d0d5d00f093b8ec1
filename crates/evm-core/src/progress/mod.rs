pub mod metrics;
pub mod state;

pub use metrics::{BudgetBasis, PerformanceState, ProjectFigures, ProjectMetrics, SalesFigures};
pub use state::ProgressState;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::axis::FinancialAxis;
use crate::types::{AccountId, AxisId, Currency, ProgressId, ProjectId};

/// Host project. Only the fields used as match keys and for the reporting
/// window are kept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_start: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_end: Option<NaiveDate>,
    /// Cost center whose analytic lines belong to the project
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analytic_account: Option<AccountId>,
}

fn default_active() -> bool {
    true
}

/// Financial breakdown of one project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinancialProgress {
    pub id: ProgressId,
    pub project: ProjectId,
    #[serde(default)]
    pub currency: Currency,
    #[serde(default)]
    pub state: ProgressState,
    #[serde(default)]
    pub axes: Vec<FinancialAxis>,
    #[serde(default = "default_active")]
    pub active: bool,
}

impl FinancialProgress {
    pub fn new(id: ProgressId, project: ProjectId) -> Self {
        FinancialProgress {
            id,
            project,
            currency: Currency::default(),
            state: ProgressState::Draft,
            axes: Vec::new(),
            active: true,
        }
    }

    /// "P042-PGP[Hangar Nord]", or "PDG[Hangar Nord]" without a project code.
    pub fn name(&self, project: Option<&Project>) -> String {
        let project_name = project
            .map(|p| p.name.clone())
            .unwrap_or_else(|| format!("#{}", self.project));
        match project.and_then(|p| p.code.as_deref()) {
            Some(code) if !code.is_empty() => format!("{code}-PGP[{project_name}]"),
            _ => format!("PDG[{project_name}]"),
        }
    }

    pub fn axis(&self, id: AxisId) -> Option<&FinancialAxis> {
        self.axes.iter().find(|a| a.id == id)
    }

    /// Cancelled and archived progresses take no ledger contributions.
    pub fn accepts_activity(&self) -> bool {
        self.active && self.state != ProgressState::Cancel
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn project(code: Option<&str>) -> Project {
        Project {
            id: ProjectId(9),
            code: code.map(str::to_string),
            name: "Hangar Nord".into(),
            date_start: None,
            date_end: None,
            analytic_account: None,
        }
    }

    #[test]
    fn test_progress_name_with_and_without_code() {
        let progress = FinancialProgress::new(ProgressId(1), ProjectId(9));
        assert_eq!(
            progress.name(Some(&project(Some("P042")))),
            "P042-PGP[Hangar Nord]"
        );
        assert_eq!(progress.name(Some(&project(None))), "PDG[Hangar Nord]");
    }

    #[test]
    fn test_cancelled_progress_takes_no_activity() {
        let mut progress = FinancialProgress::new(ProgressId(1), ProjectId(9));
        assert!(progress.accepts_activity());
        progress.state = ProgressState::Cancel;
        assert!(!progress.accepts_activity());
    }
}
