use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::EvmError;
use crate::EvmResult;

/// Lifecycle of a financial progress.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressState {
    #[default]
    Draft,
    Budgeted,
    InProgress,
    Confirm,
    Cancel,
}

impl fmt::Display for ProgressState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ProgressState::Draft => "draft",
            ProgressState::Budgeted => "budgeted",
            ProgressState::InProgress => "in_progress",
            ProgressState::Confirm => "confirm",
            ProgressState::Cancel => "cancel",
        };
        f.write_str(s)
    }
}

impl ProgressState {
    /// Automatic transition given the current ledger contents.
    ///
    /// `has_activity` is true when any axis line carries earned value or
    /// cost; `all_budgeted` when the progress has axes and each of them has a
    /// positive budget.
    pub fn evaluate(self, has_activity: bool, all_budgeted: bool) -> ProgressState {
        match self {
            ProgressState::Cancel | ProgressState::Confirm => self,
            ProgressState::Draft | ProgressState::Budgeted if has_activity => {
                ProgressState::InProgress
            }
            ProgressState::Draft if all_budgeted => ProgressState::Budgeted,
            ProgressState::InProgress if !has_activity => ProgressState::Budgeted,
            other => other,
        }
    }

    pub fn cancel(self) -> EvmResult<ProgressState> {
        match self {
            ProgressState::Confirm => Err(self.refuse(ProgressState::Cancel)),
            _ => Ok(ProgressState::Cancel),
        }
    }

    pub fn reset_to_draft(self) -> EvmResult<ProgressState> {
        match self {
            ProgressState::Cancel | ProgressState::Draft => Ok(ProgressState::Draft),
            _ => Err(self.refuse(ProgressState::Draft)),
        }
    }

    /// Closing at the project end date.
    pub fn confirm(self) -> EvmResult<ProgressState> {
        match self {
            ProgressState::InProgress | ProgressState::Confirm => Ok(ProgressState::Confirm),
            _ => Err(self.refuse(ProgressState::Confirm)),
        }
    }

    fn refuse(self, to: ProgressState) -> EvmError {
        EvmError::InvalidTransition {
            from: self.to_string(),
            to: to.to_string(),
        }
    }
}
