use thiserror::Error;

#[derive(Debug, Error)]
pub enum EvmError {
    #[error("Invalid input for {field}: {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("{entity} {id} not found")]
    NotFound { entity: String, id: String },

    #[error("Product category {category} is part of a cycle or exceeds the depth limit")]
    CategoryCycle { category: u64 },

    #[error("Product category '{category}' is already used by axis '{other_axis}' (axis '{axis}')")]
    CategoryOverlap {
        category: String,
        axis: String,
        other_axis: String,
    },

    #[error("Employee '{employee}' is already used by axis '{other_axis}' (axis '{axis}')")]
    EmployeeOverlap {
        employee: String,
        axis: String,
        other_axis: String,
    },

    #[error("Location '{location}' is already claimed by axis '{other_axis}' (axis '{axis}')")]
    LocationConflict {
        location: String,
        axis: String,
        other_axis: String,
    },

    #[error("Duplicate axis category: {0}")]
    DuplicateAxisCategory(String),

    #[error("Earned value of axis '{axis}' is driven by {driver} and cannot be entered manually")]
    LockedEarnedValue { axis: String, driver: String },

    #[error("Invalid state transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    #[error("Date error: {0}")]
    DateError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<serde_json::Error> for EvmError {
    fn from(e: serde_json::Error) -> Self {
        EvmError::SerializationError(e.to_string())
    }
}
