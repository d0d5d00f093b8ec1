pub mod axis;
pub mod catalog;
pub mod config;
pub mod engine;
pub mod error;
pub mod kpi;
pub mod ledger;
pub mod period;
pub mod progress;
pub mod reconcile;
pub mod sources;
pub mod types;

#[cfg(feature = "import")]
pub mod import;

pub use config::EngineConfig;
pub use engine::{Book, Engine};
pub use error::EvmError;
pub use types::*;

/// Standard result type for all earned-value operations
pub type EvmResult<T> = Result<T, EvmError>;
