//! Event-sourced ledger of source-row contributions.
//!
//! Each source row is classified into signed `(axis, date, kind, amount)`
//! deltas. The ledger keeps the latest revision per row and folds the live
//! deltas into per-axis-per-date cells, so replaying the same events in any
//! order yields the same aggregates.

pub mod classify;
pub mod event;
pub mod reduce;
pub mod store;

pub use classify::{Classification, Classifier, Rejection};
pub use event::{Delta, DeltaKind, LedgerEvent};
pub use reduce::{Aggregates, BudgetCell, LineCell};
pub use store::{ApplyOutcome, ApplyStatus, Ledger};
