use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::sources::{SourceKey, SourceRecord};
use crate::types::AxisId;

/// A mutation observed on a source ledger.
///
/// `revision` is the source's own version counter for the row (write
/// sequence, `write_date` as an integer, ...). For a given key the event
/// with the highest `(revision, rank)` is authoritative; a retraction
/// outranks an upsert carrying the same revision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum LedgerEvent {
    Upsert { revision: u64, record: SourceRecord },
    Retract { revision: u64, key: SourceKey },
}

impl LedgerEvent {
    pub fn upsert(revision: u64, record: SourceRecord) -> Self {
        LedgerEvent::Upsert { revision, record }
    }

    pub fn retract(revision: u64, key: SourceKey) -> Self {
        LedgerEvent::Retract { revision, key }
    }

    pub fn key(&self) -> SourceKey {
        match self {
            LedgerEvent::Upsert { record, .. } => record.key(),
            LedgerEvent::Retract { key, .. } => *key,
        }
    }

    pub fn revision(&self) -> u64 {
        match self {
            LedgerEvent::Upsert { revision, .. } | LedgerEvent::Retract { revision, .. } => {
                *revision
            }
        }
    }

    /// Tiebreak between events of equal revision.
    pub fn rank(&self) -> u8 {
        match self {
            LedgerEvent::Upsert { .. } => 0,
            LedgerEvent::Retract { .. } => 1,
        }
    }

    pub fn version(&self) -> (u64, u8) {
        (self.revision(), self.rank())
    }
}

/// What a delta adds to an axis cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeltaKind {
    EarnedQuantity,
    ActualCost,
    PlannedBudget,
}

impl fmt::Display for DeltaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DeltaKind::EarnedQuantity => "earned quantity",
            DeltaKind::ActualCost => "actual cost",
            DeltaKind::PlannedBudget => "planned budget",
        };
        f.write_str(s)
    }
}

/// A signed contribution of one source row to one `(axis, date)` cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delta {
    pub axis: AxisId,
    pub date: NaiveDate,
    pub kind: DeltaKind,
    pub amount: rust_decimal::Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::SourceLedger;

    #[test]
    fn test_retract_outranks_upsert_at_equal_revision() {
        let key = SourceKey::new(SourceLedger::Manual, 1);
        let retract = LedgerEvent::retract(3, key);
        assert!(retract.version() > (3, 0));
        assert!(retract.version() < (4, 0));
    }

    #[test]
    fn test_event_json_shape() {
        let event: LedgerEvent = serde_json::from_str(
            r#"{"op": "retract", "revision": 2, "key": {"ledger": "vendor_invoice", "id": 9}}"#,
        )
        .unwrap();
        assert_eq!(event.key(), SourceKey::new(SourceLedger::VendorInvoice, 9));
        assert_eq!(event.revision(), 2);
    }
}
