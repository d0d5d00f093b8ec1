use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::classify::{Classification, Classifier};
use super::event::{Delta, LedgerEvent};
use super::reduce::Aggregates;
use crate::sources::{SourceKey, SourceRecord};
use crate::EvmResult;

#[derive(Debug, Clone)]
struct Entry {
    version: (u64, u8),
    /// `None` once retracted; the version is kept so older events stay stale
    record: Option<SourceRecord>,
    deltas: Vec<Delta>,
}

/// What applying one event did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplyStatus {
    Applied,
    Retracted,
    /// Older than, or equal to, what the ledger already holds for the key
    Stale,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplyOutcome {
    pub key: SourceKey,
    pub status: ApplyStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classification: Option<Classification>,
}

/// Latest known revision of every source row together with the deltas it
/// currently contributes.
#[derive(Debug, Clone, Default)]
pub struct Ledger {
    entries: BTreeMap<SourceKey, Entry>,
    aggregates: Aggregates,
}

impl Ledger {
    /// Apply one event. Stale and duplicate events leave the ledger
    /// untouched; a classification error leaves it untouched as well.
    pub fn apply(&mut self, event: LedgerEvent, classifier: &Classifier) -> EvmResult<ApplyOutcome> {
        let key = event.key();
        let version = event.version();
        if let Some(existing) = self.entries.get(&key) {
            if version <= existing.version {
                debug!("stale event for {key}: {version:?} <= {:?}", existing.version);
                return Ok(ApplyOutcome {
                    key,
                    status: ApplyStatus::Stale,
                    classification: None,
                });
            }
        }

        let (record, classification) = match event {
            LedgerEvent::Upsert { record, .. } => {
                let classification = classifier.classify(&record)?;
                (Some(record), Some(classification))
            }
            LedgerEvent::Retract { .. } => (None, None),
        };
        let deltas = classification
            .as_ref()
            .map(|c| c.deltas.clone())
            .unwrap_or_default();

        if let Some(previous) = self.entries.get(&key) {
            for d in &previous.deltas {
                self.aggregates.remove(d);
            }
        }
        for d in &deltas {
            self.aggregates.add(d);
        }

        let status = if record.is_some() {
            ApplyStatus::Applied
        } else {
            ApplyStatus::Retracted
        };
        debug!("{key} {status:?} at {version:?}: {} delta(s)", deltas.len());
        self.entries.insert(
            key,
            Entry {
                version,
                record,
                deltas,
            },
        );
        Ok(ApplyOutcome {
            key,
            status,
            classification,
        })
    }

    /// Refold every live record from scratch. Records that no longer
    /// classify keep their revision but contribute nothing; the reasons are
    /// returned.
    pub fn rebuild(&mut self, classifier: &Classifier) -> Vec<String> {
        let mut warnings = Vec::new();
        self.aggregates.clear();
        for (key, entry) in self.entries.iter_mut() {
            entry.deltas.clear();
            let Some(record) = &entry.record else {
                continue;
            };
            match classifier.classify(record) {
                Ok(c) => entry.deltas = c.deltas,
                Err(e) => {
                    warn!("{key} no longer classifies: {e}");
                    warnings.push(format!("{key} contributes nothing: {e}"));
                }
            }
            for d in &entry.deltas {
                self.aggregates.add(d);
            }
        }
        info!(
            "ledger rebuilt: {} record(s), {} line(s), {} budget line(s)",
            self.live_count(),
            self.aggregates.line_count(),
            self.aggregates.budget_count()
        );
        warnings
    }

    pub fn aggregates(&self) -> &Aggregates {
        &self.aggregates
    }

    pub fn record(&self, key: &SourceKey) -> Option<&SourceRecord> {
        self.entries.get(key).and_then(|e| e.record.as_ref())
    }

    pub fn records(&self) -> impl Iterator<Item = &SourceRecord> {
        self.entries.values().filter_map(|e| e.record.as_ref())
    }

    pub fn deltas(&self, key: &SourceKey) -> &[Delta] {
        self.entries
            .get(key)
            .map(|e| e.deltas.as_slice())
            .unwrap_or(&[])
    }

    /// Revision currently held for `key`, live or retracted.
    pub fn revision(&self, key: &SourceKey) -> Option<u64> {
        self.entries.get(key).map(|e| e.version.0)
    }

    pub fn live_count(&self) -> usize {
        self.entries.values().filter(|e| e.record.is_some()).count()
    }
}
