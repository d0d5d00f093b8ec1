//! Import of monthly progress and cost series typed in a spreadsheet.
//!
//! Each non-zero value becomes a manual entry dated on the configured import
//! day of its month. Entry ids are derived from the axis, the month and the
//! kind of value, so importing the same series twice changes nothing and a
//! higher revision replaces the earlier values.

use log::{info, warn};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::time::Instant;

use crate::config::EngineConfig;
use crate::engine::{Book, Engine};
use crate::error::EvmError;
use crate::ledger::LedgerEvent;
use crate::period::ymd;
use crate::sources::manual::{derived_id, IMPORT_TAG};
use crate::sources::{ManualEntry, ManualValue, SourceRecord};
use crate::types::*;
use crate::EvmResult;

// ---------------------------------------------------------------------------
// Input / Output types
// ---------------------------------------------------------------------------

/// Month label → value. Labels are month numbers ("3") or abbreviations
/// ("Mar", "Avr", "Juil", "Sep", ...).
pub type MonthSeries = BTreeMap<String, Decimal>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonthlyImport {
    pub progress: ProgressId,
    pub year: i32,
    #[serde(default = "default_revision")]
    pub revision: u64,
    /// Axis name → monthly progress rate (fraction of planned quantity)
    #[serde(default)]
    pub progress_series: BTreeMap<String, MonthSeries>,
    /// Axis name → monthly actual cost
    #[serde(default)]
    pub cost_series: BTreeMap<String, MonthSeries>,
}

fn default_revision() -> u64 {
    1
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImportSummary {
    pub progress_entries: usize,
    pub cost_entries: usize,
    pub skipped_zero: usize,
    pub unknown_axes: Vec<String>,
    /// Axes whose earned value is computed from source rows
    pub locked_axes: Vec<String>,
    pub invalid_months: Vec<String>,
    /// Labels naming a month already given for the same axis ("3" and
    /// "Mar"); only the first label in sort order is imported
    #[serde(default)]
    pub duplicate_months: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportPlan {
    pub events: Vec<LedgerEvent>,
    pub summary: ImportSummary,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportInput {
    pub book: Book,
    pub import: MonthlyImport,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<EngineConfig>,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Turn the series into manual-entry events without applying them.
pub fn plan_import(
    book: &Book,
    config: &EngineConfig,
    import: &MonthlyImport,
) -> EvmResult<ImportPlan> {
    let progress = book.progress(import.progress).ok_or_else(|| EvmError::NotFound {
        entity: "progress".into(),
        id: import.progress.to_string(),
    })?;
    if progress.axes.is_empty() {
        return Err(EvmError::InvalidInput {
            field: "progress".into(),
            reason: format!("progress {} has no axes to import into", progress.id),
        });
    }
    let by_name: BTreeMap<&str, _> = progress.axes.iter().map(|a| (a.name.as_str(), a)).collect();

    let mut events = Vec::new();
    let mut summary = ImportSummary::default();

    for (series, slot) in [(&import.progress_series, 0u8), (&import.cost_series, 1u8)] {
        for (axis_name, months) in series {
            let Some(axis) = by_name.get(axis_name.as_str()) else {
                warn!("import: no axis named '{axis_name}'");
                if !summary.unknown_axes.contains(axis_name) {
                    summary.unknown_axes.push(axis_name.clone());
                }
                continue;
            };
            if slot == 0 && config.lock_automatic_earned_value && axis.earned_source.is_automatic()
            {
                summary.locked_axes.push(axis_name.clone());
                continue;
            }
            let mut seen = BTreeSet::new();
            for (label, value) in months {
                if value.is_zero() {
                    summary.skipped_zero += 1;
                    continue;
                }
                let Some(month) = month_number(label) else {
                    summary.invalid_months.push(format!("{axis_name}: {label}"));
                    continue;
                };
                if !seen.insert(month) {
                    warn!("import: '{axis_name}' gives month {month} twice, '{label}' ignored");
                    summary.duplicate_months.push(format!("{axis_name}: {label}"));
                    continue;
                }
                let date = ymd(import.year, month, config.import_day)?;
                let (value, description) = if slot == 0 {
                    summary.progress_entries += 1;
                    (
                        ManualValue::ProgressRate(*value),
                        format!("Progress {label} {}: {}%", import.year, (*value * Decimal::ONE_HUNDRED).round_dp(0)),
                    )
                } else {
                    summary.cost_entries += 1;
                    (
                        ManualValue::ActualCost(*value),
                        format!("Cost {label} {}: {}", import.year, value.round_dp(2)),
                    )
                };
                let entry = ManualEntry {
                    id: derived_id(IMPORT_TAG, axis.id, date, slot),
                    axis: axis.id,
                    date,
                    value,
                    description: Some(description),
                };
                events.push(LedgerEvent::upsert(import.revision, SourceRecord::Manual(entry)));
            }
        }
    }

    info!(
        "import for progress {}: {} progress and {} cost entr(ies), {} unknown axis name(s)",
        import.progress,
        summary.progress_entries,
        summary.cost_entries,
        summary.unknown_axes.len()
    );
    Ok(ImportPlan { events, summary })
}

/// Plan the import and report it in the standard envelope.
pub fn import_series(
    input: &ImportInput,
    config: Option<&EngineConfig>,
) -> EvmResult<ComputationOutput<ImportPlan>> {
    let start = Instant::now();
    let config = &EngineConfig::resolve(config, input.config.as_ref());
    input.book.validate(config)?;
    let plan = plan_import(&input.book, config, &input.import)?;

    let mut warnings = Vec::new();
    for name in &plan.summary.unknown_axes {
        warnings.push(format!("axis '{name}' not found, series skipped"));
    }
    for name in &plan.summary.locked_axes {
        warnings.push(format!("axis '{name}' computes its own progress, progress series skipped"));
    }
    for month in &plan.summary.duplicate_months {
        warnings.push(format!("month {month} given twice, value ignored"));
    }
    for month in &plan.summary.invalid_months {
        warnings.push(format!("unrecognised month {month}"));
    }

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Monthly progress and cost series import",
        &serde_json::json!({
            "progress": input.import.progress,
            "year": input.import.year,
            "revision": input.import.revision,
            "import_day": config.import_day,
        }),
        warnings,
        elapsed,
        plan,
    ))
}

impl Engine {
    /// Plan and apply an import as one batch. An entry rejected by the
    /// ledger aborts the whole import and nothing is recorded.
    pub fn import_series(&mut self, import: &MonthlyImport) -> EvmResult<ImportSummary> {
        let plan = plan_import(self.book(), self.config(), import)?;
        self.apply_all(plan.events)?;
        Ok(plan.summary)
    }
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

fn month_number(label: &str) -> Option<u32> {
    let label = label.trim();
    if let Ok(n) = label.parse::<u32>() {
        return (1..=12).contains(&n).then_some(n);
    }
    let month = match label.to_lowercase().trim_end_matches('.') {
        "jan" | "janv" | "janvier" | "january" => 1,
        "fev" | "fév" | "feb" | "fevrier" | "février" | "february" => 2,
        "mar" | "mars" | "march" => 3,
        "avr" | "apr" | "avril" | "april" => 4,
        "mai" | "may" => 5,
        "jui" | "jun" | "juin" | "june" => 6,
        "juil" | "jul" | "juillet" | "july" => 7,
        "aou" | "août" | "aout" | "aug" | "august" => 8,
        "sep" | "sept" | "septembre" | "september" => 9,
        "oct" | "octobre" | "october" => 10,
        "nov" | "novembre" | "november" => 11,
        "dec" | "déc" | "decembre" | "décembre" | "december" => 12,
        _ => return None,
    };
    Some(month)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::axis::{EarnedSource, FinancialAxis};
    use crate::progress::{FinancialProgress, Project};
    use rust_decimal_macros::dec;

    fn book() -> Book {
        let mut fab = FinancialAxis::new(AxisId(1), "MO Fab");
        fab.planned_quantity = dec!(200);
        let mut toles = FinancialAxis::new(AxisId(2), "Toles et profilés");
        toles.earned_source = EarnedSource::StockReceipt;
        let mut progress = FinancialProgress::new(ProgressId(1), ProjectId(1));
        progress.axes = vec![fab, toles];
        Book {
            projects: vec![Project {
                id: ProjectId(1),
                code: None,
                name: "Hangar".into(),
                date_start: None,
                date_end: None,
                analytic_account: None,
            }],
            progresses: vec![progress],
            ..Book::default()
        }
    }

    fn series(items: &[(&str, Decimal)]) -> MonthSeries {
        items.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    fn import() -> MonthlyImport {
        MonthlyImport {
            progress: ProgressId(1),
            year: 2024,
            revision: 1,
            progress_series: BTreeMap::from([
                ("MO Fab".to_string(), series(&[("Fev", dec!(0.10)), ("Mar", dec!(0.15)), ("Jui", dec!(0))])),
                ("Toles et profilés".to_string(), series(&[("Mar", dec!(0.10))])),
                ("Garde corps".to_string(), series(&[("Mar", dec!(0.5))])),
            ]),
            cost_series: BTreeMap::from([
                ("MO Fab".to_string(), series(&[("Fev", dec!(159660)), ("Foo", dec!(1))])),
                ("Toles et profilés".to_string(), series(&[("4", dec!(860675.80))])),
            ]),
        }
    }

    #[test]
    fn test_month_labels() {
        assert_eq!(month_number("Fev"), Some(2));
        assert_eq!(month_number("Juil"), Some(7));
        assert_eq!(month_number("Jui"), Some(6));
        assert_eq!(month_number("Août"), Some(8));
        assert_eq!(month_number("12"), Some(12));
        assert_eq!(month_number("13"), None);
        assert_eq!(month_number("Foo"), None);
    }

    #[test]
    fn test_plan_reports_skips() {
        let plan = plan_import(&book(), &EngineConfig::default(), &import()).unwrap();
        assert_eq!(plan.summary.progress_entries, 2);
        assert_eq!(plan.summary.cost_entries, 2);
        assert_eq!(plan.summary.skipped_zero, 1);
        assert_eq!(plan.summary.unknown_axes, vec!["Garde corps".to_string()]);
        assert_eq!(plan.summary.locked_axes, vec!["Toles et profilés".to_string()]);
        assert_eq!(plan.summary.invalid_months, vec!["MO Fab: Foo".to_string()]);
        assert!(plan.summary.duplicate_months.is_empty());
        assert_eq!(plan.events.len(), 4);
    }

    #[test]
    fn test_month_given_twice_is_imported_once() {
        let mut imp = import();
        imp.cost_series.insert(
            "MO Fab".to_string(),
            series(&[("3", dec!(1000)), ("Mar", dec!(2500)), ("Mars", dec!(0))]),
        );
        let plan = plan_import(&book(), &EngineConfig::default(), &imp).unwrap();
        assert_eq!(plan.summary.duplicate_months, vec!["MO Fab: Mar".to_string()]);
        assert_eq!(plan.summary.cost_entries, 2);

        let mut engine = Engine::new(book(), EngineConfig::default()).unwrap();
        engine.import_series(&imp).unwrap();
        let cost: Decimal = engine
            .axis_lines(None)
            .unwrap()
            .iter()
            .filter(|l| l.axis == AxisId(1))
            .map(|l| l.actual_cost)
            .sum();
        assert_eq!(cost, dec!(1000));

        let out = import_series(
            &ImportInput {
                book: book(),
                import: imp,
                config: None,
            },
            None,
        )
        .unwrap();
        assert!(out.warnings.iter().any(|w| w.contains("MO Fab: Mar given twice")));
    }

    #[test]
    fn test_rejected_entry_aborts_the_whole_import() {
        let mut imp = import();
        imp.progress_series.insert(
            "MO Fab".to_string(),
            series(&[("Fev", dec!(0.10)), ("Mar", dec!(1.5))]),
        );
        let mut engine = Engine::new(book(), EngineConfig::default()).unwrap();
        assert!(engine.import_series(&imp).is_err());
        assert_eq!(engine.ledger().live_count(), 0);
        assert!(engine.axis_lines(None).unwrap().is_empty());
    }

    #[test]
    fn test_reimport_is_idempotent() {
        let mut engine = Engine::new(book(), EngineConfig::default()).unwrap();
        engine.import_series(&import()).unwrap();
        let first = engine.axis_lines(None).unwrap();
        engine.import_series(&import()).unwrap();
        assert_eq!(engine.axis_lines(None).unwrap(), first);

        let earned: Decimal = first
            .iter()
            .filter(|l| l.axis == AxisId(1))
            .map(|l| l.earned_value)
            .sum();
        assert_eq!(earned, dec!(50));
    }

    #[test]
    fn test_unknown_progress_is_an_error() {
        let mut imp = import();
        imp.progress = ProgressId(9);
        assert!(plan_import(&book(), &EngineConfig::default(), &imp).is_err());
    }
}
