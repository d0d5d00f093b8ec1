mod common;

use common::*;
use evm_core::axis::{CategoryRatio, CostSource, EarnedSource, FinancialAxis, Phase, PhaseRatios};
use evm_core::engine::GridField;
use evm_core::error::EvmError;
use evm_core::ledger::LedgerEvent;
use evm_core::progress::ProgressState;
use evm_core::sources::manual::{MAX_AXIS_ID, RESERVED_ID_FLOOR};
use evm_core::sources::{ManualValue, SourceKey, SourceLedger};
use evm_core::types::*;
use evm_core::{Engine, EngineConfig};
use pretty_assertions::assert_eq;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

fn state(engine: &Engine) -> ProgressState {
    engine.book().progress(ProgressId(1)).unwrap().state
}

fn earned_of(engine: &Engine, axis: AxisId) -> Decimal {
    engine
        .axis_lines(None)
        .unwrap()
        .iter()
        .filter(|l| l.axis == axis)
        .map(|l| l.earned_value)
        .sum()
}

fn cost_of(engine: &Engine, axis: AxisId) -> Decimal {
    engine
        .axis_lines(None)
        .unwrap()
        .iter()
        .filter(|l| l.axis == axis)
        .map(|l| l.actual_cost)
        .sum()
}

// ===========================================================================
// Book validation
// ===========================================================================

#[test]
fn test_shared_category_between_axes_is_rejected() {
    let mut book = book();
    book.progresses[0].axes[1]
        .criteria
        .product_categories
        .insert(CategoryId(1));
    let err = Engine::new(book, EngineConfig::default()).unwrap_err();
    assert!(matches!(err, EvmError::CategoryOverlap { .. }));
}

#[test]
fn test_ancestor_overlap_only_when_configured() {
    let mut book = book();
    let mut extra = FinancialAxis::new(AxisId(9), "Profilés spéciaux");
    extra.criteria.product_categories.insert(CategoryId(2));
    book.progresses[0].axes.push(extra);

    assert!(Engine::new(book.clone(), EngineConfig::default()).is_ok());
    let strict = EngineConfig {
        hierarchical_overlap: true,
        ..Default::default()
    };
    assert!(matches!(
        Engine::new(book, strict).unwrap_err(),
        EvmError::CategoryOverlap { .. }
    ));
}

#[test]
fn test_shared_employee_is_rejected() {
    let mut book = book();
    book.progresses[0].axes[0]
        .criteria
        .employees
        .insert(EmployeeId(1));
    book.progresses[0].axes[2]
        .criteria
        .employees
        .insert(EmployeeId(1));
    assert!(matches!(
        Engine::new(book, EngineConfig::default()).unwrap_err(),
        EvmError::EmployeeOverlap { .. }
    ));
}

#[test]
fn test_axis_id_beyond_derived_id_range_is_rejected() {
    let mut book = book();
    book.progresses[0].axes[1].id = AxisId(MAX_AXIS_ID + 1);
    let err = Engine::new(book.clone(), EngineConfig::default()).unwrap_err();
    assert!(err.to_string().contains("exceeds the largest axis id"));

    book.progresses[0].axes[1].id = AxisId(MAX_AXIS_ID);
    assert!(Engine::new(book, EngineConfig::default()).is_ok());
}

#[test]
fn test_unknown_project_is_rejected() {
    let mut book = book();
    book.progresses[0].project = ProjectId(7);
    assert!(matches!(
        Engine::new(book, EngineConfig::default()).unwrap_err(),
        EvmError::NotFound { .. }
    ));
}

// ===========================================================================
// Lifecycle
// ===========================================================================

#[test]
fn test_state_follows_activity() {
    let mut engine = engine();
    // every axis carries a planned budget
    assert_eq!(state(&engine), ProgressState::Budgeted);

    engine
        .apply(up(1, timesheet(1, date(2024, 2, 5), dec!(-800), 1)))
        .unwrap();
    assert_eq!(state(&engine), ProgressState::InProgress);

    engine
        .apply(LedgerEvent::retract(2, SourceKey::new(SourceLedger::Timesheet, 1)))
        .unwrap();
    assert_eq!(state(&engine), ProgressState::Budgeted);
}

#[test]
fn test_failed_batch_leaves_ledger_and_states_untouched() {
    let mut engine = engine();
    let err = engine
        .apply_all(vec![
            up(1, timesheet(1, date(2024, 2, 5), dec!(-800), 1)),
            up(1, manual(2, TOLES, date(2024, 2, 6), ManualValue::EarnedQuantity(dec!(5)))),
        ])
        .unwrap_err();
    assert!(matches!(err, EvmError::LockedEarnedValue { .. }));
    assert_eq!(engine.ledger().live_count(), 0);
    assert!(engine.axis_lines(None).unwrap().is_empty());
    assert_eq!(state(&engine), ProgressState::Budgeted);

    engine
        .apply_all(vec![up(1, timesheet(1, date(2024, 2, 5), dec!(-800), 1))])
        .unwrap();
    assert_eq!(engine.ledger().live_count(), 1);
    assert_eq!(cost_of(&engine, MO_FAB), dec!(800));
    assert_eq!(state(&engine), ProgressState::InProgress);
}

#[test]
fn test_unbudgeted_progress_stays_draft() {
    let mut book = book();
    book.progresses[0].axes[1].planned_budget = Decimal::ZERO;
    let mut engine = Engine::new(book, EngineConfig::default()).unwrap();
    assert_eq!(state(&engine), ProgressState::Draft);

    // a budget line on the axis is enough
    engine
        .apply(up(
            1,
            manual(1, PEINTURE, date(2024, 2, 1), ManualValue::PlannedBudget(dec!(3000))),
        ))
        .unwrap();
    assert_eq!(state(&engine), ProgressState::Budgeted);
}

#[test]
fn test_cancel_and_reset() {
    let mut engine = engine();
    engine
        .apply(up(1, timesheet(1, date(2024, 2, 5), dec!(-800), 1)))
        .unwrap();

    engine.cancel(ProgressId(1)).unwrap();
    assert_eq!(state(&engine), ProgressState::Cancel);
    assert!(engine.axis_lines(None).unwrap().is_empty());

    // rows arriving while cancelled are kept but do not count
    engine
        .apply(up(1, timesheet(2, date(2024, 2, 6), dec!(-200), 1)))
        .unwrap();
    assert!(engine.axis_lines(None).unwrap().is_empty());

    engine.reset_to_draft(ProgressId(1)).unwrap();
    assert_eq!(state(&engine), ProgressState::InProgress);
    assert_eq!(cost_of(&engine, MO_FAB), dec!(1000));
}

#[test]
fn test_close_due_confirms_and_closes_axes() {
    let mut engine = engine();
    engine
        .apply(up(1, timesheet(1, date(2024, 6, 10), dec!(-800), 1)))
        .unwrap();

    assert!(engine.close_due(date(2024, 6, 29)).unwrap().is_empty());
    assert_eq!(engine.close_due(date(2024, 7, 1)).unwrap(), vec![ProgressId(1)]);
    assert_eq!(state(&engine), ProgressState::Confirm);

    // late rows are turned down, earlier ones still count
    let outcome = engine
        .apply(up(1, timesheet(2, date(2024, 7, 3), dec!(-500), 1)))
        .unwrap();
    let c = outcome.classification.unwrap();
    assert!(c.deltas.is_empty());
    assert!(c.rejections[0].reason.contains("closed on 2024-06-30"));
    engine
        .apply(up(1, timesheet(3, date(2024, 6, 28), dec!(-100), 1)))
        .unwrap();
    assert_eq!(cost_of(&engine, MO_FAB), dec!(900));

    assert!(engine.cancel(ProgressId(1)).is_err());
    assert!(engine.close_due(date(2024, 8, 1)).unwrap().is_empty());
}

// ===========================================================================
// Axis configuration
// ===========================================================================

#[test]
fn test_added_axis_picks_up_existing_rows() {
    let mut engine = engine();
    let outcome = engine
        .apply(up(1, bill(12, date(2024, 3, 5), TRANSPORT, dec!(2700))))
        .unwrap();
    assert!(outcome.classification.unwrap().deltas.is_empty());

    let mut transport = FinancialAxis::new(AxisId(4), "Transport");
    transport.cost_source = CostSource::VendorInvoice;
    transport.criteria.product_categories.insert(CategoryId(4));
    engine.add_axis(ProgressId(1), transport).unwrap();

    assert_eq!(cost_of(&engine, AxisId(4)), dec!(2700));
}

#[test]
fn test_rejected_configuration_leaves_engine_untouched() {
    let mut engine = engine();
    engine
        .apply(up(1, bill(10, date(2024, 2, 20), IPE, dec!(12000))))
        .unwrap();

    let mut clash = FinancialAxis::new(AxisId(5), "Acier bis");
    clash.criteria.product_categories.insert(CategoryId(1));
    assert!(engine.add_axis(ProgressId(1), clash).is_err());
    assert_eq!(engine.book().progress(ProgressId(1)).unwrap().axes.len(), 3);
    assert_eq!(cost_of(&engine, TOLES), dec!(12000));
}

#[test]
fn test_update_and_remove_axis_refold() {
    let mut engine = engine();
    engine
        .apply(up(1, bill(10, date(2024, 2, 20), IPE, dec!(12000))))
        .unwrap();

    let mut toles = engine.book().axis(TOLES).unwrap().1.clone();
    toles.criteria.product_categories.clear();
    toles.criteria.product_categories.insert(CategoryId(4));
    engine.update_axis(toles).unwrap();
    assert_eq!(cost_of(&engine, TOLES), Decimal::ZERO);

    engine.remove_axis(TOLES).unwrap();
    assert!(engine.book().axis(TOLES).is_none());
    assert_eq!(engine.ledger().live_count(), 1);
    assert!(engine.remove_axis(TOLES).is_err());
}

#[test]
fn test_update_reprices_budget() {
    let mut engine = engine();
    let mut fab = engine.book().axis(MO_FAB).unwrap().1.clone();
    fab.unit_price = dec!(120);
    engine.update_axis(fab).unwrap();
    assert_eq!(engine.book().axis(MO_FAB).unwrap().1.planned_budget, dec!(24000));
}

#[test]
fn test_hours_axis_earns_booked_hours() {
    let mut engine = engine();
    let mut pose = FinancialAxis::new(AxisId(4), "MO Pose");
    pose.earned_source = EarnedSource::TimesheetHours;
    pose.cost_source = CostSource::Timesheet;
    pose.planned_quantity = dec!(400);
    pose.unit_price = dec!(50);
    pose.criteria.employees.insert(EmployeeId(2));
    engine.add_axis(ProgressId(1), pose).unwrap();

    engine
        .apply_all(vec![
            up(1, timesheet(1, date(2024, 3, 4), dec!(-800), 2)),
            up(1, timesheet(2, date(2024, 3, 5), dec!(-900), 1)),
        ])
        .unwrap();
    assert_eq!(earned_of(&engine, AxisId(4)), dec!(8));
    assert_eq!(cost_of(&engine, AxisId(4)), dec!(800));
    // Karim's hours cost MO Fab but earn nothing there
    assert_eq!(cost_of(&engine, MO_FAB), dec!(900));
    assert_eq!(earned_of(&engine, MO_FAB), Decimal::ZERO);

    // hours are computed, not typed
    assert!(matches!(
        engine.apply(up(1, manual(3, AxisId(4), date(2024, 3, 6), ManualValue::EarnedQuantity(dec!(5))))),
        Err(EvmError::LockedEarnedValue { .. })
    ));
}

#[test]
fn test_phase_ratios_drive_rate_axis_progress() {
    let mut engine = engine();
    let mut fab = engine.book().axis(MO_FAB).unwrap().1.clone();
    fab.criteria.product_categories.insert(CategoryId(2));
    fab.category_ratios = vec![CategoryRatio {
        category: CategoryId(2),
        phases: PhaseRatios {
            debitage: dec!(20),
            soudage: dec!(30),
            ..PhaseRatios::default()
        },
    }];
    engine.update_axis(fab).unwrap();

    engine
        .apply_all(vec![
            up(1, finished(40, date(2024, 4, 10), dec!(10), "soudage")),
            up(1, finished(41, date(2024, 4, 11), dec!(10), "Débitage")),
        ])
        .unwrap();
    assert_eq!(earned_of(&engine, MO_FAB), dec!(5));

    // a phase without ratio earns nothing, an unknown operation is ineligible
    let outcome = engine
        .apply(up(1, finished(42, date(2024, 4, 12), dec!(10), "peinture")))
        .unwrap();
    assert!(outcome.classification.unwrap().deltas.is_empty());
    let explanation = engine.explain(&finished(43, date(2024, 4, 12), dec!(10), "usinage")).unwrap();
    assert!(!explanation.eligible);
    assert_eq!(earned_of(&engine, MO_FAB), dec!(5));
    assert_eq!(Phase::parse("finition"), Some(Phase::Finition));
}

#[test]
fn test_ratio_rows_follow_axis_categories() {
    let mut engine = engine();
    let mut fab = engine.book().axis(MO_FAB).unwrap().1.clone();
    fab.criteria.product_categories.insert(CategoryId(2));
    engine.update_axis(fab).unwrap();
    let rows = &engine.book().axis(MO_FAB).unwrap().1.category_ratios;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].category, CategoryId(2));
    assert_eq!(rows[0].phases.total(), Decimal::ZERO);

    let mut over = engine.book().axis(MO_FAB).unwrap().1.clone();
    over.category_ratios[0].phases.assemblage = dec!(80);
    over.category_ratios[0].phases.finition = dec!(30);
    assert!(engine.update_axis(over).is_err());
    assert_eq!(
        engine.book().axis(MO_FAB).unwrap().1.category_ratios[0].phases,
        PhaseRatios::default()
    );
}

#[test]
fn test_user_manual_ids_stay_below_the_reserved_range() {
    let mut engine = engine();
    let err = engine
        .apply(up(
            1,
            manual(RESERVED_ID_FLOOR, PEINTURE, date(2024, 4, 1), ManualValue::ActualCost(dec!(10))),
        ))
        .unwrap_err();
    assert!(err.to_string().contains("reserved"));
    assert_eq!(engine.ledger().live_count(), 0);

    engine
        .apply(up(
            1,
            manual(RESERVED_ID_FLOOR - 1, PEINTURE, date(2024, 4, 1), ManualValue::ActualCost(dec!(10))),
        ))
        .unwrap();
    // grid edits still use their derived ids
    engine
        .adjust_cell(PEINTURE, date(2024, 4, 1), GridField::ActualCost, dec!(5))
        .unwrap();
    assert_eq!(cost_of(&engine, PEINTURE), dec!(15));
}

// ===========================================================================
// Planning grid
// ===========================================================================

#[test]
fn test_grid_adjustments_accumulate_per_month() {
    let mut engine = engine();
    let total = engine
        .adjust_cell(PEINTURE, date(2024, 4, 17), GridField::ActualCost, dec!(100))
        .unwrap();
    assert_eq!(total, dec!(100));
    let total = engine
        .adjust_cell(PEINTURE, date(2024, 4, 2), GridField::ActualCost, dec!(-30))
        .unwrap();
    assert_eq!(total, dec!(70));

    let lines = engine.axis_lines(None).unwrap();
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].date, date(2024, 4, 1));
    assert_eq!(engine.ledger().live_count(), 1);

    let budget = engine
        .adjust_cell(PEINTURE, date(2024, 4, 9), GridField::PlannedBudget, dec!(2500))
        .unwrap();
    assert_eq!(budget, dec!(2500));
}

#[test]
fn test_grid_total_includes_other_rows_of_the_month() {
    let mut engine = engine();
    engine
        .apply(up(1, component(30, date(2024, 4, 12), dec!(10))))
        .unwrap();
    let total = engine
        .adjust_cell(PEINTURE, date(2024, 4, 1), GridField::ActualCost, dec!(50))
        .unwrap();
    assert_eq!(total, dec!(250));
}

#[test]
fn test_grid_on_stock_axis_progress_is_locked() {
    let mut engine = engine();
    assert!(engine
        .adjust_cell(TOLES, date(2024, 4, 1), GridField::EarnedQuantity, dec!(5))
        .is_err());
    assert!(engine
        .adjust_cell(AxisId(77), date(2024, 4, 1), GridField::ActualCost, dec!(5))
        .is_err());
}

// ===========================================================================
// Diagnostics
// ===========================================================================

#[test]
fn test_explain_lists_matches_and_rejections() {
    let engine = engine();
    let explanation = engine
        .explain(&bill(12, date(2024, 3, 5), EPOXY, dec!(700)))
        .unwrap();
    assert!(explanation.eligible);
    assert!(explanation.matched.is_empty());
    assert_eq!(explanation.rejections.len(), 1);
    assert_eq!(explanation.progress.as_deref(), Some("P-042-PGP[Hangar Nord]"));
    assert!(explanation.report.iter().any(|l| l == "No axis found"));

    let explanation = engine
        .explain(&bill(13, date(2024, 3, 5), IPE, dec!(700)))
        .unwrap();
    assert_eq!(explanation.matched.len(), 1);
    assert_eq!(explanation.matched[0].complete_name, "P-042-PGP/Toles et profilés");
    assert_eq!(explanation.matched[0].amount, dec!(700));
    // nothing was recorded
    assert_eq!(engine.ledger().live_count(), 0);
}

#[cfg(feature = "templates")]
#[test]
fn test_template_fills_empty_progress_once() {
    let mut book = book();
    book.progresses[0].axes.clear();
    let mut engine = Engine::new(book, EngineConfig::default()).unwrap();

    let outcome = engine.apply_template(ProgressId(1)).unwrap().unwrap();
    assert_eq!(outcome.created_axes.len(), 16);
    assert_eq!(outcome.created_categories.len(), 5);
    assert_eq!(engine.book().axis_categories.len(), 5);
    assert!(engine.apply_template(ProgressId(1)).unwrap().is_none());
}
