mod common;

use common::*;
use evm_core::kpi::MonthlyKpi;
use evm_core::progress::{BudgetBasis, PerformanceState};
use evm_core::reconcile::{reconcile, ReconcileInput};
use evm_core::sources::{
    InvoiceKind, ManualValue, PaymentState, PostingState, SalesInvoice, SourceRecord,
};
use evm_core::types::*;
use evm_core::{Engine, EngineConfig};
use pretty_assertions::assert_eq;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

fn planned_engine() -> Engine {
    let mut engine = engine();
    engine
        .apply_all(vec![
            up(1, manual(1, PEINTURE, date(2024, 1, 20), ManualValue::PlannedBudget(dec!(2000)))),
            up(1, manual(2, PEINTURE, date(2024, 2, 1), ManualValue::PlannedBudget(dec!(3000)))),
            up(1, manual(3, MO_FAB, date(2024, 3, 1), ManualValue::PlannedBudget(dec!(4000)))),
            up(1, manual(4, MO_FAB, date(2024, 2, 28), ManualValue::ProgressRate(dec!(0.10)))),
            up(1, manual(5, MO_FAB, date(2024, 3, 29), ManualValue::ProgressRate(dec!(0.15)))),
            up(1, timesheet(6, date(2024, 2, 12), dec!(-1500), 1)),
            up(1, timesheet(7, date(2024, 3, 12), dec!(-2500), 1)),
        ])
        .unwrap();
    engine
}

fn sales(id: u64, untaxed: Decimal, residual: Decimal, payment_state: PaymentState) -> SourceRecord {
    SourceRecord::Sales(SalesInvoice {
        id,
        project: ProjectId(1),
        kind: InvoiceKind::CustomerInvoice,
        state: PostingState::Posted,
        date: date(2024, 4, 1),
        amount_untaxed: untaxed,
        amount_total: untaxed * dec!(1.2),
        amount_residual: residual,
        payment_state,
    })
}

fn row<'a>(rows: &'a [MonthlyKpi], axis: Option<AxisId>, month: u32) -> &'a MonthlyKpi {
    rows.iter()
        .find(|r| r.axis == axis && r.month == date(2024, month, 1))
        .unwrap()
}

#[test]
fn test_axis_rows_cover_the_project_window() {
    let engine = planned_engine();
    let rows = engine.monthly_kpis(None).unwrap();
    // January to June for each of the three axes
    assert_eq!(rows.len(), 18);
    assert_eq!(rows[0].axis, Some(TOLES));
    assert_eq!(rows[0].display_name, "Toles et profilés - January 2024");
    assert_eq!(rows[17].display_name, "MO Fab - June 2024");
}

#[test]
fn test_axis_rows_accumulate() {
    let engine = planned_engine();
    let rows = engine.monthly_kpis(Some(ProgressId(1))).unwrap();

    let feb = row(&rows, Some(MO_FAB), 2);
    assert_eq!(feb.monthly_earned_value, dec!(2000));
    assert_eq!(feb.monthly_actual_cost, dec!(1500));
    assert_eq!(feb.cumulative_planned_value, Decimal::ZERO);
    assert_eq!(feb.schedule_performance_index, Decimal::ZERO);

    let mar = row(&rows, Some(MO_FAB), 3);
    assert_eq!(mar.monthly_planned_value, dec!(4000));
    assert_eq!(mar.cumulative_earned_value, dec!(5000));
    assert_eq!(mar.cumulative_actual_cost, dec!(4000));
    assert_eq!(mar.cost_performance_index, dec!(1.25));
    assert_eq!(mar.schedule_performance_index, dec!(1.25));
    assert_eq!(mar.cost_variance, dec!(1000));
    assert_eq!(mar.schedule_variance, dec!(1000));

    // months without data carry the cumulative figures forward
    let jun = row(&rows, Some(MO_FAB), 6);
    assert_eq!(jun.monthly_earned_value, Decimal::ZERO);
    assert_eq!(jun.cumulative_earned_value, dec!(5000));
}

#[test]
fn test_project_rows_sum_the_axes() {
    let engine = planned_engine();
    let rows = engine.project_kpis(None).unwrap();
    assert_eq!(rows.len(), 6);
    assert!(rows.iter().all(|r| r.axis.is_none()));
    assert_eq!(rows[0].display_name, "P-042-PGP[Hangar Nord] - January 2024");

    let mar = row(&rows, None, 3);
    assert_eq!(mar.cumulative_planned_value, dec!(9000));
    assert_eq!(mar.cumulative_earned_value, dec!(5000));
    assert_eq!(mar.schedule_performance_index, dec!(0.5556));
    assert_eq!(mar.schedule_variance, dec!(-4000));
}

#[test]
fn test_window_widens_to_late_rows() {
    let mut engine = planned_engine();
    engine
        .apply(up(1, timesheet(8, date(2024, 8, 2), dec!(-100), 1)))
        .unwrap();
    assert_eq!(engine.project_kpis(None).unwrap().len(), 8);
}

#[test]
fn test_no_dates_no_rows() {
    let mut book = book();
    book.projects[0].date_start = None;
    book.projects[0].date_end = None;
    let engine = Engine::new(book, EngineConfig::default()).unwrap();
    assert!(engine.monthly_kpis(None).unwrap().is_empty());
    assert!(engine.project_kpis(None).unwrap().is_empty());
}

#[test]
fn test_line_view_derives_amount_and_rate() {
    let engine = planned_engine();
    let lines = engine.axis_lines(None).unwrap();
    let feb = lines
        .iter()
        .find(|l| l.axis == MO_FAB && l.date == date(2024, 2, 28))
        .unwrap();
    assert_eq!(feb.earned_value, dec!(20));
    assert_eq!(feb.earned_amount, dec!(2000));
    assert_eq!(feb.acquisition_rate, dec!(0.1));
}

#[test]
fn test_metrics_use_budget_lines_when_present() {
    let mut engine = planned_engine();
    engine
        .apply_all(vec![
            up(1, sales(1, dec!(20000), Decimal::ZERO, PaymentState::Paid)),
            up(1, sales(2, dec!(5000), dec!(6000), PaymentState::NotPaid)),
        ])
        .unwrap();

    let m = engine.project_metrics(ProgressId(1)).unwrap();
    assert_eq!(m.budget_basis, BudgetBasis::BudgetLines);
    assert_eq!(m.planned_value, dec!(9000));
    assert_eq!(m.earned_value, dec!(5000));
    assert_eq!(m.actual_cost, dec!(4000));
    assert_eq!(m.cost_performance_index, dec!(1.25));
    assert_eq!(m.schedule_performance_index, dec!(0.5556));
    // EV over the axis budgets, not over the budget lines
    assert_eq!(m.completion_rate, dec!(6.25));
    assert_eq!(m.performance_state, PerformanceState::Good);
    assert_eq!(m.sales_untaxed, dec!(25000));
    assert_eq!(m.sales_margin, dec!(21000));
    // (24000 paid − 6000 due) / 24000 paid
    assert_eq!(m.receivable_index, dec!(0.75));
}

#[test]
fn test_metrics_fall_back_to_axis_budgets() {
    let mut engine = engine();
    engine
        .apply(up(1, timesheet(1, date(2024, 2, 12), dec!(-1500), 1)))
        .unwrap();
    let m = engine.project_metrics(ProgressId(1)).unwrap();
    assert_eq!(m.budget_basis, BudgetBasis::AxisBudgets);
    assert_eq!(m.planned_value, dec!(80000));
    assert_eq!(m.cost_performance_index, Decimal::ZERO);
    assert_eq!(m.performance_state, PerformanceState::Warning);
}

#[test]
fn test_completion_is_measured_against_axis_budgets() {
    let mut engine = engine();
    engine
        .apply_all(vec![
            up(1, manual(1, MO_FAB, date(2024, 3, 1), ManualValue::PlannedBudget(dec!(4000)))),
            up(1, manual(2, MO_FAB, date(2024, 3, 29), ManualValue::ProgressRate(dec!(0.15)))),
        ])
        .unwrap();
    let m = engine.project_metrics(ProgressId(1)).unwrap();
    assert_eq!(m.budget_basis, BudgetBasis::BudgetLines);
    assert_eq!(m.earned_value, dec!(3000));
    // 3000 / 80000, the 4000 budget line is ignored
    assert_eq!(m.completion_rate, dec!(3.75));
}

#[test]
fn test_reconcile_from_json_document() {
    let book = serde_json::to_value(book()).unwrap();
    let document = serde_json::json!({
        "book": book,
        "events": [
            {"op": "upsert", "revision": 1, "record": {
                "ledger": "timesheet", "id": 1, "date": "2024-02-12",
                "account": 100, "amount": "-1500", "employee": 1
            }},
            {"op": "upsert", "revision": 1, "record": {
                "ledger": "manual", "id": 2, "axis": 3, "date": "2024-02-28",
                "value": {"progress_rate": "0.10"}
            }},
            {"op": "upsert", "revision": 1, "record": {
                "ledger": "vendor_invoice", "id": 3, "kind": "in_invoice", "state": "posted",
                "project": 1, "product": 1, "date": "2024-02-20", "price_total": "12000"
            }},
            {"op": "retract", "revision": 2, "key": {"ledger": "vendor_invoice", "id": 3}}
        ],
        "progress": 1
    });
    let input: ReconcileInput = serde_json::from_value(document).unwrap();
    let out = reconcile(&input, None).unwrap();

    assert_eq!(out.result.counts.applied, 3);
    assert_eq!(out.result.counts.retracted, 1);
    assert_eq!(out.result.counts.live_records, 2);
    assert_eq!(out.result.axis_lines.len(), 2);
    assert_eq!(out.result.metrics[0].earned_value, dec!(2000));
    assert_eq!(out.result.metrics[0].actual_cost, dec!(1500));
    assert_eq!(out.result.project_kpis.len(), 6);
}
