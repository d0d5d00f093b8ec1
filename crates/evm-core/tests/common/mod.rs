#![allow(dead_code)]

use chrono::NaiveDate;
use evm_core::axis::{CostSource, EarnedSource, FinancialAxis};
use evm_core::catalog::{
    Catalog, CatalogSpec, Department, Employee, Location, LocationUsage, Product, ProductCategory,
};
use evm_core::ledger::LedgerEvent;
use evm_core::progress::{FinancialProgress, Project};
use evm_core::sources::{
    AnalyticLine, InvoiceKind, LineDisplay, ManualEntry, ManualValue, MoveOrigin, MoveState,
    PostingState, SourceRecord, StockMove, VendorInvoiceLine,
};
use evm_core::types::*;
use evm_core::{Book, Engine, EngineConfig};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

pub const TOLES: AxisId = AxisId(1);
pub const PEINTURE: AxisId = AxisId(2);
pub const MO_FAB: AxisId = AxisId(3);

pub const IPE: ProductId = ProductId(1);
pub const EPOXY: ProductId = ProductId(2);
pub const TRANSPORT: ProductId = ProductId(4);

pub const ACCOUNT: AccountId = AccountId(100);

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn catalog() -> Catalog {
    let category = |id: u64, name: &str, parent: Option<u64>| ProductCategory {
        id: CategoryId(id),
        name: name.into(),
        parent: parent.map(CategoryId),
    };
    let product = |id: u64, name: &str, cat: Option<u64>, price: Decimal| Product {
        id: ProductId(id),
        name: name.into(),
        category: cat.map(CategoryId),
        standard_price: price,
        weight: None,
        length: None,
        area: None,
    };
    let location = |id: u64, name: &str, usage| Location {
        id: LocationId(id),
        name: name.into(),
        usage,
    };
    Catalog::new(CatalogSpec {
        categories: vec![
            category(1, "Acier", None),
            category(2, "Profilés", Some(1)),
            category(3, "Peinture", None),
            category(4, "Transport", None),
        ],
        products: vec![
            Product {
                weight: Some(dec!(22.4)),
                length: Some(dec!(6)),
                ..product(1, "IPE 200", Some(2), dec!(50))
            },
            product(2, "Peinture epoxy", Some(3), dec!(20)),
            product(3, "Prestation", None, dec!(0)),
            product(4, "Camion 20T", Some(4), dec!(0)),
        ],
        departments: vec![Department {
            id: DepartmentId(1),
            name: "Atelier".into(),
        }],
        employees: vec![
            Employee {
                id: EmployeeId(1),
                name: "Karim".into(),
                department: Some(DepartmentId(1)),
            },
            Employee {
                id: EmployeeId(2),
                name: "Nadia".into(),
                department: None,
            },
        ],
        locations: vec![
            location(1, "Fournisseurs", LocationUsage::Supplier),
            location(2, "Chantier", LocationUsage::Internal),
            location(3, "Production", LocationUsage::Production),
            location(4, "Stock", LocationUsage::Internal),
        ],
    })
    .unwrap()
}

pub fn axes() -> Vec<FinancialAxis> {
    let mut toles = FinancialAxis::new(TOLES, "Toles et profilés");
    toles.sequence = 30;
    toles.earned_source = EarnedSource::StockReceipt;
    toles.cost_source = CostSource::VendorInvoice;
    toles.planned_quantity = dec!(1000);
    toles.unit_price = dec!(50);
    toles.price_budget();
    toles.criteria.product_categories.insert(CategoryId(1));
    toles.criteria.destination_location = Some(LocationId(2));

    let mut peinture = FinancialAxis::new(PEINTURE, "Peinture");
    peinture.sequence = 80;
    peinture.cost_source = CostSource::StockIssue;
    peinture.planned_budget = dec!(10000);
    peinture.criteria.product_categories.insert(CategoryId(3));

    let mut fab = FinancialAxis::new(MO_FAB, "MO Fab");
    fab.sequence = 100;
    fab.earned_source = EarnedSource::ProgressRate;
    fab.cost_source = CostSource::Timesheet;
    fab.planned_quantity = dec!(200);
    fab.unit_price = dec!(100);
    fab.price_budget();
    fab.criteria.departments.insert(DepartmentId(1));

    vec![toles, peinture, fab]
}

pub fn book() -> Book {
    let mut progress = FinancialProgress::new(ProgressId(1), ProjectId(1));
    progress.axes = axes();
    Book {
        catalog: catalog(),
        axis_categories: Vec::new(),
        projects: vec![Project {
            id: ProjectId(1),
            code: Some("P-042".into()),
            name: "Hangar Nord".into(),
            date_start: Some(date(2024, 1, 15)),
            date_end: Some(date(2024, 6, 30)),
            analytic_account: Some(ACCOUNT),
        }],
        progresses: vec![progress],
    }
}

pub fn engine() -> Engine {
    Engine::new(book(), EngineConfig::default()).unwrap()
}

// ---------------------------------------------------------------------------
// Source rows
// ---------------------------------------------------------------------------

pub fn timesheet(id: u64, on: NaiveDate, amount: Decimal, employee: u64) -> SourceRecord {
    SourceRecord::Timesheet(AnalyticLine {
        id,
        date: on,
        account: Some(ACCOUNT),
        amount,
        unit_amount: dec!(8),
        product: None,
        employee: Some(EmployeeId(employee)),
        description: None,
    })
}

pub fn bill(id: u64, on: NaiveDate, product: ProductId, total: Decimal) -> SourceRecord {
    SourceRecord::VendorInvoice(VendorInvoiceLine {
        id,
        invoice: Some(id),
        kind: InvoiceKind::VendorBill,
        state: PostingState::Posted,
        display: LineDisplay::Product,
        project: Some(ProjectId(1)),
        product: Some(product),
        invoice_date: Some(on),
        date: on,
        price_total: total,
    })
}

pub fn refund(id: u64, on: NaiveDate, product: ProductId, total: Decimal) -> SourceRecord {
    match bill(id, on, product, total) {
        SourceRecord::VendorInvoice(mut line) => {
            line.kind = InvoiceKind::VendorRefund;
            SourceRecord::VendorInvoice(line)
        }
        other => other,
    }
}

/// Receipt of IPE on site, or its return when `is_return`.
pub fn picking(id: u64, on: NaiveDate, quantity: Decimal, is_return: bool) -> SourceRecord {
    let (source, destination) = if is_return {
        (LocationId(2), LocationId(4))
    } else {
        (LocationId(1), LocationId(2))
    };
    SourceRecord::Stock(StockMove {
        id,
        product: IPE,
        quantity,
        state: MoveState::Done,
        date: on,
        destination_location: Some(destination),
        unit_cost: None,
        origin: MoveOrigin::Picking {
            project: Some(ProjectId(1)),
            state: MoveState::Done,
            source_location: Some(source),
            destination_location: Some(destination),
            scheduled_date: on,
            is_return,
        },
    })
}

/// Paint consumed by a manufacturing order of the project.
pub fn component(id: u64, on: NaiveDate, quantity: Decimal) -> SourceRecord {
    SourceRecord::Stock(StockMove {
        id,
        product: EPOXY,
        quantity,
        state: MoveState::Done,
        date: on,
        destination_location: Some(LocationId(3)),
        unit_cost: None,
        origin: MoveOrigin::ProductionComponent {
            state: MoveState::Done,
            analytic_account: Some(ACCOUNT),
            operation: None,
            finished_on: Some(on),
        },
    })
}

/// IPE finished by a manufacturing order of the project.
pub fn finished(id: u64, on: NaiveDate, quantity: Decimal, operation: &str) -> SourceRecord {
    SourceRecord::Stock(StockMove {
        id,
        product: IPE,
        quantity,
        state: MoveState::Done,
        date: on,
        destination_location: Some(LocationId(4)),
        unit_cost: None,
        origin: MoveOrigin::ProductionOutput {
            state: MoveState::Done,
            analytic_account: Some(ACCOUNT),
            operation: Some(operation.to_string()),
            finished_on: Some(on),
        },
    })
}

pub fn manual(id: u64, axis: AxisId, on: NaiveDate, value: ManualValue) -> SourceRecord {
    SourceRecord::Manual(ManualEntry {
        id,
        axis,
        date: on,
        value,
        description: None,
    })
}

pub fn up(revision: u64, record: SourceRecord) -> LedgerEvent {
    LedgerEvent::upsert(revision, record)
}
