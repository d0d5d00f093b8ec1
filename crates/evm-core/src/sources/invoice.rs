use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{Money, ProductId, ProjectId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceKind {
    #[serde(alias = "in_invoice")]
    VendorBill,
    #[serde(alias = "in_refund")]
    VendorRefund,
    #[serde(alias = "out_invoice")]
    CustomerInvoice,
    #[serde(alias = "out_refund")]
    CustomerRefund,
    Entry,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PostingState {
    #[default]
    Draft,
    Posted,
    Cancel,
}

/// Kind of invoice line; only product lines carry costs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineDisplay {
    #[default]
    Product,
    #[serde(alias = "line_section")]
    Section,
    #[serde(alias = "line_note")]
    Note,
    Tax,
    PaymentTerm,
}

/// One line of a vendor bill or refund.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VendorInvoiceLine {
    pub id: u64,
    /// Invoice the line belongs to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invoice: Option<u64>,
    pub kind: InvoiceKind,
    #[serde(default)]
    pub state: PostingState,
    #[serde(default)]
    pub display: LineDisplay,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<ProjectId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product: Option<ProductId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invoice_date: Option<NaiveDate>,
    /// Accounting date, used when the invoice date is missing
    pub date: NaiveDate,
    /// Tax-included line total
    pub price_total: Money,
}

impl VendorInvoiceLine {
    pub fn booking_date(&self) -> NaiveDate {
        self.invoice_date.unwrap_or(self.date)
    }

    /// Cost carried by the line: refunds reduce the axis cost.
    pub fn signed_cost(&self) -> Money {
        match self.kind {
            InvoiceKind::VendorRefund => -self.price_total.abs(),
            _ => self.price_total.abs(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentState {
    #[default]
    NotPaid,
    Partial,
    InPayment,
    Paid,
    Reversed,
}

/// A customer invoice of a project. Feeds project metrics only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalesInvoice {
    pub id: u64,
    pub project: ProjectId,
    #[serde(default = "default_sales_kind")]
    pub kind: InvoiceKind,
    #[serde(default)]
    pub state: PostingState,
    pub date: NaiveDate,
    pub amount_untaxed: Money,
    pub amount_total: Money,
    #[serde(default)]
    pub amount_residual: Money,
    #[serde(default)]
    pub payment_state: PaymentState,
}

fn default_sales_kind() -> InvoiceKind {
    InvoiceKind::CustomerInvoice
}

impl SalesInvoice {
    pub fn counts(&self) -> bool {
        self.state == PostingState::Posted && self.kind == InvoiceKind::CustomerInvoice
    }

    /// Amount collected, when fully paid.
    pub fn paid_amount(&self) -> Money {
        match self.payment_state {
            PaymentState::Paid => self.amount_total,
            _ => Decimal::ZERO,
        }
    }

    /// Amount still due on unpaid and partially paid invoices.
    pub fn unpaid_amount(&self) -> Money {
        match self.payment_state {
            PaymentState::NotPaid | PaymentState::Partial => self.amount_residual,
            _ => Decimal::ZERO,
        }
    }
}
