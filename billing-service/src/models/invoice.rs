//! Invoice model for billing-service.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::CreateLineItem;

/// Durable invoice status.
///
/// Overdue is deliberately not part of this set: it is a function of the
/// clock, not of the payment ledger, and is derived at read time via
/// [`Invoice::is_overdue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    Pending,
    Partial,
    Paid,
}

impl InvoiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Pending => "pending",
            InvoiceStatus::Partial => "partial",
            InvoiceStatus::Paid => "paid",
        }
    }

    pub fn from_string(s: &str) -> Self {
        match s {
            "partial" => InvoiceStatus::Partial,
            "paid" => InvoiceStatus::Paid,
            _ => InvoiceStatus::Pending,
        }
    }
}

/// Invoice record.
///
/// `amount_paid` and `amount_due` are maintained by the reconciliation path
/// in the same transaction as every payment insert, always recomputed from
/// `SUM(payments.amount)` rather than adjusted incrementally.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Invoice {
    pub invoice_id: Uuid,
    pub tenant_id: Uuid,
    pub invoice_number: String,
    pub renter_id: Option<Uuid>,
    pub unit_id: Option<Uuid>,
    pub status: String,
    pub amount: Decimal,
    pub amount_paid: Decimal,
    pub amount_due: Decimal,
    pub issue_date: NaiveDate,
    pub due_date: NaiveDate,
    pub notes: Option<String>,
    pub created_utc: DateTime<Utc>,
}

impl Invoice {
    pub fn status(&self) -> InvoiceStatus {
        InvoiceStatus::from_string(&self.status)
    }

    /// Read-time overdue derivation: a not-fully-paid invoice whose due date
    /// has passed. Idempotent, never stored.
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        self.status() != InvoiceStatus::Paid && today > self.due_date
    }
}

/// Filter parameters for listing invoices.
#[derive(Debug, Clone, Default)]
pub struct ListInvoicesFilter {
    pub status: Option<InvoiceStatus>,
    pub renter_id: Option<Uuid>,
    pub unit_id: Option<Uuid>,
    pub overdue_only: bool,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub page_size: i32,
    pub page_token: Option<Uuid>,
}

/// Input for creating an invoice. Produced by the billing engine after line
/// items have been priced; `amount` is already the rounded sum of `items`.
#[derive(Debug, Clone)]
pub struct CreateInvoice {
    pub tenant_id: Uuid,
    pub renter_id: Option<Uuid>,
    pub unit_id: Option<Uuid>,
    pub amount: Decimal,
    pub issue_date: NaiveDate,
    pub due_date: NaiveDate,
    pub notes: Option<String>,
    pub items: Vec<CreateLineItem>,
}

/// Input for editing an invoice. Only permitted while no payment references
/// the invoice.
#[derive(Debug, Clone, Default)]
pub struct UpdateInvoice {
    pub amount: Option<Decimal>,
    pub due_date: Option<NaiveDate>,
    pub notes: Option<String>,
}
