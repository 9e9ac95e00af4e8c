//! Request/response DTOs for the HTTP surface.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::{BillItem, BillItemKind, Invoice, LineItem, Payment};

/// A bill line item as submitted by the caller.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BillItemRequest {
    pub kind: String,
    pub description: Option<String>,
    pub amount: Option<Decimal>,
    pub rate: Option<Decimal>,
    pub start_reading: Option<Decimal>,
    pub end_reading: Option<Decimal>,
    pub units_divider_room: Option<Decimal>,
}

impl From<BillItemRequest> for BillItem {
    fn from(req: BillItemRequest) -> Self {
        BillItem {
            kind: BillItemKind::from_string(&req.kind),
            description: req.description,
            amount: req.amount,
            rate: req.rate,
            start_reading: req.start_reading,
            end_reading: req.end_reading,
            units_divider_room: req.units_divider_room,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct GenerateInvoiceRequest {
    pub renter_id: Option<Uuid>,
    pub unit_id: Option<Uuid>,
    pub due_date: NaiveDate,
    #[validate(length(min = 1, message = "at least one bill item is required"))]
    pub items: Vec<BillItemRequest>,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateInvoiceRequest {
    pub amount: Option<Decimal>,
    pub due_date: Option<NaiveDate>,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct RecordPaymentRequest {
    pub amount: Decimal,
    pub method: String,
    pub paid_at: Option<NaiveDate>,
    #[validate(length(max = 200))]
    pub paid_by: Option<String>,
    #[validate(length(max = 200))]
    pub received_by: Option<String>,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
}

/// Payment creation outside an invoice path: `invoice_id` is optional so an
/// advance payment can be held unlinked on the ledger.
#[derive(Debug, Deserialize, Validate)]
pub struct CreatePaymentRequest {
    pub invoice_id: Option<Uuid>,
    pub amount: Decimal,
    pub method: String,
    pub paid_at: Option<NaiveDate>,
    #[validate(length(max = 200))]
    pub paid_by: Option<String>,
    #[validate(length(max = 200))]
    pub received_by: Option<String>,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ListInvoicesQuery {
    pub status: Option<String>,
    pub renter_id: Option<Uuid>,
    pub unit_id: Option<Uuid>,
    pub overdue: Option<bool>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub page_size: Option<i32>,
    pub page_token: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct ListPaymentsQuery {
    pub invoice_id: Option<Uuid>,
    pub method: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub page_size: Option<i32>,
    pub page_token: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct InvoiceResponse {
    pub invoice_id: Uuid,
    pub invoice_number: String,
    pub renter_id: Option<Uuid>,
    pub unit_id: Option<Uuid>,
    pub status: String,
    /// Derived at read time, never stored.
    pub is_overdue: bool,
    pub amount: Decimal,
    pub amount_paid: Decimal,
    pub amount_due: Decimal,
    pub issue_date: NaiveDate,
    pub due_date: NaiveDate,
    pub notes: Option<String>,
    pub created_utc: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line_items: Option<Vec<LineItem>>,
}

impl From<Invoice> for InvoiceResponse {
    fn from(invoice: Invoice) -> Self {
        let is_overdue = invoice.is_overdue(Utc::now().date_naive());
        InvoiceResponse {
            invoice_id: invoice.invoice_id,
            invoice_number: invoice.invoice_number,
            renter_id: invoice.renter_id,
            unit_id: invoice.unit_id,
            status: invoice.status,
            is_overdue,
            amount: invoice.amount,
            amount_paid: invoice.amount_paid,
            amount_due: invoice.amount_due,
            issue_date: invoice.issue_date,
            due_date: invoice.due_date,
            notes: invoice.notes,
            created_utc: invoice.created_utc,
            line_items: None,
        }
    }
}

impl InvoiceResponse {
    pub fn with_line_items(mut self, line_items: Vec<LineItem>) -> Self {
        self.line_items = Some(line_items);
        self
    }
}

#[derive(Debug, Serialize)]
pub struct PaymentResponse {
    pub payment_id: Uuid,
    pub invoice_id: Option<Uuid>,
    pub amount: Decimal,
    pub method: String,
    pub paid_at: NaiveDate,
    pub paid_by: String,
    pub received_by: String,
    pub description: Option<String>,
    pub created_utc: DateTime<Utc>,
}

impl From<Payment> for PaymentResponse {
    fn from(payment: Payment) -> Self {
        PaymentResponse {
            payment_id: payment.payment_id,
            invoice_id: payment.invoice_id,
            amount: payment.amount,
            method: payment.method,
            paid_at: payment.paid_at,
            paid_by: payment.paid_by,
            received_by: payment.received_by,
            description: payment.description,
            created_utc: payment.created_utc,
        }
    }
}

/// Result of recording a payment: the created payment plus the reconciled
/// invoice (absent for unlinked payments).
#[derive(Debug, Serialize)]
pub struct RecordPaymentResponse {
    pub payment: PaymentResponse,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invoice: Option<InvoiceResponse>,
}
