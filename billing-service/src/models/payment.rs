//! Payment model for billing-service.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Payment method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    Check,
    BankTransfer,
    Card,
    Online,
    Other,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::Check => "check",
            PaymentMethod::BankTransfer => "bank_transfer",
            PaymentMethod::Card => "card",
            PaymentMethod::Online => "online",
            PaymentMethod::Other => "other",
        }
    }

    pub fn from_string(s: &str) -> Self {
        match s {
            "cash" => PaymentMethod::Cash,
            "check" => PaymentMethod::Check,
            "bank_transfer" => PaymentMethod::BankTransfer,
            "card" => PaymentMethod::Card,
            "online" => PaymentMethod::Online,
            _ => PaymentMethod::Other,
        }
    }
}

/// Payment record. Append-only: immutable after creation, so reconciliation
/// can always be recomputed from the full set.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Payment {
    pub payment_id: Uuid,
    pub tenant_id: Uuid,
    pub invoice_id: Option<Uuid>,
    pub amount: Decimal,
    pub method: String,
    pub paid_at: NaiveDate,
    pub paid_by: String,
    pub received_by: String,
    pub description: Option<String>,
    pub created_utc: DateTime<Utc>,
}

/// Filter parameters for listing payments.
#[derive(Debug, Clone, Default)]
pub struct ListPaymentsFilter {
    pub invoice_id: Option<Uuid>,
    pub method: Option<PaymentMethod>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub page_size: i32,
    pub page_token: Option<Uuid>,
}

/// Input for recording a payment. `paid_by`/`received_by` are already
/// normalized (trimmed, `"Unknown"` fallback) by the billing engine.
#[derive(Debug, Clone)]
pub struct CreatePayment {
    pub tenant_id: Uuid,
    pub invoice_id: Option<Uuid>,
    pub amount: Decimal,
    pub method: PaymentMethod,
    pub paid_at: NaiveDate,
    pub paid_by: String,
    pub received_by: String,
    pub description: Option<String>,
}
