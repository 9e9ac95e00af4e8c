//! Persisted invoice line item model for billing-service.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Line item on an invoice. Write-once at generation time; the metering
/// fields are retained so a utility charge stays auditable.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct LineItem {
    pub line_item_id: Uuid,
    pub invoice_id: Uuid,
    pub tenant_id: Uuid,
    pub kind: String,
    pub description: Option<String>,
    pub amount: Decimal,
    pub rate: Option<Decimal>,
    pub units: Option<Decimal>,
    pub start_reading: Option<Decimal>,
    pub end_reading: Option<Decimal>,
    pub sort_order: i32,
    pub created_utc: DateTime<Utc>,
}

/// A priced line item ready for persistence. Produced by
/// `services::billing::price_bill_items`.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateLineItem {
    pub kind: String,
    pub description: Option<String>,
    pub amount: Decimal,
    pub rate: Option<Decimal>,
    pub units: Option<Decimal>,
    pub start_reading: Option<Decimal>,
    pub end_reading: Option<Decimal>,
    pub sort_order: i32,
}
