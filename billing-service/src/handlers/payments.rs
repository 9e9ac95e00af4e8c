//! Payment handlers: recording and lookup.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use service_core::error::AppError;
use uuid::Uuid;
use validator::Validate;

use crate::{
    dtos::{
        CreatePaymentRequest, InvoiceResponse, ListPaymentsQuery, PaymentResponse,
        RecordPaymentRequest, RecordPaymentResponse,
    },
    middleware::TenantContext,
    models::{CreatePayment, ListPaymentsFilter, PaymentMethod},
    services::billing,
    AppState,
};

/// Record a payment against an invoice.
///
/// Runs the full reconciliation: the payment is persisted and the invoice's
/// paid/due amounts and status are recomputed in one transaction.
pub async fn record_invoice_payment(
    State(state): State<AppState>,
    tenant: TenantContext,
    Path(invoice_id): Path<Uuid>,
    Json(payload): Json<RecordPaymentRequest>,
) -> Result<(StatusCode, Json<RecordPaymentResponse>), AppError> {
    payload.validate()?;

    let input = CreatePayment {
        tenant_id: tenant.tenant_id,
        invoice_id: Some(invoice_id),
        amount: payload.amount,
        method: PaymentMethod::from_string(&payload.method),
        paid_at: payload.paid_at.unwrap_or_else(|| Utc::now().date_naive()),
        paid_by: billing::normalize_actor(payload.paid_by.as_deref()),
        received_by: billing::normalize_actor(payload.received_by.as_deref()),
        description: payload.description,
    };

    let (payment, invoice) = state.db.record_payment(&input).await?;

    Ok((
        StatusCode::CREATED,
        Json(RecordPaymentResponse {
            payment: PaymentResponse::from(payment),
            invoice: Some(InvoiceResponse::from(invoice)),
        }),
    ))
}

/// Create a payment, linked or unlinked.
///
/// With an `invoice_id` this is the same reconciliation path as
/// `record_invoice_payment`; without one the payment is held unlinked on
/// the ledger (an advance payment).
pub async fn create_payment(
    State(state): State<AppState>,
    tenant: TenantContext,
    Json(payload): Json<CreatePaymentRequest>,
) -> Result<(StatusCode, Json<RecordPaymentResponse>), AppError> {
    payload.validate()?;

    let input = CreatePayment {
        tenant_id: tenant.tenant_id,
        invoice_id: payload.invoice_id,
        amount: payload.amount,
        method: PaymentMethod::from_string(&payload.method),
        paid_at: payload.paid_at.unwrap_or_else(|| Utc::now().date_naive()),
        paid_by: billing::normalize_actor(payload.paid_by.as_deref()),
        received_by: billing::normalize_actor(payload.received_by.as_deref()),
        description: payload.description,
    };

    let response = if input.invoice_id.is_some() {
        let (payment, invoice) = state.db.record_payment(&input).await?;
        RecordPaymentResponse {
            payment: PaymentResponse::from(payment),
            invoice: Some(InvoiceResponse::from(invoice)),
        }
    } else {
        let payment = state.db.create_unlinked_payment(&input).await?;
        RecordPaymentResponse {
            payment: PaymentResponse::from(payment),
            invoice: None,
        }
    };

    Ok((StatusCode::CREATED, Json(response)))
}

/// Get a payment by ID.
pub async fn get_payment(
    State(state): State<AppState>,
    tenant: TenantContext,
    Path(payment_id): Path<Uuid>,
) -> Result<Json<PaymentResponse>, AppError> {
    let payment = state
        .db
        .get_payment(tenant.tenant_id, payment_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Payment not found")))?;

    Ok(Json(PaymentResponse::from(payment)))
}

/// List payments for the tenant.
pub async fn list_payments(
    State(state): State<AppState>,
    tenant: TenantContext,
    Query(query): Query<ListPaymentsQuery>,
) -> Result<Json<Vec<PaymentResponse>>, AppError> {
    let filter = ListPaymentsFilter {
        invoice_id: query.invoice_id,
        method: query.method.as_deref().map(PaymentMethod::from_string),
        start_date: query.start_date,
        end_date: query.end_date,
        page_size: query.page_size.unwrap_or(50),
        page_token: query.page_token,
    };

    let payments = state.db.list_payments(tenant.tenant_id, &filter).await?;

    Ok(Json(
        payments.into_iter().map(PaymentResponse::from).collect(),
    ))
}
