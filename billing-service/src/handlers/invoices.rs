//! Invoice handlers: generation, lookup, listing, edit and delete.
//!
//! All operations are scoped to the tenant from the request context.

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
        GenerateInvoiceRequest, InvoiceResponse, ListInvoicesQuery, PaymentResponse,
        UpdateInvoiceRequest,
    },
    middleware::TenantContext,
    models::{
        BillItem, CreateInvoice, InvoiceStatus, ListInvoicesFilter, ListPaymentsFilter,
        UpdateInvoice,
    },
    services::billing::{self, BillingError},
    AppState,
};

/// Generate an invoice from a set of bill items.
///
/// Line items are priced by the billing engine (metered items recomputed
/// from readings) and the invoice plus its items persist atomically.
pub async fn generate_invoice(
    State(state): State<AppState>,
    tenant: TenantContext,
    Json(payload): Json<GenerateInvoiceRequest>,
) -> Result<(StatusCode, Json<InvoiceResponse>), AppError> {
    payload.validate()?;

    let issue_date = Utc::now().date_naive();
    if payload.due_date < issue_date {
        return Err(BillingError::Validation(
            "due date must not precede the issue date".to_string(),
        )
        .into());
    }

    let items: Vec<BillItem> = payload.items.into_iter().map(BillItem::from).collect();
    let (priced, amount) = billing::price_bill_items(&items)?;

    tracing::info!(
        tenant_id = %tenant.tenant_id,
        renter_id = ?payload.renter_id,
        amount = %amount,
        item_count = priced.len(),
        "Generating invoice"
    );

    let invoice = state
        .db
        .create_invoice(&CreateInvoice {
            tenant_id: tenant.tenant_id,
            renter_id: payload.renter_id,
            unit_id: payload.unit_id,
            amount,
            issue_date,
            due_date: payload.due_date,
            notes: payload.notes,
            items: priced,
        })
        .await?;

    let line_items = state
        .db
        .get_line_items(tenant.tenant_id, invoice.invoice_id)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(InvoiceResponse::from(invoice).with_line_items(line_items)),
    ))
}

/// Get an invoice with its line items.
pub async fn get_invoice(
    State(state): State<AppState>,
    tenant: TenantContext,
    Path(invoice_id): Path<Uuid>,
) -> Result<Json<InvoiceResponse>, AppError> {
    let invoice = state
        .db
        .get_invoice(tenant.tenant_id, invoice_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Invoice not found")))?;

    let line_items = state
        .db
        .get_line_items(tenant.tenant_id, invoice_id)
        .await?;

    Ok(Json(InvoiceResponse::from(invoice).with_line_items(line_items)))
}

/// List invoices for the tenant.
pub async fn list_invoices(
    State(state): State<AppState>,
    tenant: TenantContext,
    Query(query): Query<ListInvoicesQuery>,
) -> Result<Json<Vec<InvoiceResponse>>, AppError> {
    let filter = ListInvoicesFilter {
        status: query.status.as_deref().map(InvoiceStatus::from_string),
        renter_id: query.renter_id,
        unit_id: query.unit_id,
        overdue_only: query.overdue.unwrap_or(false),
        start_date: query.start_date,
        end_date: query.end_date,
        page_size: query.page_size.unwrap_or(50),
        page_token: query.page_token,
    };

    let invoices = state.db.list_invoices(tenant.tenant_id, &filter).await?;

    Ok(Json(
        invoices.into_iter().map(InvoiceResponse::from).collect(),
    ))
}

/// Edit an invoice's amount, due date or notes. Rejected once a payment
/// exists against it.
pub async fn update_invoice(
    State(state): State<AppState>,
    tenant: TenantContext,
    Path(invoice_id): Path<Uuid>,
    Json(payload): Json<UpdateInvoiceRequest>,
) -> Result<Json<InvoiceResponse>, AppError> {
    payload.validate()?;

    let invoice = state
        .db
        .update_invoice(
            tenant.tenant_id,
            invoice_id,
            &UpdateInvoice {
                amount: payload.amount,
                due_date: payload.due_date,
                notes: payload.notes,
            },
        )
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Invoice not found")))?;

    Ok(Json(InvoiceResponse::from(invoice)))
}

/// Delete an invoice. Rejected while payments reference it.
pub async fn delete_invoice(
    State(state): State<AppState>,
    tenant: TenantContext,
    Path(invoice_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let deleted = state.db.delete_invoice(tenant.tenant_id, invoice_id).await?;
    if !deleted {
        return Err(AppError::NotFound(anyhow::anyhow!("Invoice not found")));
    }
    Ok(StatusCode::NO_CONTENT)
}

/// List all payments recorded against an invoice.
pub async fn list_invoice_payments(
    State(state): State<AppState>,
    tenant: TenantContext,
    Path(invoice_id): Path<Uuid>,
) -> Result<Json<Vec<PaymentResponse>>, AppError> {
    state
        .db
        .get_invoice(tenant.tenant_id, invoice_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Invoice not found")))?;

    let payments = state
        .db
        .list_payments(
            tenant.tenant_id,
            &ListPaymentsFilter {
                invoice_id: Some(invoice_id),
                page_size: 100,
                ..Default::default()
            },
        )
        .await?;

    Ok(Json(
        payments.into_iter().map(PaymentResponse::from).collect(),
    ))
}
