//! Database service for billing-service.
//!
//! The reconciliation path (`record_payment`) is the only writer of invoice
//! status, and always runs inside a transaction that locks the invoice row,
//! so two concurrent payments against the same invoice serialize and the
//! final status reflects the sum of both.

use crate::models::{
    CreateInvoice, CreatePayment, Invoice, LineItem, ListInvoicesFilter, ListPaymentsFilter,
    Payment, UpdateInvoice,
};
use crate::services::billing::{self, BillingError};
use crate::services::metrics::{
    DB_QUERY_DURATION, INVOICES_TOTAL, INVOICE_AMOUNT_TOTAL, PAYMENTS_TOTAL, PAYMENT_AMOUNT_TOTAL,
};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use service_core::error::AppError;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use tracing::{info, instrument};
use uuid::Uuid;

const INVOICE_COLUMNS: &str = "invoice_id, tenant_id, invoice_number, renter_id, unit_id, \
    status, amount, amount_paid, amount_due, issue_date, due_date, notes, created_utc";

const PAYMENT_COLUMNS: &str = "payment_id, tenant_id, invoice_id, amount, method, paid_at, \
    paid_by, received_by, description, created_utc";

/// Database connection pool wrapper.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Create a new database connection pool.
    #[instrument(skip(database_url), fields(service = "billing-service"))]
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self, AppError> {
        info!(
            max_connections = max_connections,
            min_connections = min_connections,
            "Connecting to PostgreSQL"
        );

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(600))
            .connect(database_url)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to connect: {}", e)))?;

        info!("PostgreSQL connection pool established");

        Ok(Self { pool })
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Check database health.
    #[instrument(skip(self))]
    pub async fn health_check(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Health check failed: {}", e)))?;
        Ok(())
    }

    /// Run database migrations.
    #[instrument(skip(self))]
    pub async fn run_migrations(&self) -> Result<(), AppError> {
        info!("Running database migrations");
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Migration failed: {}", e)))?;
        info!("Database migrations completed");
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Invoice Operations
    // -------------------------------------------------------------------------

    /// Create an invoice with its line items.
    ///
    /// The invoice number is allocated by the `next_invoice_number` function
    /// from a per-tenant, per-year counter inside the same transaction, so a
    /// rollback never burns a number into a gap visible as a collision.
    #[instrument(skip(self, input), fields(tenant_id = %input.tenant_id))]
    pub async fn create_invoice(&self, input: &CreateInvoice) -> Result<Invoice, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["create_invoice"])
            .start_timer();

        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to begin transaction: {}", e))
        })?;

        let invoice_id = Uuid::new_v4();
        let invoice = sqlx::query_as::<_, Invoice>(&format!(
            r#"
            INSERT INTO invoices (
                invoice_id, tenant_id, invoice_number, renter_id, unit_id,
                status, amount, amount_paid, amount_due, issue_date, due_date, notes
            )
            VALUES ($1, $2, next_invoice_number($2), $3, $4, 'pending', $5, 0, $5, $6, $7, $8)
            RETURNING {INVOICE_COLUMNS}
            "#,
        ))
        .bind(invoice_id)
        .bind(input.tenant_id)
        .bind(input.renter_id)
        .bind(input.unit_id)
        .bind(input.amount)
        .bind(input.issue_date)
        .bind(input.due_date)
        .bind(&input.notes)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to create invoice: {}", e)))?;

        for item in &input.items {
            sqlx::query(
                r#"
                INSERT INTO invoice_line_items (
                    line_item_id, invoice_id, tenant_id, kind, description, amount,
                    rate, units, start_reading, end_reading, sort_order
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(invoice_id)
            .bind(input.tenant_id)
            .bind(&item.kind)
            .bind(&item.description)
            .bind(item.amount)
            .bind(item.rate)
            .bind(item.units)
            .bind(item.start_reading)
            .bind(item.end_reading)
            .bind(item.sort_order)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                AppError::DatabaseError(anyhow::anyhow!("Failed to create line item: {}", e))
            })?;
        }

        tx.commit().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to commit invoice: {}", e))
        })?;

        timer.observe_duration();

        INVOICES_TOTAL.with_label_values(&["pending"]).inc();
        INVOICE_AMOUNT_TOTAL.inc_by(invoice.amount.to_f64().unwrap_or(0.0));

        info!(
            invoice_id = %invoice.invoice_id,
            invoice_number = %invoice.invoice_number,
            amount = %invoice.amount,
            "Invoice created"
        );

        Ok(invoice)
    }

    /// Get an invoice by ID.
    #[instrument(skip(self), fields(tenant_id = %tenant_id, invoice_id = %invoice_id))]
    pub async fn get_invoice(
        &self,
        tenant_id: Uuid,
        invoice_id: Uuid,
    ) -> Result<Option<Invoice>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_invoice"])
            .start_timer();

        let invoice = sqlx::query_as::<_, Invoice>(&format!(
            r#"
            SELECT {INVOICE_COLUMNS}
            FROM invoices
            WHERE tenant_id = $1 AND invoice_id = $2
            "#,
        ))
        .bind(tenant_id)
        .bind(invoice_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get invoice: {}", e)))?;

        timer.observe_duration();

        Ok(invoice)
    }

    /// List invoices for a tenant.
    #[instrument(skip(self, filter), fields(tenant_id = %tenant_id))]
    pub async fn list_invoices(
        &self,
        tenant_id: Uuid,
        filter: &ListInvoicesFilter,
    ) -> Result<Vec<Invoice>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_invoices"])
            .start_timer();

        let limit = filter.page_size.clamp(1, 100) as i64;
        let status_str = filter.status.map(|s| s.as_str().to_string());

        let invoices = if let Some(cursor) = filter.page_token {
            sqlx::query_as::<_, Invoice>(&format!(
                r#"
                SELECT {INVOICE_COLUMNS}
                FROM invoices
                WHERE tenant_id = $1
                  AND ($2::varchar IS NULL OR status = $2)
                  AND ($3::uuid IS NULL OR renter_id = $3)
                  AND ($4::uuid IS NULL OR unit_id = $4)
                  AND ($5::bool = FALSE OR (status <> 'paid' AND due_date < CURRENT_DATE))
                  AND ($6::date IS NULL OR issue_date >= $6)
                  AND ($7::date IS NULL OR issue_date <= $7)
                  AND invoice_id > $8
                ORDER BY invoice_id
                LIMIT $9
                "#,
            ))
            .bind(tenant_id)
            .bind(&status_str)
            .bind(filter.renter_id)
            .bind(filter.unit_id)
            .bind(filter.overdue_only)
            .bind(filter.start_date)
            .bind(filter.end_date)
            .bind(cursor)
            .bind(limit)
            .fetch_all(&self.pool)
            .await
        } else {
            sqlx::query_as::<_, Invoice>(&format!(
                r#"
                SELECT {INVOICE_COLUMNS}
                FROM invoices
                WHERE tenant_id = $1
                  AND ($2::varchar IS NULL OR status = $2)
                  AND ($3::uuid IS NULL OR renter_id = $3)
                  AND ($4::uuid IS NULL OR unit_id = $4)
                  AND ($5::bool = FALSE OR (status <> 'paid' AND due_date < CURRENT_DATE))
                  AND ($6::date IS NULL OR issue_date >= $6)
                  AND ($7::date IS NULL OR issue_date <= $7)
                ORDER BY invoice_id
                LIMIT $8
                "#,
            ))
            .bind(tenant_id)
            .bind(&status_str)
            .bind(filter.renter_id)
            .bind(filter.unit_id)
            .bind(filter.overdue_only)
            .bind(filter.start_date)
            .bind(filter.end_date)
            .bind(limit)
            .fetch_all(&self.pool)
            .await
        }
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to list invoices: {}", e)))?;

        timer.observe_duration();

        Ok(invoices)
    }

    /// Get line items for an invoice.
    #[instrument(skip(self), fields(tenant_id = %tenant_id, invoice_id = %invoice_id))]
    pub async fn get_line_items(
        &self,
        tenant_id: Uuid,
        invoice_id: Uuid,
    ) -> Result<Vec<LineItem>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_line_items"])
            .start_timer();

        let line_items = sqlx::query_as::<_, LineItem>(
            r#"
            SELECT line_item_id, invoice_id, tenant_id, kind, description, amount,
                rate, units, start_reading, end_reading, sort_order, created_utc
            FROM invoice_line_items
            WHERE tenant_id = $1 AND invoice_id = $2
            ORDER BY sort_order, created_utc
            "#,
        )
        .bind(tenant_id)
        .bind(invoice_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get line items: {}", e)))?;

        timer.observe_duration();

        Ok(line_items)
    }

    /// Edit an invoice's amount, due date or notes.
    ///
    /// Permitted only while no payment references the invoice: the amount of
    /// a partially paid invoice has no defined reconciliation semantics.
    #[instrument(skip(self, input), fields(tenant_id = %tenant_id, invoice_id = %invoice_id))]
    pub async fn update_invoice(
        &self,
        tenant_id: Uuid,
        invoice_id: Uuid,
        input: &UpdateInvoice,
    ) -> Result<Option<Invoice>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["update_invoice"])
            .start_timer();

        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to begin transaction: {}", e))
        })?;

        let existing = sqlx::query_as::<_, Invoice>(&format!(
            r#"
            SELECT {INVOICE_COLUMNS}
            FROM invoices
            WHERE tenant_id = $1 AND invoice_id = $2
            FOR UPDATE
            "#,
        ))
        .bind(tenant_id)
        .bind(invoice_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to lock invoice: {}", e)))?;

        let existing = match existing {
            Some(inv) => inv,
            None => return Ok(None),
        };

        let payment_count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM payments WHERE tenant_id = $1 AND invoice_id = $2",
        )
        .bind(tenant_id)
        .bind(invoice_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to count payments: {}", e)))?;

        if payment_count > 0 {
            return Err(BillingError::Conflict(
                "invoice cannot be edited after a payment has been recorded".to_string(),
            )
            .into());
        }

        if let Some(amount) = input.amount {
            if amount <= Decimal::ZERO {
                return Err(BillingError::Validation(
                    "invoice amount must be greater than zero".to_string(),
                )
                .into());
            }
        }
        if let Some(due_date) = input.due_date {
            if due_date < existing.issue_date {
                return Err(BillingError::Validation(
                    "due date must not precede the issue date".to_string(),
                )
                .into());
            }
        }

        let invoice = sqlx::query_as::<_, Invoice>(&format!(
            r#"
            UPDATE invoices
            SET amount = COALESCE($3, amount),
                amount_due = COALESCE($3, amount),
                due_date = COALESCE($4, due_date),
                notes = COALESCE($5, notes)
            WHERE tenant_id = $1 AND invoice_id = $2
            RETURNING {INVOICE_COLUMNS}
            "#,
        ))
        .bind(tenant_id)
        .bind(invoice_id)
        .bind(input.amount)
        .bind(input.due_date)
        .bind(&input.notes)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to update invoice: {}", e)))?;

        tx.commit().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to commit invoice update: {}", e))
        })?;

        timer.observe_duration();

        info!(invoice_id = %invoice.invoice_id, "Invoice updated");

        Ok(Some(invoice))
    }

    /// Delete an invoice. Rejected while payments reference it.
    #[instrument(skip(self), fields(tenant_id = %tenant_id, invoice_id = %invoice_id))]
    pub async fn delete_invoice(
        &self,
        tenant_id: Uuid,
        invoice_id: Uuid,
    ) -> Result<bool, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["delete_invoice"])
            .start_timer();

        let result = sqlx::query(
            r#"
            DELETE FROM invoices
            WHERE tenant_id = $1 AND invoice_id = $2
            "#,
        )
        .bind(tenant_id)
        .bind(invoice_id)
        .execute(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.is_foreign_key_violation() => {
                BillingError::Conflict(
                    "invoice has recorded payments and cannot be deleted".to_string(),
                )
                .into()
            }
            _ => AppError::DatabaseError(anyhow::anyhow!("Failed to delete invoice: {}", e)),
        })?;

        timer.observe_duration();

        let deleted = result.rows_affected() > 0;
        if deleted {
            info!(invoice_id = %invoice_id, "Invoice deleted");
        }

        Ok(deleted)
    }

    // -------------------------------------------------------------------------
    // Payment Operations
    // -------------------------------------------------------------------------

    /// Record a payment against an invoice and reconcile its status.
    ///
    /// The invoice row is locked with `SELECT ... FOR UPDATE` for the whole
    /// transaction, and `total_paid` is recomputed from `SUM(payments)`
    /// after the insert rather than adjusted incrementally, so the written
    /// status can never diverge from the payment ledger.
    #[instrument(skip(self, input), fields(tenant_id = %input.tenant_id))]
    pub async fn record_payment(
        &self,
        input: &CreatePayment,
    ) -> Result<(Payment, Invoice), AppError> {
        let invoice_id = input.invoice_id.ok_or_else(|| {
            AppError::BadRequest(anyhow::anyhow!("record_payment requires an invoice_id"))
        })?;

        billing::validate_payment_amount(input.amount)?;

        let timer = DB_QUERY_DURATION
            .with_label_values(&["record_payment"])
            .start_timer();

        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to begin transaction: {}", e))
        })?;

        let invoice = sqlx::query_as::<_, Invoice>(&format!(
            r#"
            SELECT {INVOICE_COLUMNS}
            FROM invoices
            WHERE tenant_id = $1 AND invoice_id = $2
            FOR UPDATE
            "#,
        ))
        .bind(input.tenant_id)
        .bind(invoice_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to lock invoice: {}", e)))?
        .ok_or_else(|| BillingError::NotFound(format!("invoice {invoice_id}")))?;

        let total_before: Decimal = sqlx::query_scalar(
            "SELECT COALESCE(SUM(amount), 0) FROM payments WHERE tenant_id = $1 AND invoice_id = $2",
        )
        .bind(input.tenant_id)
        .bind(invoice_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to sum payments: {}", e)))?;

        billing::check_overpayment(
            input.amount,
            billing::pending_amount(invoice.amount, total_before),
        )?;

        let payment_id = Uuid::new_v4();
        let payment = sqlx::query_as::<_, Payment>(&format!(
            r#"
            INSERT INTO payments (
                payment_id, tenant_id, invoice_id, amount, method, paid_at,
                paid_by, received_by, description
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {PAYMENT_COLUMNS}
            "#,
        ))
        .bind(payment_id)
        .bind(input.tenant_id)
        .bind(invoice_id)
        .bind(input.amount)
        .bind(input.method.as_str())
        .bind(input.paid_at)
        .bind(&input.paid_by)
        .bind(&input.received_by)
        .bind(&input.description)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to record payment: {}", e)))?;

        let total_paid: Decimal = sqlx::query_scalar(
            "SELECT COALESCE(SUM(amount), 0) FROM payments WHERE tenant_id = $1 AND invoice_id = $2",
        )
        .bind(input.tenant_id)
        .bind(invoice_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to sum payments: {}", e)))?;

        let status = billing::derive_status(invoice.amount, total_paid);
        let amount_due = billing::pending_amount(invoice.amount, total_paid);

        let invoice = sqlx::query_as::<_, Invoice>(&format!(
            r#"
            UPDATE invoices
            SET status = $3,
                amount_paid = $4,
                amount_due = $5
            WHERE tenant_id = $1 AND invoice_id = $2
            RETURNING {INVOICE_COLUMNS}
            "#,
        ))
        .bind(input.tenant_id)
        .bind(invoice_id)
        .bind(status.as_str())
        .bind(total_paid)
        .bind(amount_due)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to update invoice status: {}", e))
        })?;

        tx.commit().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to commit payment: {}", e))
        })?;

        timer.observe_duration();

        PAYMENTS_TOTAL
            .with_label_values(&[input.method.as_str()])
            .inc();
        PAYMENT_AMOUNT_TOTAL.inc_by(payment.amount.to_f64().unwrap_or(0.0));
        INVOICES_TOTAL.with_label_values(&[status.as_str()]).inc();

        info!(
            payment_id = %payment.payment_id,
            invoice_id = %invoice.invoice_id,
            amount = %payment.amount,
            status = %invoice.status,
            "Payment recorded"
        );

        Ok((payment, invoice))
    }

    /// Record a payment with no invoice linkage (e.g. an advance payment).
    /// No reconciliation happens until such a payment is linked at creation
    /// of some future invoice flow; it is simply held on the ledger.
    #[instrument(skip(self, input), fields(tenant_id = %input.tenant_id))]
    pub async fn create_unlinked_payment(
        &self,
        input: &CreatePayment,
    ) -> Result<Payment, AppError> {
        billing::validate_payment_amount(input.amount)?;

        let timer = DB_QUERY_DURATION
            .with_label_values(&["create_unlinked_payment"])
            .start_timer();

        let payment_id = Uuid::new_v4();
        let payment = sqlx::query_as::<_, Payment>(&format!(
            r#"
            INSERT INTO payments (
                payment_id, tenant_id, invoice_id, amount, method, paid_at,
                paid_by, received_by, description
            )
            VALUES ($1, $2, NULL, $3, $4, $5, $6, $7, $8)
            RETURNING {PAYMENT_COLUMNS}
            "#,
        ))
        .bind(payment_id)
        .bind(input.tenant_id)
        .bind(input.amount)
        .bind(input.method.as_str())
        .bind(input.paid_at)
        .bind(&input.paid_by)
        .bind(&input.received_by)
        .bind(&input.description)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to create payment: {}", e)))?;

        timer.observe_duration();

        PAYMENTS_TOTAL
            .with_label_values(&[input.method.as_str()])
            .inc();
        PAYMENT_AMOUNT_TOTAL.inc_by(payment.amount.to_f64().unwrap_or(0.0));

        info!(payment_id = %payment.payment_id, amount = %payment.amount, "Unlinked payment recorded");

        Ok(payment)
    }

    /// Get a payment by ID.
    #[instrument(skip(self), fields(tenant_id = %tenant_id, payment_id = %payment_id))]
    pub async fn get_payment(
        &self,
        tenant_id: Uuid,
        payment_id: Uuid,
    ) -> Result<Option<Payment>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_payment"])
            .start_timer();

        let payment = sqlx::query_as::<_, Payment>(&format!(
            r#"
            SELECT {PAYMENT_COLUMNS}
            FROM payments
            WHERE tenant_id = $1 AND payment_id = $2
            "#,
        ))
        .bind(tenant_id)
        .bind(payment_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get payment: {}", e)))?;

        timer.observe_duration();

        Ok(payment)
    }

    /// List payments for a tenant.
    #[instrument(skip(self, filter), fields(tenant_id = %tenant_id))]
    pub async fn list_payments(
        &self,
        tenant_id: Uuid,
        filter: &ListPaymentsFilter,
    ) -> Result<Vec<Payment>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_payments"])
            .start_timer();

        let limit = filter.page_size.clamp(1, 100) as i64;
        let method_str = filter.method.map(|m| m.as_str().to_string());

        let payments = if let Some(cursor) = filter.page_token {
            sqlx::query_as::<_, Payment>(&format!(
                r#"
                SELECT {PAYMENT_COLUMNS}
                FROM payments
                WHERE tenant_id = $1
                  AND ($2::uuid IS NULL OR invoice_id = $2)
                  AND ($3::varchar IS NULL OR method = $3)
                  AND ($4::date IS NULL OR paid_at >= $4)
                  AND ($5::date IS NULL OR paid_at <= $5)
                  AND payment_id > $6
                ORDER BY payment_id
                LIMIT $7
                "#,
            ))
            .bind(tenant_id)
            .bind(filter.invoice_id)
            .bind(&method_str)
            .bind(filter.start_date)
            .bind(filter.end_date)
            .bind(cursor)
            .bind(limit)
            .fetch_all(&self.pool)
            .await
        } else {
            sqlx::query_as::<_, Payment>(&format!(
                r#"
                SELECT {PAYMENT_COLUMNS}
                FROM payments
                WHERE tenant_id = $1
                  AND ($2::uuid IS NULL OR invoice_id = $2)
                  AND ($3::varchar IS NULL OR method = $3)
                  AND ($4::date IS NULL OR paid_at >= $4)
                  AND ($5::date IS NULL OR paid_at <= $5)
                ORDER BY payment_id
                LIMIT $6
                "#,
            ))
            .bind(tenant_id)
            .bind(filter.invoice_id)
            .bind(&method_str)
            .bind(filter.start_date)
            .bind(filter.end_date)
            .bind(limit)
            .fetch_all(&self.pool)
            .await
        }
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to list payments: {}", e)))?;

        timer.observe_duration();

        Ok(payments)
    }

    /// Sum of all payments linked to an invoice.
    #[instrument(skip(self), fields(tenant_id = %tenant_id, invoice_id = %invoice_id))]
    pub async fn sum_payments_by_invoice(
        &self,
        tenant_id: Uuid,
        invoice_id: Uuid,
    ) -> Result<Decimal, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["sum_payments_by_invoice"])
            .start_timer();

        let total: Decimal = sqlx::query_scalar(
            "SELECT COALESCE(SUM(amount), 0) FROM payments WHERE tenant_id = $1 AND invoice_id = $2",
        )
        .bind(tenant_id)
        .bind(invoice_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to sum payments: {}", e)))?;

        timer.observe_duration();

        Ok(total)
    }
}
