//! Prometheus metrics for billing-service.

use once_cell::sync::Lazy;
use prometheus::{
    register_counter, register_counter_vec, register_histogram_vec, Counter, CounterVec,
    HistogramVec, TextEncoder,
};

/// Invoice counter by status at creation/transition.
pub static INVOICES_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "billing_invoices_total",
        "Total number of invoices by status",
        &["status"] // pending, partial, paid
    )
    .expect("Failed to register invoices_total")
});

/// Payment counter by method.
pub static PAYMENTS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "billing_payments_total",
        "Total number of payments by method",
        &["method"]
    )
    .expect("Failed to register payments_total")
});

/// Error counter for alerting.
pub static ERRORS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "billing_errors_total",
        "Total number of errors by type",
        &["error_type"]
    )
    .expect("Failed to register errors_total")
});

/// Database query duration histogram.
pub static DB_QUERY_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "billing_db_query_duration_seconds",
        "Database query duration in seconds",
        &["operation"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0]
    )
    .expect("Failed to register db_query_duration")
});

/// Total invoiced amount.
pub static INVOICE_AMOUNT_TOTAL: Lazy<Counter> = Lazy::new(|| {
    register_counter!(
        "billing_invoice_amount_total",
        "Total invoiced amount across all tenants"
    )
    .expect("Failed to register invoice_amount_total")
});

/// Total payment amount.
pub static PAYMENT_AMOUNT_TOTAL: Lazy<Counter> = Lazy::new(|| {
    register_counter!(
        "billing_payment_amount_total",
        "Total payment amount across all tenants"
    )
    .expect("Failed to register payment_amount_total")
});

/// Initialize all metrics (forces lazy initialization).
pub fn init_metrics() {
    Lazy::force(&INVOICES_TOTAL);
    Lazy::force(&PAYMENTS_TOTAL);
    Lazy::force(&ERRORS_TOTAL);
    Lazy::force(&DB_QUERY_DURATION);
    Lazy::force(&INVOICE_AMOUNT_TOTAL);
    Lazy::force(&PAYMENT_AMOUNT_TOTAL);
}

/// Get metrics in Prometheus text format.
pub fn get_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    encoder
        .encode_to_string(&metric_families)
        .unwrap_or_default()
}
