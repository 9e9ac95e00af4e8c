//! Reconciliation rule tests: status transitions, paid/pending derivation
//! and the overpayment guard.

use billing_service::models::{Invoice, InvoiceStatus};
use billing_service::services::billing::{
    check_overpayment, derive_status, pending_amount, validate_payment_amount, BillingError,
};
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use std::str::FromStr;
use uuid::Uuid;

fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn invoice_with(amount: &str, paid: &str, due_date: NaiveDate) -> Invoice {
    let amount = dec(amount);
    let paid = dec(paid);
    Invoice {
        invoice_id: Uuid::new_v4(),
        tenant_id: Uuid::new_v4(),
        invoice_number: "INV-2026-0001".to_string(),
        renter_id: None,
        unit_id: None,
        status: derive_status(amount, paid).as_str().to_string(),
        amount,
        amount_paid: paid,
        amount_due: pending_amount(amount, paid),
        issue_date: due_date,
        due_date,
        notes: None,
        created_utc: Utc::now(),
    }
}

#[test]
fn partial_payment_leaves_invoice_partial() {
    // Invoice of 1000, one payment of 400.
    let amount = dec("1000");
    let paid = dec("400");

    assert_eq!(derive_status(amount, paid), InvoiceStatus::Partial);
    assert_eq!(pending_amount(amount, paid), dec("600"));
}

#[test]
fn completing_payment_marks_invoice_paid() {
    // Continuing: 400 already paid, 600 more arrives.
    let amount = dec("1000");
    let paid = dec("400") + dec("600");

    assert_eq!(derive_status(amount, paid), InvoiceStatus::Paid);
    assert_eq!(pending_amount(amount, paid), Decimal::ZERO);
}

#[test]
fn full_single_payment_skips_partial() {
    let amount = dec("500");

    assert_eq!(derive_status(amount, Decimal::ZERO), InvoiceStatus::Pending);
    assert_eq!(derive_status(amount, dec("500")), InvoiceStatus::Paid);
}

#[test]
fn status_reflects_sum_over_any_payment_sequence() {
    // paid + pending always reconciles to the invoice amount, and status
    // flips to paid exactly when the running total covers the amount.
    let amount = dec("1000");
    let payments = ["100", "250.50", "399.50", "250"];

    let mut total = Decimal::ZERO;
    let mut previous_total = Decimal::ZERO;
    for p in payments {
        total += dec(p);

        // Monotone accumulation.
        assert!(total >= previous_total);
        previous_total = total;

        assert_eq!(total + pending_amount(amount, total), amount);
        let status = derive_status(amount, total);
        if total >= amount {
            assert_eq!(status, InvoiceStatus::Paid);
        } else {
            assert_eq!(status, InvoiceStatus::Partial);
        }
    }
    assert_eq!(derive_status(amount, total), InvoiceStatus::Paid);
}

#[test]
fn derivation_is_idempotent() {
    let amount = dec("800");
    let paid = dec("300");
    let first = (derive_status(amount, paid), pending_amount(amount, paid));
    for _ in 0..10 {
        assert_eq!(
            (derive_status(amount, paid), pending_amount(amount, paid)),
            first
        );
    }
}

#[test]
fn overpayment_is_rejected_before_recording() {
    let balance_due = pending_amount(dec("1000"), dec("700"));
    assert!(matches!(
        check_overpayment(dec("400"), balance_due),
        Err(BillingError::OverpaymentRejected { .. })
    ));
    // Paying exactly the balance is allowed.
    assert!(check_overpayment(dec("300"), balance_due).is_ok());
}

#[test]
fn zero_and_negative_payments_are_validation_errors() {
    for bad in ["0", "-1", "-0.01"] {
        assert!(matches!(
            validate_payment_amount(Decimal::from_str(bad).unwrap()),
            Err(BillingError::Validation(_))
        ));
    }
}

#[test]
fn unpaid_invoice_past_due_date_reads_as_overdue() {
    let due = NaiveDate::from_ymd_opt(2026, 1, 31).unwrap();
    let invoice = invoice_with("1000", "400", due);

    assert!(invoice.is_overdue(NaiveDate::from_ymd_opt(2026, 2, 1).unwrap()));
    // Not overdue on the due date itself.
    assert!(!invoice.is_overdue(due));
    assert!(!invoice.is_overdue(NaiveDate::from_ymd_opt(2026, 1, 15).unwrap()));
}

#[test]
fn paid_invoice_never_reads_as_overdue() {
    let due = NaiveDate::from_ymd_opt(2026, 1, 31).unwrap();
    let invoice = invoice_with("1000", "1000", due);

    assert_eq!(invoice.status(), InvoiceStatus::Paid);
    assert!(!invoice.is_overdue(NaiveDate::from_ymd_opt(2027, 1, 1).unwrap()));
}

#[test]
fn overdue_derivation_is_read_only() {
    // Deriving overdue must not touch the durable status.
    let due = NaiveDate::from_ymd_opt(2026, 1, 31).unwrap();
    let invoice = invoice_with("1000", "0", due);

    let _ = invoice.is_overdue(NaiveDate::from_ymd_opt(2026, 3, 1).unwrap());
    assert_eq!(invoice.status(), InvoiceStatus::Pending);
    assert_eq!(invoice.status, "pending");
}
