//! Billing engine: line-item pricing and payment reconciliation rules.
//!
//! Everything in this module is pure. The database layer owns persistence
//! and atomicity; this module owns the arithmetic and the status rules, so
//! that paid/pending amounts and invoice status always derive from the same
//! code path regardless of where they are needed.

use rust_decimal::{Decimal, RoundingStrategy};
use thiserror::Error;

use crate::models::{BillItem, BillItemKind, CreateLineItem, InvoiceStatus};
use service_core::error::AppError;

/// Domain errors raised by the billing engine.
#[derive(Debug, Error)]
pub enum BillingError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("payment amount {amount} exceeds balance due {balance_due}")]
    OverpaymentRejected {
        amount: Decimal,
        balance_due: Decimal,
    },

    #[error("conflict: {0}")]
    Conflict(String),
}

impl From<BillingError> for AppError {
    fn from(err: BillingError) -> Self {
        let error_type = match err {
            BillingError::Validation(_) => "validation",
            BillingError::NotFound(_) => "not_found",
            BillingError::OverpaymentRejected { .. } => "overpayment",
            BillingError::Conflict(_) => "conflict",
        };
        crate::services::metrics::ERRORS_TOTAL
            .with_label_values(&[error_type])
            .inc();

        match err {
            BillingError::Validation(_) => AppError::Unprocessable(anyhow::anyhow!("{err}")),
            BillingError::NotFound(_) => AppError::NotFound(anyhow::anyhow!("{err}")),
            BillingError::OverpaymentRejected { .. } => {
                AppError::Conflict(anyhow::anyhow!("{err}"))
            }
            BillingError::Conflict(_) => AppError::Conflict(anyhow::anyhow!("{err}")),
        }
    }
}

/// Round a currency amount to 2 decimal places, half-up.
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Price a single bill item.
///
/// For metered kinds with both readings present the caller-supplied amount
/// is ignored and the charge is recomputed from the readings. Water items
/// with a configured room divider split the consumed units across rooms
/// before applying the rate (fractional units are kept, only the final
/// amount is rounded).
pub fn price_bill_item(item: &BillItem, sort_order: i32) -> Result<CreateLineItem, BillingError> {
    let metered = item.kind.is_metered()
        && item.start_reading.is_some()
        && item.end_reading.is_some();

    let (amount, units) = if metered {
        let start = item.start_reading.unwrap();
        let end = item.end_reading.unwrap();
        if end < start {
            return Err(BillingError::Validation(format!(
                "end reading {end} is below start reading {start}"
            )));
        }
        let raw_units = end - start;

        // The room divider is a water-only rule: a shared water meter's
        // consumption is split evenly across the rooms it serves.
        let units = match item.units_divider_room {
            Some(divider) if item.kind == BillItemKind::Water && divider > Decimal::ZERO => {
                raw_units / divider
            }
            _ => raw_units,
        };

        let rate = item.rate.unwrap_or(Decimal::ZERO);
        if units > Decimal::ZERO && rate <= Decimal::ZERO {
            return Err(BillingError::Validation(format!(
                "metered {} item requires a positive rate",
                item.kind.as_str()
            )));
        }

        (round_money(units * rate), Some(units))
    } else {
        let amount = item.amount.unwrap_or(Decimal::ZERO);
        if amount < Decimal::ZERO {
            return Err(BillingError::Validation(format!(
                "{} item amount must not be negative",
                item.kind.as_str()
            )));
        }
        (round_money(amount), None)
    };

    Ok(CreateLineItem {
        kind: item.kind.as_str().to_string(),
        description: item.description.clone(),
        amount,
        rate: item.rate,
        units,
        start_reading: if metered { item.start_reading } else { None },
        end_reading: if metered { item.end_reading } else { None },
        sort_order,
    })
}

/// Price a full set of bill items and compute the invoice total.
///
/// Fails fast on the first invalid item: no invoice may be created from a
/// partially valid item set.
pub fn price_bill_items(
    items: &[BillItem],
) -> Result<(Vec<CreateLineItem>, Decimal), BillingError> {
    if items.is_empty() {
        return Err(BillingError::Validation(
            "an invoice requires at least one bill item".to_string(),
        ));
    }

    let mut priced = Vec::with_capacity(items.len());
    for (i, item) in items.iter().enumerate() {
        priced.push(price_bill_item(item, i as i32)?);
    }

    let total = round_money(priced.iter().map(|item| item.amount).sum());
    if total <= Decimal::ZERO {
        return Err(BillingError::Validation(
            "invoice amount must be greater than zero".to_string(),
        ));
    }

    Ok((priced, total))
}

/// Derive the durable invoice status from the invoice amount and the sum of
/// its payments. The sole status rule in the system.
pub fn derive_status(amount: Decimal, total_paid: Decimal) -> InvoiceStatus {
    if total_paid >= amount {
        InvoiceStatus::Paid
    } else if total_paid > Decimal::ZERO {
        InvoiceStatus::Partial
    } else {
        InvoiceStatus::Pending
    }
}

/// Outstanding balance on an invoice, never negative.
pub fn pending_amount(amount: Decimal, total_paid: Decimal) -> Decimal {
    (amount - total_paid).max(Decimal::ZERO)
}

/// Validate a payment amount before it touches the store.
pub fn validate_payment_amount(amount: Decimal) -> Result<(), BillingError> {
    if amount <= Decimal::ZERO {
        return Err(BillingError::Validation(
            "payment amount must be greater than zero".to_string(),
        ));
    }
    Ok(())
}

/// Reject a payment that exceeds the invoice's current balance due.
///
/// Ownership decision: the engine enforces this cap so that a direct API
/// call cannot overpay; the UI check is merely a convenience duplicate.
pub fn check_overpayment(amount: Decimal, balance_due: Decimal) -> Result<(), BillingError> {
    if amount > balance_due {
        return Err(BillingError::OverpaymentRejected {
            amount,
            balance_due,
        });
    }
    Ok(())
}

/// Normalize an actor name: trimmed, with the literal `"Unknown"` standing
/// in for a missing or blank value. This mirrors the historical recording
/// behavior and is the documented contract, not a validation failure.
pub fn normalize_actor(name: Option<&str>) -> String {
    match name.map(str::trim) {
        Some(trimmed) if !trimmed.is_empty() => trimmed.to_string(),
        _ => "Unknown".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn plain_item(kind: BillItemKind, amount: &str) -> BillItem {
        BillItem {
            kind,
            description: None,
            amount: Some(dec(amount)),
            rate: None,
            start_reading: None,
            end_reading: None,
            units_divider_room: None,
        }
    }

    #[test]
    fn shared_water_meter_splits_units_across_rooms() {
        let item = BillItem {
            kind: BillItemKind::Water,
            description: None,
            amount: Some(dec("9999")), // advisory, must be ignored
            rate: Some(dec("9")),
            start_reading: Some(dec("100")),
            end_reading: Some(dec("140")),
            units_divider_room: Some(dec("4")),
        };
        let priced = price_bill_item(&item, 0).unwrap();
        assert_eq!(priced.units, Some(dec("10")));
        assert_eq!(priced.amount, dec("90.00"));
    }

    #[test]
    fn electricity_units_are_not_divided() {
        let item = BillItem {
            kind: BillItemKind::Electricity,
            description: None,
            amount: None,
            rate: Some(dec("7.5")),
            start_reading: Some(dec("200")),
            end_reading: Some(dec("212")),
            units_divider_room: Some(dec("4")), // only honored for water
        };
        let priced = price_bill_item(&item, 0).unwrap();
        assert_eq!(priced.units, Some(dec("12")));
        assert_eq!(priced.amount, dec("90.00"));
    }

    #[test]
    fn inverted_readings_are_rejected() {
        let item = BillItem {
            kind: BillItemKind::Water,
            description: None,
            amount: None,
            rate: Some(dec("9")),
            start_reading: Some(dec("140")),
            end_reading: Some(dec("100")),
            units_divider_room: None,
        };
        assert!(matches!(
            price_bill_item(&item, 0),
            Err(BillingError::Validation(_))
        ));
    }

    #[test]
    fn zero_rate_with_consumption_is_rejected_not_zeroed() {
        let item = BillItem {
            kind: BillItemKind::Electricity,
            description: None,
            amount: None,
            rate: Some(Decimal::ZERO),
            start_reading: Some(dec("10")),
            end_reading: Some(dec("20")),
            units_divider_room: None,
        };
        assert!(matches!(
            price_bill_item(&item, 0),
            Err(BillingError::Validation(_))
        ));
    }

    #[test]
    fn zero_consumption_needs_no_rate() {
        let item = BillItem {
            kind: BillItemKind::Electricity,
            description: None,
            amount: None,
            rate: None,
            start_reading: Some(dec("50")),
            end_reading: Some(dec("50")),
            units_divider_room: None,
        };
        let priced = price_bill_item(&item, 0).unwrap();
        assert_eq!(priced.amount, Decimal::ZERO);
    }

    #[test]
    fn metered_item_without_readings_keeps_manual_amount() {
        let item = BillItem {
            kind: BillItemKind::Water,
            description: None,
            amount: Some(dec("123.45")),
            rate: None,
            start_reading: None,
            end_reading: None,
            units_divider_room: None,
        };
        let priced = price_bill_item(&item, 0).unwrap();
        assert_eq!(priced.amount, dec("123.45"));
        assert_eq!(priced.units, None);
    }

    #[test]
    fn amounts_round_half_up() {
        let item = BillItem {
            kind: BillItemKind::Water,
            description: None,
            amount: None,
            rate: Some(dec("0.125")),
            start_reading: Some(dec("0")),
            end_reading: Some(dec("1")),
            units_divider_room: None,
        };
        // 0.125 rounds half-up to 0.13
        assert_eq!(price_bill_item(&item, 0).unwrap().amount, dec("0.13"));
    }

    #[test]
    fn invoice_total_sums_all_items() {
        let items = vec![
            plain_item(BillItemKind::Rent, "5000"),
            plain_item(BillItemKind::Other, "150.50"),
        ];
        let (priced, total) = price_bill_items(&items).unwrap();
        assert_eq!(priced.len(), 2);
        assert_eq!(total, dec("5150.50"));
        assert_eq!(priced[0].sort_order, 0);
        assert_eq!(priced[1].sort_order, 1);
    }

    #[test]
    fn empty_item_set_is_rejected() {
        assert!(matches!(
            price_bill_items(&[]),
            Err(BillingError::Validation(_))
        ));
    }

    #[test]
    fn zero_total_invoice_is_rejected() {
        let items = vec![plain_item(BillItemKind::Other, "0")];
        assert!(matches!(
            price_bill_items(&items),
            Err(BillingError::Validation(_))
        ));
    }

    #[test]
    fn one_invalid_item_fails_the_whole_set() {
        let items = vec![
            plain_item(BillItemKind::Rent, "5000"),
            BillItem {
                kind: BillItemKind::Water,
                description: None,
                amount: None,
                rate: Some(dec("9")),
                start_reading: Some(dec("140")),
                end_reading: Some(dec("100")),
                units_divider_room: None,
            },
        ];
        assert!(price_bill_items(&items).is_err());
    }

    #[test]
    fn status_follows_paid_total() {
        let amount = dec("1000");
        assert_eq!(derive_status(amount, Decimal::ZERO), InvoiceStatus::Pending);
        assert_eq!(derive_status(amount, dec("400")), InvoiceStatus::Partial);
        assert_eq!(derive_status(amount, dec("1000")), InvoiceStatus::Paid);
        assert_eq!(derive_status(amount, dec("1200")), InvoiceStatus::Paid);
    }

    #[test]
    fn paid_plus_pending_reconciles_to_amount() {
        let amount = dec("1000");
        for paid in ["0", "400", "999.99", "1000"] {
            let paid = dec(paid);
            assert_eq!(paid + pending_amount(amount, paid), amount);
        }
    }

    #[test]
    fn pending_amount_never_goes_negative() {
        assert_eq!(pending_amount(dec("100"), dec("150")), Decimal::ZERO);
    }

    #[test]
    fn non_positive_payment_amounts_are_rejected() {
        assert!(validate_payment_amount(Decimal::ZERO).is_err());
        assert!(validate_payment_amount(dec("-5")).is_err());
        assert!(validate_payment_amount(dec("0.01")).is_ok());
    }

    #[test]
    fn overpayment_is_rejected_with_both_amounts() {
        let err = check_overpayment(dec("150"), dec("100")).unwrap_err();
        match err {
            BillingError::OverpaymentRejected {
                amount,
                balance_due,
            } => {
                assert_eq!(amount, dec("150"));
                assert_eq!(balance_due, dec("100"));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(check_overpayment(dec("100"), dec("100")).is_ok());
    }

    #[test]
    fn actor_names_fall_back_to_unknown() {
        assert_eq!(normalize_actor(Some("  Alice ")), "Alice");
        assert_eq!(normalize_actor(Some("   ")), "Unknown");
        assert_eq!(normalize_actor(None), "Unknown");
    }
}
