//! Invoice generation tests: line-item pricing, utility metering and the
//! request-level fallbacks.

use billing_service::dtos::BillItemRequest;
use billing_service::models::{BillItem, BillItemKind, PaymentMethod};
use billing_service::services::billing::{
    normalize_actor, price_bill_items, round_money, BillingError,
};
use rust_decimal::Decimal;
use std::str::FromStr;

fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn rent(amount: &str) -> BillItem {
    BillItem {
        kind: BillItemKind::Rent,
        description: None,
        amount: Some(dec(amount)),
        rate: None,
        start_reading: None,
        end_reading: None,
        units_divider_room: None,
    }
}

fn metered(kind: BillItemKind, rate: &str, start: &str, end: &str, divider: Option<&str>) -> BillItem {
    BillItem {
        kind,
        description: None,
        amount: None,
        rate: Some(dec(rate)),
        start_reading: Some(dec(start)),
        end_reading: Some(dec(end)),
        units_divider_room: divider.map(dec),
    }
}

#[test]
fn water_bill_with_shared_meter_divides_units() {
    // 40 raw units across 4 rooms at rate 9 = 90.00
    let items = vec![metered(BillItemKind::Water, "9", "100", "140", Some("4"))];
    let (priced, total) = price_bill_items(&items).unwrap();

    assert_eq!(priced[0].units, Some(dec("10")));
    assert_eq!(priced[0].amount, dec("90.00"));
    assert_eq!(total, dec("90.00"));
}

#[test]
fn fractional_units_are_kept_until_final_rounding() {
    // 10 raw units across 3 rooms: units stay fractional, only the charge
    // is rounded. 10/3 * 9 = 30.00
    let items = vec![metered(BillItemKind::Water, "9", "0", "10", Some("3"))];
    let (priced, _) = price_bill_items(&items).unwrap();

    assert_eq!(priced[0].amount, dec("30.00"));
}

#[test]
fn inverted_meter_readings_produce_no_invoice() {
    let items = vec![
        rent("5000"),
        metered(BillItemKind::Electricity, "7", "250", "200", None),
    ];
    assert!(matches!(
        price_bill_items(&items),
        Err(BillingError::Validation(_))
    ));
}

#[test]
fn caller_amount_on_metered_item_is_advisory_only() {
    let mut item = metered(BillItemKind::Electricity, "5", "100", "120", None);
    item.amount = Some(dec("1.00"));
    let (priced, total) = price_bill_items(&[item]).unwrap();

    assert_eq!(priced[0].amount, dec("100.00"));
    assert_eq!(total, dec("100.00"));
}

#[test]
fn mixed_invoice_totals_all_items() {
    let items = vec![
        rent("5000"),
        metered(BillItemKind::Electricity, "7.5", "200", "212", None),
        metered(BillItemKind::Water, "9", "100", "140", Some("4")),
        BillItem {
            kind: BillItemKind::Other,
            description: Some("parking".to_string()),
            amount: Some(dec("250")),
            rate: None,
            start_reading: None,
            end_reading: None,
            units_divider_room: None,
        },
    ];
    let (priced, total) = price_bill_items(&items).unwrap();

    assert_eq!(priced.len(), 4);
    // 5000 + 90 + 90 + 250
    assert_eq!(total, dec("5430.00"));
    // Sort order follows submission order.
    let orders: Vec<i32> = priced.iter().map(|i| i.sort_order).collect();
    assert_eq!(orders, vec![0, 1, 2, 3]);
}

#[test]
fn money_rounds_half_up_to_two_decimals() {
    assert_eq!(round_money(dec("10.005")), dec("10.01"));
    assert_eq!(round_money(dec("10.004")), dec("10.00"));
    assert_eq!(round_money(dec("-10.005")), dec("-10.01"));
}

#[test]
fn unknown_item_kind_falls_back_to_other() {
    let req = BillItemRequest {
        kind: "gas".to_string(),
        description: None,
        amount: Some(dec("100")),
        rate: None,
        start_reading: None,
        end_reading: None,
        units_divider_room: None,
    };
    let item = BillItem::from(req);
    assert_eq!(item.kind, BillItemKind::Other);
    assert!(!item.kind.is_metered());
}

#[test]
fn readings_on_non_metered_kinds_are_ignored() {
    // A rent item with stray readings keeps its manual amount.
    let mut item = rent("5000");
    item.start_reading = Some(dec("0"));
    item.end_reading = Some(dec("100"));
    let (priced, total) = price_bill_items(&[item]).unwrap();

    assert_eq!(priced[0].amount, dec("5000.00"));
    assert_eq!(priced[0].units, None);
    assert_eq!(total, dec("5000.00"));
}

#[test]
fn payment_method_strings_round_trip() {
    for method in ["cash", "check", "bank_transfer", "card", "online", "other"] {
        assert_eq!(PaymentMethod::from_string(method).as_str(), method);
    }
    assert_eq!(PaymentMethod::from_string("barter"), PaymentMethod::Other);
}

#[test]
fn missing_actor_names_default_to_unknown() {
    assert_eq!(normalize_actor(None), "Unknown");
    assert_eq!(normalize_actor(Some("")), "Unknown");
    assert_eq!(normalize_actor(Some("  J. Tenant ")), "J. Tenant");
}
