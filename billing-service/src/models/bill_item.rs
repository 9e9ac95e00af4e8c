//! Bill item inputs consumed at invoice-generation time.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Kind of charge on a bill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BillItemKind {
    Rent,
    Electricity,
    Water,
    Other,
}

impl BillItemKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BillItemKind::Rent => "rent",
            BillItemKind::Electricity => "electricity",
            BillItemKind::Water => "water",
            BillItemKind::Other => "other",
        }
    }

    pub fn from_string(s: &str) -> Self {
        match s {
            "rent" => BillItemKind::Rent,
            "electricity" => BillItemKind::Electricity,
            "water" => BillItemKind::Water,
            _ => BillItemKind::Other,
        }
    }

    /// Metered kinds have their amount recomputed from readings when both
    /// readings are present.
    pub fn is_metered(&self) -> bool {
        matches!(self, BillItemKind::Electricity | BillItemKind::Water)
    }
}

/// Raw bill item as submitted by the caller. For metered kinds with both
/// readings present, `amount` is advisory only and is recomputed.
#[derive(Debug, Clone)]
pub struct BillItem {
    pub kind: BillItemKind,
    pub description: Option<String>,
    pub amount: Option<Decimal>,
    pub rate: Option<Decimal>,
    pub start_reading: Option<Decimal>,
    pub end_reading: Option<Decimal>,
    pub units_divider_room: Option<Decimal>,
}
