//! Stock item and movement models

use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::{ItemCategory, ItemUnit, UnknownVariant};

/// A trackable inventory good with its current on-hand quantity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StockItem {
    pub id: Uuid,
    pub name: String,
    pub category: ItemCategory,
    pub unit: ItemUnit,
    pub quantity: i64,
    /// Reorder threshold; the item is low on stock at or below this value
    pub min_quantity: i64,
    pub unit_price: Decimal,
    pub supplier: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StockItem {
    pub fn is_low_stock(&self) -> bool {
        self.quantity <= self.min_quantity
    }

    pub fn stock_value(&self) -> Decimal {
        Decimal::from(self.quantity) * self.unit_price
    }
}

/// Direction of a stock movement
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum MovementKind {
    Entry,
    Exit,
}

impl MovementKind {
    pub const ALL: [MovementKind; 2] = [MovementKind::Entry, MovementKind::Exit];

    pub fn as_str(&self) -> &'static str {
        match self {
            MovementKind::Entry => "entry",
            MovementKind::Exit => "exit",
        }
    }

    /// Sign applied to the movement quantity when computing a balance
    pub fn sign(&self) -> i64 {
        match self {
            MovementKind::Entry => 1,
            MovementKind::Exit => -1,
        }
    }
}

impl std::fmt::Display for MovementKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MovementKind {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|v| v.as_str() == wanted)
            .ok_or_else(|| UnknownVariant {
                set: "movement kind",
                value: s.to_string(),
            })
    }
}

/// Reason code attached to a movement
///
/// Entries accept `purchase`, `donation`, `return` and `adjustment`; exits
/// accept `procedure_use`, `expired`, `loss` and `adjustment`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum MovementReason {
    Purchase,
    Donation,
    Return,
    Adjustment,
    ProcedureUse,
    Expired,
    Loss,
}

impl MovementReason {
    pub const ALL: [MovementReason; 7] = [
        MovementReason::Purchase,
        MovementReason::Donation,
        MovementReason::Return,
        MovementReason::Adjustment,
        MovementReason::ProcedureUse,
        MovementReason::Expired,
        MovementReason::Loss,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MovementReason::Purchase => "purchase",
            MovementReason::Donation => "donation",
            MovementReason::Return => "return",
            MovementReason::Adjustment => "adjustment",
            MovementReason::ProcedureUse => "procedure_use",
            MovementReason::Expired => "expired",
            MovementReason::Loss => "loss",
        }
    }

    pub fn is_allowed_for(&self, kind: MovementKind) -> bool {
        match kind {
            MovementKind::Entry => matches!(
                self,
                MovementReason::Purchase
                    | MovementReason::Donation
                    | MovementReason::Return
                    | MovementReason::Adjustment
            ),
            MovementKind::Exit => matches!(
                self,
                MovementReason::ProcedureUse
                    | MovementReason::Expired
                    | MovementReason::Loss
                    | MovementReason::Adjustment
            ),
        }
    }
}

impl std::fmt::Display for MovementReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MovementReason {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|v| v.as_str() == wanted)
            .ok_or_else(|| UnknownVariant {
                set: "movement reason",
                value: s.to_string(),
            })
    }
}

/// An immutable, signed quantity adjustment applied to a stock item
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StockMovement {
    pub id: Uuid,
    pub item_id: Uuid,
    pub kind: MovementKind,
    /// Always positive; the sign comes from `kind`
    pub quantity: i64,
    pub reason: MovementReason,
    pub notes: Option<String>,
    pub actor: String,
    pub timestamp: DateTime<Utc>,
    /// Set when the movement was posted by an order receipt
    pub source_order_id: Option<Uuid>,
}

impl StockMovement {
    pub fn signed_quantity(&self) -> i64 {
        self.kind.sign() * self.quantity
    }
}

/// Sum of signed quantities for a movement history
pub fn movement_balance<'a>(movements: impl IntoIterator<Item = &'a StockMovement>) -> i64 {
    movements.into_iter().map(StockMovement::signed_quantity).sum()
}

/// Value of a single item in a valuation report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemValuation {
    pub item_id: Uuid,
    pub name: String,
    pub quantity: i64,
    pub unit_price: Decimal,
    pub total_value: Decimal,
    pub low_stock: bool,
}

/// Stock valuation across all items
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockValuation {
    pub items: Vec<ItemValuation>,
    pub item_count: usize,
    pub low_stock_count: usize,
    pub total_value: Decimal,
}
