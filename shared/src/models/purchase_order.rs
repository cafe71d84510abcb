//! Purchase order models

use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{ReceiptLine, StockMovement};
use crate::types::{ItemUnit, UnknownVariant};

/// Lifecycle state of a purchase order
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum OrderState {
    Pending,
    Approved,
    Cancelled,
    Received,
}

impl OrderState {
    pub const ALL: [OrderState; 4] = [
        OrderState::Pending,
        OrderState::Approved,
        OrderState::Cancelled,
        OrderState::Received,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderState::Pending => "pending",
            OrderState::Approved => "approved",
            OrderState::Cancelled => "cancelled",
            OrderState::Received => "received",
        }
    }

    /// No transition is permitted out of a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderState::Cancelled | OrderState::Received)
    }

    pub fn can_transition_to(&self, next: OrderState) -> bool {
        matches!(
            (self, next),
            (OrderState::Pending, OrderState::Approved)
                | (OrderState::Pending, OrderState::Cancelled)
                | (OrderState::Approved, OrderState::Cancelled)
                | (OrderState::Approved, OrderState::Received)
        )
    }
}

impl std::fmt::Display for OrderState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderState {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|v| v.as_str() == wanted)
            .ok_or_else(|| UnknownVariant {
                set: "order state",
                value: s.to_string(),
            })
    }
}

/// A single requested item on an order
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderLine {
    pub item_id: Uuid,
    pub ordered_qty: i64,
    pub unit: ItemUnit,
    #[serde(default)]
    pub unit_price: Decimal,
}

impl OrderLine {
    pub fn line_total(&self) -> Decimal {
        Decimal::from(self.ordered_qty) * self.unit_price
    }
}

/// Why an order was cancelled
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CancellationReason {
    SupplierUnavailable,
    PriceChanged,
    NoLongerNeeded,
    Duplicate,
    DeliveryDelay,
    /// Requires a free-text explanation
    Other,
}

impl CancellationReason {
    pub const ALL: [CancellationReason; 6] = [
        CancellationReason::SupplierUnavailable,
        CancellationReason::PriceChanged,
        CancellationReason::NoLongerNeeded,
        CancellationReason::Duplicate,
        CancellationReason::DeliveryDelay,
        CancellationReason::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CancellationReason::SupplierUnavailable => "supplier_unavailable",
            CancellationReason::PriceChanged => "price_changed",
            CancellationReason::NoLongerNeeded => "no_longer_needed",
            CancellationReason::Duplicate => "duplicate",
            CancellationReason::DeliveryDelay => "delivery_delay",
            CancellationReason::Other => "other",
        }
    }
}

impl FromStr for CancellationReason {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|v| v.as_str() == wanted)
            .ok_or_else(|| UnknownVariant {
                set: "cancellation reason",
                value: s.to_string(),
            })
    }
}

/// Recorded cancellation details
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Cancellation {
    pub reason: CancellationReason,
    pub custom_reason: Option<String>,
}

impl Cancellation {
    /// Human-readable reason, preferring the custom text when present
    pub fn describe(&self) -> String {
        match &self.custom_reason {
            Some(text) if !text.trim().is_empty() => text.trim().to_string(),
            _ => self.reason.as_str().replace('_', " "),
        }
    }
}

/// Audit trail entry for a state change
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderTransition {
    pub from: Option<OrderState>,
    pub to: OrderState,
    pub actor: String,
    pub at: DateTime<Utc>,
}

/// A supplier order progressing through approval and receipt
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PurchaseOrder {
    pub id: Uuid,
    pub supplier_name: String,
    pub lines: Vec<OrderLine>,
    pub total_value: Decimal,
    pub state: OrderState,
    pub approval_notes: Option<String>,
    pub cancellation: Option<Cancellation>,
    pub invoice_number: Option<String>,
    pub receipt_notes: Option<String>,
    pub received_at: Option<DateTime<Utc>>,
    /// Bumped on every transition
    pub version: u64,
    pub transitions: Vec<OrderTransition>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PurchaseOrder {
    pub fn item_ids(&self) -> impl Iterator<Item = Uuid> + '_ {
        self.lines.iter().map(|l| l.item_id)
    }

    pub fn line_for(&self, item_id: Uuid) -> Option<&OrderLine> {
        self.lines.iter().find(|l| l.item_id == item_id)
    }
}

/// Quantity actually delivered for one item of an order
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LineReceipt {
    pub item_id: Uuid,
    pub received_qty: i64,
}

/// Outcome of receiving an order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceiptSummary {
    pub order_id: Uuid,
    pub invoice_number: String,
    pub received_at: DateTime<Utc>,
    pub lines: Vec<ReceiptLine>,
    pub movements: Vec<StockMovement>,
    pub has_discrepancy: bool,
}
