//! Reconciliation of ordered against received quantities

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use super::{LineReceipt, OrderLine};

/// Classification of a received line
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum LineClassification {
    /// Received exactly what was ordered
    Ok,
    /// Received less than ordered, including nothing at all
    Partial,
    /// Received more than ordered
    Excess,
}

impl std::fmt::Display for LineClassification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LineClassification::Ok => write!(f, "ok"),
            LineClassification::Partial => write!(f, "partial"),
            LineClassification::Excess => write!(f, "excess"),
        }
    }
}

/// One order line with its received quantity and classification
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReceiptLine {
    pub item_id: Uuid,
    pub ordered_qty: i64,
    pub received_qty: i64,
    pub classification: LineClassification,
}

impl ReceiptLine {
    /// Received minus ordered
    pub fn difference(&self) -> i64 {
        self.received_qty - self.ordered_qty
    }
}

/// Receipts that do not line up one-to-one with the order lines
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoverageError {
    #[error("no receipt given for item {0}")]
    Missing(Uuid),
    #[error("item {0} is not on the order")]
    Unexpected(Uuid),
    #[error("item {0} is received more than once")]
    Duplicate(Uuid),
}

/// Classify a single line
pub fn classify(ordered: i64, received: i64) -> LineClassification {
    match received.cmp(&ordered) {
        std::cmp::Ordering::Equal => LineClassification::Ok,
        std::cmp::Ordering::Less => LineClassification::Partial,
        std::cmp::Ordering::Greater => LineClassification::Excess,
    }
}

/// True iff any line is not `ok`
pub fn has_discrepancy(lines: &[ReceiptLine]) -> bool {
    lines
        .iter()
        .any(|l| l.classification != LineClassification::Ok)
}

/// Whether free-text notes must accompany the receipt
pub fn notes_required(lines: &[ReceiptLine]) -> bool {
    has_discrepancy(lines)
}

/// Match receipts to order lines and classify each one.
///
/// The receipts must name exactly the items on the order, each once. The
/// result follows the order-line sequence.
pub fn reconcile(
    order_lines: &[OrderLine],
    receipts: &[LineReceipt],
) -> Result<Vec<ReceiptLine>, CoverageError> {
    let mut seen = HashSet::with_capacity(receipts.len());
    for receipt in receipts {
        if !seen.insert(receipt.item_id) {
            return Err(CoverageError::Duplicate(receipt.item_id));
        }
        if !order_lines.iter().any(|l| l.item_id == receipt.item_id) {
            return Err(CoverageError::Unexpected(receipt.item_id));
        }
    }

    order_lines
        .iter()
        .map(|line| {
            let receipt = receipts
                .iter()
                .find(|r| r.item_id == line.item_id)
                .ok_or(CoverageError::Missing(line.item_id))?;
            Ok(ReceiptLine {
                item_id: line.item_id,
                ordered_qty: line.ordered_qty,
                received_qty: receipt.received_qty,
                classification: classify(line.ordered_qty, receipt.received_qty),
            })
        })
        .collect()
}
