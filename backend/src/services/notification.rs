//! Supplier notification collaborator
//!
//! The purchase order workflow tells suppliers about approvals and
//! cancellations after the transition has committed. Delivery is
//! fire-and-forget: a notifier must never block the caller and its failures
//! are only logged.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// What happened to the order
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum NoticeKind {
    OrderApproved { notes: Option<String> },
    OrderCancelled { reason: String },
}

/// A message for the supplier of an order
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SupplierNotice {
    pub order_id: Uuid,
    pub supplier_name: String,
    #[serde(flatten)]
    pub kind: NoticeKind,
    pub actor: String,
    pub sent_at: DateTime<Utc>,
}

/// Outbound channel to suppliers
pub trait SupplierNotifier: Send + Sync {
    /// Hand the notice off for delivery without waiting on it
    fn notify(&self, notice: SupplierNotice);
}

/// Notifier that only writes the notice to the log
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

impl SupplierNotifier for LogNotifier {
    fn notify(&self, notice: SupplierNotice) {
        tracing::info!(
            order_id = %notice.order_id,
            supplier = %notice.supplier_name,
            notice = ?notice.kind,
            "Supplier notice (no webhook configured)"
        );
    }
}
