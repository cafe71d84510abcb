//! Purchase order workflow
//!
//! Orders move `pending -> approved -> received`, and may be cancelled while
//! pending or approved. Receiving an order reconciles the delivered
//! quantities and books them into the stock ledger as one batch.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use serde::Deserialize;
use shared::{
    is_blank, reconciliation, validate_cancellation, validate_invoice_number,
    validate_order_lines, validate_received_qty, validate_supplier_name, Cancellation,
    CancellationReason, LineReceipt, MovementKind, MovementReason, OrderLine, OrderState,
    OrderTransition, PurchaseOrder, ReceiptSummary,
};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::services::ledger::{
    parse_field, MovementRequest, OpenOrderRefs, PostMovementInput, StockLedger,
};
use crate::services::notification::{NoticeKind, SupplierNotice, SupplierNotifier};
use crate::services::order_locks::{OrderGuard, OrderLocks};

/// Purchase order service
#[derive(Clone)]
pub struct PurchaseOrderService {
    orders: Arc<RwLock<HashMap<Uuid, PurchaseOrder>>>,
    locks: OrderLocks,
    ledger: StockLedger,
    notifier: Arc<dyn SupplierNotifier>,
}

/// Input for creating an order
#[derive(Debug, Clone, Deserialize)]
pub struct CreateOrderInput {
    pub supplier_name: String,
    pub lines: Vec<OrderLine>,
}

/// Input for approving an order
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApproveOrderInput {
    /// The approver acknowledged reviewing the order
    #[serde(default)]
    pub confirmed: bool,
    #[serde(default)]
    pub notify_supplier: bool,
    pub notes: Option<String>,
}

/// Input for cancelling an order
#[derive(Debug, Clone)]
pub struct CancelOrderInput {
    pub reason: CancellationReason,
    pub custom_reason: Option<String>,
}

/// A cancellation as submitted by a user, with the reason code as free text
#[derive(Debug, Clone, Deserialize)]
pub struct CancelOrderForm {
    pub reason: String,
    pub custom_reason: Option<String>,
}

impl TryFrom<CancelOrderForm> for CancelOrderInput {
    type Error = AppError;

    fn try_from(form: CancelOrderForm) -> AppResult<Self> {
        Ok(Self {
            reason: parse_field("reason", &form.reason)?,
            custom_reason: form.custom_reason,
        })
    }
}

/// Input for receiving an order
#[derive(Debug, Clone, Deserialize)]
pub struct ReceiveOrderInput {
    pub invoice_number: String,
    pub line_receipts: Vec<LineReceipt>,
    pub notes: Option<String>,
    /// The receiver checked the delivery against the invoice
    #[serde(default)]
    pub confirmed: bool,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn ensure_not_terminal(order: &PurchaseOrder, action: &str) -> AppResult<()> {
    if order.state.is_terminal() {
        return Err(AppError::InvalidStateTransition(format!(
            "Cannot {} order {}: it is already {}",
            action, order.id, order.state
        )));
    }
    Ok(())
}

fn record_transition(order: &mut PurchaseOrder, to: OrderState, actor: &str) {
    let now = Utc::now();
    order.transitions.push(OrderTransition {
        from: Some(order.state),
        to,
        actor: actor.to_string(),
        at: now,
    });
    order.state = to;
    order.version += 1;
    order.updated_at = now;
}

fn collect_open_refs(orders: &HashMap<Uuid, PurchaseOrder>) -> OpenOrderRefs {
    let mut refs = OpenOrderRefs::default();
    for order in orders.values().filter(|o| !o.state.is_terminal()) {
        refs.order_ids.insert(order.id);
        refs.item_ids.extend(order.item_ids());
    }
    refs
}

/// The stored order must still carry the version read at the start
fn check_version(
    orders: &HashMap<Uuid, PurchaseOrder>,
    order_id: Uuid,
    read_version: u64,
) -> AppResult<()> {
    match orders.get(&order_id) {
        Some(stored) if stored.version == read_version => Ok(()),
        Some(_) => Err(AppError::Conflict {
            resource: "purchase_order".to_string(),
            message: "Order was modified by another request".to_string(),
        }),
        None => Err(AppError::NotFound("Purchase order".to_string())),
    }
}

impl PurchaseOrderService {
    /// Create a new PurchaseOrderService instance
    pub fn new(ledger: StockLedger, notifier: Arc<dyn SupplierNotifier>) -> Self {
        Self {
            orders: Arc::new(RwLock::new(HashMap::new())),
            locks: OrderLocks::new(),
            ledger,
            notifier,
        }
    }

    /// Create an order in the pending state
    #[tracing::instrument(skip(self, input), fields(supplier = %input.supplier_name, lines = input.lines.len()))]
    pub async fn create_order(&self, actor: &str, input: CreateOrderInput) -> AppResult<PurchaseOrder> {
        validate_supplier_name(&input.supplier_name)
            .map_err(|msg| AppError::validation("supplier_name", msg))?;
        validate_order_lines(&input.lines).map_err(|msg| AppError::validation("lines", msg))?;

        let now = Utc::now();
        let order = PurchaseOrder {
            id: Uuid::new_v4(),
            supplier_name: input.supplier_name.trim().to_string(),
            total_value: input.lines.iter().map(OrderLine::line_total).sum(),
            lines: input.lines,
            state: OrderState::Pending,
            approval_notes: None,
            cancellation: None,
            invoice_number: None,
            receipt_notes: None,
            received_at: None,
            version: 0,
            transitions: vec![OrderTransition {
                from: None,
                to: OrderState::Pending,
                actor: actor.to_string(),
                at: now,
            }],
            created_by: actor.to_string(),
            created_at: now,
            updated_at: now,
        };

        self.orders.write().await.insert(order.id, order.clone());
        tracing::info!(order_id = %order.id, total = %order.total_value, "Purchase order created");
        Ok(order)
    }

    /// Get a single order
    pub async fn get_order(&self, order_id: Uuid) -> AppResult<PurchaseOrder> {
        self.orders
            .read()
            .await
            .get(&order_id)
            .cloned()
            .ok_or_else(|| AppError::NotFound("Purchase order".to_string()))
    }

    /// List orders, newest first, optionally only those in one state
    pub async fn list_orders(&self, state: Option<OrderState>) -> Vec<PurchaseOrder> {
        let orders = self.orders.read().await;
        let mut list: Vec<PurchaseOrder> = orders
            .values()
            .filter(|o| state.map_or(true, |s| o.state == s))
            .cloned()
            .collect();
        list.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        list
    }

    /// Orders that are not yet cancelled or received, and their items
    pub async fn open_order_refs(&self) -> OpenOrderRefs {
        collect_open_refs(&*self.orders.read().await)
    }

    /// Delete a stock item unless an open order still refers to it.
    ///
    /// The orders stay read-locked until the ledger has removed the item, so
    /// no order can take the item on in between. Orders are always locked
    /// before the ledger.
    pub async fn delete_item(&self, item_id: Uuid) -> AppResult<()> {
        let orders = self.orders.read().await;
        let refs = collect_open_refs(&orders);
        self.ledger.delete_item(item_id, &refs).await
    }

    /// Take the order's lock and read its current state.
    ///
    /// Unknown ids are rejected before they reach the lock registry.
    async fn lock_order(&self, order_id: Uuid) -> AppResult<(OrderGuard, PurchaseOrder)> {
        self.get_order(order_id).await?;
        let guard = self.locks.acquire(order_id).await;
        let order = self.get_order(order_id).await?;
        Ok((guard, order))
    }

    async fn commit(&self, order: PurchaseOrder, read_version: u64) -> AppResult<PurchaseOrder> {
        let mut orders = self.orders.write().await;
        check_version(&orders, order.id, read_version)?;
        orders.insert(order.id, order.clone());
        Ok(order)
    }

    /// Approve a pending order
    #[tracing::instrument(skip(self, input), fields(confirmed = input.confirmed))]
    pub async fn approve(
        &self,
        actor: &str,
        order_id: Uuid,
        input: ApproveOrderInput,
    ) -> AppResult<PurchaseOrder> {
        let (_guard, mut order) = self.lock_order(order_id).await?;
        ensure_not_terminal(&order, "approve")?;

        if !input.confirmed {
            return Err(AppError::Precondition(
                "The order review must be confirmed before approval".to_string(),
            ));
        }
        if order.state != OrderState::Pending {
            return Err(AppError::Precondition(format!(
                "Only pending orders can be approved; order is {}",
                order.state
            )));
        }

        let read_version = order.version;
        record_transition(&mut order, OrderState::Approved, actor);
        order.approval_notes = non_blank(input.notes);
        let order = self.commit(order, read_version).await?;

        tracing::info!(order_id = %order.id, "Purchase order approved");
        if input.notify_supplier {
            self.notifier.notify(SupplierNotice {
                order_id: order.id,
                supplier_name: order.supplier_name.clone(),
                kind: NoticeKind::OrderApproved {
                    notes: order.approval_notes.clone(),
                },
                actor: actor.to_string(),
                sent_at: Utc::now(),
            });
        }

        Ok(order)
    }

    /// Cancel a pending or approved order. No stock is touched.
    #[tracing::instrument(skip(self, input), fields(reason = input.reason.as_str()))]
    pub async fn cancel(
        &self,
        actor: &str,
        order_id: Uuid,
        input: CancelOrderInput,
    ) -> AppResult<PurchaseOrder> {
        let (_guard, mut order) = self.lock_order(order_id).await?;
        ensure_not_terminal(&order, "cancel")?;

        validate_cancellation(input.reason, input.custom_reason.as_deref())
            .map_err(|msg| AppError::validation("custom_reason", msg))?;

        if !order.state.can_transition_to(OrderState::Cancelled) {
            return Err(AppError::InvalidStateTransition(format!(
                "Cannot cancel an order that is {}",
                order.state
            )));
        }

        let read_version = order.version;
        let cancellation = Cancellation {
            reason: input.reason,
            custom_reason: non_blank(input.custom_reason),
        };
        let reason = cancellation.describe();
        record_transition(&mut order, OrderState::Cancelled, actor);
        order.cancellation = Some(cancellation);
        let order = self.commit(order, read_version).await?;

        tracing::info!(order_id = %order.id, %reason, "Purchase order cancelled");
        self.notifier.notify(SupplierNotice {
            order_id: order.id,
            supplier_name: order.supplier_name.clone(),
            kind: NoticeKind::OrderCancelled { reason },
            actor: actor.to_string(),
            sent_at: Utc::now(),
        });

        Ok(order)
    }

    /// Receive an approved order and book the delivered quantities.
    ///
    /// Either every line is posted to the ledger and the order becomes
    /// received, or nothing changes.
    #[tracing::instrument(skip(self, input), fields(invoice = %input.invoice_number, confirmed = input.confirmed))]
    pub async fn receive(
        &self,
        actor: &str,
        order_id: Uuid,
        input: ReceiveOrderInput,
    ) -> AppResult<ReceiptSummary> {
        let (_guard, mut order) = self.lock_order(order_id).await?;
        ensure_not_terminal(&order, "receive")?;

        if !input.confirmed {
            return Err(AppError::Precondition(
                "The delivery must be confirmed against the invoice".to_string(),
            ));
        }
        validate_invoice_number(&input.invoice_number)
            .map_err(|msg| AppError::Precondition(msg.to_string()))?;
        if order.state != OrderState::Approved {
            return Err(AppError::Precondition(format!(
                "Only approved orders can be received; order is {}",
                order.state
            )));
        }
        for receipt in &input.line_receipts {
            validate_received_qty(receipt.received_qty)
                .map_err(|msg| AppError::validation("line_receipts", msg))?;
        }

        let lines = reconciliation::reconcile(&order.lines, &input.line_receipts)
            .map_err(|e| AppError::Precondition(format!("Receipt does not match the order: {}", e)))?;
        let has_discrepancy = reconciliation::has_discrepancy(&lines);
        if reconciliation::notes_required(&lines) && is_blank(input.notes.as_deref()) {
            return Err(AppError::validation("notes", "reconciliation notes required"));
        }

        let invoice_number = input.invoice_number.trim().to_string();
        let requests: Vec<MovementRequest> = lines
            .iter()
            .filter(|line| line.received_qty > 0)
            .map(|line| MovementRequest {
                item_id: line.item_id,
                input: PostMovementInput {
                    kind: MovementKind::Entry,
                    quantity: line.received_qty,
                    reason: MovementReason::Purchase,
                    notes: Some(format!("Invoice {}", invoice_number)),
                    source_order_id: Some(order.id),
                },
            })
            .collect();

        // Held across the ledger posting so the order cannot change between
        // the version check and the write-back.
        let mut orders = self.orders.write().await;
        check_version(&orders, order.id, order.version)?;
        let movements = self.ledger.post_batch(actor, requests).await?;

        let received_at = Utc::now();
        record_transition(&mut order, OrderState::Received, actor);
        order.invoice_number = Some(invoice_number.clone());
        order.receipt_notes = non_blank(input.notes);
        order.received_at = Some(received_at);
        orders.insert(order.id, order);

        tracing::info!(
            %order_id,
            movements = movements.len(),
            has_discrepancy,
            "Purchase order received"
        );

        Ok(ReceiptSummary {
            order_id,
            invoice_number,
            received_at,
            lines,
            movements,
            has_discrepancy,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::LogNotifier;

    fn service() -> PurchaseOrderService {
        PurchaseOrderService::new(StockLedger::default(), Arc::new(LogNotifier))
    }

    #[tokio::test]
    async fn test_unknown_orders_never_enter_the_lock_registry() {
        let orders = service();
        for _ in 0..100 {
            let err = orders
                .approve("clerk", Uuid::new_v4(), ApproveOrderInput::default())
                .await
                .unwrap_err();
            assert!(matches!(err, AppError::NotFound(_)));
        }
        assert!(orders.locks.is_empty());
    }

    #[tokio::test]
    async fn test_lock_entries_are_released_after_transitions() {
        let orders = service();
        let order = orders
            .create_order(
                "clerk",
                CreateOrderInput {
                    supplier_name: "Lab X".to_string(),
                    lines: vec![OrderLine {
                        item_id: Uuid::new_v4(),
                        ordered_qty: 1,
                        unit: shared::ItemUnit::Box,
                        unit_price: rust_decimal::Decimal::ONE,
                    }],
                },
            )
            .await
            .unwrap();

        orders
            .cancel(
                "clerk",
                order.id,
                CancelOrderInput {
                    reason: CancellationReason::Duplicate,
                    custom_reason: None,
                },
            )
            .await
            .unwrap();
        assert!(orders.locks.is_empty());
    }
}
