//! Stock ledger: item registry and quantity-affecting movements
//!
//! The ledger is the only place where `StockItem::quantity` changes. Every
//! change is recorded as an immutable `StockMovement`, so an item's quantity
//! always equals the signed sum of its history.

use std::collections::{HashMap, HashSet};
use std::str::FromStr;
use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::{
    validate_item_name, validate_movement_quantity, validate_stock_count, validate_unit_price,
    ItemCategory, ItemUnit, ItemValuation, MovementKind, MovementReason, StockItem, StockMovement,
    StockValuation, UnknownVariant,
};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// Stock ledger service
#[derive(Clone)]
pub struct StockLedger {
    book: Arc<RwLock<LedgerBook>>,
    archive_deleted_history: bool,
}

#[derive(Default)]
struct LedgerBook {
    items: HashMap<Uuid, StockItem>,
    /// Chronological movement history per item
    history: HashMap<Uuid, Vec<StockMovement>>,
    /// History of deleted items
    archive: HashMap<Uuid, Vec<StockMovement>>,
}

/// Input for registering a new item
///
/// Category and unit arrive as free text so that values outside the
/// enumerated sets are reported as validation errors on the right field.
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterItemInput {
    pub name: String,
    pub category: String,
    pub unit: String,
    #[serde(default)]
    pub quantity: i64,
    #[serde(default)]
    pub min_quantity: i64,
    #[serde(default)]
    pub unit_price: Decimal,
    pub supplier: Option<String>,
    pub notes: Option<String>,
}

/// Input for editing an item's descriptive fields
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateItemInput {
    pub name: Option<String>,
    pub category: Option<String>,
    pub unit: Option<String>,
    pub min_quantity: Option<i64>,
    pub unit_price: Option<Decimal>,
    pub supplier: Option<String>,
    pub notes: Option<String>,
}

/// Input for posting a movement against one item
#[derive(Debug, Clone)]
pub struct PostMovementInput {
    pub kind: MovementKind,
    pub quantity: i64,
    pub reason: MovementReason,
    pub notes: Option<String>,
    pub source_order_id: Option<Uuid>,
}

/// A manual movement as submitted by a user
///
/// Kind and reason are free text for the same reason as the item category
/// and unit. Manual movements never carry an order reference.
#[derive(Debug, Clone, Deserialize)]
pub struct MovementForm {
    pub kind: String,
    pub quantity: i64,
    pub reason: String,
    pub notes: Option<String>,
}

impl TryFrom<MovementForm> for PostMovementInput {
    type Error = AppError;

    fn try_from(form: MovementForm) -> AppResult<Self> {
        Ok(Self {
            kind: parse_field("kind", &form.kind)?,
            quantity: form.quantity,
            reason: parse_field("reason", &form.reason)?,
            notes: form.notes,
            source_order_id: None,
        })
    }
}

/// One movement of a batch posting
#[derive(Debug, Clone)]
pub struct MovementRequest {
    pub item_id: Uuid,
    pub input: PostMovementInput,
}

/// Ids of purchase orders that are still open, and the items on them
#[derive(Debug, Clone, Default)]
pub struct OpenOrderRefs {
    pub order_ids: HashSet<Uuid>,
    pub item_ids: HashSet<Uuid>,
}

/// Flat movement row for CSV export
#[derive(Debug, Serialize)]
struct MovementCsvRow {
    id: Uuid,
    item_id: Uuid,
    item_name: String,
    kind: &'static str,
    quantity: i64,
    signed_quantity: i64,
    reason: &'static str,
    notes: Option<String>,
    actor: String,
    timestamp: String,
    source_order_id: Option<Uuid>,
}

/// Parse a free-text enumerated value, naming the field on failure
pub fn parse_field<T>(field: &str, value: &str) -> AppResult<T>
where
    T: FromStr<Err = UnknownVariant>,
{
    value
        .parse::<T>()
        .map_err(|e| AppError::validation(field, e.to_string()))
}

fn parse_category(value: &str) -> AppResult<ItemCategory> {
    parse_field("category", value)
}

fn parse_unit(value: &str) -> AppResult<ItemUnit> {
    parse_field("unit", value)
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl LedgerBook {
    fn item(&self, item_id: Uuid) -> AppResult<&StockItem> {
        self.items
            .get(&item_id)
            .ok_or_else(|| AppError::NotFound("Stock item".to_string()))
    }

    /// Check one movement against a projected quantity and return the new one
    fn check_movement(&self, item_id: Uuid, current: i64, input: &PostMovementInput) -> AppResult<i64> {
        let item = self.item(item_id)?;

        validate_movement_quantity(input.quantity)
            .map_err(|msg| AppError::InvalidQuantity(msg.to_string()))?;

        if !input.reason.is_allowed_for(input.kind) {
            return Err(AppError::validation(
                "reason",
                format!("Reason '{}' is not valid for an {}", input.reason, input.kind),
            ));
        }

        match input.kind {
            MovementKind::Entry => current
                .checked_add(input.quantity)
                .ok_or_else(|| AppError::InvalidQuantity("Quantity is too large".to_string())),
            MovementKind::Exit if input.quantity > current => Err(AppError::InsufficientStock {
                item: item.name.clone(),
                available: current,
                requested: input.quantity,
            }),
            MovementKind::Exit => Ok(current - input.quantity),
        }
    }

    fn apply(&mut self, actor: &str, item_id: Uuid, new_quantity: i64, input: PostMovementInput) -> StockMovement {
        let now = Utc::now();
        let movement = StockMovement {
            id: Uuid::new_v4(),
            item_id,
            kind: input.kind,
            quantity: input.quantity,
            reason: input.reason,
            notes: non_blank(input.notes),
            actor: actor.to_string(),
            timestamp: now,
            source_order_id: input.source_order_id,
        };

        if let Some(item) = self.items.get_mut(&item_id) {
            item.quantity = new_quantity;
            item.updated_at = now;
        }
        self.history.entry(item_id).or_default().push(movement.clone());
        movement
    }
}

impl StockLedger {
    /// Create an empty ledger
    pub fn new(archive_deleted_history: bool) -> Self {
        Self {
            book: Arc::new(RwLock::new(LedgerBook::default())),
            archive_deleted_history,
        }
    }

    /// Register a new item.
    ///
    /// A positive opening quantity is booked as an `entry/adjustment`
    /// movement.
    #[tracing::instrument(skip(self, input), fields(name = %input.name))]
    pub async fn register_item(&self, actor: &str, input: RegisterItemInput) -> AppResult<StockItem> {
        validate_item_name(&input.name).map_err(|msg| AppError::validation("name", msg))?;
        let category = parse_category(&input.category)?;
        let unit = parse_unit(&input.unit)?;
        validate_stock_count(input.quantity).map_err(|msg| AppError::validation("quantity", msg))?;
        validate_stock_count(input.min_quantity)
            .map_err(|msg| AppError::validation("min_quantity", msg))?;
        validate_unit_price(input.unit_price).map_err(|msg| AppError::validation("unit_price", msg))?;

        let now = Utc::now();
        let item = StockItem {
            id: Uuid::new_v4(),
            name: input.name.trim().to_string(),
            category,
            unit,
            quantity: 0,
            min_quantity: input.min_quantity,
            unit_price: input.unit_price,
            supplier: non_blank(input.supplier),
            notes: non_blank(input.notes),
            created_at: now,
            updated_at: now,
        };

        let mut book = self.book.write().await;
        book.items.insert(item.id, item.clone());
        book.history.insert(item.id, Vec::new());

        if input.quantity > 0 {
            let opening = PostMovementInput {
                kind: MovementKind::Entry,
                quantity: input.quantity,
                reason: MovementReason::Adjustment,
                notes: Some("Opening balance".to_string()),
                source_order_id: None,
            };
            book.apply(actor, item.id, input.quantity, opening);
        }

        let registered = book.item(item.id)?.clone();
        tracing::info!(item_id = %registered.id, quantity = registered.quantity, "Stock item registered");
        Ok(registered)
    }

    /// Get a single item
    pub async fn get_item(&self, item_id: Uuid) -> AppResult<StockItem> {
        self.book.read().await.item(item_id).cloned()
    }

    /// List all items sorted by name
    pub async fn list_items(&self) -> Vec<StockItem> {
        let book = self.book.read().await;
        let mut items: Vec<StockItem> = book.items.values().cloned().collect();
        items.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
        items
    }

    /// Edit descriptive fields; quantity only changes through movements
    pub async fn update_item(&self, item_id: Uuid, input: UpdateItemInput) -> AppResult<StockItem> {
        let mut book = self.book.write().await;
        let existing = book.item(item_id)?.clone();

        let name = match input.name {
            Some(name) => {
                validate_item_name(&name).map_err(|msg| AppError::validation("name", msg))?;
                name.trim().to_string()
            }
            None => existing.name.clone(),
        };
        let category = match input.category.as_deref() {
            Some(value) => parse_category(value)?,
            None => existing.category,
        };
        let unit = match input.unit.as_deref() {
            Some(value) => parse_unit(value)?,
            None => existing.unit,
        };
        let min_quantity = input.min_quantity.unwrap_or(existing.min_quantity);
        validate_stock_count(min_quantity).map_err(|msg| AppError::validation("min_quantity", msg))?;
        let unit_price = input.unit_price.unwrap_or(existing.unit_price);
        validate_unit_price(unit_price).map_err(|msg| AppError::validation("unit_price", msg))?;

        let updated = StockItem {
            name,
            category,
            unit,
            min_quantity,
            unit_price,
            supplier: input.supplier.map_or(existing.supplier.clone(), |s| non_blank(Some(s))),
            notes: input.notes.map_or(existing.notes.clone(), |n| non_blank(Some(n))),
            updated_at: Utc::now(),
            ..existing
        };
        book.items.insert(item_id, updated.clone());

        Ok(updated)
    }

    /// Post one movement against an item
    #[tracing::instrument(skip(self, input), fields(kind = %input.kind, quantity = input.quantity))]
    pub async fn post_movement(
        &self,
        actor: &str,
        item_id: Uuid,
        input: PostMovementInput,
    ) -> AppResult<StockMovement> {
        let mut book = self.book.write().await;
        let current = book.item(item_id)?.quantity;
        let new_quantity = book.check_movement(item_id, current, &input)?;
        let movement = book.apply(actor, item_id, new_quantity, input);

        tracing::info!(
            movement_id = %movement.id,
            %item_id,
            new_quantity,
            "Stock movement posted"
        );
        Ok(movement)
    }

    /// Post several movements as one unit.
    ///
    /// Every request is checked against the quantities the earlier requests
    /// of the batch would leave behind. If any check fails nothing is
    /// applied.
    pub async fn post_batch(
        &self,
        actor: &str,
        requests: Vec<MovementRequest>,
    ) -> AppResult<Vec<StockMovement>> {
        let mut book = self.book.write().await;

        let mut projected: HashMap<Uuid, i64> = HashMap::new();
        let mut staged = Vec::with_capacity(requests.len());
        for request in requests {
            let current = match projected.get(&request.item_id) {
                Some(quantity) => *quantity,
                None => book.item(request.item_id)?.quantity,
            };
            let new_quantity = book.check_movement(request.item_id, current, &request.input)?;
            projected.insert(request.item_id, new_quantity);
            staged.push((request, new_quantity));
        }

        let movements: Vec<StockMovement> = staged
            .into_iter()
            .map(|(request, new_quantity)| book.apply(actor, request.item_id, new_quantity, request.input))
            .collect();

        tracing::info!(count = movements.len(), "Stock movement batch posted");
        Ok(movements)
    }

    /// Delete an item unless an open purchase order still refers to it
    #[tracing::instrument(skip(self, open_orders))]
    pub async fn delete_item(&self, item_id: Uuid, open_orders: &OpenOrderRefs) -> AppResult<()> {
        let mut book = self.book.write().await;
        book.item(item_id)?;

        if open_orders.item_ids.contains(&item_id) {
            return Err(AppError::Conflict {
                resource: "stock_item".to_string(),
                message: "Item is on a purchase order that is still open".to_string(),
            });
        }

        let history = book.history.get(&item_id).map(Vec::as_slice).unwrap_or_default();
        if history.iter().any(|m| {
            m.source_order_id
                .is_some_and(|order_id| open_orders.order_ids.contains(&order_id))
        }) {
            return Err(AppError::Conflict {
                resource: "stock_item".to_string(),
                message: "Item has movements from a purchase order that is still open".to_string(),
            });
        }

        book.items.remove(&item_id);
        let history = book.history.remove(&item_id).unwrap_or_default();
        let archived = history.len();
        if self.archive_deleted_history && !history.is_empty() {
            book.archive.insert(item_id, history);
        }

        tracing::info!(archived, archive = self.archive_deleted_history, "Stock item deleted");
        Ok(())
    }

    /// Movement history of an item, newest first
    pub async fn movements(&self, item_id: Uuid) -> AppResult<Vec<StockMovement>> {
        let book = self.book.read().await;
        book.item(item_id)?;
        let mut history = book.history.get(&item_id).cloned().unwrap_or_default();
        history.reverse();
        Ok(history)
    }

    /// Every movement in the ledger, newest first
    pub async fn list_movements(&self) -> Vec<StockMovement> {
        let book = self.book.read().await;
        let mut all: Vec<StockMovement> = book.history.values().flatten().cloned().collect();
        all.sort_by_key(|m| m.timestamp);
        all.reverse();
        all
    }

    /// Retained history of a deleted item, oldest first
    pub async fn archived_movements(&self, item_id: Uuid) -> Vec<StockMovement> {
        self.book
            .read()
            .await
            .archive
            .get(&item_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Items at or below their minimum quantity
    pub async fn low_stock_items(&self) -> Vec<StockItem> {
        self.list_items()
            .await
            .into_iter()
            .filter(StockItem::is_low_stock)
            .collect()
    }

    /// Value of the stock on hand
    pub async fn valuation(&self) -> StockValuation {
        let items: Vec<ItemValuation> = self
            .list_items()
            .await
            .into_iter()
            .map(|item| ItemValuation {
                item_id: item.id,
                total_value: item.stock_value(),
                low_stock: item.is_low_stock(),
                name: item.name,
                quantity: item.quantity,
                unit_price: item.unit_price,
            })
            .collect();

        StockValuation {
            item_count: items.len(),
            low_stock_count: items.iter().filter(|i| i.low_stock).count(),
            total_value: items.iter().map(|i| i.total_value).sum(),
            items,
        }
    }

    /// Export movement history as CSV, optionally for a single item
    pub async fn export_movements_csv(&self, item_id: Option<Uuid>) -> AppResult<String> {
        let movements = match item_id {
            Some(id) => self.movements(id).await?,
            None => self.list_movements().await,
        };

        let names: HashMap<Uuid, String> = {
            let book = self.book.read().await;
            book.items.values().map(|i| (i.id, i.name.clone())).collect()
        };

        let mut wtr = csv::Writer::from_writer(vec![]);
        for m in movements {
            let row = MovementCsvRow {
                id: m.id,
                item_id: m.item_id,
                item_name: names.get(&m.item_id).cloned().unwrap_or_default(),
                kind: m.kind.as_str(),
                quantity: m.quantity,
                signed_quantity: m.signed_quantity(),
                reason: m.reason.as_str(),
                notes: m.notes,
                actor: m.actor,
                timestamp: m.timestamp.to_rfc3339(),
                source_order_id: m.source_order_id,
            };
            wtr.serialize(row)
                .map_err(|e| AppError::Internal(format!("CSV serialization error: {}", e)))?;
        }
        let data = wtr
            .into_inner()
            .map_err(|e| AppError::Internal(format!("CSV writer error: {}", e)))?;
        String::from_utf8(data).map_err(|e| AppError::Internal(format!("UTF-8 conversion error: {}", e)))
    }
}

impl Default for StockLedger {
    fn default() -> Self {
        Self::new(true)
    }
}
