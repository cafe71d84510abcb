//! HTTP handlers for purchase orders

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use shared::{PurchaseOrder, ReceiptSummary};
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::{Actor, ApiJson};
use crate::services::ledger::parse_field;
use crate::services::purchase_order::{
    ApproveOrderInput, CancelOrderForm, CancelOrderInput, CreateOrderInput, ReceiveOrderInput,
};
use crate::AppState;

/// Query for listing orders
#[derive(Debug, Deserialize)]
pub struct ListOrdersQuery {
    pub state: Option<String>,
}

/// List purchase orders
pub async fn list_orders(
    State(state): State<AppState>,
    Query(query): Query<ListOrdersQuery>,
) -> AppResult<Json<Vec<PurchaseOrder>>> {
    let filter = query
        .state
        .as_deref()
        .map(|value| parse_field("state", value))
        .transpose()?;
    Ok(Json(state.orders.list_orders(filter).await))
}

/// Create a purchase order
pub async fn create_order(
    State(state): State<AppState>,
    actor: Actor,
    ApiJson(input): ApiJson<CreateOrderInput>,
) -> AppResult<Json<PurchaseOrder>> {
    let order = state.orders.create_order(actor.as_str(), input).await?;
    Ok(Json(order))
}

/// Get a purchase order
pub async fn get_order(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
) -> AppResult<Json<PurchaseOrder>> {
    Ok(Json(state.orders.get_order(order_id).await?))
}

/// Approve a pending order
pub async fn approve_order(
    State(state): State<AppState>,
    actor: Actor,
    Path(order_id): Path<Uuid>,
    ApiJson(input): ApiJson<ApproveOrderInput>,
) -> AppResult<Json<PurchaseOrder>> {
    let order = state
        .orders
        .approve(actor.as_str(), order_id, input)
        .await?;
    Ok(Json(order))
}

/// Cancel an open order
pub async fn cancel_order(
    State(state): State<AppState>,
    actor: Actor,
    Path(order_id): Path<Uuid>,
    ApiJson(form): ApiJson<CancelOrderForm>,
) -> AppResult<Json<PurchaseOrder>> {
    let input = CancelOrderInput::try_from(form)?;
    let order = state.orders.cancel(actor.as_str(), order_id, input).await?;
    Ok(Json(order))
}

/// Receive an approved order
pub async fn receive_order(
    State(state): State<AppState>,
    actor: Actor,
    Path(order_id): Path<Uuid>,
    ApiJson(input): ApiJson<ReceiveOrderInput>,
) -> AppResult<Json<ReceiptSummary>> {
    let summary = state
        .orders
        .receive(actor.as_str(), order_id, input)
        .await?;
    Ok(Json(summary))
}
