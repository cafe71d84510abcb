//! HTTP handlers for stock items and movements

use axum::{
    extract::{Path, Query, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use shared::{StockItem, StockMovement, StockValuation};
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::{Actor, ApiJson};
use crate::services::ledger::{MovementForm, PostMovementInput, RegisterItemInput, UpdateItemInput};
use crate::AppState;

/// Query for the movement export
#[derive(Debug, Deserialize)]
pub struct ExportQuery {
    /// "json" (default) or "csv"
    pub format: Option<String>,
    pub item_id: Option<Uuid>,
}

/// List all stock items
pub async fn list_items(State(state): State<AppState>) -> Json<Vec<StockItem>> {
    Json(state.ledger.list_items().await)
}

/// Register a new stock item
pub async fn register_item(
    State(state): State<AppState>,
    actor: Actor,
    ApiJson(input): ApiJson<RegisterItemInput>,
) -> AppResult<Json<StockItem>> {
    let item = state.ledger.register_item(actor.as_str(), input).await?;
    Ok(Json(item))
}

/// Get a stock item
pub async fn get_item(
    State(state): State<AppState>,
    Path(item_id): Path<Uuid>,
) -> AppResult<Json<StockItem>> {
    Ok(Json(state.ledger.get_item(item_id).await?))
}

/// Edit a stock item's details
pub async fn update_item(
    State(state): State<AppState>,
    Path(item_id): Path<Uuid>,
    ApiJson(input): ApiJson<UpdateItemInput>,
) -> AppResult<Json<StockItem>> {
    Ok(Json(state.ledger.update_item(item_id, input).await?))
}

/// Delete a stock item
pub async fn delete_item(
    State(state): State<AppState>,
    actor: Actor,
    Path(item_id): Path<Uuid>,
) -> AppResult<Json<()>> {
    state.orders.delete_item(item_id).await?;
    tracing::info!(%item_id, actor = actor.as_str(), "Item deleted via API");
    Ok(Json(()))
}

/// Movement history of an item
pub async fn list_item_movements(
    State(state): State<AppState>,
    Path(item_id): Path<Uuid>,
) -> AppResult<Json<Vec<StockMovement>>> {
    Ok(Json(state.ledger.movements(item_id).await?))
}

/// Post a manual stock entry or exit
pub async fn post_movement(
    State(state): State<AppState>,
    actor: Actor,
    Path(item_id): Path<Uuid>,
    ApiJson(form): ApiJson<MovementForm>,
) -> AppResult<Json<StockMovement>> {
    let input = PostMovementInput::try_from(form)?;
    let movement = state
        .ledger
        .post_movement(actor.as_str(), item_id, input)
        .await?;
    Ok(Json(movement))
}

/// Retained history of a deleted item
pub async fn list_archived_movements(
    State(state): State<AppState>,
    Path(item_id): Path<Uuid>,
) -> Json<Vec<StockMovement>> {
    Json(state.ledger.archived_movements(item_id).await)
}

/// Items at or below their minimum quantity
pub async fn list_low_stock(State(state): State<AppState>) -> Json<Vec<StockItem>> {
    Json(state.ledger.low_stock_items().await)
}

/// Value of the stock on hand
pub async fn get_valuation(State(state): State<AppState>) -> Json<StockValuation> {
    Json(state.ledger.valuation().await)
}

/// Export the movement history as JSON or CSV
pub async fn export_movements(
    State(state): State<AppState>,
    Query(query): Query<ExportQuery>,
) -> AppResult<Response> {
    if query.format.as_deref() == Some("csv") {
        let csv = state.ledger.export_movements_csv(query.item_id).await?;
        return Ok((
            [
                (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
                (
                    header::CONTENT_DISPOSITION,
                    "attachment; filename=\"stock_movements.csv\"",
                ),
            ],
            csv,
        )
            .into_response());
    }

    let movements = match query.item_id {
        Some(item_id) => state.ledger.movements(item_id).await?,
        None => state.ledger.list_movements().await,
    };
    Ok(Json(movements).into_response())
}
