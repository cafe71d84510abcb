//! Route definitions for clinic stock management

use axum::{
    routing::{get, post},
    Router,
};

use crate::{handlers, AppState};

/// Create API routes
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(handlers::health_check))
        // Stock items and their movements
        .nest("/items", item_routes())
        // Stock reports
        .nest("/stock", stock_routes())
        // Purchase orders
        .nest("/orders", order_routes())
}

/// Stock item routes
fn item_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_items).post(handlers::register_item))
        .route(
            "/:item_id",
            get(handlers::get_item)
                .put(handlers::update_item)
                .delete(handlers::delete_item),
        )
        .route(
            "/:item_id/movements",
            get(handlers::list_item_movements).post(handlers::post_movement),
        )
        .route(
            "/:item_id/archived-movements",
            get(handlers::list_archived_movements),
        )
}

/// Stock report routes
fn stock_routes() -> Router<AppState> {
    Router::new()
        .route("/low", get(handlers::list_low_stock))
        .route("/valuation", get(handlers::get_valuation))
        .route("/movements", get(handlers::export_movements))
}

/// Purchase order routes
fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_orders).post(handlers::create_order))
        .route("/:order_id", get(handlers::get_order))
        .route("/:order_id/approve", post(handlers::approve_order))
        .route("/:order_id/cancel", post(handlers::cancel_order))
        .route("/:order_id/receive", post(handlers::receive_order))
}
