//! Clinic Stock Management - Backend
//!
//! Stock ledger and purchase order workflow for a clinic, exposed as a JSON
//! API. The services are usable on their own; the router is one caller.

use std::{sync::Arc, time::Duration};

use axum::{routing::get, Router};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub mod config;
pub mod error;
pub mod external;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod services;

pub use config::Config;
use error::AppResult;
use external::WebhookNotifier;
use services::{LogNotifier, PurchaseOrderService, StockLedger, SupplierNotifier};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub ledger: StockLedger,
    pub orders: PurchaseOrderService,
}

impl AppState {
    /// Wire the services from configuration
    pub fn new(config: Config) -> AppResult<Self> {
        let notifier = build_notifier(&config)?;
        Ok(Self::with_notifier(config, notifier))
    }

    /// Wire the services around a given supplier notifier
    pub fn with_notifier(config: Config, notifier: Arc<dyn SupplierNotifier>) -> Self {
        let ledger = StockLedger::new(config.ledger.archive_deleted_history);
        let orders = PurchaseOrderService::new(ledger.clone(), notifier);
        Self {
            config: Arc::new(config),
            ledger,
            orders,
        }
    }
}

/// Webhook notifier when a URL is configured, log-only otherwise
fn build_notifier(config: &Config) -> AppResult<Arc<dyn SupplierNotifier>> {
    match &config.notifications.webhook_url {
        Some(url) => {
            tracing::info!("Supplier notices go to {}", url);
            let notifier = WebhookNotifier::new(
                url.clone(),
                config.notifications.webhook_secret.clone(),
                Duration::from_secs(config.notifications.timeout_secs),
            )?;
            Ok(Arc::new(notifier))
        }
        None => Ok(Arc::new(LogNotifier)),
    }
}

/// Create the application router with all routes and middleware
pub fn create_app(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .nest("/api/v1", routes::api_routes())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Root endpoint
async fn root() -> &'static str {
    "Clinic Stock Management API v1.0"
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}
