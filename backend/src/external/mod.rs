//! External API integrations

pub mod supplier_webhook;

pub use supplier_webhook::WebhookNotifier;
