//! Webhook client delivering supplier notices
//!
//! Each notice is POSTed as JSON. When a secret is configured the raw body is
//! signed with HMAC-SHA256 and the base64 digest is sent in
//! `x-csm-signature`, so the receiver can verify it the same way.

use std::time::Duration;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use hmac::{Hmac, Mac};
use reqwest::Client;
use sha2::Sha256;

use crate::error::{AppError, AppResult};
use crate::services::notification::{SupplierNotice, SupplierNotifier};

pub const SIGNATURE_HEADER: &str = "x-csm-signature";

/// Supplier webhook client
#[derive(Clone)]
pub struct WebhookNotifier {
    client: Client,
    url: String,
    secret: Option<String>,
}

impl WebhookNotifier {
    /// Create a new webhook notifier
    pub fn new(url: String, secret: Option<String>, timeout: Duration) -> AppResult<Self> {
        if url.trim().is_empty() {
            return Err(AppError::Configuration(
                "notifications.webhook_url is empty".to_string(),
            ));
        }
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Configuration(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            url,
            secret,
        })
    }

    /// Deliver one notice and wait for the response
    pub async fn deliver(&self, notice: &SupplierNotice) -> AppResult<()> {
        let body = serde_json::to_vec(notice)
            .map_err(|e| AppError::Internal(format!("Failed to encode notice: {}", e)))?;

        let mut request = self
            .client
            .post(&self.url)
            .header(reqwest::header::CONTENT_TYPE, "application/json");
        if let Some(secret) = &self.secret {
            request = request.header(SIGNATURE_HEADER, sign_payload(secret, &body)?);
        }

        let response = request
            .body(body)
            .send()
            .await
            .map_err(|e| AppError::ExternalService(format!("Supplier webhook failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::ExternalService(format!(
                "Supplier webhook returned {}",
                response.status()
            )));
        }

        Ok(())
    }
}

impl SupplierNotifier for WebhookNotifier {
    fn notify(&self, notice: SupplierNotice) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::warn!(order_id = %notice.order_id, "No async runtime, supplier notice dropped");
            return;
        };

        let notifier = self.clone();
        runtime.spawn(async move {
            match notifier.deliver(&notice).await {
                Ok(()) => tracing::debug!(order_id = %notice.order_id, "Supplier notified"),
                Err(e) => tracing::warn!(order_id = %notice.order_id, error = %e, "Supplier notice not delivered"),
            }
        });
    }
}

/// Base64 HMAC-SHA256 of the payload
pub fn sign_payload(secret: &str, body: &[u8]) -> AppResult<String> {
    type HmacSha256 = Hmac<Sha256>;
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| AppError::Internal("Failed to create HMAC".to_string()))?;
    mac.update(body);
    Ok(BASE64.encode(mac.finalize().into_bytes()))
}
