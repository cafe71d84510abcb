//! Actor identity extraction
//!
//! Authentication happens upstream; this service only needs an opaque actor
//! identity for its audit trail, read from the `x-actor-id` header.

use axum::http::request::Parts;

use crate::error::AppError;

pub const ACTOR_HEADER: &str = "x-actor-id";

/// Used when the caller supplies no identity
pub const ANONYMOUS: &str = "anonymous";

/// Extractor for the acting user
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Actor(pub String);

impl Actor {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[axum::async_trait]
impl<S> axum::extract::FromRequestParts<S> for Actor
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        match parts.headers.get(ACTOR_HEADER) {
            None => Ok(Actor(ANONYMOUS.to_string())),
            Some(value) => {
                let actor = value
                    .to_str()
                    .map_err(|_| AppError::validation(ACTOR_HEADER, "Actor header must be visible ASCII"))?
                    .trim();
                if actor.is_empty() {
                    return Err(AppError::validation(ACTOR_HEADER, "Actor header is empty"));
                }
                Ok(Actor(actor.to_string()))
            }
        }
    }
}
