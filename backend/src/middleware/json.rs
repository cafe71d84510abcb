//! JSON body extraction with typed rejections
//!
//! Bodies that do not parse are reported through `AppError` like every other
//! input error, instead of axum's plain-text rejection.

use axum::extract::{rejection::JsonRejection, FromRequest, Request};
use axum::Json;

use crate::error::AppError;

/// Field name reported when the body itself is malformed
pub const BODY_FIELD: &str = "body";

/// `Json` extractor whose rejection is an `AppError::Validation`
#[derive(Debug, Clone, Copy, Default)]
pub struct ApiJson<T>(pub T);

#[axum::async_trait]
impl<S, T> FromRequest<S> for ApiJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(ApiJson(value)),
            Err(rejection) => Err(AppError::validation(BODY_FIELD, rejection.body_text())),
        }
    }
}
