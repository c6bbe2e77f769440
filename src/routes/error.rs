//! Error type returned by route handlers.

use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use thiserror::Error;

/// Per-request failures, converted into an HTTP error response.
#[derive(Debug, Error)]
pub enum ApiError {
    /// A critical dependency is not ready; callers are expected to retry.
    #[error("{0}")]
    ServiceUnavailable(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            ApiError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        };

        (status, Json(json!({ "detail": self.to_string() }))).into_response()
    }
}
