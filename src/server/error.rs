//! HTTP error responses.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

/// Error returned by API handlers, rendered as `{"error": message}`.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request or the run it started failed (400).
    #[error("{0}")]
    BadRequest(String),

    /// A run is already in flight (409).
    #[error("{0}")]
    Conflict(String),

    /// Server-side failure unrelated to the request (500).
    #[error("{0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
