//! HTTP-facing error types.
//!
//! The resolver never surfaces errors (it terminates every path in a
//! string), so these types only cover the REST boundary: the token endpoint
//! and any future administrative routes.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

/// Errors returned by HTTP handlers.
#[derive(Debug, Error)]
pub enum AppError {
    /// Request is malformed or missing a required parameter.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// A required backend is not configured on this deployment.
    #[error("Service unavailable: {0}")]
    Unavailable(String),

    /// Token minting failed.
    #[error("Token error: {0}")]
    Token(String),
}

/// Result type for HTTP handlers.
pub type AppResult<T> = Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Token(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = Json(json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let resp = AppError::InvalidRequest("room".into()).into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let resp = AppError::Unavailable("livekit".into()).into_response();
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);

        let resp = AppError::Token("boom".into()).into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_error_display() {
        let err = AppError::InvalidRequest("missing identity".into());
        assert_eq!(err.to_string(), "Invalid request: missing identity");
    }
}
