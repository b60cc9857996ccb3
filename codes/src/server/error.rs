//! HTTP error types for the code server.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::Error;

/// Error wrapper for converting code service errors to HTTP responses.
pub struct ApiError(pub Error);

impl ApiError {
    fn status_and_type(&self) -> (StatusCode, &'static str) {
        match &self.0 {
            Error::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            Error::AlreadyDumped(_) => (StatusCode::CONFLICT, "already_dumped"),
            Error::Exhausted => (StatusCode::CONFLICT, "exhausted"),
            Error::Transaction(_) => (StatusCode::SERVICE_UNAVAILABLE, "unavailable"),
            Error::StateCorruption(_) => (StatusCode::INTERNAL_SERVER_ERROR, "state_corruption"),
            Error::InvalidInput(_) => (StatusCode::BAD_REQUEST, "bad_data"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type) = self.status_and_type();

        let body = serde_json::json!({
            "status": "error",
            "errorType": error_type,
            "error": self.0.to_string()
        });

        (status, Json(body)).into_response()
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        ApiError(err)
    }
}
