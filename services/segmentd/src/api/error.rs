//! Error envelope and helpers for HTTP handlers.
use crate::api::types::ErrorResponse;
use crate::store::StoreError;
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// An API error that renders as a JSON [`ErrorResponse`].
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub body: ErrorResponse,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &str, message: &str) -> Self {
        Self {
            status,
            body: ErrorResponse {
                code: code.to_string(),
                message: message.to_string(),
                request_id: None,
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

/// 400 with code `validation_error`.
pub fn api_validation_error(message: &str) -> ApiError {
    ApiError::new(StatusCode::BAD_REQUEST, "validation_error", message)
}

/// 404 with code `not_found`.
pub fn api_not_found(message: &str) -> ApiError {
    ApiError::new(StatusCode::NOT_FOUND, "not_found", message)
}

/// 409 with a caller-chosen code, e.g. `already_exists`.
pub fn api_conflict(code: &str, message: &str) -> ApiError {
    ApiError::new(StatusCode::CONFLICT, code, message)
}

/// 500 with code `internal`. Logs the underlying store error; the response
/// body carries only the public message.
pub fn api_internal(message: &str, err: &StoreError) -> ApiError {
    tracing::error!(error = %err, "segmentd storage error: {message}");
    ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "internal", message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn helpers_set_status_and_code() {
        let err = api_validation_error("bad percent");
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.body.code, "validation_error");

        let err = api_not_found("segment beta not found");
        assert_eq!(err.status, StatusCode::NOT_FOUND);
        assert_eq!(err.body.code, "not_found");

        let err = api_conflict("already_exists", "segment already exists");
        assert_eq!(err.status, StatusCode::CONFLICT);
        assert_eq!(err.body.code, "already_exists");

        let err = api_internal("boom", &StoreError::Unexpected(anyhow::anyhow!("db down")));
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.body.code, "internal");
        assert_eq!(err.body.message, "boom");
    }
}
