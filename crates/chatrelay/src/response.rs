//! JSON error responses shared by handlers.

use axum::Json;
use axum::http::StatusCode;
use serde::Serialize;

/// JSON error response body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub status: u16,
}

pub type ErrorResponse = (StatusCode, Json<ErrorBody>);

pub fn error(status: StatusCode, message: impl Into<String>) -> ErrorResponse {
    (
        status,
        Json(ErrorBody {
            error: message.into(),
            status: status.as_u16(),
        }),
    )
}

pub fn bad_request(message: impl Into<String>) -> ErrorResponse {
    error(StatusCode::BAD_REQUEST, message)
}

pub fn not_found(message: impl Into<String>) -> ErrorResponse {
    error(StatusCode::NOT_FOUND, message)
}

pub fn conflict(message: impl Into<String>) -> ErrorResponse {
    error(StatusCode::CONFLICT, message)
}

pub fn internal_error(message: impl Into<String>) -> ErrorResponse {
    error(StatusCode::INTERNAL_SERVER_ERROR, message)
}

pub fn service_unavailable(message: impl Into<String>) -> ErrorResponse {
    error(StatusCode::SERVICE_UNAVAILABLE, message)
}
