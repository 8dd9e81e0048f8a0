// src/error.rs

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;

/// Message shown for transport and unknown failures.
pub const GENERIC_FAILURE_MESSAGE: &str = "Something went wrong. Please try again.";

/// Global Application Error Enum.
/// Centralizes error handling and mapping to HTTP responses.
#[derive(Debug)]
pub enum AppError {
    // 500 Internal Server Error
    InternalServerError(String),

    // 400 Bad Request
    BadRequest(String),

    // 401 Unauthorized
    AuthError(String),

    // 403 Forbidden (wrong role)
    Forbidden(String),

    // 404 Not Found (missing config, no questions, unknown record)
    NotFound(String),

    // 409 Conflict (wrong phase, slot already taken)
    Conflict(String),

    // 403 Forbidden, business rule with a user-facing reason
    Ineligible(String),

    // 502 Bad Gateway, the managed backend failed or was unreachable
    Upstream(String),
}

impl AppError {
    /// The single string the assessment screens display for this error.
    ///
    /// Eligibility and not-found errors keep their own message; everything
    /// else collapses to a generic retry hint.
    pub fn user_message(&self) -> String {
        match self {
            AppError::Ineligible(reason) => reason.clone(),
            AppError::NotFound(msg) | AppError::BadRequest(msg) | AppError::Conflict(msg) => {
                msg.clone()
            }
            AppError::InternalServerError(_)
            | AppError::AuthError(_)
            | AppError::Forbidden(_)
            | AppError::Upstream(_) => GENERIC_FAILURE_MESSAGE.to_string(),
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl std::error::Error for AppError {}

/// Implements `IntoResponse` for `AppError`.
/// Converts the error into a JSON response with appropriate HTTP status code.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::InternalServerError(msg) => {
                tracing::error!("Internal Server Error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal Server Error".to_string(),
                )
            }
            AppError::Upstream(msg) => {
                tracing::error!("Upstream failure: {}", msg);
                (StatusCode::BAD_GATEWAY, GENERIC_FAILURE_MESSAGE.to_string())
            }
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::AuthError(msg) => (StatusCode::UNAUTHORIZED, msg),
            AppError::Forbidden(msg) | AppError::Ineligible(msg) => (StatusCode::FORBIDDEN, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg),
        };
        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

/// Converts `reqwest::Error` into `AppError::Upstream`.
/// Allows using `?` operator on outbound calls.
impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::Upstream(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::BadRequest(err.to_string())
    }
}

impl From<url::ParseError> for AppError {
    fn from(err: url::ParseError) -> Self {
        AppError::InternalServerError(format!("Invalid URL: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_message_keeps_business_reasons() {
        let err = AppError::Ineligible("Retake available tomorrow".to_string());
        assert_eq!(err.user_message(), "Retake available tomorrow");

        let err = AppError::NotFound("Assessment not found".to_string());
        assert_eq!(err.user_message(), "Assessment not found");
    }

    #[test]
    fn test_user_message_hides_transport_details() {
        let err = AppError::Upstream("connection refused (os error 111)".to_string());
        assert_eq!(err.user_message(), GENERIC_FAILURE_MESSAGE);
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(
            AppError::Upstream("x".into()).into_response().status(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            AppError::Ineligible("x".into()).into_response().status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            AppError::Conflict("x".into()).into_response().status(),
            StatusCode::CONFLICT
        );
    }
}
