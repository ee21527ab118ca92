//! Error types for ghportal
//!
//! All errors in the application are converted to `AppError`,
//! which implements `IntoResponse` for proper HTTP error responses.
//! The OAuth handlers turn most of these into redirects instead; see
//! `auth::oauth`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Application-wide error type
#[derive(Debug, Error)]
pub enum AppError {
    /// Outbound call answered with a non-2xx status (502)
    ///
    /// `body` is the raw response text; error bodies are not always JSON.
    #[error("Request failed with status {status}: {body}")]
    Request { status: u16, body: String },

    /// Response body was not the JSON we expected (502)
    #[error("Failed to decode response: {0}")]
    Decode(String),

    /// Token endpoint answered 2xx but signalled a failure (502)
    #[error("Token exchange failed: {0}")]
    TokenExchange(String),

    /// CSRF state check failed (400)
    #[error("OAuth state mismatch")]
    StateMismatch,

    /// Session store read/write/destroy failed (500)
    #[error("Session persistence error: {0}")]
    SessionPersistence(String),

    /// HTTP client error (502)
    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    /// Configuration error (500)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal server error (500)
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Short label used for metrics and structured logs
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Request { .. } => "request",
            AppError::Decode(_) => "decode",
            AppError::TokenExchange(_) => "token_exchange",
            AppError::StateMismatch => "state_mismatch",
            AppError::SessionPersistence(_) => "session_persistence",
            AppError::HttpClient(_) => "http_client",
            AppError::Config(_) => "config",
            AppError::Internal(_) => "internal",
        }
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Config(err.to_string())
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::SessionPersistence(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Decode(err.to_string())
    }
}

impl IntoResponse for AppError {
    /// Convert error to HTTP response
    ///
    /// Upstream and internal failures get a generic message so that
    /// provider error text never reaches the browser.
    fn into_response(self) -> Response {
        use axum::Json;

        let (status, error_message) = match &self {
            AppError::StateMismatch => (StatusCode::BAD_REQUEST, self.to_string()),
            AppError::Request { .. }
            | AppError::Decode(_)
            | AppError::TokenExchange(_)
            | AppError::HttpClient(_) => (
                StatusCode::BAD_GATEWAY,
                "Upstream request failed".to_string(),
            ),
            AppError::SessionPersistence(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Session storage unavailable".to_string(),
            ),
            AppError::Config(_) | AppError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
        };

        tracing::error!(error = %self, kind = self.kind(), "Request failed");

        // Record error metric
        use crate::metrics::ERRORS_TOTAL;
        ERRORS_TOTAL.with_label_values(&[self.kind()]).inc();

        let body = Json(serde_json::json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upstream_errors_hide_provider_text() {
        let response = AppError::TokenExchange("bad_verification_code".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn persistence_errors_are_internal() {
        let response = AppError::SessionPersistence("disk full".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn request_error_message_carries_status_and_body() {
        let error = AppError::Request {
            status: 404,
            body: "not found".to_string(),
        };
        assert_eq!(error.to_string(), "Request failed with status 404: not found");
    }
}
