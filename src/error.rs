//! Error handling module
//!
//! Centralized error types and HTTP response conversion.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::domain::LedgerError;

/// Application error types
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    // Client errors (4xx)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Missing required header: {0}")]
    MissingHeader(String),

    #[error("Invalid header value: {0}")]
    InvalidHeader(String),

    // Ledger errors
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

/// Malformed or mistyped JSON bodies get the same envelope as every other error
impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::InvalidRequest(rejection.body_text())
    }
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub error_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl AppError {
    fn status_and_code(&self) -> (StatusCode, &'static str, Option<String>) {
        match self {
            // 400 Bad Request
            AppError::InvalidRequest(msg) => {
                (StatusCode::BAD_REQUEST, "invalid_request", Some(msg.clone()))
            }
            AppError::MissingHeader(header) => {
                (StatusCode::BAD_REQUEST, "missing_header", Some(header.clone()))
            }
            AppError::InvalidHeader(header) => {
                (StatusCode::BAD_REQUEST, "invalid_header", Some(header.clone()))
            }

            // Ledger errors - map to appropriate HTTP status
            AppError::Ledger(err) => match err {
                LedgerError::InvalidInput(msg) => {
                    (StatusCode::BAD_REQUEST, "invalid_input", Some(msg.clone()))
                }
                LedgerError::InsufficientBalance { .. } => {
                    (StatusCode::BAD_REQUEST, "insufficient_balance", Some(err.to_string()))
                }
                LedgerError::AccountNotFound(owner) => {
                    (StatusCode::NOT_FOUND, "account_not_found", Some(owner.clone()))
                }
                LedgerError::ProductNotFound(code) => {
                    (StatusCode::NOT_FOUND, "product_not_found", Some(code.clone()))
                }
                LedgerError::AccountExists(owner) => {
                    (StatusCode::CONFLICT, "account_exists", Some(owner.clone()))
                }
                LedgerError::Conflict { invoice } => {
                    (StatusCode::CONFLICT, "invoice_conflict", Some(invoice.clone()))
                }
                LedgerError::StoreFailure(msg) => {
                    tracing::error!("Store failure: {}", msg);
                    (StatusCode::INTERNAL_SERVER_ERROR, "store_failure", None)
                }
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_code, details) = self.status_and_code();

        // internal details stay in the logs
        let error = if status.is_server_error() {
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        let body = ErrorResponse {
            error,
            error_code: error_code.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}
