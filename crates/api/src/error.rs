//! Mapping of ledger errors onto HTTP responses.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tracing::error;

use ledgerline_core::ledger::{ErrorCategory, LedgerError};

/// JSON error body returned by every ledger route.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Machine-readable code, e.g. `INSUFFICIENT_FUNDS`.
    pub error: &'static str,
    /// Human-readable message.
    pub message: String,
    /// Whether retrying the same request may succeed.
    pub retryable: bool,
}

/// A ledger error on its way out of a handler.
#[derive(Debug)]
pub struct ApiError(pub LedgerError);

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let err = self.0;
        let status = StatusCode::from_u16(err.http_status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        // Storage details stay in the logs
        let message = match err.category() {
            ErrorCategory::Storage if status.is_server_error() => {
                error!(error = %err, "Ledger request failed");
                "The ledger is temporarily unavailable".to_string()
            }
            _ => err.to_string(),
        };

        let body = ErrorBody {
            error: err.error_code(),
            message,
            retryable: err.is_retryable(),
        };
        (status, Json(body)).into_response()
    }
}

/// Result type for ledger handlers.
pub type ApiResult<T> = Result<T, ApiError>;
