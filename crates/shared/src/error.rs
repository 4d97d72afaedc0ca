//! Application-wide error types.
//!
//! Request-level failures are `LedgerError`s rendered by the API crate; this
//! type covers process startup.

use thiserror::Error;

/// Result type alias using `AppError`.
pub type AppResult<T> = Result<T, AppError>;

/// Startup error types.
#[derive(Debug, Error)]
pub enum AppError {
    /// Backing store temporarily unavailable.
    #[error("Service unavailable: {0}")]
    Unavailable(String),

    /// Configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        Self::Configuration(err.to_string())
    }
}
