//! services/api/src/error.rs
//!
//! Defines the primary error type for the API service, plus the mapping
//! from store failures to the HTTP responses handlers return.

use axum::http::StatusCode;
use timetable_core::ports::StoreError;
use tracing::error;

use crate::config::ConfigError;

/// The primary error type for the `api` service.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Represents an error that occurred during configuration loading.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Represents an error that propagated up from one of the engine's
    /// store ports.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Represents an error from the underlying database library.
    #[error("Database Error: {0}")]
    Database(#[from] sqlx::Error),

    /// Represents a standard Input/Output error (e.g., binding to a network socket).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A catch-all for any other unexpected errors.
    #[error("An unexpected internal error occurred: {0}")]
    Internal(String),
}

/// Maps a store failure onto the status and message a handler should
/// return. Backend details are logged, not leaked to clients.
pub fn store_error_response(err: StoreError) -> (StatusCode, String) {
    match err {
        StoreError::NotFound(what) => (StatusCode::NOT_FOUND, format!("not found: {what}")),
        StoreError::Backend(detail) => {
            error!("storage backend failure: {detail}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "storage backend failure".to_string(),
            )
        }
    }
}
