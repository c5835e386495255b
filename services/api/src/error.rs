//! services/api/src/error.rs
//!
//! Defines the primary error type for the entire API service.

use crate::adapters::UploadError;
use crate::config::ConfigError;
use axum::http::StatusCode;
use blog_core::PortError;
use tracing::error;

/// The primary error type for the `api` service.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Represents an error that occurred during configuration loading.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Represents an error that propagated up from the core repositories.
    #[error("Service Port Error: {0}")]
    Port(#[from] PortError),

    /// Represents a failure while storing an uploaded file.
    #[error("Upload Error: {0}")]
    Upload(#[from] UploadError),

    /// Represents a standard Input/Output error (e.g., binding to a network socket).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A catch-all for any other unexpected errors.
    #[error("An unexpected internal error occurred: {0}")]
    Internal(String),
}

impl ApiError {
    /// Converts the error into the `(status, message)` pair handlers return.
    ///
    /// Validation failures keep their message; everything else is logged and
    /// reported as a generic 500.
    pub fn into_response_parts(self, context: &str) -> (StatusCode, String) {
        match self {
            ApiError::Port(PortError::InvalidInput(msg)) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Upload(UploadError::NotAllowed(name)) => (
                StatusCode::BAD_REQUEST,
                UploadError::NotAllowed(name).to_string(),
            ),
            other => {
                error!("{}: {:?}", context, other);
                (StatusCode::INTERNAL_SERVER_ERROR, context.to_string())
            }
        }
    }
}
