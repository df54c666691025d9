//! Advisory service error types

use thiserror::Error;

/// Errors that can occur while consulting the advisory service
#[derive(Debug, Error)]
pub enum AdvisoryError {
    #[error("Advisory API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Unusable advisory response: {0}")]
    InvalidResponse(String),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}
