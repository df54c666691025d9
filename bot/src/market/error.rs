//! Marketplace error types

use thiserror::Error;

/// Errors that can occur while talking to the ad service
#[derive(Debug, Error)]
pub enum MarketError {
    #[error("Version conflict on draft {draft_id}: the draft changed behind our back")]
    Conflict { draft_id: String },

    #[error("Draft {0} not found on the ad service")]
    NotFound(String),

    #[error("Ad service error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid response from ad service: {0}")]
    InvalidResponse(String),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl MarketError {
    /// Check if this is a stale version-token rejection
    pub fn is_conflict(&self) -> bool {
        matches!(self, MarketError::Conflict { .. })
    }
}
