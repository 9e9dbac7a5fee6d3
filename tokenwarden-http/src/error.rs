//! Intermediary transport errors.
//!
//! These never cross the lifecycle seams: the probe turns them into the
//! fail-closed status and the renewal path into a `RenewalError`.

use thiserror::Error;

/// Result type for intermediary calls.
pub type HttpResult<T> = Result<T, HttpError>;

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("intermediary returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl HttpError {
    /// True when the intermediary rejected the credential outright.
    pub fn is_rejection(&self) -> bool {
        matches!(self, Self::Status { status: 401 | 403, .. })
    }
}
