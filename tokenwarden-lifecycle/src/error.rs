//! Session lifecycle error types.

use thiserror::Error;

/// Result type for lifecycle configuration and handle operations.
pub type SessionResult<T> = Result<T, SessionError>;

/// Why a renewal did not produce a new credential pair.
///
/// Cloneable so one settled renewal can be handed to every caller that
/// joined it.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum RenewalError {
    /// The renewal credential itself was rejected. The session cannot be
    /// recovered without signing in again.
    #[error("renewal credential rejected")]
    Unauthorized,

    /// Network or server failure. The next cycle may succeed.
    #[error("renewal failed: {0}")]
    Transient(String),

    /// The manager is stopped (public route or torn down).
    #[error("session manager not running")]
    NotRunning,
}

impl RenewalError {
    /// Returns true if the session must be terminated.
    pub fn is_unrecoverable(&self) -> bool {
        matches!(self, Self::Unauthorized)
    }
}

/// Errors raised while building or looking up a session manager.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("session manager not initialized")]
    NotInitialized,
}
