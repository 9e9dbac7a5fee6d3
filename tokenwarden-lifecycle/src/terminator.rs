//! Session termination hook.

use crate::types::TerminationReason;
use async_trait::async_trait;

/// Ends the session (sign-out and redirect) once renewal is impossible.
///
/// Called at most once per expiry episode.
#[async_trait]
pub trait SessionTerminator: Send + Sync {
    async fn terminate(&self, reason: TerminationReason);
}
