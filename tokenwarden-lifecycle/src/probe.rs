//! Status query against the trusted intermediary.

use crate::types::SessionStatus;
use async_trait::async_trait;
use std::fmt::Display;
use tracing::warn;

/// Answers "is the credential expired, and how long until it is".
///
/// Implementations never fail: any transport or protocol error must be
/// reported as [`SessionStatus::expired`]. There are no retries; the next
/// scheduled check probes again. [`FailClosed`] does the mapping for
/// implementations built on a fallible query.
#[async_trait]
pub trait StatusProbe: Send + Sync {
    async fn probe(&self) -> SessionStatus;
}

/// Collapses a fallible status query into the status a probe reports.
pub trait FailClosed {
    /// The status on success, [`SessionStatus::expired`] on any error.
    fn fail_closed(self) -> SessionStatus;
}

impl<E: Display> FailClosed for Result<SessionStatus, E> {
    fn fail_closed(self) -> SessionStatus {
        self.unwrap_or_else(|e| {
            warn!("status query failed, treating session as expired: {e}");
            SessionStatus::expired()
        })
    }
}
