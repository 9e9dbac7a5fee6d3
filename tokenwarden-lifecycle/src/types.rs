//! Shared types for session lifecycle operations.

use crate::error::RenewalError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Derived status of the current access credential.
///
/// Recomputed on every probe; the manager keeps exactly one last-known copy.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStatus {
    pub is_expired: bool,
    pub seconds_until_expiry: u64,
    pub should_renew_soon: bool,
    /// When the intermediary answered (or the probe gave up).
    pub observed_at: DateTime<Utc>,
}

impl SessionStatus {
    /// Builds a status, deriving `should_renew_soon` from the threshold.
    pub fn new(is_expired: bool, seconds_until_expiry: u64, renew_threshold_secs: u64) -> Self {
        Self {
            is_expired,
            seconds_until_expiry,
            should_renew_soon: !is_expired && seconds_until_expiry <= renew_threshold_secs,
            observed_at: Utc::now(),
        }
    }

    /// The fail-closed status: unknown is treated as expired.
    pub fn expired() -> Self {
        Self {
            is_expired: true,
            seconds_until_expiry: 0,
            should_renew_soon: false,
            observed_at: Utc::now(),
        }
    }

    /// Estimated absolute expiry, anchored at the observation time.
    pub fn expires_at(&self) -> DateTime<Utc> {
        i64::try_from(self.seconds_until_expiry)
            .ok()
            .and_then(chrono::Duration::try_seconds)
            .and_then(|d| self.observed_at.checked_add_signed(d))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }
}

/// A freshly minted access/renewal credential pair.
///
/// Only ever passed through to the caller of a renewal; never stored.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialPair {
    pub access_credential: String,
    pub renewal_credential: String,
}

impl fmt::Debug for CredentialPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialPair")
            .field("access_credential", &"<redacted>")
            .field("renewal_credential", &"<redacted>")
            .finish()
    }
}

/// Result of one renewal exchange.
pub type RefreshOutcome = Result<CredentialPair, RenewalError>;

/// Lifecycle of the manager. Timers exist iff `Running`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    Stopped,
    Running,
}

/// Why the session is being ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminationReason {
    /// A status check reported the credential as expired.
    Expired,
    /// The intermediary rejected the renewal credential.
    RenewalRejected,
}

/// Typed signal published alongside the zero-argument observer callbacks.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionEvent {
    /// A probe completed and became the last-known status.
    StatusChanged(SessionStatus),
    /// A renewal produced a new credential pair.
    RenewalSucceeded,
    /// A renewal failed. Non-terminal unless followed by `SessionExpired`.
    RenewalFailed { reason: RenewalError },
    /// The session is being terminated.
    SessionExpired { reason: TerminationReason },
}
