//! Session lifecycle configuration.

use crate::error::{SessionError, SessionResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the session manager.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Status check cadence in seconds.
    pub status_check_interval_secs: u64,

    /// Proactive renewal cadence in seconds.
    pub renewal_interval_secs: u64,

    /// Renew once the credential has this many seconds or fewer left.
    pub renew_threshold_secs: u64,

    /// Path prefixes that do not require an active session.
    pub public_route_prefixes: Vec<String>,

    /// Capacity of the typed event broadcast channel.
    pub event_capacity: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            status_check_interval_secs: 30,
            renewal_interval_secs: 1200, // 20 minutes
            renew_threshold_secs: 300,   // 5 minutes before expiry
            public_route_prefixes: vec![
                "/login".to_string(),
                "/logout".to_string(),
                "/auth".to_string(),
                "/forgot-password".to_string(),
                "/reset-password".to_string(),
            ],
            event_capacity: 32,
        }
    }
}

impl SessionConfig {
    pub fn status_check_interval(&self) -> Duration {
        Duration::from_secs(self.status_check_interval_secs)
    }

    pub fn renewal_interval(&self) -> Duration {
        Duration::from_secs(self.renewal_interval_secs)
    }

    /// Rejects settings that would make the timers spin or the event
    /// channel unusable.
    pub fn validate(&self) -> SessionResult<()> {
        if self.status_check_interval_secs == 0 {
            return Err(SessionError::Config(
                "status_check_interval_secs must be non-zero".to_string(),
            ));
        }
        if self.renewal_interval_secs == 0 {
            return Err(SessionError::Config(
                "renewal_interval_secs must be non-zero".to_string(),
            ));
        }
        if self.event_capacity == 0 {
            return Err(SessionError::Config("event_capacity must be non-zero".to_string()));
        }
        Ok(())
    }
}
