//! Shared test doubles for the lifecycle integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokenwarden_lifecycle::{
    CredentialPair, RefreshOutcome, RenewalClient, RenewalError, SessionConfig, SessionManager,
    SessionStatus, SessionTerminator, StatusProbe, TerminationReason,
};

pub const THRESHOLD: u64 = 300;

pub fn valid(secs: u64) -> SessionStatus {
    SessionStatus::new(false, secs, THRESHOLD)
}

pub fn expired() -> SessionStatus {
    SessionStatus::expired()
}

pub fn pair(n: u32) -> CredentialPair {
    CredentialPair {
        access_credential: format!("access-{n}"),
        renewal_credential: format!("renewal-{n}"),
    }
}

/// Returns scripted statuses in order, repeating the last one forever.
pub struct ScriptedProbe {
    script: Mutex<VecDeque<SessionStatus>>,
    last: Mutex<SessionStatus>,
    calls: AtomicUsize,
}

impl ScriptedProbe {
    pub fn new(script: Vec<SessionStatus>) -> Arc<Self> {
        let last = script.last().cloned().unwrap_or_else(expired);
        Arc::new(Self {
            script: Mutex::new(VecDeque::from(script)),
            last: Mutex::new(last),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn always(status: SessionStatus) -> Arc<Self> {
        Self::new(vec![status])
    }

    /// Appends statuses to the script.
    pub fn then(&self, statuses: Vec<SessionStatus>) {
        let mut script = self.script.lock().unwrap();
        if let Some(last) = statuses.last() {
            *self.last.lock().unwrap() = last.clone();
        }
        script.extend(statuses);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StatusProbe for ScriptedProbe {
    async fn probe(&self) -> SessionStatus {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let next = self.script.lock().unwrap().pop_front();
        match next {
            Some(status) => status,
            None => self.last.lock().unwrap().clone(),
        }
    }
}

/// Renewal client with a fixed outcome and optional latency.
pub struct MockRenewal {
    outcome: Mutex<RefreshOutcome>,
    delay: Duration,
    calls: AtomicUsize,
}

impl MockRenewal {
    pub fn new(outcome: RefreshOutcome, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            outcome: Mutex::new(outcome),
            delay,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn succeeding() -> Arc<Self> {
        Self::new(Ok(pair(1)), Duration::ZERO)
    }

    pub fn rejecting() -> Arc<Self> {
        Self::new(Err(RenewalError::Unauthorized), Duration::ZERO)
    }

    pub fn failing() -> Arc<Self> {
        Self::new(
            Err(RenewalError::Transient("503 Service Unavailable".into())),
            Duration::ZERO,
        )
    }

    pub fn set_outcome(&self, outcome: RefreshOutcome) {
        *self.outcome.lock().unwrap() = outcome;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RenewalClient for MockRenewal {
    async fn renew(&self) -> RefreshOutcome {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.outcome.lock().unwrap().clone()
    }
}

/// Records every termination.
#[derive(Default)]
pub struct RecordingTerminator {
    reasons: Mutex<Vec<TerminationReason>>,
}

impl RecordingTerminator {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn count(&self) -> usize {
        self.reasons.lock().unwrap().len()
    }

    pub fn reasons(&self) -> Vec<TerminationReason> {
        self.reasons.lock().unwrap().clone()
    }
}

#[async_trait]
impl SessionTerminator for RecordingTerminator {
    async fn terminate(&self, reason: TerminationReason) {
        self.reasons.lock().unwrap().push(reason);
    }
}

pub fn test_config() -> SessionConfig {
    SessionConfig {
        status_check_interval_secs: 30,
        renewal_interval_secs: 1200,
        renew_threshold_secs: THRESHOLD,
        ..SessionConfig::default()
    }
}

pub fn manager(
    probe: &Arc<ScriptedProbe>,
    renewal: &Arc<MockRenewal>,
    terminator: &Arc<RecordingTerminator>,
) -> SessionManager {
    SessionManager::builder(probe.clone(), renewal.clone(), terminator.clone())
        .config(test_config())
        .build()
        .expect("test config is valid")
}

/// Lets every spawned task run to idle. On a paused clock this advances
/// time by one millisecond, well short of any tick.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(1)).await;
}
