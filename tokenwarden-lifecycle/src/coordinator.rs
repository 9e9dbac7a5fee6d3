//! Single-flight renewal.
//!
//! At most one [`RenewalClient::renew`] call is outstanding per coordinator.
//! Callers that arrive while one is in flight join it and receive the same
//! outcome. The in-flight slot is cleared the moment the call settles, so
//! the next request after settlement starts a fresh exchange.
//!
//! The exchange runs on its own task: a caller that gives up waiting does
//! not cancel it, and a renewal that was already issued always settles.

use crate::error::RenewalError;
use crate::renewal::RenewalClient;
use crate::types::RefreshOutcome;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{Mutex, watch};
use tracing::{debug, error};

/// Handle on the exchange currently outstanding.
struct InFlight {
    seq: u64,
    settled: watch::Receiver<Option<RefreshOutcome>>,
}

/// Deduplicates concurrent renewal requests.
pub struct RefreshCoordinator {
    client: Arc<dyn RenewalClient>,
    in_flight: Arc<Mutex<Option<InFlight>>>,
    /// Number of exchanges actually issued.
    issued: AtomicU64,
}

impl RefreshCoordinator {
    pub fn new(client: Arc<dyn RenewalClient>) -> Self {
        Self {
            client,
            in_flight: Arc::new(Mutex::new(None)),
            issued: AtomicU64::new(0),
        }
    }

    /// Renews, or joins the renewal already in flight.
    pub async fn refresh_once(&self) -> RefreshOutcome {
        self.join().await.1
    }

    /// Like [`refresh_once`](Self::refresh_once), also returning the sequence
    /// number of the exchange that produced the outcome. Every caller that
    /// joined the same exchange sees the same number.
    pub async fn join(&self) -> (u64, RefreshOutcome) {
        let (seq, mut settled) = {
            let mut slot = self.in_flight.lock().await;
            match slot.as_ref() {
                Some(pending) => {
                    debug!("renewal #{} already in flight, joining", pending.seq);
                    (pending.seq, pending.settled.clone())
                }
                None => {
                    let pending = self.launch();
                    let joined = (pending.seq, pending.settled.clone());
                    *slot = Some(pending);
                    joined
                }
            }
        };

        let outcome = match settled.wait_for(Option::is_some).await {
            Ok(result) => (*result)
                .clone()
                .unwrap_or_else(|| Err(RenewalError::Transient("renewal settled empty".into()))),
            Err(_) => Err(RenewalError::Transient(
                "renewal task dropped before settling".to_string(),
            )),
        };
        (seq, outcome)
    }

    /// Returns true while an exchange is outstanding.
    pub async fn is_in_flight(&self) -> bool {
        self.in_flight.lock().await.is_some()
    }

    /// Total exchanges issued since construction.
    pub fn issued(&self) -> u64 {
        self.issued.load(Ordering::Relaxed)
    }

    /// Spawns the exchange. Called with the slot lock held.
    fn launch(&self) -> InFlight {
        let (tx, rx) = watch::channel(None);
        let client = Arc::clone(&self.client);
        let slot = Arc::clone(&self.in_flight);
        let seq = self.issued.fetch_add(1, Ordering::Relaxed) + 1;
        debug!("issuing renewal #{seq}");

        tokio::spawn(async move {
            // Inner task so a panicking client still settles the slot.
            let outcome = match tokio::spawn(async move { client.renew().await }).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    error!("renewal #{seq} aborted: {e}");
                    Err(RenewalError::Transient(format!("renewal task failed: {e}")))
                }
            };

            // The slot is empty before any caller can observe the result.
            *slot.lock().await = None;
            let _ = tx.send(Some(outcome));
        });

        InFlight { seq, settled: rx }
    }
}
