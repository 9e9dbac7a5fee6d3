//! Session lifecycle scheduler.
//!
//! Owns two independent timers while running:
//! - Status check (default 30s): probe, cache, notify, terminate once on expiry
//! - Proactive renewal (default 20min): single-flight refresh, re-probe on success
//!
//! Every `start()` opens a new run epoch. Tick handlers and settling
//! renewals act only if the manager is still running in the epoch they were
//! issued under, so nothing queued before a `stop()` can notify observers or
//! terminate the session afterwards.

use crate::config::SessionConfig;
use crate::coordinator::RefreshCoordinator;
use crate::error::{RenewalError, SessionResult};
use crate::observers::{ObserverHandle, ObserverRegistry};
use crate::probe::StatusProbe;
use crate::renewal::RenewalClient;
use crate::route::{AlwaysActive, PublicRoutes, RouteGate, SharedRouteGate};
use crate::terminator::SessionTerminator;
use crate::types::*;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

/// The two scheduled tasks of one run. Dropping cancels both.
struct Timers {
    status: JoinHandle<()>,
    renewal: JoinHandle<()>,
}

impl Drop for Timers {
    fn drop(&mut self) {
        self.status.abort();
        self.renewal.abort();
    }
}

struct SchedulerState {
    lifecycle: LifecycleState,
    epoch: u64,
    timers: Option<Timers>,
    status: SessionStatus,
    /// Sequence number of the probe behind `status`.
    applied_probe: u64,
    /// Sequence number of the last renewal whose outcome was acted on.
    settled_renewal: u64,
    /// Set once the terminator has fired for the current expiry episode.
    expired_notified: bool,
    /// Set after the renewal credential was rejected; cleared by `start()`.
    renewal_halted: bool,
    torn_down: bool,
    last_event: Option<SessionEvent>,
}

struct Inner {
    config: SessionConfig,
    probe: Arc<dyn StatusProbe>,
    coordinator: RefreshCoordinator,
    terminator: Arc<dyn SessionTerminator>,
    gate: Arc<dyn RouteGate>,
    navigation: SharedRouteGate,
    public_routes: PublicRoutes,
    observers: ObserverRegistry,
    events: broadcast::Sender<SessionEvent>,
    probe_seq: AtomicU64,
    state: Mutex<SchedulerState>,
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, SchedulerState> {
        // Never held across an await or a callback.
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Builder for [`SessionManager`].
pub struct SessionManagerBuilder {
    config: SessionConfig,
    probe: Arc<dyn StatusProbe>,
    renewal: Arc<dyn RenewalClient>,
    terminator: Arc<dyn SessionTerminator>,
    gate: Arc<dyn RouteGate>,
}

impl SessionManagerBuilder {
    pub fn config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    /// Extra gate consulted on every tick, on top of navigation state.
    pub fn route_gate(mut self, gate: Arc<dyn RouteGate>) -> Self {
        self.gate = gate;
        self
    }

    /// Builds a stopped manager.
    pub fn build(self) -> SessionResult<SessionManager> {
        self.config.validate()?;
        let (events, _) = broadcast::channel(self.config.event_capacity);
        let public_routes = PublicRoutes::new(self.config.public_route_prefixes.clone());

        Ok(SessionManager {
            inner: Arc::new(Inner {
                probe: self.probe,
                coordinator: RefreshCoordinator::new(self.renewal),
                terminator: self.terminator,
                gate: self.gate,
                navigation: SharedRouteGate::new(true),
                public_routes,
                observers: ObserverRegistry::new(),
                events,
                probe_seq: AtomicU64::new(0),
                state: Mutex::new(SchedulerState {
                    lifecycle: LifecycleState::Stopped,
                    epoch: 0,
                    timers: None,
                    status: SessionStatus::expired(),
                    applied_probe: 0,
                    settled_renewal: 0,
                    expired_notified: false,
                    renewal_halted: false,
                    torn_down: false,
                    last_event: None,
                }),
                config: self.config,
            }),
        })
    }
}

/// Process-wide coordinator of the access credential's lifecycle.
///
/// Cheap to clone; all clones share one state. Lifecycle calls that spawn
/// timers (`start`, `restart`, `navigate`) must run inside a Tokio runtime.
#[derive(Clone)]
pub struct SessionManager {
    inner: Arc<Inner>,
}

impl SessionManager {
    pub fn builder(
        probe: Arc<dyn StatusProbe>,
        renewal: Arc<dyn RenewalClient>,
        terminator: Arc<dyn SessionTerminator>,
    ) -> SessionManagerBuilder {
        SessionManagerBuilder {
            config: SessionConfig::default(),
            probe,
            renewal,
            terminator,
            gate: Arc::new(AlwaysActive),
        }
    }

    // ── Lifecycle ──

    /// Stopped → Running: probes immediately, then arms both timers.
    /// No-op if already running.
    pub fn start(&self) {
        let mut state = self.inner.lock();
        if state.torn_down {
            warn!("start() on a torn-down session manager ignored");
            return;
        }
        if state.lifecycle == LifecycleState::Running {
            debug!("session manager already running");
            return;
        }

        state.epoch += 1;
        state.lifecycle = LifecycleState::Running;
        state.renewal_halted = false;
        state.timers = Some(self.spawn_timers(state.epoch));
        info!("session manager started (run {})", state.epoch);
    }

    /// Running → Stopped: cancels both timers and re-arms the expiry signal.
    /// Renewals already issued still settle, but are not acted on.
    /// No-op if already stopped.
    pub fn stop(&self) {
        let timers = {
            let mut state = self.inner.lock();
            if state.lifecycle == LifecycleState::Stopped {
                return;
            }
            state.lifecycle = LifecycleState::Stopped;
            state.expired_notified = false;
            info!("session manager stopped (run {})", state.epoch);
            state.timers.take()
        };
        drop(timers);
    }

    pub fn restart(&self) {
        self.stop();
        self.start();
    }

    /// Applies a navigation: public paths stop the manager, protected paths
    /// start it.
    pub fn navigate(&self, path: &str) {
        let protected = !self.inner.public_routes.is_public(path);
        self.inner.navigation.set_active(protected);
        if protected {
            debug!("entering protected route {path}");
            self.start();
        } else {
            debug!("entering public route {path}");
            self.stop();
        }
    }

    /// Stops the manager for good and drops every observer.
    pub fn teardown(&self) {
        self.stop();
        self.inner.lock().torn_down = true;
        self.inner.observers.clear();
        info!("session manager torn down");
    }

    // ── Queries ──

    pub fn state(&self) -> LifecycleState {
        self.inner.lock().lifecycle
    }

    pub fn is_running(&self) -> bool {
        self.state() == LifecycleState::Running
    }

    /// Last-known expiry flag. True until the first probe completes.
    pub fn is_expired(&self) -> bool {
        self.inner.lock().status.is_expired
    }

    /// Last-known seconds until expiry.
    pub fn time_until_expiry(&self) -> u64 {
        self.inner.lock().status.seconds_until_expiry
    }

    pub fn status(&self) -> SessionStatus {
        self.inner.lock().status.clone()
    }

    /// Most recent typed event, for zero-argument observers that need to
    /// tell a transient renewal failure from a plain status change.
    pub fn last_event(&self) -> Option<SessionEvent> {
        self.inner.lock().last_event.clone()
    }

    pub fn config(&self) -> &SessionConfig {
        &self.inner.config
    }

    /// Exchanges issued by the refresh coordinator so far.
    pub fn renewals_issued(&self) -> u64 {
        self.inner.coordinator.issued()
    }

    // ── Notification ──

    pub fn subscribe<F>(&self, callback: F) -> ObserverHandle
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.inner.observers.subscribe(callback)
    }

    pub fn observers(&self) -> &ObserverRegistry {
        &self.inner.observers
    }

    /// Typed event stream. Lagging receivers lose the oldest events.
    pub fn events(&self) -> broadcast::Receiver<SessionEvent> {
        self.inner.events.subscribe()
    }

    // ── Renewal ──

    /// Explicit renewal, deduplicated against any renewal already in flight.
    ///
    /// Rejected with [`RenewalError::NotRunning`] while stopped, and with
    /// [`RenewalError::Unauthorized`] after the renewal credential was
    /// rejected in this run; neither reaches the intermediary.
    pub async fn force_refresh(&self) -> RefreshOutcome {
        match self.running_epoch() {
            Some(epoch) => self.renew(epoch).await,
            None => Err(RenewalError::NotRunning),
        }
    }

    /// One status-check tick, as the timer would run it.
    pub async fn run_status_check(&self) {
        if let Some(epoch) = self.running_epoch() {
            self.status_check(epoch).await;
        }
    }

    /// One proactive-renewal tick, as the timer would run it.
    pub async fn run_renewal_cycle(&self) -> RefreshOutcome {
        match self.running_epoch() {
            Some(epoch) => self.renewal_cycle(epoch).await,
            None => Err(RenewalError::NotRunning),
        }
    }

    // ── Internals ──

    fn downgrade(&self) -> Weak<Inner> {
        Arc::downgrade(&self.inner)
    }

    fn upgrade(weak: &Weak<Inner>) -> Option<Self> {
        weak.upgrade().map(|inner| Self { inner })
    }

    fn running_epoch(&self) -> Option<u64> {
        let state = self.inner.lock();
        (state.lifecycle == LifecycleState::Running).then_some(state.epoch)
    }

    fn is_current(&self, epoch: u64) -> bool {
        let state = self.inner.lock();
        state.lifecycle == LifecycleState::Running && state.epoch == epoch
    }

    fn route_active(&self) -> bool {
        self.inner.navigation.requires_session() && self.inner.gate.requires_session()
    }

    fn spawn_timers(&self, epoch: u64) -> Timers {
        let status_period = self.inner.config.status_check_interval();
        let renewal_period = self.inner.config.renewal_interval();

        let weak = self.downgrade();
        let status = tokio::spawn(async move {
            // First tick fires immediately: the probe on start.
            let mut ticker = tokio::time::interval(status_period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let Some(manager) = Self::upgrade(&weak) else { break };
                manager.status_check(epoch).await;
            }
        });

        let weak = self.downgrade();
        let renewal = tokio::spawn(async move {
            let mut ticker =
                tokio::time::interval_at(Instant::now() + renewal_period, renewal_period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let Some(manager) = Self::upgrade(&weak) else { break };
                // Detached so a slow exchange never delays the cadence;
                // overlapping cycles join the same exchange.
                tokio::spawn(async move {
                    let _ = manager.renewal_cycle(epoch).await;
                });
            }
        });

        Timers { status, renewal }
    }

    async fn status_check(&self, epoch: u64) {
        if !self.is_current(epoch) {
            debug!("status tick from stale run {epoch} skipped");
            return;
        }
        if !self.route_active() {
            debug!("route does not require a session, status check skipped");
            return;
        }

        let Some(status) = self.probe_and_apply(epoch).await else {
            return;
        };

        if status.should_renew_soon && !self.inner.lock().renewal_halted {
            debug!(
                "credential expires in {}s, renewing",
                status.seconds_until_expiry
            );
            let manager = self.clone();
            tokio::spawn(async move {
                let _ = manager.renewal_cycle(epoch).await;
            });
        }
    }

    async fn renewal_cycle(&self, epoch: u64) -> RefreshOutcome {
        if !self.is_current(epoch) {
            debug!("renewal tick from stale run {epoch} skipped");
            return Err(RenewalError::NotRunning);
        }
        if !self.route_active() {
            debug!("route does not require a session, renewal skipped");
            return Err(RenewalError::NotRunning);
        }
        self.renew(epoch).await
    }

    async fn renew(&self, epoch: u64) -> RefreshOutcome {
        if self.inner.lock().renewal_halted {
            return Err(RenewalError::Unauthorized);
        }

        let (seq, outcome) = self.inner.coordinator.join().await;
        self.settle(epoch, seq, &outcome).await;
        outcome
    }

    /// Acts on a settled renewal once, however many callers joined it.
    async fn settle(&self, epoch: u64, seq: u64, outcome: &RefreshOutcome) {
        let terminate = {
            let mut state = self.inner.lock();
            if state.lifecycle != LifecycleState::Running || state.epoch != epoch {
                debug!("renewal #{seq} settled after stop, outcome ignored");
                return;
            }
            if seq <= state.settled_renewal {
                return;
            }
            state.settled_renewal = seq;

            match outcome {
                Ok(_) => {
                    self.record(&mut state, SessionEvent::RenewalSucceeded);
                    false
                }
                Err(reason) => {
                    self.record(
                        &mut state,
                        SessionEvent::RenewalFailed {
                            reason: reason.clone(),
                        },
                    );
                    if reason.is_unrecoverable() {
                        state.renewal_halted = true;
                        !std::mem::replace(&mut state.expired_notified, true)
                    } else {
                        warn!("renewal #{seq} failed, retrying next cycle: {reason}");
                        false
                    }
                }
            }
        };

        match outcome {
            Ok(_) => {
                debug!("renewal #{seq} succeeded, re-probing");
                self.probe_and_apply(epoch).await;
            }
            Err(_) => {
                self.inner.observers.notify_all();
                if terminate {
                    self.terminate(epoch, TerminationReason::RenewalRejected).await;
                }
            }
        }
    }

    /// Probes, and applies the result unless the run ended or a newer probe
    /// already landed. Returns the applied status.
    async fn probe_and_apply(&self, epoch: u64) -> Option<SessionStatus> {
        let seq = self.inner.probe_seq.fetch_add(1, Ordering::SeqCst) + 1;
        let status = self.inner.probe.probe().await;
        debug!(
            "probe #{seq}: expired={} remaining={}s renew_soon={}",
            status.is_expired, status.seconds_until_expiry, status.should_renew_soon
        );

        let terminate = {
            let mut state = self.inner.lock();
            if state.lifecycle != LifecycleState::Running || state.epoch != epoch {
                debug!("probe #{seq} landed after stop, discarded");
                return None;
            }
            if seq < state.applied_probe {
                debug!("probe #{seq} superseded by #{}, discarded", state.applied_probe);
                return None;
            }
            state.applied_probe = seq;
            state.status = status.clone();
            self.record(&mut state, SessionEvent::StatusChanged(status.clone()));

            if status.is_expired {
                !std::mem::replace(&mut state.expired_notified, true)
            } else {
                // A rejected renewal already ended this session; only a
                // restart re-arms termination.
                if !state.renewal_halted {
                    state.expired_notified = false;
                }
                false
            }
        };

        self.inner.observers.notify_all();
        if terminate {
            self.terminate(epoch, TerminationReason::Expired).await;
        }
        Some(status)
    }

    async fn terminate(&self, epoch: u64, reason: TerminationReason) {
        {
            let mut state = self.inner.lock();
            if state.lifecycle != LifecycleState::Running || state.epoch != epoch {
                return;
            }
            self.record(&mut state, SessionEvent::SessionExpired { reason });
        }
        info!("session terminated: {reason:?}");
        self.inner.observers.notify_all();
        self.inner.terminator.terminate(reason).await;
    }

    fn record(&self, state: &mut SchedulerState, event: SessionEvent) {
        state.last_event = Some(event.clone());
        let _ = self.inner.events.send(event);
    }
}
