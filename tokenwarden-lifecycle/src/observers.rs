//! Zero-argument status observers.
//!
//! Callbacks run synchronously, in subscription order, over a snapshot of
//! the subscriber list. A panicking callback is logged and skipped; it never
//! reaches the caller or the remaining observers.

use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use tracing::error;

type Observer = Arc<dyn Fn() + Send + Sync>;

#[derive(Default)]
struct RegistryInner {
    next_id: AtomicU64,
    observers: Mutex<Vec<(u64, Observer)>>,
}

impl RegistryInner {
    fn lock(&self) -> MutexGuard<'_, Vec<(u64, Observer)>> {
        // A callback never runs under this lock, so poisoning only means a
        // panic elsewhere; the list itself is still consistent.
        self.observers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn remove(&self, id: u64) -> bool {
        let mut observers = self.lock();
        let before = observers.len();
        observers.retain(|(oid, _)| *oid != id);
        observers.len() != before
    }
}

/// Set of callbacks invoked on every status change.
#[derive(Clone, Default)]
pub struct ObserverRegistry {
    inner: Arc<RegistryInner>,
}

impl ObserverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a callback. Keep the handle to unsubscribe later; dropping
    /// it leaves the subscription in place.
    pub fn subscribe<F>(&self, callback: F) -> ObserverHandle
    where
        F: Fn() + Send + Sync + 'static,
    {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner.lock().push((id, Arc::new(callback)));
        ObserverHandle {
            id,
            registry: Arc::downgrade(&self.inner),
        }
    }

    /// Invokes every callback subscribed at the moment of the call.
    ///
    /// Subscribing or unsubscribing from inside a callback is allowed and
    /// takes effect from the next round.
    pub fn notify_all(&self) {
        let snapshot: Vec<(u64, Observer)> = self.inner.lock().clone();
        for (id, callback) in snapshot {
            if let Err(payload) = catch_unwind(AssertUnwindSafe(|| callback())) {
                error!("observer {id} panicked: {}", panic_message(payload.as_ref()));
            }
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops every subscription (teardown).
    pub fn clear(&self) {
        self.inner.lock().clear();
    }
}

/// Subscription token returned by [`ObserverRegistry::subscribe`].
#[derive(Clone, Debug)]
pub struct ObserverHandle {
    id: u64,
    registry: Weak<RegistryInner>,
}

impl ObserverHandle {
    /// Removes the subscription. Returns true only on the call that actually
    /// removed it; later calls (or calls after the registry is gone) are no-ops.
    pub fn unsubscribe(&self) -> bool {
        match self.registry.upgrade() {
            Some(inner) => inner.remove(self.id),
            None => false,
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "non-string panic payload"
    }
}
