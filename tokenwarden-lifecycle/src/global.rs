//! Process-wide session manager handle.
//!
//! One manager per process, created lazily by the first caller and started
//! immediately. Every other call site receives a clone of that instance.

use crate::error::{SessionError, SessionResult};
use crate::scheduler::SessionManager;
use std::sync::{Mutex, MutexGuard};
use tracing::{info, warn};

static GLOBAL: Mutex<Option<SessionManager>> = Mutex::new(None);

/// Acquire the GLOBAL lock, recovering from poison if a builder panicked
/// while it was held.
fn lock_global() -> MutexGuard<'static, Option<SessionManager>> {
    GLOBAL.lock().unwrap_or_else(|poisoned| {
        warn!("recovering from poisoned global session manager lock");
        poisoned.into_inner()
    })
}

/// Returns the process-wide manager, building and starting it on first use.
///
/// `build` runs at most once per process lifetime (or once per
/// [`teardown_global`]); later callers get the existing instance and their
/// builder is ignored. Must be called inside a Tokio runtime.
pub fn init_global<F>(build: F) -> SessionResult<SessionManager>
where
    F: FnOnce() -> SessionResult<SessionManager>,
{
    let mut slot = lock_global();
    if let Some(manager) = slot.as_ref() {
        return Ok(manager.clone());
    }

    let manager = build()?;
    manager.start();
    *slot = Some(manager.clone());
    info!("global session manager initialized");
    Ok(manager)
}

/// Returns the process-wide manager if it has been initialized.
pub fn global() -> SessionResult<SessionManager> {
    lock_global().clone().ok_or(SessionError::NotInitialized)
}

/// Tears down and releases the process-wide manager.
/// Returns false if there was none.
pub fn teardown_global() -> bool {
    let taken = lock_global().take();
    match taken {
        Some(manager) => {
            manager.teardown();
            true
        }
        None => false,
    }
}
