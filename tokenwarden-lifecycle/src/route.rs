//! Route gating: whether the current navigation context needs a session.

use std::sync::atomic::{AtomicBool, Ordering};

/// Tells the manager whether session management is wanted right now.
///
/// Consulted at the top of every tick. Must be cheap and non-blocking.
pub trait RouteGate: Send + Sync {
    fn requires_session(&self) -> bool;
}

/// Gate for contexts without public routes.
#[derive(Clone, Copy, Debug, Default)]
pub struct AlwaysActive;

impl RouteGate for AlwaysActive {
    fn requires_session(&self) -> bool {
        true
    }
}

/// Gate backed by a flag that navigation flips.
#[derive(Debug)]
pub struct SharedRouteGate {
    active: AtomicBool,
}

impl SharedRouteGate {
    pub fn new(active: bool) -> Self {
        Self {
            active: AtomicBool::new(active),
        }
    }

    pub fn set_active(&self, active: bool) {
        self.active.store(active, Ordering::SeqCst);
    }
}

impl Default for SharedRouteGate {
    fn default() -> Self {
        Self::new(true)
    }
}

impl RouteGate for SharedRouteGate {
    fn requires_session(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }
}

/// Classifies paths as public (no session) or protected.
#[derive(Clone, Debug, Default)]
pub struct PublicRoutes {
    prefixes: Vec<String>,
}

impl PublicRoutes {
    pub fn new(prefixes: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            prefixes: prefixes
                .into_iter()
                .map(|p| {
                    let p: String = p.into();
                    p.trim_end_matches('/').to_string()
                })
                .filter(|p| !p.is_empty())
                .collect(),
        }
    }

    /// A path is public if it equals a prefix or lies beneath one.
    /// Query strings and fragments are ignored; `/authors` does not match `/auth`.
    pub fn is_public(&self, path: &str) -> bool {
        let path = path
            .split(['?', '#'])
            .next()
            .unwrap_or_default()
            .trim_end_matches('/');
        self.prefixes.iter().any(|prefix| {
            path == prefix
                || path
                    .strip_prefix(prefix.as_str())
                    .is_some_and(|rest| rest.starts_with('/'))
        })
    }
}
