//! Session token lifecycle management.
//!
//! Keeps a short-lived access credential valid across an open-ended session:
//! - Status polling against the trusted intermediary (fail-closed)
//! - Proactive renewal before expiry
//! - Single-flight deduplication of concurrent renewals
//! - Observer notification on every status change
//! - One-shot session termination when renewal is impossible
//!
//! The credential bytes themselves never pass through this crate's state;
//! it only sees derived status and renewal outcomes.

pub mod config;
pub mod coordinator;
pub mod error;
pub mod global;
pub mod observers;
pub mod probe;
pub mod renewal;
pub mod route;
pub mod scheduler;
pub mod terminator;
pub mod types;

pub use config::SessionConfig;
pub use coordinator::RefreshCoordinator;
pub use error::{RenewalError, SessionError, SessionResult};
pub use observers::{ObserverHandle, ObserverRegistry};
pub use probe::{FailClosed, StatusProbe};
pub use renewal::RenewalClient;
pub use route::{AlwaysActive, PublicRoutes, RouteGate, SharedRouteGate};
pub use scheduler::{SessionManager, SessionManagerBuilder};
pub use terminator::SessionTerminator;
pub use types::*;
