//! HTTP surfaces of the trusted session intermediary.
//!
//! Implements the lifecycle crate's seams over reqwest:
//! - [`IntermediaryClient`]: status query ([`StatusProbe`]) and renewal
//!   exchange ([`RenewalClient`])
//! - [`RedirectTerminator`]: sign-out call plus redirect hand-off
//!
//! [`StatusProbe`]: tokenwarden_lifecycle::StatusProbe
//! [`RenewalClient`]: tokenwarden_lifecycle::RenewalClient

pub mod client;
pub mod config;
pub mod error;
pub mod terminator;
pub mod wire;

pub use client::IntermediaryClient;
pub use config::HttpConfig;
pub use error::{HttpError, HttpResult};
pub use terminator::RedirectTerminator;
