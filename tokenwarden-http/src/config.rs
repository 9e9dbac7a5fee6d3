//! Intermediary endpoint configuration.

use crate::error::{HttpError, HttpResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Where the intermediary lives and which paths it serves.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Base URL of the intermediary (e.g., "http://localhost:3000").
    pub base_url: String,

    /// Status query endpoint.
    pub status_path: String,

    /// Renewal exchange endpoint.
    pub refresh_path: String,

    /// Sign-out endpoint called on termination.
    pub sign_out_path: String,

    /// Where the user is sent after termination.
    pub sign_in_redirect: String,

    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".to_string(),
            status_path: "/api/auth/status".to_string(),
            refresh_path: "/api/auth/refresh".to_string(),
            sign_out_path: "/api/auth/logout".to_string(),
            sign_in_redirect: "/login".to_string(),
            request_timeout_secs: 30,
        }
    }
}

impl HttpConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Rejects a base URL without an http(s) scheme, endpoint paths that are
    /// not absolute, and a zero timeout.
    pub fn validate(&self) -> HttpResult<()> {
        let base = self.base_url.trim();
        if !(base.starts_with("http://") || base.starts_with("https://")) {
            return Err(HttpError::Config(format!(
                "base_url must be an http(s) URL, got {:?}",
                self.base_url
            )));
        }
        for (name, path) in [
            ("status_path", &self.status_path),
            ("refresh_path", &self.refresh_path),
            ("sign_out_path", &self.sign_out_path),
        ] {
            if !path.starts_with('/') {
                return Err(HttpError::Config(format!(
                    "{name} must start with '/', got {path:?}"
                )));
            }
        }
        if self.request_timeout_secs == 0 {
            return Err(HttpError::Config(
                "request_timeout_secs must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }
}
