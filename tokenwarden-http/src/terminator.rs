//! Sign-out and redirect on unrecoverable expiry.

use crate::client::IntermediaryClient;
use crate::config::HttpConfig;
use async_trait::async_trait;
use reqwest::Client;
use std::sync::Arc;
use tokenwarden_lifecycle::{SessionTerminator, TerminationReason};
use tracing::{info, warn};

type RedirectSink = Arc<dyn Fn(&str) + Send + Sync>;

/// Calls the intermediary's sign-out endpoint, then hands the sign-in
/// location to `redirect`. Sign-out is best effort; the redirect always
/// happens.
pub struct RedirectTerminator {
    client: Client,
    config: HttpConfig,
    redirect: RedirectSink,
}

impl RedirectTerminator {
    pub fn new<F>(client: Client, config: HttpConfig, redirect: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        Self {
            client,
            config,
            redirect: Arc::new(redirect),
        }
    }

    /// Signs out through the intermediary client's cookie jar, so the
    /// sign-out request names the session being ended.
    pub fn from_client<F>(client: &IntermediaryClient, redirect: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        Self::new(client.http_client(), client.config().clone(), redirect)
    }

    /// Sign-in location carrying the termination reason.
    pub fn redirect_target(&self, reason: TerminationReason) -> String {
        let reason = match reason {
            TerminationReason::Expired => "expired",
            TerminationReason::RenewalRejected => "renewal_rejected",
        };
        format!("{}?reason={reason}", self.config.sign_in_redirect)
    }
}

#[async_trait]
impl SessionTerminator for RedirectTerminator {
    async fn terminate(&self, reason: TerminationReason) {
        let url = self.config.url(&self.config.sign_out_path);
        match self.client.post(&url).send().await {
            Ok(resp) if resp.status().is_success() => {}
            Ok(resp) => warn!("sign-out returned {}", resp.status()),
            Err(e) => warn!("sign-out request failed: {e}"),
        }

        let target = self.redirect_target(reason);
        info!("redirecting to {target}");
        (self.redirect)(&target);
    }
}
