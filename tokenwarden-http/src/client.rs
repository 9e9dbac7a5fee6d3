//! HTTP client for the session intermediary.
//!
//! Carries the ambient credential context in its cookie jar; this crate
//! never reads or writes credential bytes itself. Renewal responses that
//! rotate cookies update the jar as a side effect of the exchange.

use crate::config::HttpConfig;
use crate::error::{HttpError, HttpResult};
use crate::wire::{RenewResponse, StatusResponse};
use async_trait::async_trait;
use reqwest::Client;
use tokenwarden_lifecycle::{
    CredentialPair, FailClosed, RefreshOutcome, RenewalClient, RenewalError, SessionStatus,
    StatusProbe,
};
use tracing::{debug, warn};

/// Talks to the status and renewal endpoints.
pub struct IntermediaryClient {
    client: Client,
    config: HttpConfig,
    renew_threshold_secs: u64,
}

impl IntermediaryClient {
    pub fn new(config: HttpConfig, renew_threshold_secs: u64) -> HttpResult<Self> {
        config.validate()?;
        let client = Client::builder()
            .timeout(config.request_timeout())
            .cookie_store(true)
            .build()?;
        Ok(Self::with_client(client, config, renew_threshold_secs))
    }

    /// Uses a caller-built client (shared cookie jar, custom TLS, ...).
    pub fn with_client(client: Client, config: HttpConfig, renew_threshold_secs: u64) -> Self {
        Self {
            client,
            config,
            renew_threshold_secs,
        }
    }

    pub fn config(&self) -> &HttpConfig {
        &self.config
    }

    /// Handle on the underlying client. Clones share the cookie jar, so
    /// requests made through it carry the session's credential context.
    pub fn http_client(&self) -> Client {
        self.client.clone()
    }

    // ── Status ──

    /// Raw status query. Any non-2xx answer is an error.
    pub async fn query_status(&self) -> HttpResult<StatusResponse> {
        let url = self.config.url(&self.config.status_path);
        let resp = self.client.get(&url).send().await?;
        let resp = check_status(resp).await?;
        let body = resp.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }

    // ── Renewal ──

    /// Raw renewal exchange. 401/403 surface as a rejection
    /// (see [`HttpError::is_rejection`]).
    pub async fn exchange(&self) -> HttpResult<CredentialPair> {
        let url = self.config.url(&self.config.refresh_path);
        let resp = self.client.post(&url).send().await?;
        let resp = check_status(resp).await?;
        let body = resp.bytes().await?;
        let renewed: RenewResponse = serde_json::from_slice(&body)?;
        Ok(renewed.into())
    }
}

#[async_trait]
impl StatusProbe for IntermediaryClient {
    async fn probe(&self) -> SessionStatus {
        self.query_status()
            .await
            .map(|resp| {
                if resp.should_refresh {
                    debug!("intermediary hints renewal ({}s left)", resp.time_until_expiry);
                }
                SessionStatus::new(
                    resp.is_expired,
                    resp.seconds_until_expiry(),
                    self.renew_threshold_secs,
                )
            })
            .fail_closed()
    }
}

#[async_trait]
impl RenewalClient for IntermediaryClient {
    async fn renew(&self) -> RefreshOutcome {
        self.exchange().await.map_err(|e| {
            if e.is_rejection() {
                warn!("renewal credential rejected: {e}");
                RenewalError::Unauthorized
            } else {
                warn!("renewal exchange failed: {e}");
                RenewalError::Transient(e.to_string())
            }
        })
    }
}

async fn check_status(resp: reqwest::Response) -> HttpResult<reqwest::Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(HttpError::Status {
        status: status.as_u16(),
        body,
    })
}
