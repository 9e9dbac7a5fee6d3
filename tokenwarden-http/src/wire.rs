//! Request/response bodies exchanged with the intermediary.

use serde::{Deserialize, Serialize};
use tokenwarden_lifecycle::CredentialPair;

/// Status query response.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub is_expired: bool,
    /// Negative once the credential has lapsed.
    pub time_until_expiry: i64,
    /// The intermediary's own renewal hint. Informational: the renew-soon
    /// decision uses the locally configured threshold.
    #[serde(default)]
    pub should_refresh: bool,
}

impl StatusResponse {
    pub fn seconds_until_expiry(&self) -> u64 {
        u64::try_from(self.time_until_expiry).unwrap_or(0)
    }
}

/// Successful renewal response.
#[derive(Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenewResponse {
    pub new_access_credential: String,
    pub new_refresh_credential: String,
}

impl From<RenewResponse> for CredentialPair {
    fn from(resp: RenewResponse) -> Self {
        Self {
            access_credential: resp.new_access_credential,
            renewal_credential: resp.new_refresh_credential,
        }
    }
}
