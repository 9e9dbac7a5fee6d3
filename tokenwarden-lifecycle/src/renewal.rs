//! Renewal exchange against the trusted intermediary.

use crate::types::RefreshOutcome;
use async_trait::async_trait;

/// Exchanges the current credential pair for a new one.
///
/// One call, one exchange. Implementations must map a rejected renewal
/// credential to [`RenewalError::Unauthorized`](crate::RenewalError::Unauthorized)
/// and every other failure to `Transient`; callers terminate the session only
/// on the former.
#[async_trait]
pub trait RenewalClient: Send + Sync {
    async fn renew(&self) -> RefreshOutcome;
}
