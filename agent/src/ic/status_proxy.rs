//! Status proxy actor

use async_trait::async_trait;
use candid::Principal;

use crate::errors::AgentError;
use crate::ic::client::IcClient;
use crate::ic::types::CanisterStatus;

/// `(timestamp_seconds, status)` as produced by the proxy
pub type StatusTuple = (u64, CanisterStatus);

/// Status proxy surface
#[async_trait]
pub trait StatusProxy: Send + Sync {
    /// Cached read; `None` when the proxy holds nothing for the canister
    async fn query_state(&self, canister: Principal) -> Result<Option<StatusTuple>, AgentError>;

    /// Live read through the management canister, refreshing the proxy cache
    async fn load_state(&self, canister: Principal) -> Result<StatusTuple, AgentError>;
}

#[async_trait]
impl StatusProxy for IcClient {
    async fn query_state(&self, canister: Principal) -> Result<Option<StatusTuple>, AgentError> {
        let proxy = self.status_proxy_id()?;
        self.query(&proxy, "queryState", (canister,)).await
    }

    async fn load_state(&self, canister: Principal) -> Result<StatusTuple, AgentError> {
        let proxy = self.status_proxy_id()?;
        self.update(&proxy, "loadState", (canister,)).await
    }
}
