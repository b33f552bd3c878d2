//! Management canister

use async_trait::async_trait;
use candid::Principal;

use crate::errors::AgentError;
use crate::ic::client::IcClient;
use crate::ic::types::{CanisterIdRecord, CanisterStatus};

/// Management canister surface
#[async_trait]
pub trait ManagementApi: Send + Sync {
    /// Fails unless the caller controls `canister`
    async fn canister_status(&self, canister: Principal) -> Result<CanisterStatus, AgentError>;
}

#[async_trait]
impl ManagementApi for IcClient {
    async fn canister_status(&self, canister: Principal) -> Result<CanisterStatus, AgentError> {
        let bytes = self
            .update_raw(
                &Principal::management_canister(),
                &canister,
                "canister_status",
                (CanisterIdRecord { canister_id: canister },),
            )
            .await?;
        Ok(candid::decode_one(&bytes)?)
    }
}
