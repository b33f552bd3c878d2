//! Asset storage canister

use async_trait::async_trait;
use candid::Principal;

use crate::errors::AgentError;
use crate::ic::client::IcClient;
use crate::ic::types::{ListPermitted, Permission, RevokePermission};

/// Asset canister permission surface
#[async_trait]
pub trait AssetStorage: Send + Sync {
    /// Principals holding `permission` on `canister`
    async fn list_permitted(
        &self,
        canister: Principal,
        permission: Permission,
    ) -> Result<Vec<Principal>, AgentError>;

    /// Remove `permission` from `principal` on `canister`
    async fn revoke_permission(
        &self,
        canister: Principal,
        principal: Principal,
        permission: Permission,
    ) -> Result<(), AgentError>;
}

#[async_trait]
impl AssetStorage for IcClient {
    async fn list_permitted(
        &self,
        canister: Principal,
        permission: Permission,
    ) -> Result<Vec<Principal>, AgentError> {
        self.query(&canister, "list_permitted", (ListPermitted { permission },))
            .await
    }

    async fn revoke_permission(
        &self,
        canister: Principal,
        principal: Principal,
        permission: Permission,
    ) -> Result<(), AgentError> {
        self.update_unit(
            &canister,
            "revoke_permission",
            (RevokePermission {
                of_principal: principal,
                permission,
            },),
        )
        .await
    }
}
