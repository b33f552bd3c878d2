//! TCYCLES ledger (ICRC-1)

use async_trait::async_trait;
use candid::{Nat, Principal};

use crate::errors::AgentError;
use crate::ic::client::IcClient;
use crate::ic::types::{nat_to_u128, Account};

/// Cycles ledger surface
#[async_trait]
pub trait CyclesLedger: Send + Sync {
    /// Balance of the default subaccount of `owner`, in cycles
    async fn balance_of(&self, owner: Principal) -> Result<u128, AgentError>;
}

#[async_trait]
impl CyclesLedger for IcClient {
    async fn balance_of(&self, owner: Principal) -> Result<u128, AgentError> {
        let ledger = self.ledger_id()?;
        let balance: Nat = self
            .query(
                &ledger,
                "icrc1_balance_of",
                (Account {
                    owner,
                    subaccount: None,
                },),
            )
            .await?;
        nat_to_u128(&balance)
    }
}
