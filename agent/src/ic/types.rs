//! Candid types of the actors the agent talks to.
//!
//! Records only declare the fields the agent reads; Candid subtyping drops
//! the rest on decode.

use candid::{CandidType, Deserialize, Nat, Principal};

use crate::errors::AgentError;

/// Parse a textual principal
pub fn parse_principal(text: &str) -> Result<Principal, AgentError> {
    Principal::from_text(text.trim())
        .map_err(|e| AgentError::PrincipalError(format!("{}: {}", text, e)))
}

/// Convert a Candid `nat` into `u128`
pub fn nat_to_u128(value: &Nat) -> Result<u128, AgentError> {
    let digits = value.0.to_u64_digits();
    match digits.as_slice() {
        [] => Ok(0),
        [lo] => Ok(u128::from(*lo)),
        [lo, hi] => Ok(u128::from(*lo) | (u128::from(*hi) << 64)),
        _ => Err(AgentError::ValidationError(format!("{} does not fit in 128 bits", value))),
    }
}

#[derive(CandidType, Deserialize, Debug, Clone)]
pub struct CanisterIdRecord {
    pub canister_id: Principal,
}

#[derive(CandidType, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CanisterRunStatus {
    #[serde(rename = "running")]
    Running,
    #[serde(rename = "stopping")]
    Stopping,
    #[serde(rename = "stopped")]
    Stopped,
}

impl CanisterRunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CanisterRunStatus::Running => "running",
            CanisterRunStatus::Stopping => "stopping",
            CanisterRunStatus::Stopped => "stopped",
        }
    }
}

#[derive(CandidType, Deserialize, Debug, Clone, PartialEq)]
pub struct DefiniteCanisterSettings {
    pub controllers: Vec<Principal>,
    pub compute_allocation: Nat,
    pub memory_allocation: Nat,
    pub freezing_threshold: Nat,
}

#[derive(CandidType, Deserialize, Debug, Clone, PartialEq)]
pub struct MemoryMetrics {
    pub wasm_memory_size: Nat,
    pub stable_memory_size: Nat,
    pub global_memory_size: Nat,
    pub wasm_binary_size: Nat,
    pub custom_sections_size: Nat,
}

/// `canister_status` result, as returned by the management canister and
/// relayed by the status proxy
#[derive(CandidType, Deserialize, Debug, Clone, PartialEq)]
pub struct CanisterStatus {
    pub status: CanisterRunStatus,
    pub settings: DefiniteCanisterSettings,
    pub module_hash: Option<Vec<u8>>,
    pub memory_size: Nat,
    pub cycles: Nat,
    pub idle_cycles_burned_per_day: Option<Nat>,
    pub memory_metrics: Option<MemoryMetrics>,
}

/// Asset canister permissions
#[derive(CandidType, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    Commit,
    ManagePermissions,
    Prepare,
}

#[derive(CandidType, Deserialize, Debug, Clone)]
pub struct ListPermitted {
    pub permission: Permission,
}

#[derive(CandidType, Deserialize, Debug, Clone)]
pub struct RevokePermission {
    pub of_principal: Principal,
    pub permission: Permission,
}

/// ICRC-1 account
#[derive(CandidType, Deserialize, Debug, Clone)]
pub struct Account {
    pub owner: Principal,
    pub subaccount: Option<Vec<u8>>,
}
