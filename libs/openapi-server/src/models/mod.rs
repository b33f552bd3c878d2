//! Agent API models

use serde::{Deserialize, Serialize};

/// Health response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
}

/// Version response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionResponse {
    pub version: String,
    pub git_hash: String,
    pub build_time: String,
}

/// Session response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionResponse {
    pub authenticated: bool,
    pub user_id: Option<String>,
    pub email: Option<String>,
    pub principal: Option<String>,
    pub expires_at: Option<String>,
}

/// Canister summary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanisterResponse {
    pub id: String,
    pub ic_canister_id: String,
    pub name: Option<String>,
}

/// Canister status with derived cycle metrics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanisterStatusResponse {
    pub canister_id: String,
    pub timestamp_seconds: u64,
    pub status: String,
    /// Cycle balance, as a decimal string since it exceeds JSON number range
    pub cycles: String,
    pub cycles_label: String,
    pub module_hash: Option<String>,
    pub controllers: Vec<String>,
    pub memory_size: String,
    pub burn_tc_per_year: Option<f64>,
    /// Absent when unknown or unbounded; see `years_left_label`
    pub years_left: Option<f64>,
    pub years_left_label: String,
}

/// Wallet balance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalanceResponse {
    pub owner: String,
    pub balance: String,
    pub balance_label: String,
}

/// Permission scan report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanReportResponse {
    pub run_id: String,
    pub started_at: String,
    pub finished_at: String,
    pub discovered: usize,
    pub controlled: usize,
    pub permitted: usize,
    pub idle: usize,
    pub revoked: Vec<String>,
    pub revoke_failures: Vec<String>,
    pub aborted: Option<String>,
}

/// Event bridge connection state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeStateResponse {
    pub state: String,
    pub attempt: Option<u32>,
    pub retry_in_ms: Option<u64>,
}

/// Outcome for one DNS record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DnsRecordResult {
    #[serde(rename = "type")]
    pub record_type: String,
    pub name: String,
    pub action: String,
    pub message: String,
}

/// DNS configure response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DnsConfigureResponse {
    pub success: bool,
    pub records: Vec<DnsRecordResult>,
    pub error: Option<String>,
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub details: Option<serde_json::Value>,
}
