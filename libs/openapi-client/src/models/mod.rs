//! Backend API models

use serde::{Deserialize, Serialize};

/// Envelope returned by every edge function
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Canister row in the backend registry
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanisterRow {
    /// Database id
    pub id: String,
    /// IC principal as text
    pub ic_canister_id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub frontend_url: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// Canister list payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanisterList {
    pub canisters: Vec<CanisterRow>,
}

/// Answer of the "is a deployment running" check
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunningCheckResponse {
    pub is_running: bool,
    #[serde(default)]
    pub deployment_id: Option<String>,
}

/// Body of the password grant
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PasswordGrantRequest {
    pub email: String,
    pub password: String,
}

/// Body of the refresh token grant
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshGrantRequest {
    pub refresh_token: String,
}

/// Auth user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}

/// Token grant response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthTokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default)]
    pub expires_in: Option<i64>,
    pub user: AuthUser,
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(default)]
    pub message: Option<String>,
}
