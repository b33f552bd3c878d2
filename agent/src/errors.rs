//! Error types for the hosty agent

use thiserror::Error;

/// Main error type for the hosty agent
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Candid error: {0}")]
    CandidError(#[from] candid::Error),

    #[error("IC agent error: {0}")]
    IcError(String),

    #[error("Invalid principal: {0}")]
    PrincipalError(String),

    #[error("Identity error: {0}")]
    IdentityError(String),

    #[error("Authentication error: {0}")]
    AuthError(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Token error: {0}")]
    TokenError(String),

    #[error("Not logged in: {0}")]
    NotLoggedIn(String),

    #[error("Backend API error: {0}")]
    ApiError(String),

    #[error("DNS error: {0}")]
    DnsError(String),

    #[error("Event bridge error: {0}")]
    BridgeError(String),

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Shutdown error: {0}")]
    ShutdownError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<anyhow::Error> for AgentError {
    fn from(err: anyhow::Error) -> Self {
        AgentError::Internal(err.to_string())
    }
}

impl From<ic_agent::AgentError> for AgentError {
    fn from(err: ic_agent::AgentError) -> Self {
        AgentError::IcError(err.to_string())
    }
}

impl AgentError {
    /// Whether the backend rejected the session
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, AgentError::Unauthorized(_))
    }
}
