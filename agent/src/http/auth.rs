//! Supabase auth grants

use openapi_client::models::{AuthTokenResponse, PasswordGrantRequest, RefreshGrantRequest};
use reqwest::{Client, StatusCode};
use serde::Serialize;
use tracing::{debug, error};

use crate::errors::AgentError;
use crate::storage::settings::BackendSettings;

/// Client for the auth endpoints of the Supabase project
pub struct AuthClient {
    client: Client,
    base_url: String,
    anon_key: String,
}

impl AuthClient {
    pub fn new(settings: &BackendSettings) -> Result<Self, AgentError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            base_url: settings.supabase_url.trim_end_matches('/').to_string(),
            anon_key: settings.anon_key.clone(),
        })
    }

    /// Password grant
    pub async fn password_login(&self, email: &str, password: &str) -> Result<AuthTokenResponse, AgentError> {
        let body = PasswordGrantRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        self.grant("password", &body).await
    }

    /// Refresh token grant
    pub async fn refresh(&self, refresh_token: &str) -> Result<AuthTokenResponse, AgentError> {
        let body = RefreshGrantRequest {
            refresh_token: refresh_token.to_string(),
        };
        self.grant("refresh_token", &body).await
    }

    async fn grant<B: Serialize>(&self, grant_type: &str, body: &B) -> Result<AuthTokenResponse, AgentError> {
        let url = format!("{}/auth/v1/token?grant_type={}", self.base_url, grant_type);
        debug!("POST {} ({} grant)", url, grant_type);

        let response = self
            .client
            .post(&url)
            .header("apikey", &self.anon_key)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("Auth {} grant failed: {} - {}", grant_type, status, body);
            return Err(match status {
                StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED => {
                    AgentError::AuthError(format!("{} grant rejected: {}", grant_type, body))
                }
                _ => AgentError::ApiError(format!("{}: {}", status, body)),
            });
        }

        Ok(response.json().await?)
    }
}
