//! Edge function HTTP client

use openapi_client::models::ApiResponse;
use reqwest::{header, Client, RequestBuilder, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, error};

use crate::errors::AgentError;

/// HTTP client for the backend edge functions
pub struct HttpClient {
    client: Client,
    base_url: String,
    anon_key: String,
}

impl HttpClient {
    pub fn new(base_url: &str, anon_key: &str) -> Result<Self, AgentError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            anon_key: anon_key.to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// GET an enveloped payload
    pub async fn get<T: DeserializeOwned>(&self, path: &str, token: &SecretString) -> Result<T, AgentError> {
        let url = format!("{}{}", self.base_url, path);
        debug!("GET {}", url);

        let request = self.authorize(self.client.get(&url), token);
        self.send(request, "GET", path).await
    }

    /// POST a JSON body and read an enveloped payload
    pub async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        token: &SecretString,
        body: &B,
    ) -> Result<T, AgentError> {
        let url = format!("{}{}", self.base_url, path);
        debug!("POST {}", url);

        let request = self.authorize(self.client.post(&url), token).json(body);
        self.send(request, "POST", path).await
    }

    fn authorize(&self, request: RequestBuilder, token: &SecretString) -> RequestBuilder {
        let request = request.header(header::AUTHORIZATION, format!("Bearer {}", token.expose_secret()));
        if self.anon_key.is_empty() {
            request
        } else {
            request.header("apikey", &self.anon_key)
        }
    }

    async fn send<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        method: &str,
        path: &str,
    ) -> Result<T, AgentError> {
        let response = request.send().await?;
        let status = response.status();

        if status == StatusCode::UNAUTHORIZED {
            return Err(AgentError::Unauthorized(format!("{} {}", method, path)));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("HTTP {} {} failed: {} - {}", method, path, status, body);
            return Err(AgentError::ApiError(format!("{}: {}", status, body)));
        }

        let envelope: ApiResponse<T> = response.json().await?;
        unwrap_envelope(envelope, method, path)
    }
}

/// Extract the payload of a successful envelope
pub fn unwrap_envelope<T>(envelope: ApiResponse<T>, method: &str, path: &str) -> Result<T, AgentError> {
    if !envelope.success {
        return Err(AgentError::ApiError(format!(
            "{} {}: {}",
            method,
            path,
            envelope.error.unwrap_or_else(|| "request failed".to_string())
        )));
    }
    envelope
        .data
        .ok_or_else(|| AgentError::ApiError(format!("{} {}: response has no data", method, path)))
}
