//! Authenticated backend access for background workers

use std::sync::Arc;

use async_trait::async_trait;
use secrecy::SecretString;

use crate::authn::session_mngr::SessionManagerExt;
use crate::errors::AgentError;
use crate::http::client::HttpClient;
use crate::models::canister::{Canister, CanisterRecordId};
use crate::models::deployment::Deployment;
use crate::scanner::permissions::{CanisterRegistry, DeploymentMonitor};

/// Pairs the HTTP client with the session so callers never handle tokens
pub struct BackendApi {
    http_client: Arc<HttpClient>,
    session: Arc<dyn SessionManagerExt>,
}

impl BackendApi {
    pub fn new(http_client: Arc<HttpClient>, session: Arc<dyn SessionManagerExt>) -> Self {
        Self {
            http_client,
            session,
        }
    }

    async fn token(&self) -> Result<SecretString, AgentError> {
        Ok(self.session.get_token().await?.raw)
    }

    fn observe<T>(&self, context: &str, result: Result<T, AgentError>) -> Result<T, AgentError> {
        if let Err(e) = &result {
            if e.is_unauthorized() {
                self.session.report_unauthorized(context);
            }
        }
        result
    }

    pub async fn list_canisters(&self) -> Result<Vec<Canister>, AgentError> {
        let token = self.token().await?;
        let result = self.http_client.list_canisters(&token).await;
        self.observe("list canisters", result)
    }

    pub async fn list_deployments(
        &self,
        canister: Option<&CanisterRecordId>,
        limit: u32,
    ) -> Result<Vec<Deployment>, AgentError> {
        let token = self.token().await?;
        let result = self.http_client.list_deployments(&token, canister, limit).await;
        self.observe("list deployments", result)
    }

    pub async fn get_deployment(&self, deployment_id: &str) -> Result<Deployment, AgentError> {
        let token = self.token().await?;
        let result = self.http_client.get_deployment(&token, deployment_id).await;
        self.observe("get deployment", result)
    }

    pub async fn is_deployment_running(&self, canister: &CanisterRecordId) -> Result<bool, AgentError> {
        let token = self.token().await?;
        let result = self.http_client.is_deployment_running(&token, canister).await;
        self.observe("deployment running check", result)
    }
}

#[async_trait]
impl CanisterRegistry for BackendApi {
    async fn list_canisters(&self) -> Result<Vec<Canister>, AgentError> {
        BackendApi::list_canisters(self).await
    }
}

#[async_trait]
impl DeploymentMonitor for BackendApi {
    async fn is_deployment_running(&self, canister: &CanisterRecordId) -> Result<bool, AgentError> {
        BackendApi::is_deployment_running(self, canister).await
    }
}
