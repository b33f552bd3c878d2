//! Deployment API client

use openapi_client::models::RunningCheckResponse;
use secrecy::SecretString;
use serde::Deserialize;

use crate::errors::AgentError;
use crate::http::client::HttpClient;
use crate::models::canister::CanisterRecordId;
use crate::models::deployment::Deployment;

/// List of deployments response
#[derive(Debug, Clone, Deserialize)]
pub struct DeploymentListResponse {
    pub deployments: Vec<Deployment>,
}

fn query_string(pairs: &[(&str, &str)]) -> String {
    let mut serializer = url::form_urlencoded::Serializer::new(String::new());
    for (key, value) in pairs {
        serializer.append_pair(key, value);
    }
    serializer.finish()
}

/// Percent-encode a value used as a single path segment
fn path_segment(value: &str) -> String {
    // byte_serialize encodes '+' itself, so any '+' left stands for a space
    url::form_urlencoded::byte_serialize(value.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
}

impl HttpClient {
    /// Recent deployments, optionally restricted to one canister
    pub async fn list_deployments(
        &self,
        token: &SecretString,
        canister: Option<&CanisterRecordId>,
        limit: u32,
    ) -> Result<Vec<Deployment>, AgentError> {
        let limit = limit.to_string();
        let mut pairs = vec![("limit", limit.as_str())];
        if let Some(canister) = canister {
            pairs.push(("canisterId", canister.as_str()));
        }

        let path = format!("/deployments?{}", query_string(&pairs));
        let response: DeploymentListResponse = self.get(&path, token).await?;
        Ok(response.deployments)
    }

    pub async fn get_deployment(&self, token: &SecretString, deployment_id: &str) -> Result<Deployment, AgentError> {
        let path = format!("/deployments/{}", path_segment(deployment_id));
        self.get(&path, token).await
    }

    /// Whether a deployment is currently running for the canister row
    pub async fn is_deployment_running(
        &self,
        token: &SecretString,
        canister: &CanisterRecordId,
    ) -> Result<bool, AgentError> {
        let path = format!("/deployments/running?{}", query_string(&[("canisterId", canister.as_str())]));
        let response: RunningCheckResponse = self.get(&path, token).await?;
        Ok(response.is_running)
    }
}
