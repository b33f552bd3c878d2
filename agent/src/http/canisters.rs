//! Canister registry API

use openapi_client::models::CanisterList;
use secrecy::SecretString;
use tracing::warn;

use crate::errors::AgentError;
use crate::http::client::HttpClient;
use crate::models::canister::Canister;

impl HttpClient {
    /// Canisters registered to the authenticated user.
    ///
    /// Rows whose principal does not parse are skipped.
    pub async fn list_canisters(&self, token: &SecretString) -> Result<Vec<Canister>, AgentError> {
        let response: CanisterList = self.get("/canisters", token).await?;
        let canisters = response
            .canisters
            .into_iter()
            .filter_map(|row| {
                let id = row.id.clone();
                match Canister::try_from(row) {
                    Ok(canister) => Some(canister),
                    Err(e) => {
                        warn!("Skipping canister row {}: {}", id, e);
                        None
                    }
                }
            })
            .collect();
        Ok(canisters)
    }
}
