//! Cloudflare DNS API client

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, error};

use crate::dns::{DnsApi, DnsRecord, NewDnsRecord};
use crate::errors::AgentError;

const CLOUDFLARE_API: &str = "https://api.cloudflare.com/client/v4";

#[derive(Debug, Deserialize)]
struct CloudflareError {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct CloudflareResponse<T> {
    success: bool,
    #[serde(default)]
    errors: Vec<CloudflareError>,
    result: Option<T>,
}

/// Client bound to one API token
pub struct CloudflareClient {
    client: Client,
    base_url: String,
    api_token: SecretString,
}

impl CloudflareClient {
    pub fn new(api_token: &SecretString) -> Result<Self, AgentError> {
        Self::with_base_url(CLOUDFLARE_API, api_token)
    }

    pub fn with_base_url(base_url: &str, api_token: &SecretString) -> Result<Self, AgentError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_token: SecretString::from(api_token.expose_secret().to_string()),
        })
    }

    fn records_url(&self, zone_id: &str) -> String {
        format!("{}/zones/{}/dns_records", self.base_url, zone_id)
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder, what: &str) -> Result<Option<T>, AgentError> {
        let response = request.bearer_auth(self.api_token.expose_secret()).send().await?;
        let status = response.status();
        let body: CloudflareResponse<T> = response.json().await?;

        if !status.is_success() || !body.success {
            let message = body
                .errors
                .iter()
                .map(|e| format!("{} ({})", e.message, e.code))
                .collect::<Vec<_>>()
                .join(", ");
            error!("Cloudflare {} failed: {} {}", what, status, message);
            return Err(AgentError::DnsError(format!("{} failed: {}", what, message)));
        }
        Ok(body.result)
    }

    fn required<T>(result: Option<T>, what: &str) -> Result<T, AgentError> {
        result.ok_or_else(|| AgentError::DnsError(format!("{} returned no record", what)))
    }
}

#[async_trait]
impl DnsApi for CloudflareClient {
    async fn list_records(&self, zone_id: &str, record_type: &str, name: &str) -> Result<Vec<DnsRecord>, AgentError> {
        debug!("Listing {} records for {}", record_type, name);
        let request = self
            .client
            .get(self.records_url(zone_id))
            .query(&[("type", record_type), ("name", name)]);
        Ok(self.send(request, "list records").await?.unwrap_or_default())
    }

    async fn create_record(&self, zone_id: &str, record: &NewDnsRecord) -> Result<DnsRecord, AgentError> {
        debug!("Creating {} record {}", record.record_type, record.name);
        let request = self.client.post(self.records_url(zone_id)).json(record);
        Self::required(self.send(request, "create record").await?, "create record")
    }

    async fn update_record(
        &self,
        zone_id: &str,
        record_id: &str,
        record: &NewDnsRecord,
    ) -> Result<DnsRecord, AgentError> {
        debug!("Updating {} record {}", record.record_type, record.name);
        let url = format!("{}/{}", self.records_url(zone_id), record_id);
        let request = self.client.put(url).json(record);
        Self::required(self.send(request, "update record").await?, "update record")
    }

    async fn delete_record(&self, zone_id: &str, record_id: &str) -> Result<(), AgentError> {
        debug!("Deleting record {}", record_id);
        let url = format!("{}/{}", self.records_url(zone_id), record_id);
        self.send::<serde_json::Value>(self.client.delete(url), "delete record").await?;
        Ok(())
    }
}
