//! Custom domain DNS records for canister-hosted sites

pub mod cloudflare;
pub mod configure;

use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};
use secrecy::SecretString;

use crate::errors::AgentError;

/// An existing DNS record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DnsRecord {
    pub id: String,
    #[serde(rename = "type")]
    pub record_type: String,
    pub name: String,
    pub content: String,
}

/// Record body for create and update
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewDnsRecord {
    #[serde(rename = "type")]
    pub record_type: String,
    pub name: String,
    pub content: String,
    /// 1 means automatic
    pub ttl: u32,
    pub proxied: bool,
}

impl NewDnsRecord {
    pub fn new(record_type: &str, name: &str, content: &str) -> Self {
        Self {
            record_type: record_type.to_string(),
            name: name.to_string(),
            content: content.to_string(),
            ttl: 1,
            proxied: false,
        }
    }
}

/// DNS provider surface, scoped to one zone
#[async_trait]
pub trait DnsApi: Send + Sync {
    async fn list_records(&self, zone_id: &str, record_type: &str, name: &str) -> Result<Vec<DnsRecord>, AgentError>;

    async fn create_record(&self, zone_id: &str, record: &NewDnsRecord) -> Result<DnsRecord, AgentError>;

    async fn update_record(
        &self,
        zone_id: &str,
        record_id: &str,
        record: &NewDnsRecord,
    ) -> Result<DnsRecord, AgentError>;

    async fn delete_record(&self, zone_id: &str, record_id: &str) -> Result<(), AgentError>;
}

/// Body of `POST /dns/configure`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DnsConfigureRequest {
    #[serde(deserialize_with = "deserialize_secret")]
    pub api_token: SecretString,
    pub zone_id: String,
    pub domain: String,
    pub canister_id: String,
    #[serde(default)]
    pub is_apex_domain: bool,
    #[serde(default)]
    pub subdomain: Option<String>,
}

fn deserialize_secret<'de, D>(deserializer: D) -> Result<SecretString, D::Error>
where
    D: Deserializer<'de>,
{
    String::deserialize(deserializer).map(SecretString::from)
}
