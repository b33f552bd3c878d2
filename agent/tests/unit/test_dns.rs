//! Custom domain DNS setup tests

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use secrecy::SecretString;
use tokio_test::assert_ok;

use hosty_agent::dns::configure::{configure_dns, ACTION_CREATED, ACTION_UNCHANGED, ACTION_UPDATED};
use hosty_agent::dns::{DnsApi, DnsConfigureRequest, DnsRecord, NewDnsRecord};
use hosty_agent::errors::AgentError;

const CANISTER: &str = "ryjl3-tyaaa-aaaaa-aaaba-cai";

#[derive(Debug, Clone, PartialEq)]
enum Op {
    Create(String, String),
    Update(String, String),
    Delete(String),
}

#[derive(Default)]
struct MockZone {
    records: Mutex<Vec<DnsRecord>>,
    ops: Mutex<Vec<Op>>,
    next_id: AtomicUsize,
    fail_creates: bool,
}

impl MockZone {
    fn with(records: &[(&str, &str, &str)]) -> Self {
        let zone = Self::default();
        for (record_type, name, content) in records {
            let id = zone.id();
            zone.records.lock().unwrap().push(DnsRecord {
                id,
                record_type: record_type.to_string(),
                name: name.to_string(),
                content: content.to_string(),
            });
        }
        zone
    }

    fn id(&self) -> String {
        format!("rec-{}", self.next_id.fetch_add(1, Ordering::SeqCst))
    }

    fn ops(&self) -> Vec<Op> {
        self.ops.lock().unwrap().clone()
    }

    fn find(&self, record_type: &str, name: &str) -> Vec<DnsRecord> {
        self.records
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.record_type == record_type && r.name == name)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl DnsApi for MockZone {
    async fn list_records(&self, zone_id: &str, record_type: &str, name: &str) -> Result<Vec<DnsRecord>, AgentError> {
        assert_eq!(zone_id, "zone-1");
        Ok(self.find(record_type, name))
    }

    async fn create_record(&self, _zone_id: &str, record: &NewDnsRecord) -> Result<DnsRecord, AgentError> {
        if self.fail_creates {
            return Err(AgentError::DnsError("9109: Invalid access token".to_string()));
        }
        let created = DnsRecord {
            id: self.id(),
            record_type: record.record_type.clone(),
            name: record.name.clone(),
            content: record.content.clone(),
        };
        self.records.lock().unwrap().push(created.clone());
        self.ops
            .lock()
            .unwrap()
            .push(Op::Create(record.name.clone(), record.content.clone()));
        Ok(created)
    }

    async fn update_record(
        &self,
        _zone_id: &str,
        record_id: &str,
        record: &NewDnsRecord,
    ) -> Result<DnsRecord, AgentError> {
        let mut records = self.records.lock().unwrap();
        let existing = records
            .iter_mut()
            .find(|r| r.id == record_id)
            .ok_or_else(|| AgentError::NotFound(record_id.to_string()))?;
        existing.content = record.content.clone();
        self.ops
            .lock()
            .unwrap()
            .push(Op::Update(record_id.to_string(), record.content.clone()));
        Ok(existing.clone())
    }

    async fn delete_record(&self, _zone_id: &str, record_id: &str) -> Result<(), AgentError> {
        self.records.lock().unwrap().retain(|r| r.id != record_id);
        self.ops.lock().unwrap().push(Op::Delete(record_id.to_string()));
        Ok(())
    }
}

fn request(subdomain: &str) -> DnsConfigureRequest {
    DnsConfigureRequest {
        api_token: SecretString::from("cf-token".to_string()),
        zone_id: "zone-1".to_string(),
        domain: "example.com".to_string(),
        canister_id: CANISTER.to_string(),
        is_apex_domain: false,
        subdomain: Some(subdomain.to_string()),
    }
}

#[tokio::test]
async fn test_empty_zone_creates_all_records() {
    let zone = MockZone::default();

    let results = assert_ok!(configure_dns(&zone, &request("www")).await);

    let actions: Vec<&str> = results.iter().map(|r| r.action.as_str()).collect();
    assert_eq!(actions, vec![ACTION_CREATED; 3]);
    assert_eq!(results[0].name, "www.example.com");
    assert_eq!(results[0].message, "Points to www.example.com.icp1.io");
    assert_eq!(results[1].name, "_canister-id.www.example.com");
    assert_eq!(results[1].message, format!("Set to {}", CANISTER));
    assert_eq!(
        zone.find("CNAME", "_acme-challenge.www.example.com")[0].content,
        "_acme-challenge.www.example.com.icp2.io"
    );
}

#[tokio::test]
async fn test_second_run_is_unchanged_except_txt() {
    let zone = MockZone::default();
    configure_dns(&zone, &request("www")).await.unwrap();

    let results = configure_dns(&zone, &request("www")).await.unwrap();

    assert_eq!(results[0].action, ACTION_UNCHANGED);
    assert_eq!(results[0].message, "Already points to www.example.com.icp1.io");
    assert_eq!(results[1].action, ACTION_UPDATED);
    assert_eq!(results[2].action, ACTION_UNCHANGED);
    assert_eq!(zone.find("TXT", "_canister-id.www.example.com").len(), 1);
}

#[tokio::test]
async fn test_duplicate_txt_records_are_replaced_by_one() {
    let zone = MockZone::with(&[
        ("TXT", "_canister-id.app.example.com", "aaaaa-aa"),
        ("TXT", "_canister-id.app.example.com", "rrkah-fqaaa-aaaaa-aaaaq-cai"),
        ("CNAME", "app.example.com", "app.example.com.icp1.io"),
        ("CNAME", "_acme-challenge.app.example.com", "_acme-challenge.app.example.com.icp2.io"),
    ]);

    let results = configure_dns(&zone, &request("app")).await.unwrap();

    assert_eq!(results[1].action, ACTION_UPDATED);
    assert_eq!(results[1].message, "Replaced 2 records");
    assert_eq!(
        zone.ops(),
        vec![
            Op::Delete("rec-0".to_string()),
            Op::Delete("rec-1".to_string()),
            Op::Create("_canister-id.app.example.com".to_string(), CANISTER.to_string()),
        ]
    );
    let txt = zone.find("TXT", "_canister-id.app.example.com");
    assert_eq!(txt.len(), 1);
    assert_eq!(txt[0].content, CANISTER);
}

#[tokio::test]
async fn test_cname_with_other_target_is_updated() {
    let zone = MockZone::with(&[("CNAME", "app.example.com", "old.example.net")]);

    let results = configure_dns(&zone, &request("app")).await.unwrap();

    assert_eq!(results[0].action, ACTION_UPDATED);
    assert_eq!(results[0].message, "Changed old.example.net to app.example.com.icp1.io");
    assert_eq!(
        zone.ops()[0],
        Op::Update("rec-0".to_string(), "app.example.com.icp1.io".to_string())
    );
}

#[tokio::test]
async fn test_invalid_canister_id_touches_nothing() {
    let zone = MockZone::default();
    let mut request = request("www");
    request.canister_id = "not a canister!".to_string();

    let result = configure_dns(&zone, &request).await;

    assert!(matches!(result, Err(AgentError::PrincipalError(_))));
    assert!(zone.ops().is_empty());
}

#[tokio::test]
async fn test_provider_error_stops_setup() {
    let zone = MockZone {
        fail_creates: true,
        ..Default::default()
    };

    let result = configure_dns(&zone, &request("www")).await;

    assert!(matches!(result, Err(AgentError::DnsError(_))));
    assert!(zone.find("TXT", "_canister-id.www.example.com").is_empty());
}

#[test]
fn test_request_wire_format() {
    let json = r#"{
        "apiToken": "cf-token",
        "zoneId": "zone-1",
        "domain": "example.com",
        "canisterId": "ryjl3-tyaaa-aaaaa-aaaba-cai",
        "subdomain": "www"
    }"#;

    let request: DnsConfigureRequest = serde_json::from_str(json).unwrap();

    assert!(!request.is_apex_domain);
    assert_eq!(request.subdomain.as_deref(), Some("www"));
    // The token must not leak through Debug
    assert!(!format!("{:?}", request).contains("cf-token"));
}
