//! Idempotent record setup for a canister custom domain
//!
//! Three records are required by the IC boundary nodes:
//! - `CNAME <host>` pointing at `<host>.icp1.io`
//! - `TXT _canister-id.<host>` holding the canister id, exactly one
//! - `CNAME _acme-challenge.<host>` pointing at `_acme-challenge.<host>.icp2.io`

use openapi_server::models::DnsRecordResult;
use tracing::info;

use crate::dns::{DnsApi, DnsConfigureRequest, NewDnsRecord};
use crate::errors::AgentError;
use crate::ic::types::parse_principal;

const BOUNDARY_DOMAIN: &str = "icp1.io";
const ACME_DOMAIN: &str = "icp2.io";

pub const ACTION_CREATED: &str = "created";
pub const ACTION_UPDATED: &str = "updated";
pub const ACTION_UNCHANGED: &str = "unchanged";

/// Fully qualified host the site is served on
pub fn site_host(request: &DnsConfigureRequest) -> Result<String, AgentError> {
    let domain = request.domain.trim().trim_end_matches('.');
    if domain.is_empty() {
        return Err(AgentError::ValidationError("domain is required".to_string()));
    }
    if request.is_apex_domain {
        return Ok(domain.to_string());
    }

    match request.subdomain.as_deref().map(str::trim) {
        Some(sub) if !sub.is_empty() => Ok(format!("{}.{}", sub, domain)),
        _ => Err(AgentError::ValidationError(
            "subdomain is required for non-apex domains".to_string(),
        )),
    }
}

/// Create or update the three records; stops at the first provider error
pub async fn configure_dns(api: &dyn DnsApi, request: &DnsConfigureRequest) -> Result<Vec<DnsRecordResult>, AgentError> {
    if request.zone_id.trim().is_empty() {
        return Err(AgentError::ValidationError("zoneId is required".to_string()));
    }
    parse_principal(&request.canister_id)?;
    let host = site_host(request)?;
    info!("Configuring DNS for {} -> {}", host, request.canister_id);

    let zone = request.zone_id.as_str();
    let acme_name = format!("_acme-challenge.{}", host);

    let results = vec![
        upsert_cname(api, zone, &host, &format!("{}.{}", host, BOUNDARY_DOMAIN)).await?,
        replace_txt(api, zone, &format!("_canister-id.{}", host), &request.canister_id).await?,
        upsert_cname(api, zone, &acme_name, &format!("{}.{}", acme_name, ACME_DOMAIN)).await?,
    ];
    Ok(results)
}

async fn upsert_cname(api: &dyn DnsApi, zone: &str, name: &str, target: &str) -> Result<DnsRecordResult, AgentError> {
    let wanted = NewDnsRecord::new("CNAME", name, target);
    let existing = api.list_records(zone, "CNAME", name).await?;

    let (action, message) = match existing.first() {
        Some(record) if record.content == target => (ACTION_UNCHANGED, format!("Already points to {}", target)),
        Some(record) => {
            api.update_record(zone, &record.id, &wanted).await?;
            (ACTION_UPDATED, format!("Changed {} to {}", record.content, target))
        }
        None => {
            api.create_record(zone, &wanted).await?;
            (ACTION_CREATED, format!("Points to {}", target))
        }
    };

    Ok(result("CNAME", name, action, message))
}

/// The IC requires a single canister-id record, so every existing one goes
async fn replace_txt(api: &dyn DnsApi, zone: &str, name: &str, canister_id: &str) -> Result<DnsRecordResult, AgentError> {
    let existing = api.list_records(zone, "TXT", name).await?;
    for record in &existing {
        api.delete_record(zone, &record.id).await?;
    }
    api.create_record(zone, &NewDnsRecord::new("TXT", name, canister_id))
        .await?;

    let record = if existing.is_empty() {
        result("TXT", name, ACTION_CREATED, format!("Set to {}", canister_id))
    } else {
        result(
            "TXT",
            name,
            ACTION_UPDATED,
            format!("Replaced {} records", existing.len()),
        )
    };
    Ok(record)
}

fn result(record_type: &str, name: &str, action: &str, message: String) -> DnsRecordResult {
    DnsRecordResult {
        record_type: record_type.to_string(),
        name: name.to_string(),
        action: action.to_string(),
        message,
    }
}
