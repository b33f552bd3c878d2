//! HTTP request handlers

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use candid::Principal;
use openapi_server::models::{
    BalanceResponse, BridgeStateResponse, CanisterResponse, CanisterStatusResponse, DnsConfigureResponse,
    ErrorResponse, HealthResponse, ScanReportResponse, SessionResponse, VersionResponse,
};
use serde::Deserialize;
use tracing::{error, warn};

use crate::authn::session_mngr::SessionManagerExt;
use crate::bridge::connection::ConnectionState;
use crate::dns::cloudflare::CloudflareClient;
use crate::dns::configure::configure_dns;
use crate::dns::DnsConfigureRequest;
use crate::errors::AgentError;
use crate::models::canister::{Canister, CanisterRecordId};
use crate::models::deployment::Deployment;
use crate::models::status::{format_tc, CanisterStatusSnapshot};
use crate::scanner::permissions::ScanReport;
use crate::server::state::ServerState;
use crate::utils::{hex_encode, version_info};

const DEFAULT_DEPLOYMENT_LIMIT: u32 = 50;

impl IntoResponse for AgentError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            AgentError::NotLoggedIn(_) | AgentError::AuthError(_) | AgentError::Unauthorized(_) | AgentError::TokenError(_) => {
                (StatusCode::UNAUTHORIZED, "unauthorized")
            }
            AgentError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            AgentError::ValidationError(_) | AgentError::PrincipalError(_) => (StatusCode::BAD_REQUEST, "invalid_request"),
            AgentError::ConfigError(_) => (StatusCode::SERVICE_UNAVAILABLE, "not_configured"),
            AgentError::HttpError(_)
            | AgentError::ApiError(_)
            | AgentError::IcError(_)
            | AgentError::CandidError(_)
            | AgentError::DnsError(_) => (StatusCode::BAD_GATEWAY, "upstream_error"),
            _ => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        };
        if status.is_server_error() {
            error!("Request failed: {}", self);
        }

        let body = ErrorResponse {
            error: code.to_string(),
            message: self.to_string(),
            details: None,
        };
        (status, Json(body)).into_response()
    }
}

/// Health check handler
pub async fn health_handler() -> impl IntoResponse {
    let version = version_info();
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: "hosty-agent".to_string(),
        version: version.version,
    })
}

/// Version handler
pub async fn version_handler() -> impl IntoResponse {
    let version = version_info();
    Json(VersionResponse {
        version: version.version,
        git_hash: version.git_hash,
        build_time: version.build_time,
    })
}

/// Session handler
pub async fn session_handler(State(state): State<Arc<ServerState>>) -> impl IntoResponse {
    let user_id = state.session.user_id();
    let authenticated = user_id.is_some();
    let session = state.session.session().await;
    let expires_at = if authenticated {
        state.session.get_token().await.ok().map(|t| t.expires_at().to_rfc3339())
    } else {
        None
    };

    Json(SessionResponse {
        authenticated,
        user_id: user_id.or_else(|| session.as_ref().map(|s| s.user_id.clone())),
        email: session.and_then(|s| s.email),
        principal: state.ic.principal().ok().map(|p| p.to_text()),
        expires_at,
    })
}

fn canister_response(canister: Canister) -> CanisterResponse {
    CanisterResponse {
        id: canister.id.to_string(),
        ic_canister_id: canister.ic_canister_id.to_text(),
        name: canister.name,
    }
}

/// Canisters handler
pub async fn canisters_handler(State(state): State<Arc<ServerState>>) -> Result<impl IntoResponse, AgentError> {
    let canisters = state.backend.list_canisters().await?;
    Ok(Json(canisters.into_iter().map(canister_response).collect::<Vec<_>>()))
}

pub fn status_response(canister_id: String, snapshot: &CanisterStatusSnapshot) -> CanisterStatusResponse {
    let forecast = snapshot.forecast();
    let status = &snapshot.status;

    CanisterStatusResponse {
        canister_id,
        timestamp_seconds: snapshot.timestamp_seconds,
        status: status.status.as_str().to_string(),
        cycles: status.cycles.0.to_string(),
        cycles_label: snapshot
            .cycles()
            .map(format_tc)
            .unwrap_or_else(|_| "unknown".to_string()),
        module_hash: status.module_hash.as_ref().map(|hash| hex_encode(hash)),
        controllers: status.settings.controllers.iter().map(Principal::to_text).collect(),
        memory_size: status.memory_size.0.to_string(),
        burn_tc_per_year: forecast.burn_tc_per_year,
        years_left: forecast.finite_years_left(),
        years_left_label: forecast.years_left_label(),
    }
}

/// Canister status handler; `id` is the IC canister principal
pub async fn canister_status_handler(
    State(state): State<Arc<ServerState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AgentError> {
    let fetch = state.caches.status.fetch(&id).await?;
    Ok(Json(status_response(id.trim().to_string(), &fetch.snapshot)))
}

/// Wallet balance handler
pub async fn balance_handler(State(state): State<Arc<ServerState>>) -> Result<impl IntoResponse, AgentError> {
    let owner = state.ic.principal()?;
    let balance = state.ledger.balance_of(owner).await?;

    Ok(Json(BalanceResponse {
        owner: owner.to_text(),
        balance: balance.to_string(),
        balance_label: format_tc(balance),
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentsQuery {
    pub canister_id: Option<String>,
    pub limit: Option<u32>,
    #[serde(default)]
    pub refresh: bool,
}

/// Deployments handler.
///
/// The unfiltered list is served from the cache once loaded, so pushed
/// updates and log chunks are visible; `refresh=true` reloads it.
pub async fn deployments_handler(
    State(state): State<Arc<ServerState>>,
    Query(query): Query<DeploymentsQuery>,
) -> Result<Json<Vec<Deployment>>, AgentError> {
    let cache = &state.caches.deployments;
    let limit = query.limit.unwrap_or(DEFAULT_DEPLOYMENT_LIMIT);

    if let Some(canister_id) = query.canister_id {
        let canister = CanisterRecordId::new(canister_id);
        let deployments = state.backend.list_deployments(Some(&canister), limit).await?;
        for deployment in &deployments {
            cache.put(deployment.clone());
        }
        return Ok(Json(deployments));
    }

    if !query.refresh {
        if let Some(deployments) = cache.list() {
            return Ok(Json(deployments));
        }
    }

    let deployments = state.backend.list_deployments(None, limit).await?;
    cache.seed_list(deployments, limit as usize);
    Ok(Json(cache.list().unwrap_or_default()))
}

/// Deployment detail handler
pub async fn deployment_handler(
    State(state): State<Arc<ServerState>>,
    Path(id): Path<String>,
) -> Result<Json<Deployment>, AgentError> {
    if let Some(deployment) = state.caches.deployments.get(&id) {
        return Ok(Json(deployment));
    }

    let deployment = state.backend.get_deployment(&id).await?;
    state.caches.deployments.put(deployment);
    state
        .caches
        .deployments
        .get(&id)
        .map(Json)
        .ok_or_else(|| AgentError::NotFound(format!("deployment {}", id)))
}

pub fn scan_report_response(report: &ScanReport) -> ScanReportResponse {
    ScanReportResponse {
        run_id: report.run_id.clone(),
        started_at: report.started_at.to_rfc3339(),
        finished_at: report.finished_at.to_rfc3339(),
        discovered: report.discovered,
        controlled: report.controlled,
        permitted: report.permitted,
        idle: report.idle,
        revoked: report.revoked.iter().map(Principal::to_text).collect(),
        revoke_failures: report.revoke_failures.iter().map(Principal::to_text).collect(),
        aborted: report.aborted.clone(),
    }
}

/// Run a permission scan now, or join the running one
pub async fn scanner_run_handler(State(state): State<Arc<ServerState>>) -> Result<impl IntoResponse, AgentError> {
    let scanner = state
        .scanner
        .clone()
        .ok_or_else(|| AgentError::ConfigError("no backend principal configured".to_string()))?;
    if !state.session.auth_state().borrow().is_authenticated() {
        return Err(AgentError::NotLoggedIn("scan requires an authenticated session".to_string()));
    }

    let report = scanner.run().await;
    Ok(Json(scan_report_response(&report)))
}

pub fn bridge_state_response(connection: &ConnectionState) -> BridgeStateResponse {
    BridgeStateResponse {
        state: connection.name().to_string(),
        attempt: connection.attempt(),
        retry_in_ms: connection.retry_in().map(|d| d.as_millis() as u64),
    }
}

/// Event bridge state handler
pub async fn bridge_state_handler(State(state): State<Arc<ServerState>>) -> impl IntoResponse {
    let connection = state.bridge_state.borrow().clone();
    Json(bridge_state_response(&connection))
}

/// DNS configure handler
pub async fn dns_configure_handler(Json(request): Json<DnsConfigureRequest>) -> impl IntoResponse {
    let result = match CloudflareClient::new(&request.api_token) {
        Ok(client) => configure_dns(&client, &request).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(records) => (
            StatusCode::OK,
            Json(DnsConfigureResponse {
                success: true,
                records,
                error: None,
            }),
        ),
        Err(e) => {
            warn!("DNS configure for {} failed: {}", request.domain, e);
            let status = match e {
                AgentError::ValidationError(_) | AgentError::PrincipalError(_) => StatusCode::BAD_REQUEST,
                _ => StatusCode::BAD_GATEWAY,
            };
            (
                status,
                Json(DnsConfigureResponse {
                    success: false,
                    records: Vec::new(),
                    error: Some(e.to_string()),
                }),
            )
        }
    }
}
