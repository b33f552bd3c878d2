//! Local HTTP API tests

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::Router;
use http::{header, Method, Request, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt;

use hosty_agent::app::options::AppOptions;
use hosty_agent::app::state::AppState;
use hosty_agent::server::serve::router;
use hosty_agent::server::state::ServerState;
use hosty_agent::storage::layout::StorageLayout;
use hosty_agent::storage::settings::Settings;

/// Router over a fresh, signed-out storage directory
async fn signed_out_router() -> Router {
    let base_dir = std::env::temp_dir().join(format!("hosty-agent-test-{}", uuid::Uuid::new_v4()));
    let layout = StorageLayout::new(base_dir);
    layout.setup().await.unwrap();

    let mut settings = Settings::default();
    settings.ic.backend_principal = String::new();
    let options = AppOptions::from_settings(&settings, layout).unwrap();

    let app_state = AppState::init(&options).await.unwrap();
    router(Arc::new(ServerState::from_app_state(&app_state)))
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, http::HeaderMap, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, headers, body)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn test_health() {
    let (status, _, body) = send(signed_out_router().await, get("/health")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_bridge_state_starts_idle() {
    let (status, _, body) = send(signed_out_router().await, get("/bridge/state")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["state"], "idle");
    assert_eq!(body["attempt"], Value::Null);
}

#[tokio::test]
async fn test_backend_calls_require_login() {
    let (status, _, body) = send(signed_out_router().await, get("/canisters")).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "unauthorized");
}

#[tokio::test]
async fn test_invalid_canister_id_is_bad_request() {
    let (status, _, body) = send(signed_out_router().await, get("/canisters/not%20a%20principal/status")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_request");
}

#[tokio::test]
async fn test_scanner_without_backend_principal_is_unavailable() {
    let request = Request::builder()
        .method(Method::POST)
        .uri("/scanner/run")
        .body(Body::empty())
        .unwrap();

    let (status, _, body) = send(signed_out_router().await, request).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"], "not_configured");
}

#[tokio::test]
async fn test_dns_configure_rejects_missing_subdomain() {
    let payload = json!({
        "apiToken": "cf-token",
        "zoneId": "zone-1",
        "domain": "example.com",
        "canisterId": "ryjl3-tyaaa-aaaaa-aaaba-cai",
        "isApexDomain": false
    });
    let request = Request::builder()
        .method(Method::POST)
        .uri("/dns/configure")
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::ORIGIN, "https://hosty.live")
        .body(Body::from(payload.to_string()))
        .unwrap();

    let (status, headers, body) = send(signed_out_router().await, request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert!(body["error"].as_str().unwrap().contains("subdomain"));
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
}
