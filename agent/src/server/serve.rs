//! HTTP server setup

use std::future::Future;
use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::app::options::ServerOptions;
use crate::errors::AgentError;
use crate::server::handlers::{
    balance_handler, bridge_state_handler, canister_status_handler, canisters_handler, deployment_handler,
    deployments_handler, dns_configure_handler, health_handler, scanner_run_handler, session_handler,
    version_handler,
};
use crate::server::state::ServerState;

/// Build the router
pub fn router(state: Arc<ServerState>) -> Router {
    // Called cross-origin from the dashboard
    let dns = Router::new()
        .route("/dns/configure", post(dns_configure_handler))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );

    Router::new()
        // Health and version
        .route("/health", get(health_handler))
        .route("/version", get(version_handler))
        // Session
        .route("/session", get(session_handler))
        // Canisters
        .route("/canisters", get(canisters_handler))
        .route("/canisters/{id}/status", get(canister_status_handler))
        .route("/wallet/balance", get(balance_handler))
        // Deployments
        .route("/deployments", get(deployments_handler))
        .route("/deployments/{id}", get(deployment_handler))
        // Background workers
        .route("/scanner/run", post(scanner_run_handler))
        .route("/bridge/state", get(bridge_state_handler))
        // State and middleware
        .with_state(state)
        .merge(dns)
        .layer(TraceLayer::new_for_http())
}

/// Start the HTTP server
pub async fn serve(
    options: &ServerOptions,
    state: Arc<ServerState>,
    shutdown_signal: impl Future<Output = ()> + Send + 'static,
) -> Result<JoinHandle<Result<(), AgentError>>, AgentError> {
    let app = router(state);

    let addr = format!("{}:{}", options.host, options.port);
    info!("Starting HTTP server on {}", addr);

    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| AgentError::ServerError(e.to_string()))?;

    let handle = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal)
            .await
            .map_err(|e| AgentError::ServerError(e.to_string()))
    });

    Ok(handle)
}
