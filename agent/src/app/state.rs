//! Application state management
//!
//! `AppState` is the single context object every consumer receives by `Arc`;
//! nothing in the agent is reachable through a global.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::info;

use crate::app::options::AppOptions;
use crate::authn::session_mngr::{SessionManager, SessionManagerExt};
use crate::bridge::connection::ConnectionState;
use crate::cache::deployments::DeploymentCache;
use crate::cache::status::{StatusCache, StatusCacheOptions};
use crate::errors::AgentError;
use crate::http::auth::AuthClient;
use crate::http::backend::BackendApi;
use crate::http::client::HttpClient;
use crate::ic::client::IcClient;
use crate::ic::ledger::CyclesLedger;
use crate::ic::status_proxy::StatusProxy;
use crate::scanner::permissions::PermissionScanner;

/// Application caches
pub struct Caches {
    pub status: Arc<StatusCache>,
    pub deployments: Arc<DeploymentCache>,
}

impl Caches {
    pub fn new(proxy: Arc<dyn StatusProxy>, options: StatusCacheOptions) -> Self {
        Self {
            status: Arc::new(StatusCache::new(proxy, options)),
            deployments: Arc::new(DeploymentCache::new()),
        }
    }
}

/// Main application state
pub struct AppState {
    /// HTTP client for the edge functions
    pub http_client: Arc<HttpClient>,

    /// Session manager for authentication
    pub session: Arc<SessionManager>,

    /// Token-carrying backend access
    pub backend: Arc<BackendApi>,

    /// IC agent context
    pub ic: Arc<IcClient>,

    /// Cycles ledger surface
    pub ledger: Arc<dyn CyclesLedger>,

    /// Application caches
    pub caches: Arc<Caches>,

    /// Permission scanner, absent without a backend principal
    pub scanner: Option<Arc<PermissionScanner>>,

    /// Event bridge connection state
    pub bridge_state: Arc<watch::Sender<ConnectionState>>,
}

impl AppState {
    /// Initialize application state
    pub async fn init(options: &AppOptions) -> Result<Self, AgentError> {
        info!("Initializing application state...");

        let http_client = Arc::new(HttpClient::new(&options.backend.functions_url, &options.backend.anon_key)?);
        let auth_client = Arc::new(AuthClient::new(&options.backend)?);

        let session = Arc::new(SessionManager::new(Arc::new(options.layout.session_file()), auth_client).await?);
        let backend = Arc::new(BackendApi::new(
            http_client.clone(),
            session.clone() as Arc<dyn SessionManagerExt>,
        ));

        let ic = Arc::new(IcClient::connect(options.ic.clone(), &options.layout.identity_file()).await?);
        let caches = Arc::new(Caches::new(
            ic.clone() as Arc<dyn StatusProxy>,
            options.status_cache.clone(),
        ));

        let scanner = options.backend_principal.map(|principal| {
            Arc::new(PermissionScanner::new(
                backend.clone(),
                ic.clone(),
                ic.clone(),
                backend.clone(),
                principal,
            ))
        });

        let (bridge_state, _) = watch::channel(ConnectionState::Idle);

        Ok(Self {
            http_client,
            session,
            backend,
            ledger: ic.clone(),
            ic,
            caches,
            scanner,
            bridge_state: Arc::new(bridge_state),
        })
    }

    /// Shutdown application state
    pub async fn shutdown(&self) -> Result<(), AgentError> {
        info!("Shutting down application state...");
        self.ic.shutdown().await
    }
}
