//! Server state

use std::sync::Arc;

use tokio::sync::watch;

use crate::app::state::{AppState, Caches};
use crate::authn::session_mngr::SessionManager;
use crate::bridge::connection::ConnectionState;
use crate::http::backend::BackendApi;
use crate::ic::client::IcClient;
use crate::ic::ledger::CyclesLedger;
use crate::scanner::permissions::PermissionScanner;

/// Server state shared across handlers
pub struct ServerState {
    pub session: Arc<SessionManager>,
    pub backend: Arc<BackendApi>,
    pub ic: Arc<IcClient>,
    pub ledger: Arc<dyn CyclesLedger>,
    pub caches: Arc<Caches>,
    pub scanner: Option<Arc<PermissionScanner>>,
    pub bridge_state: watch::Receiver<ConnectionState>,
}

impl ServerState {
    pub fn from_app_state(app_state: &AppState) -> Self {
        Self {
            session: app_state.session.clone(),
            backend: app_state.backend.clone(),
            ic: app_state.ic.clone(),
            ledger: app_state.ledger.clone(),
            caches: app_state.caches.clone(),
            scanner: app_state.scanner.clone(),
            bridge_state: app_state.bridge_state.subscribe(),
        }
    }
}
