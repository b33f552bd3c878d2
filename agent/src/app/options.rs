//! Application configuration options

use std::time::Duration;

use candid::Principal;
use tracing::warn;

use crate::cache::status::StatusCacheOptions;
use crate::errors::AgentError;
use crate::ic::client::IcOptions;
use crate::ic::types::parse_principal;
use crate::storage::layout::StorageLayout;
use crate::storage::settings::{BackendSettings, Settings};
use crate::workers::{bridge, scanner, session_refresh};

/// Main application options
#[derive(Debug, Clone)]
pub struct AppOptions {
    /// Lifecycle configuration
    pub lifecycle: LifecycleOptions,

    /// Storage layout paths
    pub layout: StorageLayout,

    /// Backend (Supabase) endpoints
    pub backend: BackendSettings,

    /// IC agent configuration
    pub ic: IcOptions,

    /// Principal whose commit grants the scanner revokes; the scanner is
    /// disabled without one
    pub backend_principal: Option<Principal>,

    /// Enable local HTTP server
    pub enable_socket_server: bool,

    /// Enable the permission scanner worker
    pub enable_scanner: bool,

    /// Enable the event bridge worker
    pub enable_event_bridge: bool,

    /// Server configuration
    pub server: ServerOptions,

    /// Status cache retry behavior
    pub status_cache: StatusCacheOptions,

    /// Scanner worker options
    pub scanner_worker: scanner::Options,

    /// Event bridge worker options
    pub bridge_worker: bridge::Options,

    /// Session refresh worker options
    pub session_refresh_worker: session_refresh::Options,
}

impl AppOptions {
    /// Build options from the loaded settings
    pub fn from_settings(settings: &Settings, layout: StorageLayout) -> Result<Self, AgentError> {
        let backend_principal = if settings.ic.backend_principal.trim().is_empty() {
            if settings.enable_scanner {
                warn!("No backend principal configured, permission scanner disabled");
            }
            None
        } else {
            Some(parse_principal(&settings.ic.backend_principal)?)
        };

        Ok(Self {
            lifecycle: LifecycleOptions::default(),
            layout,
            backend: settings.backend.clone(),
            ic: IcOptions::from_settings(&settings.ic)?,
            backend_principal,
            enable_socket_server: settings.enable_socket_server,
            enable_scanner: settings.enable_scanner && backend_principal.is_some(),
            enable_event_bridge: settings.enable_event_bridge,
            server: ServerOptions {
                host: settings.server.host.clone(),
                port: settings.server.port,
            },
            status_cache: StatusCacheOptions::default(),
            scanner_worker: scanner::Options {
                interval: Duration::from_secs(settings.scanner_interval_secs.max(1)),
            },
            bridge_worker: bridge::Options {
                url: settings.events.url.clone(),
                ..Default::default()
            },
            session_refresh_worker: session_refresh::Options::default(),
        })
    }
}

/// Lifecycle options for the agent
#[derive(Debug, Clone)]
pub struct LifecycleOptions {
    /// Maximum delay for graceful shutdown
    pub max_shutdown_delay: Duration,
}

impl Default for LifecycleOptions {
    fn default() -> Self {
        Self {
            max_shutdown_delay: Duration::from_secs(30),
        }
    }
}

/// Local HTTP server options
#[derive(Debug, Clone)]
pub struct ServerOptions {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8787,
        }
    }
}
