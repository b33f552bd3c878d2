//! Settings file management

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::logs::LogLevel;

/// Agent settings, read from `settings.json`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub log_level: LogLevel,

    /// Emit JSON formatted logs
    #[serde(default)]
    pub log_json: bool,

    /// Also write logs to a daily rolling file in the logs directory
    #[serde(default)]
    pub log_to_file: bool,

    #[serde(default)]
    pub backend: BackendSettings,

    #[serde(default)]
    pub ic: IcSettings,

    #[serde(default)]
    pub events: EventSettings,

    #[serde(default)]
    pub server: ServerSettings,

    /// Enable the local HTTP API
    #[serde(default = "default_true")]
    pub enable_socket_server: bool,

    /// Enable the background permission scanner
    #[serde(default = "default_true")]
    pub enable_scanner: bool,

    /// Enable the deployment event bridge
    #[serde(default = "default_true")]
    pub enable_event_bridge: bool,

    /// Permission scan interval in seconds
    #[serde(default = "default_scanner_interval")]
    pub scanner_interval_secs: u64,
}

fn default_true() -> bool {
    true
}

fn default_scanner_interval() -> u64 {
    300
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Info,
            log_json: false,
            log_to_file: false,
            backend: BackendSettings::default(),
            ic: IcSettings::default(),
            events: EventSettings::default(),
            server: ServerSettings::default(),
            enable_socket_server: true,
            enable_scanner: true,
            enable_event_bridge: true,
            scanner_interval_secs: default_scanner_interval(),
        }
    }
}

impl Settings {
    /// Override file values with `HOSTY_*` environment variables
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(level) = lookup("HOSTY_LOG_LEVEL") {
            match level.parse() {
                Ok(level) => self.log_level = level,
                Err(e) => warn!("Ignoring HOSTY_LOG_LEVEL: {}", e),
            }
        }
        if let Some(url) = lookup("HOSTY_FUNCTIONS_URL") {
            self.backend.functions_url = url;
        }
        if let Some(url) = lookup("HOSTY_SUPABASE_URL") {
            self.backend.supabase_url = url;
        }
        if let Some(key) = lookup("HOSTY_SUPABASE_ANON_KEY") {
            self.backend.anon_key = key;
        }
        if let Some(host) = lookup("HOSTY_IC_HOST") {
            self.ic.host = host;
        }
        if let Some(id) = lookup("HOSTY_STATUS_PROXY_CANISTER_ID") {
            self.ic.status_proxy_canister_id = id;
        }
        if let Some(id) = lookup("HOSTY_LEDGER_CANISTER_ID") {
            self.ic.ledger_canister_id = id;
        }
        if let Some(principal) = lookup("HOSTY_BACKEND_PRINCIPAL") {
            self.ic.backend_principal = principal;
        }
        if let Some(url) = lookup("HOSTY_EVENTS_URL") {
            self.events.url = url;
        }
    }
}

/// Backend (Supabase) settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendSettings {
    /// Base URL of the edge functions
    #[serde(default = "default_functions_url")]
    pub functions_url: String,

    /// Base URL of the Supabase project (auth endpoints)
    #[serde(default = "default_supabase_url")]
    pub supabase_url: String,

    /// Public anon key sent as the `apikey` header
    #[serde(default)]
    pub anon_key: String,
}

fn default_functions_url() -> String {
    "http://localhost:54321/functions/v1".to_string()
}

fn default_supabase_url() -> String {
    "http://localhost:54321".to_string()
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            functions_url: default_functions_url(),
            supabase_url: default_supabase_url(),
            anon_key: String::new(),
        }
    }
}

/// Internet Computer settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IcSettings {
    /// Replica / boundary node URL
    #[serde(default = "default_ic_host")]
    pub host: String,

    /// Fetch the root key on start-up (local replicas only)
    #[serde(default)]
    pub fetch_root_key: bool,

    /// Status proxy canister
    #[serde(default)]
    pub status_proxy_canister_id: String,

    /// TCYCLES ledger canister
    #[serde(default = "default_ledger_canister_id")]
    pub ledger_canister_id: String,

    /// Principal the deployment backend uses to commit assets
    #[serde(default)]
    pub backend_principal: String,
}

fn default_ic_host() -> String {
    "https://icp-api.io".to_string()
}

fn default_ledger_canister_id() -> String {
    "um5iw-rqaaa-aaaaq-qaaba-cai".to_string()
}

impl Default for IcSettings {
    fn default() -> Self {
        Self {
            host: default_ic_host(),
            fetch_root_key: false,
            status_proxy_canister_id: String::new(),
            ledger_canister_id: default_ledger_canister_id(),
            backend_principal: String::new(),
        }
    }
}

/// Deployment event stream settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventSettings {
    /// WebSocket endpoint of the build service
    #[serde(default = "default_events_url")]
    pub url: String,
}

fn default_events_url() -> String {
    "ws://localhost:3001/deployments".to_string()
}

impl Default for EventSettings {
    fn default() -> Self {
        Self {
            url: default_events_url(),
        }
    }
}

/// Local HTTP API settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_server_host")]
    pub host: String,

    #[serde(default = "default_server_port")]
    pub port: u16,
}

fn default_server_host() -> String {
    "127.0.0.1".to_string()
}

fn default_server_port() -> u16 {
    8787
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_server_host(),
            port: default_server_port(),
        }
    }
}
