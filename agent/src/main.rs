//! hosty-agent - Entry Point
//!
//! Local agent for the hosty.live dashboard: keeps the canister status and
//! deployment caches warm, revokes stale backend permissions, and serves the
//! cached state on a local HTTP API.

use std::collections::HashMap;
use std::env;

use hosty_agent::app::options::AppOptions;
use hosty_agent::app::run::run;
use hosty_agent::authn::session_mngr::login_with_password;
use hosty_agent::diagnostic::run_diagnostic;
use hosty_agent::errors::AgentError;
use hosty_agent::http::auth::AuthClient;
use hosty_agent::logs::{init_logging, LogOptions};
use hosty_agent::storage::layout::StorageLayout;
use hosty_agent::storage::settings::Settings;
use hosty_agent::utils::version_info;

use tracing::{error, info};

#[tokio::main]
async fn main() {
    // Parse command line arguments
    let args: Vec<String> = env::args().collect();
    let mut cli_args: HashMap<String, String> = HashMap::new();

    for arg in args.iter().skip(1) {
        if let Some((key, value)) = arg.split_once('=') {
            // Handle --key=value format
            let clean_key = key.trim_start_matches('-');
            cli_args.insert(clean_key.to_string(), value.to_string());
        } else if arg.starts_with("--") {
            // Handle standalone flags like --version
            let clean_key = arg.trim_start_matches('-');
            cli_args.insert(clean_key.to_string(), "true".to_string());
        }
    }

    // Print version and exit
    let version = version_info();
    if cli_args.contains_key("version") {
        match serde_json::to_string_pretty(&version) {
            Ok(json) => println!("{}", json),
            Err(_) => println!("{}", version.version),
        }
        return;
    }

    let layout = StorageLayout::from_env();
    if let Err(e) = layout.setup().await {
        eprintln!("Unable to create {}: {}", layout.base_dir.display(), e);
        std::process::exit(1);
    }

    // Retrieve the settings file
    let settings = match load_settings(&layout).await {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Unable to read settings file: {}", e);
            std::process::exit(1);
        }
    };

    // Run diagnostics
    if cli_args.contains_key("diagnostic") || cli_args.contains_key("diag") {
        let healthy = run_diagnostic(&layout, &settings).await;
        std::process::exit(if healthy { 0 } else { 1 });
    }

    if cli_args.contains_key("login") {
        if let Err(e) = login(&layout, &settings, &cli_args).await {
            eprintln!("Login failed: {}", e);
            std::process::exit(1);
        }
        return;
    }

    if cli_args.contains_key("logout") {
        match layout.session_file().delete().await {
            Ok(()) => println!("Logged out"),
            Err(e) => {
                eprintln!("Logout failed: {}", e);
                std::process::exit(1);
            }
        }
        return;
    }

    // Run the agent starting here

    // Initialize logging
    let log_options = LogOptions {
        log_level: settings.log_level.clone(),
        log_dir: settings
            .log_to_file
            .then(|| layout.logs_dir().path().to_path_buf()),
        json_format: settings.log_json,
        ..Default::default()
    };
    let _log_guard = match init_logging(log_options) {
        Ok(guard) => guard,
        Err(e) => {
            println!("Failed to initialize logging: {e}");
            None
        }
    };

    let options = match AppOptions::from_settings(&settings, layout) {
        Ok(options) => options,
        Err(e) => {
            error!("Invalid settings: {}", e);
            std::process::exit(1);
        }
    };

    info!("Running hosty agent {} with options: {:?}", version.version, options);
    if let Err(e) = run(options, await_shutdown_signal()).await {
        error!("Failed to run the agent: {e}");
        std::process::exit(1);
    }
}

async fn load_settings(layout: &StorageLayout) -> Result<Settings, AgentError> {
    let settings_file = layout.settings_file();
    let mut settings = if settings_file.exists().await {
        settings_file.read_json::<Settings>().await?
    } else {
        Settings::default()
    };
    settings.apply_env_overrides();
    Ok(settings)
}

async fn login(
    layout: &StorageLayout,
    settings: &Settings,
    cli_args: &HashMap<String, String>,
) -> Result<(), AgentError> {
    let email = cli_args
        .get("email")
        .ok_or_else(|| AgentError::ValidationError("--email=<email> is required".to_string()))?;
    let password = match cli_args.get("password") {
        Some(password) => password.clone(),
        None => env::var("HOSTY_PASSWORD")
            .map_err(|_| AgentError::ValidationError("--password=<password> or HOSTY_PASSWORD is required".to_string()))?,
    };

    let auth_client = AuthClient::new(&settings.backend)?;
    let session = login_with_password(&auth_client, &layout.session_file(), email, &password).await?;
    println!("Logged in as {}", session.email.as_deref().unwrap_or(&session.user_id));
    Ok(())
}

async fn await_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let (mut sigterm, mut sigint) = match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
            (Ok(sigterm), Ok(sigint)) => (sigterm, sigint),
            _ => {
                error!("Failed to install signal handlers, waiting for Ctrl+C only");
                let _ = tokio::signal::ctrl_c().await;
                return;
            }
        };

        tokio::select! {
            _ = sigterm.recv() => {
                info!("SIGTERM received, shutting down...");
            }
            _ = sigint.recv() => {
                info!("SIGINT received, shutting down...");
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Ctrl+C received, shutting down...");
            }
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
        }
        info!("Ctrl+C received, shutting down...");
    }
}
