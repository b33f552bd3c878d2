//! `--diagnostic`: check the local setup without starting the workers

use colored::Colorize;
use secrecy::ExposeSecret;

use crate::authn::session_token::SessionToken;
use crate::ic::client::{IcClient, IcOptions};
use crate::storage::layout::StorageLayout;
use crate::storage::session::load_session;
use crate::storage::settings::Settings;

enum Check {
    Pass(String),
    Warn(String),
    Fail(String),
}

fn report(name: &str, check: Check) -> bool {
    match check {
        Check::Pass(detail) => {
            println!("{} {:<14} {}", "[ ok ]".green().bold(), name, detail);
            true
        }
        Check::Warn(detail) => {
            println!("{} {:<14} {}", "[warn]".yellow().bold(), name, detail);
            true
        }
        Check::Fail(detail) => {
            println!("{} {:<14} {}", "[fail]".red().bold(), name, detail);
            false
        }
    }
}

/// Print one line per check; returns whether every check passed
pub async fn run_diagnostic(layout: &StorageLayout, settings: &Settings) -> bool {
    println!("{}", "hosty-agent diagnostic".bold());
    println!("storage: {}\n", layout.base_dir.display());
    let mut healthy = true;

    let settings_file = layout.settings_file();
    healthy &= report(
        "settings",
        if settings_file.exists().await {
            Check::Pass(settings_file.path().display().to_string())
        } else {
            Check::Warn("no settings.json, using defaults".to_string())
        },
    );

    healthy &= report("session", check_session(layout).await);

    let identity_file = layout.identity_file();
    healthy &= report(
        "identity",
        if identity_file.exists().await {
            Check::Pass(identity_file.path().display().to_string())
        } else {
            Check::Warn("no identity.pem, actor calls run as the anonymous principal".to_string())
        },
    );

    let ic_check = match IcOptions::from_settings(&settings.ic) {
        Ok(options) => match IcClient::connect(options, &identity_file).await {
            Ok(client) => match client.principal() {
                Ok(principal) => Check::Pass(format!("{} as {}", settings.ic.host, principal)),
                Err(e) => Check::Fail(e.to_string()),
            },
            Err(e) => Check::Fail(e.to_string()),
        },
        Err(e) => Check::Fail(e.to_string()),
    };
    healthy &= report("ic agent", ic_check);

    healthy &= report(
        "status proxy",
        if settings.ic.status_proxy_canister_id.trim().is_empty() {
            Check::Fail("status_proxy_canister_id is not set".to_string())
        } else {
            Check::Pass(settings.ic.status_proxy_canister_id.clone())
        },
    );

    healthy &= report(
        "scanner",
        if settings.ic.backend_principal.trim().is_empty() {
            Check::Warn("backend_principal is not set, scanner disabled".to_string())
        } else {
            Check::Pass(format!("every {}s", settings.scanner_interval_secs))
        },
    );

    println!();
    if healthy {
        println!("{}", "All checks passed".green());
    } else {
        println!("{}", "Some checks failed".red());
    }
    healthy
}

async fn check_session(layout: &StorageLayout) -> Check {
    let session_file = layout.session_file();
    if !session_file.exists().await {
        return Check::Warn("not logged in, run `hosty-agent --login`".to_string());
    }

    let session = match load_session(&session_file).await {
        Ok(session) => session,
        Err(e) => return Check::Fail(e.to_string()),
    };
    match SessionToken::from_raw(session.access_token.expose_secret().to_string()) {
        Ok(token) if token.is_expired() => Check::Warn(format!(
            "{} (access token expired at {}, will refresh)",
            token.user_id(),
            token.expires_at()
        )),
        Ok(token) => Check::Pass(format!("{} until {}", token.user_id(), token.expires_at())),
        Err(e) => Check::Fail(e.to_string()),
    }
}
