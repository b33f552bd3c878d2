//! Permission scanner worker

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::authn::session_mngr::AuthState;
use crate::scanner::permissions::PermissionScanner;

/// Scanner worker options
#[derive(Debug, Clone)]
pub struct Options {
    /// Interval between scheduled scans
    pub interval: Duration,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(300), // 5 minutes
        }
    }
}

/// Run the scanner worker.
///
/// Scans on start, when the session becomes authenticated, and on every
/// interval tick. Ticks while unauthenticated are skipped, and a change that
/// keeps the session authenticated (a token refresh) does not scan.
pub async fn run<S, F>(
    options: &Options,
    scanner: Arc<PermissionScanner>,
    mut auth_state: watch::Receiver<AuthState>,
    sleep_fn: S,
    mut shutdown_signal: Pin<Box<dyn Future<Output = ()> + Send>>,
) where
    S: Fn(Duration) -> F,
    F: Future<Output = ()>,
{
    info!("Scanner worker starting...");
    let mut auth_open = true;
    let mut scan_due = true;

    loop {
        let authenticated = auth_state.borrow_and_update().is_authenticated();
        if scan_due && authenticated {
            tokio::select! {
                _ = &mut shutdown_signal => {
                    info!("Scanner worker shutting down...");
                    return;
                }
                report = scanner.run() => {
                    if let Some(reason) = &report.aborted {
                        warn!("Scan {} aborted: {}", report.run_id, reason);
                    } else {
                        debug!("Scan {} revoked {} grants", report.run_id, report.revoked.len());
                    }
                }
            }
        } else if scan_due {
            debug!("Not authenticated, skipping permission scan");
        }

        tokio::select! {
            _ = &mut shutdown_signal => {
                info!("Scanner worker shutting down...");
                return;
            }
            _ = sleep_fn(options.interval) => {
                scan_due = true;
            }
            changed = auth_state.changed(), if auth_open => {
                if changed.is_err() {
                    warn!("Authentication state channel closed, scanning on interval only");
                    auth_open = false;
                    scan_due = false;
                } else {
                    // Only the edge into the authenticated state triggers a scan
                    scan_due = !authenticated && auth_state.borrow().is_authenticated();
                }
            }
        }
    }
}
