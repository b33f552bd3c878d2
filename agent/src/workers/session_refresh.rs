//! Session refresh worker

use std::future::Future;
use std::pin::Pin;
use std::time::{Duration, Instant};

use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, error, info, warn};

use crate::authn::session_mngr::{AuthEvent, SessionManagerExt};

/// Session refresh worker options
#[derive(Debug, Clone)]
pub struct Options {
    /// Check interval
    pub check_interval: Duration,

    /// Refresh when the access token expires within this duration
    pub refresh_threshold: Duration,

    /// Minimum spacing between refresh attempts triggered by auth events
    pub min_refresh_gap: Duration,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            check_interval: Duration::from_secs(60),
            refresh_threshold: Duration::from_secs(300), // 5 minutes
            min_refresh_gap: Duration::from_secs(10),
        }
    }
}

/// Run the session refresh worker
pub async fn run<T, S, F>(
    options: &Options,
    session: &T,
    sleep_fn: S,
    mut shutdown_signal: Pin<Box<dyn Future<Output = ()> + Send>>,
) where
    T: SessionManagerExt + ?Sized,
    S: Fn(Duration) -> F,
    F: Future<Output = ()>,
{
    info!("Session refresh worker starting...");

    let mut events = session.auth_events();
    let mut last_attempt: Option<Instant> = None;

    loop {
        tokio::select! {
            _ = &mut shutdown_signal => {
                info!("Session refresh worker shutting down...");
                return;
            }
            _ = sleep_fn(options.check_interval) => {
                check_expiry(options, session, &mut last_attempt).await;
            }
            event = events.recv() => match event {
                Ok(AuthEvent::Unauthorized { context }) => {
                    info!("Backend rejected the session ({}), refreshing...", context);
                    refresh(options, session, &mut last_attempt).await;
                }
                Ok(AuthEvent::Expired) => {
                    info!("Access token expired, refreshing...");
                    refresh(options, session, &mut last_attempt).await;
                }
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    warn!("Missed {} auth events", skipped);
                }
                Err(RecvError::Closed) => {
                    info!("Auth event channel closed, session refresh worker exiting...");
                    return;
                }
            }
        }
    }
}

async fn check_expiry<T>(options: &Options, session: &T, last_attempt: &mut Option<Instant>)
where
    T: SessionManagerExt + ?Sized,
{
    debug!("Checking access token expiration...");

    let token = match session.get_token().await {
        Ok(token) => token,
        Err(e) => {
            // An expired token is reported on the event channel
            debug!("No usable access token: {}", e);
            return;
        }
    };

    let threshold_secs = options.refresh_threshold.as_secs() as i64;
    if token.expires_within(threshold_secs) {
        info!("Access token expires within {} seconds, refreshing...", threshold_secs);
        refresh(options, session, last_attempt).await;
    } else {
        debug!("Access token valid for another {} seconds", token.time_until_expiry());
    }
}

async fn refresh<T>(options: &Options, session: &T, last_attempt: &mut Option<Instant>)
where
    T: SessionManagerExt + ?Sized,
{
    if let Some(at) = last_attempt {
        if at.elapsed() < options.min_refresh_gap {
            debug!("Refreshed {:?} ago, skipping", at.elapsed());
            return;
        }
    }
    *last_attempt = Some(Instant::now());

    match session.refresh_token().await {
        Ok(token) => info!("Session refreshed, new expiration: {}", token.expires_at()),
        Err(e) => error!("Failed to refresh session: {}", e),
    }
}
