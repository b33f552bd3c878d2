//! Deployment event bridge worker

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use secrecy::{ExposeSecret, SecretString};
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::{header, HeaderValue, StatusCode};
use tokio_tungstenite::tungstenite::protocol::Message;
use tokio_tungstenite::tungstenite::Error as WsError;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, warn};
use url::Url;

use crate::authn::session_mngr::{AuthState, SessionManagerExt};
use crate::bridge::connection::{BackoffPolicy, ConnectionMachine, ConnectionState};
use crate::bridge::protocol::handle_frame;
use crate::cache::deployments::DeploymentCache;
use crate::errors::AgentError;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type ShutdownSignal = Pin<Box<dyn Future<Output = ()> + Send>>;

/// Event bridge worker options
#[derive(Debug, Clone)]
pub struct Options {
    /// WebSocket endpoint of the build service
    pub url: String,

    /// Reconnect policy
    pub policy: BackoffPolicy,

    /// Limit on the connect handshake
    pub connect_timeout: Duration,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            url: "ws://localhost:3001/deployments".to_string(),
            policy: BackoffPolicy::default(),
            connect_timeout: Duration::from_secs(10),
        }
    }
}

enum StreamEnd {
    Shutdown,
    SignedOut,
    Dropped(String),
}

/// Run the event bridge worker.
///
/// Holds one connection while the session is authenticated and publishes
/// every state transition on `state_tx`.
pub async fn run<S, F>(
    options: &Options,
    session: Arc<dyn SessionManagerExt>,
    cache: Arc<DeploymentCache>,
    state_tx: Arc<watch::Sender<ConnectionState>>,
    sleep_fn: S,
    mut shutdown_signal: ShutdownSignal,
) where
    S: Fn(Duration) -> F,
    F: Future<Output = ()>,
{
    info!("Event bridge worker starting...");

    let url = match parse_events_url(&options.url) {
        Ok(url) => url,
        Err(e) => {
            error!("Invalid event stream URL: {}", e);
            return;
        }
    };

    let mut machine = ConnectionMachine::new(options.policy.clone());
    let mut auth_state = session.auth_state();
    let publish = |machine: &ConnectionMachine| {
        state_tx.send_replace(machine.state().clone());
    };
    publish(&machine);

    loop {
        let authenticated = auth_state.borrow_and_update().is_authenticated();
        let failed = matches!(machine.state(), ConnectionState::Failed { .. });
        if !authenticated || failed {
            if failed {
                warn!("Event bridge stopped reconnecting, waiting for a new session");
            } else {
                debug!("Not authenticated, event bridge idle");
            }
            if !wait_for_auth_change(&mut auth_state, &mut shutdown_signal).await {
                break;
            }
            machine.reset();
            publish(&machine);
            continue;
        }

        let token = match session.get_token().await {
            Ok(token) => token.raw,
            Err(e) => {
                warn!("No access token for the event stream: {}", e);
                if !wait_for_auth_change(&mut auth_state, &mut shutdown_signal).await {
                    break;
                }
                continue;
            }
        };

        if !machine.start() {
            break;
        }
        publish(&machine);
        info!("Connecting to event stream: {} ({})", url, machine.state());

        let connected = tokio::select! {
            _ = &mut shutdown_signal => break,
            result = tokio::time::timeout(options.connect_timeout, connect(&url, &token)) => match result {
                Ok(result) => result,
                Err(_) => Err(AgentError::BridgeError(format!(
                    "connect timed out after {:?}",
                    options.connect_timeout
                ))),
            },
        };

        let end = match connected {
            Ok(ws) => {
                machine.on_connected();
                publish(&machine);
                info!("Connected to event stream");
                pump(ws, &cache, &mut auth_state, &mut shutdown_signal).await
            }
            Err(e) => {
                if e.is_unauthorized() {
                    session.report_unauthorized("event stream handshake");
                }
                StreamEnd::Dropped(e.to_string())
            }
        };

        match end {
            StreamEnd::Shutdown => break,
            StreamEnd::SignedOut => {
                info!("Session ended, closing event stream");
                machine.reset();
                publish(&machine);
            }
            StreamEnd::Dropped(reason) => {
                let retry_in = machine.on_disconnected(&reason);
                publish(&machine);
                match retry_in {
                    Some(delay) => {
                        warn!("Event stream disconnected: {}. Retrying in {:?}...", reason, delay);
                        tokio::select! {
                            _ = &mut shutdown_signal => break,
                            _ = sleep_fn(delay) => {}
                        }
                    }
                    None => error!("Event stream failed: {}", machine.state()),
                }
            }
        }
    }

    machine.shutdown();
    publish(&machine);
    info!("Event bridge worker shutting down...");
}

/// Wait for the next authentication change; `false` on shutdown or when the
/// session manager is gone
async fn wait_for_auth_change(
    auth_state: &mut watch::Receiver<AuthState>,
    shutdown_signal: &mut ShutdownSignal,
) -> bool {
    tokio::select! {
        _ = shutdown_signal => false,
        changed = auth_state.changed() => changed.is_ok(),
    }
}

async fn connect(url: &Url, token: &SecretString) -> Result<WsStream, AgentError> {
    let mut request = url
        .as_str()
        .into_client_request()
        .map_err(|e| AgentError::BridgeError(e.to_string()))?;
    let bearer = HeaderValue::from_str(&format!("Bearer {}", token.expose_secret()))
        .map_err(|e| AgentError::BridgeError(e.to_string()))?;
    request.headers_mut().insert(header::AUTHORIZATION, bearer);

    match connect_async(request).await {
        Ok((ws, _)) => Ok(ws),
        Err(WsError::Http(response)) if response.status() == StatusCode::UNAUTHORIZED => {
            Err(AgentError::Unauthorized("event stream handshake".to_string()))
        }
        Err(e) => Err(AgentError::BridgeError(e.to_string())),
    }
}

async fn pump(
    mut ws: WsStream,
    cache: &DeploymentCache,
    auth_state: &mut watch::Receiver<AuthState>,
    shutdown_signal: &mut ShutdownSignal,
) -> StreamEnd {
    let mut auth_open = true;
    loop {
        tokio::select! {
            _ = &mut *shutdown_signal => {
                let _ = ws.close(None).await;
                return StreamEnd::Shutdown;
            }
            changed = auth_state.changed(), if auth_open => {
                if changed.is_err() {
                    auth_open = false;
                } else if !auth_state.borrow_and_update().is_authenticated() {
                    let _ = ws.close(None).await;
                    return StreamEnd::SignedOut;
                }
            }
            msg = ws.next() => match msg {
                Some(Ok(Message::Text(text))) => {
                    handle_frame(&text, cache);
                }
                Some(Ok(Message::Close(frame))) => {
                    let reason = frame
                        .map(|f| format!("closed by server: {}", f.reason.as_str()))
                        .unwrap_or_else(|| "closed by server".to_string());
                    return StreamEnd::Dropped(reason);
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => return StreamEnd::Dropped(e.to_string()),
                None => return StreamEnd::Dropped("stream ended".to_string()),
            }
        }
    }
}

fn parse_events_url(raw: &str) -> Result<Url, AgentError> {
    let mut url = Url::parse(raw).map_err(|e| AgentError::ConfigError(e.to_string()))?;

    let scheme = match url.scheme() {
        "ws" | "wss" => return Ok(url),
        "http" => "ws",
        "https" => "wss",
        other => {
            return Err(AgentError::ConfigError(format!(
                "unsupported event stream scheme '{}'",
                other
            )))
        }
    };
    url.set_scheme(scheme)
        .map_err(|_| AgentError::ConfigError("failed to set scheme".to_string()))?;
    Ok(url)
}
