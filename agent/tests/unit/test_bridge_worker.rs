//! Event bridge worker tests against a local WebSocket server

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use secrecy::ExposeSecret;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::{Response as HttpResponse, StatusCode};
use tokio_tungstenite::tungstenite::protocol::Message;
use tokio_tungstenite::WebSocketStream;

use hosty_agent::authn::session_mngr::{AuthEvent, AuthState, SessionManagerExt};
use hosty_agent::authn::session_token::SessionToken;
use hosty_agent::bridge::connection::{BackoffPolicy, ConnectionState};
use hosty_agent::bridge::protocol::BridgeEvent;
use hosty_agent::cache::deployments::DeploymentCache;
use hosty_agent::errors::AgentError;
use hosty_agent::models::deployment::{DeploymentLogChunk, DeploymentStatus};
use hosty_agent::utils::CooldownOptions;
use hosty_agent::workers;

use crate::common::{deployment, token};

const WAIT: Duration = Duration::from_secs(5);
const QUIET: Duration = Duration::from_millis(100);

struct BridgeSession {
    token: SessionToken,
    state: watch::Sender<AuthState>,
    events: broadcast::Sender<AuthEvent>,
    unauthorized: Mutex<Vec<String>>,
}

impl BridgeSession {
    fn new() -> Self {
        let token = token("user-1", 3_600);
        let (state, _) = watch::channel(AuthState::Authenticated {
            user_id: token.user_id().to_string(),
        });
        let (events, _) = broadcast::channel(16);
        Self {
            token,
            state,
            events,
            unauthorized: Mutex::new(Vec::new()),
        }
    }

    fn sign_out(&self) {
        self.state.send_replace(AuthState::Unauthenticated);
    }

    fn sign_in(&self) {
        self.state.send_replace(AuthState::Authenticated {
            user_id: self.token.user_id().to_string(),
        });
    }
}

#[async_trait]
impl SessionManagerExt for BridgeSession {
    async fn get_token(&self) -> Result<SessionToken, AgentError> {
        Ok(self.token.clone())
    }

    async fn refresh_token(&self) -> Result<SessionToken, AgentError> {
        Ok(self.token.clone())
    }

    fn auth_state(&self) -> watch::Receiver<AuthState> {
        self.state.subscribe()
    }

    fn auth_events(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }

    fn report_unauthorized(&self, context: &str) {
        self.unauthorized.lock().unwrap().push(context.to_string());
    }
}

struct Bridge {
    session: Arc<BridgeSession>,
    cache: Arc<DeploymentCache>,
    state: watch::Receiver<ConnectionState>,
    delays: Arc<Mutex<Vec<Duration>>>,
    shutdown: Option<oneshot::Sender<()>>,
    handle: JoinHandle<()>,
}

impl Bridge {
    /// Start the worker with an instant sleep that records every backoff delay
    fn start(url: String, max_attempts: u32) -> Self {
        let session = Arc::new(BridgeSession::new());
        let cache = Arc::new(DeploymentCache::new());
        let (state_tx, state) = watch::channel(ConnectionState::Idle);
        let delays = Arc::new(Mutex::new(Vec::new()));
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        let options = workers::bridge::Options {
            url,
            policy: BackoffPolicy {
                cooldown: CooldownOptions {
                    base_delay: Duration::from_secs(1),
                    max_delay: Duration::from_secs(30),
                    multiplier: 2.0,
                },
                jitter: 0.0,
                max_attempts,
            },
            connect_timeout: WAIT,
        };

        let worker_session: Arc<dyn SessionManagerExt> = session.clone();
        let worker_cache = cache.clone();
        let worker_delays = delays.clone();
        let handle = tokio::spawn(async move {
            workers::bridge::run(
                &options,
                worker_session,
                worker_cache,
                Arc::new(state_tx),
                move |delay| {
                    worker_delays.lock().unwrap().push(delay);
                    std::future::ready(())
                },
                Box::pin(async move {
                    let _ = shutdown_rx.await;
                }),
            )
            .await;
        });

        Self {
            session,
            cache,
            state,
            delays,
            shutdown: Some(shutdown_tx),
            handle,
        }
    }

    async fn wait_for(&mut self, name: &str) {
        timeout(WAIT, self.state.wait_for(|state| state.name() == name))
            .await
            .unwrap()
            .unwrap();
    }

    fn delays(&self) -> Vec<Duration> {
        self.delays.lock().unwrap().clone()
    }

    async fn stop(mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        timeout(WAIT, self.handle).await.unwrap().unwrap();
    }
}

async fn listen() -> (TcpListener, String) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}/deployments", listener.local_addr().unwrap());
    (listener, url)
}

/// Accept one connection; returns the socket and its `Authorization` header
async fn accept(listener: &TcpListener) -> (WebSocketStream<TcpStream>, Option<String>) {
    let (stream, _) = timeout(WAIT, listener.accept()).await.unwrap().unwrap();
    let mut authorization = None;
    let ws = tokio_tungstenite::accept_hdr_async(
        stream,
        |request: &Request, response: Response| -> Result<Response, ErrorResponse> {
            authorization = request
                .headers()
                .get("authorization")
                .and_then(|value| value.to_str().ok())
                .map(str::to_string);
            Ok(response)
        },
    )
    .await
    .unwrap();
    (ws, authorization)
}

async fn assert_no_connection(listener: &TcpListener) {
    assert!(timeout(QUIET, listener.accept()).await.is_err());
}

fn is_closing(message: Option<Result<Message, tokio_tungstenite::tungstenite::Error>>) -> bool {
    matches!(message, Some(Ok(Message::Close(_))) | Some(Err(_)) | None)
}

#[tokio::test]
async fn test_frames_patch_the_deployment_cache() {
    let (listener, url) = listen().await;
    let mut bridge = Bridge::start(url, 3);

    let (mut server, authorization) = accept(&listener).await;
    bridge.wait_for("connected").await;
    assert_eq!(
        authorization,
        Some(format!("Bearer {}", bridge.session.token.raw.expose_secret()))
    );

    let updated = BridgeEvent::DeploymentUpdated(deployment("dep-1", DeploymentStatus::Building, 10));
    let log = BridgeEvent::DeploymentLog(DeploymentLogChunk {
        deployment_id: "dep-1".to_string(),
        chunk: "npm install\n".to_string(),
        timestamp: None,
    });
    server.send(Message::text(updated.to_frame().unwrap())).await.unwrap();
    server.send(Message::text("{not json")).await.unwrap();
    server.send(Message::text(log.to_frame().unwrap())).await.unwrap();

    let cache = bridge.cache.clone();
    timeout(WAIT, async {
        while cache.get("dep-1").map(|d| d.build_logs) != Some("npm install\n".to_string()) {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap();
    assert_eq!(cache.get("dep-1").unwrap().status, DeploymentStatus::Building);
    assert_eq!(*bridge.state.borrow(), ConnectionState::Connected);

    bridge.stop().await;
}

#[tokio::test]
async fn test_server_close_backs_off_then_reconnects() {
    let (listener, url) = listen().await;
    let mut bridge = Bridge::start(url, 3);

    let (mut first, _) = accept(&listener).await;
    bridge.wait_for("connected").await;
    first.close(None).await.unwrap();

    let (_second, _) = accept(&listener).await;
    assert_eq!(bridge.delays(), vec![Duration::from_secs(1)]);
    bridge.wait_for("connected").await;

    bridge.stop().await;
}

#[tokio::test]
async fn test_sign_out_closes_without_reconnect() {
    let (listener, url) = listen().await;
    let mut bridge = Bridge::start(url, 3);

    let (mut server, _) = accept(&listener).await;
    bridge.wait_for("connected").await;

    bridge.session.sign_out();
    assert!(is_closing(timeout(WAIT, server.next()).await.unwrap()));
    bridge.wait_for("idle").await;
    assert_no_connection(&listener).await;
    assert!(bridge.delays().is_empty());

    // A new session connects again
    bridge.session.sign_in();
    let (_server, _) = accept(&listener).await;
    bridge.wait_for("connected").await;

    bridge.stop().await;
}

#[tokio::test]
async fn test_shutdown_while_connected_never_reconnects() {
    let (listener, url) = listen().await;
    let mut bridge = Bridge::start(url, 3);

    let (mut server, _) = accept(&listener).await;
    bridge.wait_for("connected").await;

    let state = bridge.state.clone();
    let delays = bridge.delays.clone();
    bridge.stop().await;

    assert!(is_closing(timeout(WAIT, server.next()).await.unwrap()));
    assert_eq!(*state.borrow(), ConnectionState::Idle);
    assert_no_connection(&listener).await;
    assert!(delays.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_rejected_handshake_reports_unauthorized() {
    let (listener, url) = listen().await;
    let mut bridge = Bridge::start(url, 2);

    let server = tokio::spawn(async move {
        loop {
            let Ok((stream, _)) = listener.accept().await else {
                return;
            };
            let _ = tokio_tungstenite::accept_hdr_async(
                stream,
                |_: &Request, _: Response| -> Result<Response, ErrorResponse> {
                    Err(HttpResponse::builder()
                        .status(StatusCode::UNAUTHORIZED)
                        .body(Some("invalid token".to_string()))
                        .unwrap())
                },
            )
            .await;
        }
    });

    bridge.wait_for("failed").await;
    assert_eq!(
        *bridge.session.unauthorized.lock().unwrap(),
        vec!["event stream handshake".to_string(); 2]
    );
    assert_eq!(bridge.delays(), vec![Duration::from_secs(1)]);
    assert!(bridge.cache.is_empty());

    server.abort();
    bridge.stop().await;
}
