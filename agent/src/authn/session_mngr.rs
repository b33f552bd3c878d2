//! Session manager for backend authentication
//!
//! Owns the stored session, publishes the authentication state on a `watch`
//! channel and fans out authentication failures on a `broadcast` channel.

use std::sync::Arc;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use tokio::sync::{broadcast, watch, RwLock};
use tracing::{info, warn};

use crate::authn::session_token::SessionToken;
use crate::errors::AgentError;
use crate::filesys::file::File;
use crate::http::auth::AuthClient;
use crate::storage::session::{load_session, save_session, Session};
use crate::utils::now_secs;

/// Whether a usable session is present
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthState {
    Unauthenticated,
    Authenticated { user_id: String },
}

impl AuthState {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, AuthState::Authenticated { .. })
    }

    fn from_token(token: &SessionToken) -> Self {
        if token.is_expired() {
            AuthState::Unauthenticated
        } else {
            AuthState::Authenticated {
                user_id: token.user_id().to_string(),
            }
        }
    }
}

/// Authentication failures reported by consumers of the session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthEvent {
    /// A backend call was rejected with 401
    Unauthorized { context: String },
    /// The access token is past its expiry
    Expired,
    /// The refresh grant failed
    RefreshFailed { reason: String },
    /// A new access token was stored
    Refreshed,
}

/// Session manager trait for testability
#[async_trait]
pub trait SessionManagerExt: Send + Sync {
    /// The current access token; fails when absent or expired
    async fn get_token(&self) -> Result<SessionToken, AgentError>;

    /// Exchange the refresh token for a new access token
    async fn refresh_token(&self) -> Result<SessionToken, AgentError>;

    /// Subscribe to authentication state changes
    fn auth_state(&self) -> watch::Receiver<AuthState>;

    /// Subscribe to authentication failures
    fn auth_events(&self) -> broadcast::Receiver<AuthEvent>;

    /// Report a 401 from the backend
    fn report_unauthorized(&self, context: &str);

    /// Id of the signed-in user, `None` while unauthenticated
    fn user_id(&self) -> Option<String> {
        match &*self.auth_state().borrow() {
            AuthState::Authenticated { user_id } => Some(user_id.clone()),
            AuthState::Unauthenticated => None,
        }
    }
}

/// Session manager implementation
pub struct SessionManager {
    session_file: Arc<File>,
    auth_client: Arc<AuthClient>,
    cached: RwLock<Option<(Session, SessionToken)>>,
    state_tx: watch::Sender<AuthState>,
    events_tx: broadcast::Sender<AuthEvent>,
}

impl SessionManager {
    /// Load the stored session; a missing or expired session starts unauthenticated
    pub async fn new(session_file: Arc<File>, auth_client: Arc<AuthClient>) -> Result<Self, AgentError> {
        let (state_tx, _) = watch::channel(AuthState::Unauthenticated);
        let (events_tx, _) = broadcast::channel(16);

        let manager = Self {
            session_file,
            auth_client,
            cached: RwLock::new(None),
            state_tx,
            events_tx,
        };

        if let Err(e) = manager.load().await {
            warn!("No usable session: {}", e);
        }

        Ok(manager)
    }

    /// Stored session, if any
    pub async fn session(&self) -> Option<Session> {
        self.cached.read().await.as_ref().map(|(session, _)| session.clone())
    }

    async fn load(&self) -> Result<SessionToken, AgentError> {
        let session = load_session(&self.session_file).await?;
        let token = SessionToken::from_raw(session.access_token.expose_secret().to_string())?;

        self.publish(AuthState::from_token(&token));
        *self.cached.write().await = Some((session, token.clone()));
        Ok(token)
    }

    async fn store(&self, session: Session) -> Result<SessionToken, AgentError> {
        let token = SessionToken::from_raw(session.access_token.expose_secret().to_string())?;
        save_session(&self.session_file, &session).await?;

        *self.cached.write().await = Some((session, token.clone()));
        self.publish(AuthState::from_token(&token));
        Ok(token)
    }

    /// Publish `next`; subscribers are only woken when the state differs
    fn publish(&self, next: AuthState) -> bool {
        self.state_tx.send_if_modified(|state| {
            if *state == next {
                return false;
            }
            *state = next;
            true
        })
    }

    fn mark_unauthenticated(&self, event: AuthEvent) {
        self.publish(AuthState::Unauthenticated);
        let _ = self.events_tx.send(event);
    }
}

#[async_trait]
impl SessionManagerExt for SessionManager {
    async fn get_token(&self) -> Result<SessionToken, AgentError> {
        let token = {
            let cached = self.cached.read().await;
            cached.as_ref().map(|(_, token)| token.clone())
        };

        let token = match token {
            Some(token) => token,
            None => self
                .load()
                .await
                .map_err(|e| AgentError::NotLoggedIn(e.to_string()))?,
        };

        if token.is_expired() {
            self.mark_unauthenticated(AuthEvent::Expired);
            return Err(AgentError::AuthError(format!(
                "Access token expired at {}",
                token.expires_at()
            )));
        }
        Ok(token)
    }

    async fn refresh_token(&self) -> Result<SessionToken, AgentError> {
        info!("Refreshing access token...");

        let current = self
            .session()
            .await
            .ok_or_else(|| AgentError::NotLoggedIn("No stored session".to_string()))?;

        let grant = match self.auth_client.refresh(current.refresh_token.expose_secret()).await {
            Ok(grant) => grant,
            Err(e) => {
                self.mark_unauthenticated(AuthEvent::RefreshFailed {
                    reason: e.to_string(),
                });
                return Err(e);
            }
        };

        let token = self
            .store(Session {
                user_id: grant.user.id,
                email: grant.user.email.or(current.email),
                access_token: SecretString::from(grant.access_token),
                refresh_token: SecretString::from(grant.refresh_token),
                logged_in_at: current.logged_in_at,
            })
            .await?;

        let _ = self.events_tx.send(AuthEvent::Refreshed);
        info!("Access token refreshed, expires at: {}", token.expires_at());
        Ok(token)
    }

    fn auth_state(&self) -> watch::Receiver<AuthState> {
        self.state_tx.subscribe()
    }

    fn auth_events(&self) -> broadcast::Receiver<AuthEvent> {
        self.events_tx.subscribe()
    }

    fn report_unauthorized(&self, context: &str) {
        warn!("Backend rejected the session ({})", context);
        let _ = self.events_tx.send(AuthEvent::Unauthorized {
            context: context.to_string(),
        });
    }
}

/// Log in with email and password and store the resulting session
pub async fn login_with_password(
    auth_client: &AuthClient,
    session_file: &File,
    email: &str,
    password: &str,
) -> Result<Session, AgentError> {
    let grant = auth_client.password_login(email, password).await?;
    let session = Session {
        user_id: grant.user.id,
        email: grant.user.email.or_else(|| Some(email.to_string())),
        access_token: SecretString::from(grant.access_token),
        refresh_token: SecretString::from(grant.refresh_token),
        logged_in_at: now_secs(),
    };

    SessionToken::from_raw(session.access_token.expose_secret().to_string())?;
    save_session(session_file, &session).await?;
    Ok(session)
}
