//! Session file management

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize, Serializer};

use crate::errors::AgentError;
use crate::filesys::file::File;

/// Authenticated session stored locally
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Backend user id
    pub user_id: String,

    #[serde(default)]
    pub email: Option<String>,

    /// Backend access token (JWT)
    #[serde(serialize_with = "serialize_secret")]
    pub access_token: SecretString,

    /// Refresh token for the access token
    #[serde(serialize_with = "serialize_secret")]
    pub refresh_token: SecretString,

    /// Login timestamp (Unix epoch seconds)
    pub logged_in_at: u64,
}

/// The session file is the one place tokens are written out in clear
fn serialize_secret<S: Serializer>(secret: &SecretString, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(secret.expose_secret())
}

/// Assert that a session has been stored
pub async fn assert_logged_in(session_file: &File) -> Result<Session, AgentError> {
    if !session_file.exists().await {
        return Err(AgentError::NotLoggedIn(format!(
            "{} does not exist",
            session_file.path().display()
        )));
    }

    let session = load_session(session_file).await?;
    if session.access_token.expose_secret().is_empty() {
        return Err(AgentError::NotLoggedIn("Session has no access token".to_string()));
    }
    Ok(session)
}

/// Load the session from file
pub async fn load_session(session_file: &File) -> Result<Session, AgentError> {
    session_file
        .read_json()
        .await
        .map_err(|e| AgentError::StorageError(format!("Failed to read session: {}", e)))
}

/// Save the session to file (owner readable only)
pub async fn save_session(session_file: &File, session: &Session) -> Result<(), AgentError> {
    session_file.write_json_private(session).await
}
