//! Storage layout configuration

use std::path::PathBuf;

use crate::errors::AgentError;
use crate::filesys::dir::Dir;
use crate::filesys::file::File;

/// Storage layout for the agent
#[derive(Debug, Clone)]
pub struct StorageLayout {
    /// Base directory for all storage
    pub base_dir: PathBuf,
}

impl StorageLayout {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// Layout rooted at `HOSTY_HOME` when set, otherwise the default location
    pub fn from_env() -> Self {
        match std::env::var_os("HOSTY_HOME") {
            Some(dir) => Self::new(dir),
            None => Self::default(),
        }
    }

    /// Authenticated session (tokens)
    pub fn session_file(&self) -> File {
        File::new(self.base_dir.join("session.json"))
    }

    pub fn settings_file(&self) -> File {
        File::new(self.base_dir.join("settings.json"))
    }

    /// PEM encoded IC identity used for actor calls
    pub fn identity_file(&self) -> File {
        File::new(self.base_dir.join("identity.pem"))
    }

    pub fn logs_dir(&self) -> Dir {
        Dir::new(self.base_dir.join("logs"))
    }

    /// Create the directories the agent writes into
    pub async fn setup(&self) -> Result<(), AgentError> {
        Dir::new(self.base_dir.clone()).create().await?;
        self.logs_dir().create().await?;
        Ok(())
    }
}

impl Default for StorageLayout {
    fn default() -> Self {
        let home = std::env::var_os("HOME")
            .or_else(|| std::env::var_os("USERPROFILE"))
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));

        Self::new(home.join(".hosty"))
    }
}
