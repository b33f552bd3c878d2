//! Deployment models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::canister::CanisterRecordId;

/// Deployment lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DeploymentStatus {
    Pending,
    Building,
    Deploying,
    Success,
    Failed,
    Cancelled,
}

impl DeploymentStatus {
    /// SUCCESS, FAILED and CANCELLED end the lifecycle
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            DeploymentStatus::Success | DeploymentStatus::Failed | DeploymentStatus::Cancelled
        )
    }

    fn rank(&self) -> u8 {
        match self {
            DeploymentStatus::Pending => 0,
            DeploymentStatus::Building => 1,
            DeploymentStatus::Deploying => 2,
            DeploymentStatus::Success | DeploymentStatus::Failed | DeploymentStatus::Cancelled => 3,
        }
    }

    /// Status only moves forward; a terminal status never changes
    pub fn can_transition_to(&self, next: DeploymentStatus) -> bool {
        if self.is_terminal() {
            return *self == next;
        }
        next.rank() >= self.rank()
    }
}

/// Where the build sources came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SourceType {
    Zip,
    Git,
    Url,
}

/// A deployment as mirrored from the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Deployment {
    pub id: String,

    /// Database id of the target canister
    pub canister_id: CanisterRecordId,

    pub status: DeploymentStatus,

    #[serde(default)]
    pub status_reason: Option<String>,

    #[serde(default)]
    pub build_command: Option<String>,

    #[serde(default)]
    pub output_dir: Option<String>,

    #[serde(default)]
    pub source_type: Option<SourceType>,

    /// Append-only build output
    #[serde(default)]
    pub build_logs: String,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl Deployment {
    /// Version used to order concurrent writes of the same record
    pub fn version(&self) -> i64 {
        self.updated_at.timestamp_millis()
    }
}

/// Incremental build output pushed by the build service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentLogChunk {
    pub deployment_id: String,
    pub chunk: String,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}
