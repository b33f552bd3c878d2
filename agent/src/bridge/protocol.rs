//! Event stream frames
//!
//! Every text frame is a JSON object `{"event": <name>, "data": <payload>}`.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::cache::deployments::DeploymentCache;
use crate::errors::AgentError;
use crate::models::deployment::{Deployment, DeploymentLogChunk};

pub const DEPLOYMENT_UPDATED: &str = "deployment:updated";
pub const DEPLOYMENT_LOG: &str = "deployment:log";

#[derive(Debug, Serialize, Deserialize)]
struct Frame {
    event: String,
    #[serde(default)]
    data: serde_json::Value,
}

/// Events the bridge acts on
#[derive(Debug, Clone, PartialEq)]
pub enum BridgeEvent {
    DeploymentUpdated(Deployment),
    DeploymentLog(DeploymentLogChunk),
}

impl BridgeEvent {
    /// Parse a text frame; unknown event names yield `None`
    pub fn parse(text: &str) -> Result<Option<Self>, AgentError> {
        let frame: Frame = serde_json::from_str(text)?;
        let event = match frame.event.as_str() {
            DEPLOYMENT_UPDATED => Some(BridgeEvent::DeploymentUpdated(serde_json::from_value(frame.data)?)),
            DEPLOYMENT_LOG => Some(BridgeEvent::DeploymentLog(serde_json::from_value(frame.data)?)),
            other => {
                debug!("Ignoring event '{}'", other);
                None
            }
        };
        Ok(event)
    }

    pub fn name(&self) -> &'static str {
        match self {
            BridgeEvent::DeploymentUpdated(_) => DEPLOYMENT_UPDATED,
            BridgeEvent::DeploymentLog(_) => DEPLOYMENT_LOG,
        }
    }

    /// Encode as a text frame
    pub fn to_frame(&self) -> Result<String, AgentError> {
        let data = match self {
            BridgeEvent::DeploymentUpdated(deployment) => serde_json::to_value(deployment)?,
            BridgeEvent::DeploymentLog(log) => serde_json::to_value(log)?,
        };
        Ok(serde_json::to_string(&Frame {
            event: self.name().to_string(),
            data,
        })?)
    }

    /// Patch the cache with this event; returns whether the cache changed
    pub fn apply(self, cache: &DeploymentCache) -> bool {
        match self {
            BridgeEvent::DeploymentUpdated(deployment) => cache.apply_updated(deployment).applied(),
            BridgeEvent::DeploymentLog(log) => cache.apply_log(&log),
        }
    }
}

/// Parse and apply one text frame, logging instead of failing on bad frames
pub fn handle_frame(text: &str, cache: &DeploymentCache) -> bool {
    match BridgeEvent::parse(text) {
        Ok(Some(event)) => {
            debug!("Received {}", event.name());
            event.apply(cache)
        }
        Ok(None) => false,
        Err(e) => {
            warn!("Dropping malformed event frame: {}", e);
            false
        }
    }
}
