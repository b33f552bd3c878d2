//! Deployment cache patched by pushed events

use std::collections::HashMap;
use std::sync::RwLock;

use tracing::{debug, warn};

use crate::cache::versioned::{write_versioned, Versioned, WriteOutcome};
use crate::models::deployment::{Deployment, DeploymentLogChunk};

#[derive(Default)]
struct Inner {
    by_id: HashMap<String, Versioned<Deployment>>,
    /// Ordered ids of the list view; `None` until a list has been loaded
    list: Option<Vec<String>>,
    /// Length of the list view, taken from the limit of the last load
    list_limit: usize,
}

/// Detail entries keyed by deployment id plus the ordered list view.
///
/// Both views share one lock so a list entry always resolves to its detail
/// entry. The list view never grows past the limit it was loaded with; ids
/// pushed off its tail lose their detail entry too. Detail entries stored
/// with `put` are kept until then.
#[derive(Default)]
pub struct DeploymentCache {
    inner: RwLock<Inner>,
}

impl DeploymentCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, deployment_id: &str) -> Option<Deployment> {
        let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
        inner.by_id.get(deployment_id).map(|cell| cell.value.clone())
    }

    /// The list view, `None` if no list has been loaded yet
    pub fn list(&self) -> Option<Vec<Deployment>> {
        let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
        inner.list.as_ref().map(|ids| {
            ids.iter()
                .filter_map(|id| inner.by_id.get(id).map(|cell| cell.value.clone()))
                .collect()
        })
    }

    pub fn len(&self) -> usize {
        let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
        inner.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Replace the list view with a freshly fetched list of at most `limit`
    pub fn seed_list(&self, deployments: Vec<Deployment>, limit: usize) {
        let mut inner = self.inner.write().unwrap_or_else(|e| e.into_inner());
        inner.list_limit = limit;
        let mut ids = Vec::with_capacity(deployments.len());
        for deployment in deployments {
            if ids.len() == limit {
                break;
            }
            ids.push(deployment.id.clone());
            let mut slot = inner.by_id.remove(&deployment.id);
            write_versioned(
                &mut slot,
                Versioned {
                    version: deployment.version(),
                    value: deployment,
                },
            );
            if let Some(cell) = slot {
                inner.by_id.insert(cell.value.id.clone(), cell);
            }
        }
        inner.list = Some(ids);
    }

    /// Store a single fetched deployment without touching the list view
    pub fn put(&self, deployment: Deployment) -> WriteOutcome {
        let mut inner = self.inner.write().unwrap_or_else(|e| e.into_inner());
        Self::write_entry(&mut inner, deployment)
    }

    /// `deployment:updated`: replace the detail entry, then replace the list
    /// entry in place or prepend it
    pub fn apply_updated(&self, deployment: Deployment) -> WriteOutcome {
        let mut inner = self.inner.write().unwrap_or_else(|e| e.into_inner());
        let id = deployment.id.clone();

        if let Some(cell) = inner.by_id.get(&id) {
            if cell.version <= deployment.version() && !cell.value.status.can_transition_to(deployment.status) {
                warn!(
                    "Deployment {} moved backwards from {:?} to {:?}",
                    id, cell.value.status, deployment.status
                );
            }
        }

        let outcome = Self::write_entry(&mut inner, deployment);
        if !outcome.applied() {
            debug!("Ignoring out-of-date update for deployment {}", id);
            return outcome;
        }

        let limit = inner.list_limit;
        let evicted = match inner.list.as_mut() {
            Some(list) if !list.contains(&id) => {
                list.insert(0, id);
                list.split_off(limit.min(list.len()))
            }
            _ => Vec::new(),
        };
        for id in evicted {
            debug!("Deployment {} fell off the list view", id);
            inner.by_id.remove(&id);
        }
        outcome
    }

    /// `deployment:log`: append the chunk to a cached deployment.
    ///
    /// Returns `false` and leaves the cache untouched when the deployment is
    /// not cached.
    pub fn apply_log(&self, log: &DeploymentLogChunk) -> bool {
        let mut inner = self.inner.write().unwrap_or_else(|e| e.into_inner());
        match inner.by_id.get_mut(&log.deployment_id) {
            Some(cell) => {
                cell.value.build_logs.push_str(&log.chunk);
                true
            }
            None => {
                debug!("Dropping log chunk for uncached deployment {}", log.deployment_id);
                false
            }
        }
    }

    fn write_entry(inner: &mut Inner, deployment: Deployment) -> WriteOutcome {
        let id = deployment.id.clone();
        let mut slot = inner.by_id.remove(&id);
        let outcome = write_versioned(
            &mut slot,
            Versioned {
                version: deployment.version(),
                value: deployment,
            },
        );
        if let Some(cell) = slot {
            inner.by_id.insert(id, cell);
        }
        outcome
    }
}
