//! Canister status cache

use std::sync::Arc;
use std::time::Duration;

use candid::Principal;
use tracing::debug;

use crate::cache::versioned::VersionedMap;
use crate::errors::AgentError;
use crate::ic::status_proxy::StatusProxy;
use crate::ic::types::parse_principal;
use crate::models::status::{is_cache_hit, CanisterStatusSnapshot};
use crate::utils::{now_secs, retry_async};

/// Status cache options
#[derive(Debug, Clone)]
pub struct StatusCacheOptions {
    /// Total attempts per fetch, the first included
    pub attempts: u32,

    /// Delay between attempts
    pub retry_delay: Duration,
}

impl Default for StatusCacheOptions {
    fn default() -> Self {
        Self {
            attempts: 2,
            retry_delay: Duration::from_secs(1),
        }
    }
}

/// A fetched snapshot and whether the proxy's cached copy was reused
#[derive(Debug, Clone)]
pub struct StatusFetch {
    pub snapshot: CanisterStatusSnapshot,
    pub cache_hit: bool,
}

/// Fetches canister status through the status proxy, reusing the proxy's
/// cached snapshot while it is at most 60 seconds old
pub struct StatusCache {
    proxy: Arc<dyn StatusProxy>,
    snapshots: VersionedMap<Principal, CanisterStatusSnapshot>,
    options: StatusCacheOptions,
}

impl StatusCache {
    pub fn new(proxy: Arc<dyn StatusProxy>, options: StatusCacheOptions) -> Self {
        Self {
            proxy,
            snapshots: VersionedMap::new(),
            options,
        }
    }

    /// Fetch the status of `canister_id`, retrying a failed attempt
    pub async fn fetch(&self, canister_id: &str) -> Result<StatusFetch, AgentError> {
        let canister = parse_principal(canister_id)?;
        retry_async(self.options.attempts, self.options.retry_delay, || {
            self.fetch_once(canister)
        })
        .await
    }

    /// One cached-read-then-reload pass
    pub async fn fetch_once(&self, canister: Principal) -> Result<StatusFetch, AgentError> {
        let now = now_secs();

        if let Some((timestamp, status)) = self.proxy.query_state(canister).await? {
            if is_cache_hit(timestamp, now) {
                let snapshot = CanisterStatusSnapshot::new(timestamp, status);
                debug!("Status of {} served from proxy cache ({}s old)", canister, snapshot.age_secs(now));
                self.remember(canister, &snapshot);
                return Ok(StatusFetch {
                    snapshot,
                    cache_hit: true,
                });
            }
            debug!("Proxy snapshot of {} is stale (taken at {}), reloading", canister, timestamp);
        }

        let (timestamp, status) = self.proxy.load_state(canister).await?;
        let snapshot = CanisterStatusSnapshot::new(timestamp, status);
        self.remember(canister, &snapshot);
        Ok(StatusFetch {
            snapshot,
            cache_hit: false,
        })
    }

    /// Most recent snapshot seen for `canister`, fresh or not
    pub fn last_known(&self, canister: &Principal) -> Option<CanisterStatusSnapshot> {
        self.snapshots.get(canister).map(|cell| cell.value)
    }

    fn remember(&self, canister: Principal, snapshot: &CanisterStatusSnapshot) {
        self.snapshots
            .write(canister, snapshot.timestamp_seconds as i64, snapshot.clone());
    }
}
