//! Status cache tests

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use candid::Principal;
use tokio_test::{assert_err, assert_ok};

use hosty_agent::cache::status::{StatusCache, StatusCacheOptions};
use hosty_agent::errors::AgentError;
use hosty_agent::ic::status_proxy::{StatusProxy, StatusTuple};
use hosty_agent::utils::now_secs;

use crate::common::{principal, status};

struct MockProxy {
    cached: Mutex<Option<StatusTuple>>,
    loaded: Mutex<StatusTuple>,
    query_failures: AtomicUsize,
    queries: AtomicUsize,
    loads: AtomicUsize,
}

impl MockProxy {
    fn new(cached_age: Option<i64>, loaded_age: i64) -> Self {
        let now = now_secs() as i64;
        Self {
            cached: Mutex::new(cached_age.map(|age| ((now - age) as u64, status(1_000, Some(10))))),
            loaded: Mutex::new(((now - loaded_age) as u64, status(2_000, Some(10)))),
            query_failures: AtomicUsize::new(0),
            queries: AtomicUsize::new(0),
            loads: AtomicUsize::new(0),
        }
    }

    fn failing_queries(self, failures: usize) -> Self {
        self.query_failures.store(failures, Ordering::SeqCst);
        self
    }
}

#[async_trait]
impl StatusProxy for MockProxy {
    async fn query_state(&self, _canister: Principal) -> Result<Option<StatusTuple>, AgentError> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        let remaining = self.query_failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.query_failures.store(remaining - 1, Ordering::SeqCst);
            return Err(AgentError::IcError("replica unavailable".to_string()));
        }
        Ok(self.cached.lock().unwrap().clone())
    }

    async fn load_state(&self, _canister: Principal) -> Result<StatusTuple, AgentError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        Ok(self.loaded.lock().unwrap().clone())
    }
}

fn cache(proxy: Arc<MockProxy>) -> StatusCache {
    StatusCache::new(
        proxy,
        StatusCacheOptions {
            attempts: 2,
            retry_delay: Duration::from_millis(1),
        },
    )
}

#[tokio::test]
async fn test_fresh_snapshot_is_a_hit() {
    let proxy = Arc::new(MockProxy::new(Some(30), 0));
    let cache = cache(proxy.clone());

    let fetch = assert_ok!(cache.fetch(&principal(1).to_text()).await);

    assert!(fetch.cache_hit);
    assert_eq!(fetch.snapshot.cycles().unwrap(), 1_000);
    assert_eq!(proxy.loads.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_stale_snapshot_forces_reload() {
    let proxy = Arc::new(MockProxy::new(Some(90), 0));
    let cache = cache(proxy.clone());

    let fetch = cache.fetch(&principal(1).to_text()).await.unwrap();

    assert!(!fetch.cache_hit);
    assert_eq!(fetch.snapshot.cycles().unwrap(), 2_000);
    assert_eq!(proxy.loads.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_future_snapshot_forces_reload() {
    let proxy = Arc::new(MockProxy::new(Some(-5), 0));
    let cache = cache(proxy.clone());

    let fetch = cache.fetch(&principal(1).to_text()).await.unwrap();

    assert!(!fetch.cache_hit);
    assert_eq!(proxy.loads.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_missing_snapshot_forces_reload() {
    let proxy = Arc::new(MockProxy::new(None, 0));
    let cache = cache(proxy.clone());

    let fetch = cache.fetch(&principal(1).to_text()).await.unwrap();

    assert!(!fetch.cache_hit);
    assert_eq!(proxy.loads.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_one_failure_is_retried() {
    let proxy = Arc::new(MockProxy::new(Some(10), 0).failing_queries(1));
    let cache = cache(proxy.clone());

    let fetch = cache.fetch(&principal(1).to_text()).await.unwrap();

    assert!(fetch.cache_hit);
    assert_eq!(proxy.queries.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_second_failure_surfaces() {
    let proxy = Arc::new(MockProxy::new(Some(10), 0).failing_queries(2));
    let cache = cache(proxy.clone());

    let err = assert_err!(cache.fetch(&principal(1).to_text()).await);

    assert!(matches!(err, AgentError::IcError(_)));
    assert_eq!(proxy.queries.load(Ordering::SeqCst), 2);
    assert_eq!(proxy.loads.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_invalid_principal_is_rejected_without_calls() {
    let proxy = Arc::new(MockProxy::new(Some(10), 0));
    let cache = cache(proxy.clone());

    let result = cache.fetch("definitely not a principal").await;

    assert!(matches!(result, Err(AgentError::PrincipalError(_))));
    assert_eq!(proxy.queries.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_older_snapshot_does_not_replace_newer() {
    let proxy = Arc::new(MockProxy::new(Some(10), 0));
    let cache = cache(proxy.clone());
    let canister = principal(1);

    let fresh = cache.fetch(&canister.to_text()).await.unwrap();
    assert_eq!(cache.last_known(&canister).unwrap(), fresh.snapshot);

    // The proxy now serves an older copy that is still inside the window
    let now = now_secs();
    *proxy.cached.lock().unwrap() = Some((now - 50, status(500, Some(10))));
    let older = cache.fetch(&canister.to_text()).await.unwrap();

    assert!(older.cache_hit);
    assert_eq!(older.snapshot.cycles().unwrap(), 500);
    assert_eq!(cache.last_known(&canister).unwrap().cycles().unwrap(), 1_000);
}
