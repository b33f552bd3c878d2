//! Permission scanner tests

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use candid::Principal;

use hosty_agent::errors::AgentError;
use hosty_agent::ic::assets::AssetStorage;
use hosty_agent::ic::management::ManagementApi;
use hosty_agent::ic::types::{CanisterStatus, Permission};
use hosty_agent::models::canister::{Canister, CanisterRecordId};
use hosty_agent::scanner::permissions::{CanisterRegistry, DeploymentMonitor, PermissionScanner};

use crate::common::{canister, principal, status};

fn backend() -> Principal {
    principal(200)
}

#[derive(Default)]
struct World {
    canisters: Vec<Canister>,
    registry_fails: bool,
    controlled: HashSet<Principal>,
    permitted: HashMap<Principal, Vec<Principal>>,
    running: HashSet<String>,
    running_check_fails: HashSet<String>,
    revoke_fails: HashSet<Principal>,
}

#[derive(Default)]
struct MockIc {
    world: World,
    registry_calls: AtomicUsize,
    revoked: Mutex<Vec<(Principal, Principal, Permission)>>,
}

#[async_trait]
impl CanisterRegistry for MockIc {
    async fn list_canisters(&self) -> Result<Vec<Canister>, AgentError> {
        self.registry_calls.fetch_add(1, Ordering::SeqCst);
        // Let a concurrent caller observe the in-flight scan
        tokio::task::yield_now().await;
        if self.world.registry_fails {
            return Err(AgentError::ApiError("backend returned 500".to_string()));
        }
        Ok(self.world.canisters.clone())
    }
}

#[async_trait]
impl ManagementApi for MockIc {
    async fn canister_status(&self, canister: Principal) -> Result<CanisterStatus, AgentError> {
        if self.world.controlled.contains(&canister) {
            Ok(status(1_000, Some(10)))
        } else {
            Err(AgentError::IcError("caller is not a controller".to_string()))
        }
    }
}

#[async_trait]
impl AssetStorage for MockIc {
    async fn list_permitted(
        &self,
        canister: Principal,
        permission: Permission,
    ) -> Result<Vec<Principal>, AgentError> {
        assert_eq!(permission, Permission::Commit);
        Ok(self.world.permitted.get(&canister).cloned().unwrap_or_default())
    }

    async fn revoke_permission(
        &self,
        canister: Principal,
        principal: Principal,
        permission: Permission,
    ) -> Result<(), AgentError> {
        if self.world.revoke_fails.contains(&canister) {
            return Err(AgentError::IcError("revoke rejected".to_string()));
        }
        self.revoked.lock().unwrap().push((canister, principal, permission));
        Ok(())
    }
}

#[async_trait]
impl DeploymentMonitor for MockIc {
    async fn is_deployment_running(&self, canister: &CanisterRecordId) -> Result<bool, AgentError> {
        if self.world.running_check_fails.contains(canister.as_str()) {
            return Err(AgentError::ApiError("timeout".to_string()));
        }
        Ok(self.world.running.contains(canister.as_str()))
    }
}

fn scanner(mock: Arc<MockIc>) -> Arc<PermissionScanner> {
    Arc::new(PermissionScanner::new(
        mock.clone(),
        mock.clone(),
        mock.clone(),
        mock,
        backend(),
    ))
}

/// Canisters 1..=6:
/// 1 eligible, 2 not controlled, 3 backend not permitted, 4 deployment running,
/// 5 running check fails, 6 eligible
fn mixed_world() -> World {
    let mut world = World {
        canisters: (1..=6).map(canister).collect(),
        ..Default::default()
    };
    for n in [1, 3, 4, 5, 6] {
        world.controlled.insert(principal(n));
    }
    for n in [1, 2, 4, 5, 6] {
        world.permitted.insert(principal(n), vec![principal(100), backend()]);
    }
    world.permitted.insert(principal(3), vec![principal(100)]);
    world.running.insert("row-4".to_string());
    world.running_check_fails.insert("row-5".to_string());
    world
}

#[tokio::test]
async fn test_revokes_only_idle_permitted_controlled_canisters() {
    let mock = Arc::new(MockIc {
        world: mixed_world(),
        ..Default::default()
    });
    let scanner = scanner(mock.clone());

    let report = scanner.run().await;

    assert!(report.aborted.is_none());
    assert_eq!(report.discovered, 6);
    assert_eq!(report.controlled, 5);
    assert_eq!(report.permitted, 4);
    assert_eq!(report.idle, 2);
    assert_eq!(report.revoked, vec![principal(1), principal(6)]);
    assert!(report.revoke_failures.is_empty());

    let revoked = mock.revoked.lock().unwrap().clone();
    assert_eq!(
        revoked,
        vec![
            (principal(1), backend(), Permission::Commit),
            (principal(6), backend(), Permission::Commit),
        ]
    );
}

#[tokio::test]
async fn test_failed_running_check_keeps_grant() {
    let mut world = mixed_world();
    world.canisters = vec![canister(5)];
    let mock = Arc::new(MockIc {
        world,
        ..Default::default()
    });

    let report = scanner(mock.clone()).run().await;

    assert_eq!(report.permitted, 1);
    assert_eq!(report.idle, 0);
    assert!(report.revoked.is_empty());
    assert!(mock.revoked.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_revoke_failure_is_reported_and_scan_continues() {
    let mut world = mixed_world();
    world.revoke_fails.insert(principal(1));
    let mock = Arc::new(MockIc {
        world,
        ..Default::default()
    });

    let report = scanner(mock).run().await;

    assert!(report.aborted.is_none());
    assert_eq!(report.revoke_failures, vec![principal(1)]);
    assert_eq!(report.revoked, vec![principal(6)]);
}

#[tokio::test]
async fn test_registry_failure_aborts_scan() {
    let mock = Arc::new(MockIc {
        world: World {
            registry_fails: true,
            ..mixed_world()
        },
        ..Default::default()
    });
    let scanner = scanner(mock.clone());

    let report = scanner.run().await;

    assert!(report.aborted.is_some());
    assert_eq!(report.discovered, 0);
    assert!(mock.revoked.lock().unwrap().is_empty());
    assert_eq!(scanner.last_report().unwrap().run_id, report.run_id);
}

#[tokio::test]
async fn test_concurrent_runs_share_one_scan() {
    let mock = Arc::new(MockIc {
        world: mixed_world(),
        ..Default::default()
    });
    let scanner = scanner(mock.clone());

    let (first, second) = tokio::join!(scanner.run(), scanner.run());

    assert_eq!(mock.registry_calls.load(Ordering::SeqCst), 1);
    assert_eq!(first.run_id, second.run_id);
    assert_eq!(mock.revoked.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn test_sequential_runs_scan_again() {
    let mock = Arc::new(MockIc {
        world: mixed_world(),
        ..Default::default()
    });
    let scanner = scanner(mock.clone());

    let first = scanner.run().await;
    let second = scanner.run().await;

    assert_eq!(mock.registry_calls.load(Ordering::SeqCst), 2);
    assert_ne!(first.run_id, second.run_id);
    assert_eq!(scanner.last_report().unwrap().run_id, second.run_id);
}
