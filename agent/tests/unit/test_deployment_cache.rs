//! Deployment cache and event frame tests

use hosty_agent::bridge::protocol::{handle_frame, BridgeEvent};
use hosty_agent::cache::deployments::DeploymentCache;
use hosty_agent::cache::versioned::WriteOutcome;
use hosty_agent::models::deployment::{DeploymentLogChunk, DeploymentStatus};

use crate::common::deployment;

fn ids(cache: &DeploymentCache) -> Vec<String> {
    cache
        .list()
        .unwrap()
        .into_iter()
        .map(|d| d.id)
        .collect()
}

fn seeded() -> DeploymentCache {
    let cache = DeploymentCache::new();
    cache.seed_list(vec![
        deployment("dep-3", DeploymentStatus::Building, 30),
        deployment("dep-2", DeploymentStatus::Success, 20),
        deployment("dep-1", DeploymentStatus::Failed, 10),
    ], 20);
    cache
}

#[test]
fn test_update_of_listed_deployment_replaces_in_place() {
    let cache = seeded();

    let outcome = cache.apply_updated(deployment("dep-2", DeploymentStatus::Failed, 40));

    assert_eq!(outcome, WriteOutcome::Replaced);
    assert_eq!(ids(&cache), vec!["dep-3", "dep-2", "dep-1"]);
    assert_eq!(cache.list().unwrap()[1].status, DeploymentStatus::Failed);
    assert_eq!(cache.get("dep-2").unwrap().status, DeploymentStatus::Failed);
}

#[test]
fn test_update_of_new_deployment_is_prepended() {
    let cache = seeded();

    let outcome = cache.apply_updated(deployment("dep-4", DeploymentStatus::Pending, 50));

    assert_eq!(outcome, WriteOutcome::Inserted);
    assert_eq!(ids(&cache), vec!["dep-4", "dep-3", "dep-2", "dep-1"]);
}

#[test]
fn test_list_view_stays_within_its_limit() {
    let cache = DeploymentCache::new();
    cache.seed_list(
        vec![
            deployment("dep-3", DeploymentStatus::Building, 30),
            deployment("dep-2", DeploymentStatus::Success, 20),
            deployment("dep-1", DeploymentStatus::Failed, 10),
        ],
        3,
    );

    cache.apply_updated(deployment("dep-4", DeploymentStatus::Pending, 50));
    cache.apply_updated(deployment("dep-5", DeploymentStatus::Pending, 60));

    assert_eq!(ids(&cache), vec!["dep-5", "dep-4", "dep-3"]);
    assert!(cache.get("dep-1").is_none());
    assert!(cache.get("dep-2").is_none());
    assert_eq!(cache.len(), 3);
}

#[test]
fn test_seeded_list_is_cut_at_the_limit() {
    let cache = DeploymentCache::new();
    cache.seed_list(
        vec![
            deployment("dep-2", DeploymentStatus::Success, 20),
            deployment("dep-1", DeploymentStatus::Failed, 10),
        ],
        1,
    );

    assert_eq!(ids(&cache), vec!["dep-2"]);
}

#[test]
fn test_stale_update_is_ignored() {
    let cache = seeded();

    let outcome = cache.apply_updated(deployment("dep-3", DeploymentStatus::Pending, 5));

    assert_eq!(outcome, WriteOutcome::Stale);
    assert_eq!(cache.get("dep-3").unwrap().status, DeploymentStatus::Building);
}

#[test]
fn test_update_without_loaded_list_only_touches_detail() {
    let cache = DeploymentCache::new();

    cache.apply_updated(deployment("dep-1", DeploymentStatus::Building, 10));

    assert!(cache.list().is_none());
    assert_eq!(cache.get("dep-1").unwrap().status, DeploymentStatus::Building);
}

#[test]
fn test_log_for_unknown_deployment_is_noop() {
    let cache = seeded();

    let applied = cache.apply_log(&DeploymentLogChunk {
        deployment_id: "dep-9".to_string(),
        chunk: "npm ci\n".to_string(),
        timestamp: None,
    });

    assert!(!applied);
    assert!(cache.get("dep-9").is_none());
    assert_eq!(cache.len(), 3);
}

#[test]
fn test_log_chunks_append_in_order() {
    let cache = seeded();

    for chunk in ["npm ci\n", "npm run build\n"] {
        assert!(cache.apply_log(&DeploymentLogChunk {
            deployment_id: "dep-3".to_string(),
            chunk: chunk.to_string(),
            timestamp: None,
        }));
    }

    assert_eq!(cache.get("dep-3").unwrap().build_logs, "npm ci\nnpm run build\n");
    // The list view resolves to the same entry
    assert_eq!(cache.list().unwrap()[0].build_logs, "npm ci\nnpm run build\n");
}

#[test]
fn test_frames_patch_the_cache() {
    let cache = seeded();

    let updated = BridgeEvent::DeploymentUpdated(deployment("dep-5", DeploymentStatus::Building, 60))
        .to_frame()
        .unwrap();
    assert!(handle_frame(&updated, &cache));

    let log = r#"{"event":"deployment:log","data":{"deploymentId":"dep-5","chunk":"done\n"}}"#;
    assert!(handle_frame(log, &cache));

    assert_eq!(ids(&cache)[0], "dep-5");
    assert_eq!(cache.get("dep-5").unwrap().build_logs, "done\n");
}

#[test]
fn test_unknown_and_malformed_frames_leave_cache_untouched() {
    let cache = seeded();
    let before = cache.list();

    assert!(!handle_frame(r#"{"event":"canister:deleted","data":{"id":"row-1"}}"#, &cache));
    assert!(!handle_frame(r#"{"event":"deployment:log","data":{"chunk":"x"}}"#, &cache));
    assert!(!handle_frame("{", &cache));

    assert_eq!(cache.list(), before);
}
