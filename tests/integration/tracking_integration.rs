//! Dependency tracking over the sled controller store

use serde_json::json;
use tempfile::TempDir;
use universal_agent::controller::{ControllerStore, SledControllerStore};
use universal_agent::model::{ActualResource, Resource, TargetResource};
use universal_agent::tracking::{outdated, refresh, track, watchers_of};
use uuid::Uuid;

fn target(kind: &str, value: serde_json::Value) -> TargetResource {
    let value = value.as_object().cloned().unwrap();
    TargetResource::from_resource(&Resource::new(Uuid::new_v4(), kind, value), None).unwrap()
}

#[test]
fn test_stale_then_fresh_after_refresh() {
    let temp_dir = TempDir::new().unwrap();
    let store = SledControllerStore::new(temp_dir.path()).unwrap();
    let watcher = target("config", json!({"path": "/etc/app.conf"}));
    let mut network = target("network", json!({"cidr": "10.0.0.0/24"}));
    store.put_target(&watcher).unwrap();
    store.put_target(&network).unwrap();

    let tracked = track(&store, &watcher, &network).unwrap();
    assert!(outdated(&store).unwrap().is_empty());

    network
        .set_value(json!({"cidr": "10.0.8.0/24"}).as_object().cloned().unwrap())
        .unwrap();
    store.put_target(&network).unwrap();

    let stale = outdated(&store).unwrap();
    assert_eq!(stale.len(), 1);
    assert_eq!(stale[0].tracked.uuid, tracked.uuid);
    assert_eq!(stale[0].tracked.watcher_kind, "config");

    let refreshed = refresh(&store, tracked.uuid).unwrap();
    assert_eq!(refreshed.full_hash, network.full_hash);
    assert!(outdated(&store).unwrap().is_empty());
}

#[test]
fn test_outdated_reports_actual_resource() {
    let temp_dir = TempDir::new().unwrap();
    let store = SledControllerStore::new(temp_dir.path()).unwrap();
    let watcher = target("config", json!({}));
    let mut network = target("network", json!({"cidr": "a"}));
    store.put_target(&watcher).unwrap();
    store.put_target(&network).unwrap();
    track(&store, &watcher, &network).unwrap();

    let actual = ActualResource::from_resource(&network.to_resource(), Some(Uuid::new_v4())).unwrap();
    store.put_actual(&actual).unwrap();

    network
        .set_value(json!({"cidr": "b"}).as_object().cloned().unwrap())
        .unwrap();
    store.put_target(&network).unwrap();

    let stale = outdated(&store).unwrap();
    assert_eq!(stale[0].actual, Some(actual.uuid));
}

#[test]
fn test_deleting_target_removes_tracking() {
    let temp_dir = TempDir::new().unwrap();
    let store = SledControllerStore::new(temp_dir.path()).unwrap();
    let watcher = target("config", json!({}));
    let network = target("network", json!({"cidr": "a"}));
    store.put_target(&watcher).unwrap();
    store.put_target(&network).unwrap();
    track(&store, &watcher, &network).unwrap();

    store.delete_target(network.uuid).unwrap();

    assert!(watchers_of(&store, network.uuid).unwrap().is_empty());
    assert!(store.list_tracked().unwrap().is_empty());
    assert!(store.get_target(watcher.uuid).unwrap().is_some());
}
