//! Delta Payload Protocol over the sled controller store

use serde_json::json;
use std::collections::BTreeSet;
use tempfile::TempDir;
use universal_agent::controller::{register_agent, AgentSpec, ControllerStore, SledControllerStore};
use universal_agent::model::{Resource, TargetResource};
use universal_agent::payload::get_payload;
use uuid::Uuid;

fn spec() -> AgentSpec {
    let uuid = Uuid::new_v4();
    AgentSpec {
        uuid,
        name: Some("Agent A".to_string()),
        capabilities: BTreeSet::from(["foo".to_string()]),
        facts: BTreeSet::from(["bar".to_string()]),
        node: uuid,
    }
}

fn target(agent: Uuid, name: &str) -> TargetResource {
    let value = json!({"name": name}).as_object().cloned().unwrap();
    TargetResource::from_resource(&Resource::new(Uuid::new_v4(), "foo", value), Some(agent))
        .unwrap()
}

#[test]
fn test_unchanged_payload_is_empty_on_second_poll() {
    let temp_dir = TempDir::new().unwrap();
    let store = SledControllerStore::new(temp_dir.path()).unwrap();
    let agent = register_agent(&store, &spec()).unwrap();
    store.put_target(&target(agent.uuid, "foo-name")).unwrap();

    let first = get_payload(&store, agent.uuid, 0, "").unwrap();
    assert_eq!(first.capabilities["foo"].resources.len(), 1);

    let second = get_payload(&store, agent.uuid, 0, &first.hash).unwrap();
    assert!(second.capabilities.is_empty());
    assert!(second.facts.is_empty());
    assert_eq!(second.hash, first.hash);
}

#[test]
fn test_changed_payload_returns_everything() {
    let temp_dir = TempDir::new().unwrap();
    let store = SledControllerStore::new(temp_dir.path()).unwrap();
    let agent = register_agent(&store, &spec()).unwrap();
    let mut assigned = target(agent.uuid, "foo-name");
    store.put_target(&assigned).unwrap();

    let first = get_payload(&store, agent.uuid, 0, "").unwrap();

    assigned
        .set_value(json!({"name": "renamed"}).as_object().cloned().unwrap())
        .unwrap();
    store.put_target(&assigned).unwrap();

    let second = get_payload(&store, agent.uuid, 0, &first.hash).unwrap();
    assert_ne!(second.hash, first.hash);
    assert_eq!(second.capabilities["foo"].resources.len(), 1);
    assert_eq!(
        second.capabilities["foo"].resources[0]["value"]["name"],
        json!("renamed")
    );
    assert_eq!(second.facts.len(), 2);
}

#[test]
fn test_payload_hash_is_stable_across_reopen() {
    let temp_dir = TempDir::new().unwrap();
    let declared = spec();
    let first = {
        let store = SledControllerStore::new(temp_dir.path()).unwrap();
        let agent = register_agent(&store, &declared).unwrap();
        store.put_target(&target(agent.uuid, "a")).unwrap();
        store.flush().unwrap();
        get_payload(&store, agent.uuid, 0, "").unwrap()
    };

    let store = SledControllerStore::new(temp_dir.path()).unwrap();
    let again = get_payload(&store, declared.uuid, 1, &first.hash).unwrap();
    assert!(again.is_unchanged());
}

#[test]
fn test_other_agents_targets_are_not_included() {
    let temp_dir = TempDir::new().unwrap();
    let store = SledControllerStore::new(temp_dir.path()).unwrap();
    let agent = register_agent(&store, &spec()).unwrap();
    store.put_target(&target(Uuid::new_v4(), "elsewhere")).unwrap();

    let payload = get_payload(&store, agent.uuid, 0, "").unwrap();
    assert!(payload.capabilities["foo"].resources.is_empty());
}
