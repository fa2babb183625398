//! Durable Target Field Store backings driven through the driver

use crate::integration::test_utils::{driver_over, resource};
use serde_json::json;
use std::sync::Arc;
use tempfile::TempDir;
use universal_agent::backend::MemoryBackend;
use universal_agent::driver::CapabilityDriver;
use universal_agent::store::{JsonFileFieldBacking, SledFieldBacking, TargetFieldBacking};

fn survives_restart(open: impl Fn() -> Arc<dyn TargetFieldBacking>) {
    let backend = Arc::new(MemoryBackend::new("p1"));
    let res = resource("foo", &[("name", json!("a")), ("size", json!(1))]);

    {
        let mut driver = driver_over(&backend, open());
        driver.start().unwrap();
        driver.create(&res).unwrap();
        driver.finalize().unwrap();
    }

    let mut driver = driver_over(&backend, open());
    driver.start().unwrap();
    let listed = driver.list("foo").unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].uuid, res.uuid);
    assert_eq!(listed[0].hash().unwrap(), res.hash().unwrap());
}

fn abort_discards(open: impl Fn() -> Arc<dyn TargetFieldBacking>) {
    let backend = Arc::new(MemoryBackend::new("p1"));

    let mut driver = driver_over(&backend, open());
    driver.start().unwrap();
    driver.create(&resource("foo", &[("name", json!("a"))])).unwrap();
    drop(driver);

    assert!(open().load_all().unwrap().is_empty());
}

#[test]
fn test_sled_backing_survives_restart() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("fields");
    // sled holds a lock per process; reopen through one handle
    let backing: Arc<dyn TargetFieldBacking> = Arc::new(SledFieldBacking::new(&path).unwrap());
    survives_restart(|| backing.clone());
}

#[test]
fn test_sled_backing_drop_discards_pass() {
    let temp_dir = TempDir::new().unwrap();
    let backing: Arc<dyn TargetFieldBacking> =
        Arc::new(SledFieldBacking::new(temp_dir.path().join("fields")).unwrap());
    abort_discards(|| backing.clone());
}

#[test]
fn test_json_backing_survives_restart() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("fields.json");
    survives_restart(|| Arc::new(JsonFileFieldBacking::new(&path)));
    assert!(path.exists());
}

#[test]
fn test_json_backing_drop_discards_pass() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("fields.json");
    abort_discards(|| Arc::new(JsonFileFieldBacking::new(&path)));
    assert!(!path.exists());
}

#[test]
fn test_delete_is_persisted() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("fields.json");
    let backend = Arc::new(MemoryBackend::new("p1"));
    let res = resource("foo", &[("name", json!("a"))]);

    let mut driver = driver_over(&backend, Arc::new(JsonFileFieldBacking::new(&path)));
    driver.start().unwrap();
    driver.create(&res).unwrap();
    driver.finalize().unwrap();

    driver.start().unwrap();
    driver.delete(&res).unwrap();
    driver.finalize().unwrap();

    assert!(JsonFileFieldBacking::new(&path).load_all().unwrap().is_empty());
    assert_eq!(backend.count("foo"), 0);
}
