//! Driver behavior across full reconciliation passes

use crate::integration::test_utils::{driver_over, resource};
use serde_json::json;
use std::sync::Arc;
use universal_agent::backend::{BackendClient, BackendItem, MemoryBackend, ResourceModel};
use universal_agent::driver::{CapabilityDriver, DirectDriver, ListReport};
use universal_agent::error::{BackendError, DriverError};
use universal_agent::model::Resource;
use universal_agent::store::{MemoryFieldBacking, TargetFieldStore};
use universal_agent::types::AttributeMap;
use uuid::Uuid;

#[test]
fn test_list_never_returns_unowned_uuid() {
    let backend = Arc::new(MemoryBackend::new("p1"));
    let mut driver = driver_over(&backend, Arc::new(MemoryFieldBacking::new()));

    let stray = Uuid::new_v4();
    let mut view = AttributeMap::new();
    view.insert("uuid".to_string(), json!(stray.to_string()));
    view.insert("project_id".to_string(), json!("p1"));
    view.insert("name".to_string(), json!("someone else's"));
    backend.insert_raw("foo", stray, view);

    driver.start().unwrap();
    let owned = driver.create(&resource("foo", &[("name", json!("mine"))])).unwrap();

    let listed = driver.list("foo").unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].uuid, owned.uuid);
    assert!(listed.iter().all(|r| r.uuid != stray));
}

#[test]
fn test_create_crash_before_remote_success_reads_as_missing() {
    let backend = Arc::new(MemoryBackend::new("p1"));
    let backing = MemoryFieldBacking::new();
    let mut driver = driver_over(&backend, Arc::new(backing.clone()));
    let res = resource("foo", &[("name", json!("a"))]);

    driver.start().unwrap();
    backend.set_unavailable(true);
    assert!(matches!(
        driver.create(&res),
        Err(DriverError::Backend(BackendError::Transport(_)))
    ));
    driver.finalize().unwrap();
    assert_eq!(backing.snapshot().len(), 1);

    backend.set_unavailable(false);
    driver.start().unwrap();
    assert!(driver.list("foo").unwrap().is_empty());
    assert!(matches!(
        driver.get(&res),
        Err(DriverError::ResourceNotFound { .. })
    ));

    // The next pass retries the create with the same ownership scope
    assert!(driver.create(&res).is_ok());
    assert_eq!(driver.list("foo").unwrap().len(), 1);
}

#[test]
fn test_failed_update_leaves_entry_unchanged() {
    let backend = Arc::new(MemoryBackend::new("p1"));
    let backing = MemoryFieldBacking::new();
    let mut driver = driver_over(&backend, Arc::new(backing.clone()));
    let res = resource("foo", &[("name", json!("a"))]);

    driver.start().unwrap();
    driver.create(&res).unwrap();
    driver.finalize().unwrap();
    let before = backing.snapshot();

    driver.start().unwrap();
    let mut changed = res.clone();
    changed.value.insert("extra".to_string(), json!(true));
    backend.set_unavailable(true);
    assert!(driver.update(&changed).is_err());
    driver.finalize().unwrap();

    assert_eq!(backing.snapshot(), before);
}

#[test]
fn test_update_widens_owned_fields() {
    let backend = Arc::new(MemoryBackend::new("p1"));
    let mut driver = driver_over(&backend, Arc::new(MemoryFieldBacking::new()));
    let res = resource("foo", &[("name", json!("a"))]);

    driver.start().unwrap();
    driver.create(&res).unwrap();

    let mut changed = res.clone();
    changed.value.insert("size".to_string(), json!(2));
    changed.target_fields = changed.value_fields();
    let updated = driver.update(&changed).unwrap();
    assert_eq!(updated.hash().unwrap(), changed.hash().unwrap());

    let listed = driver.list("foo").unwrap();
    assert_eq!(listed[0].target_fields.len(), 2);
    assert_eq!(listed[0].hash().unwrap(), changed.hash().unwrap());
}

#[test]
fn test_delete_already_deleted_remote() {
    let backend = Arc::new(MemoryBackend::new("p1"));
    let backing = MemoryFieldBacking::new();
    let mut driver = driver_over(&backend, Arc::new(backing.clone()));
    let res = resource("foo", &[("name", json!("a"))]);

    driver.start().unwrap();
    driver.create(&res).unwrap();
    driver.finalize().unwrap();

    // Someone else removed it
    driver.start().unwrap();
    let mut other = driver_over(&backend, Arc::new(MemoryFieldBacking::new()));
    other.start().unwrap();
    assert!(other.delete(&res).is_ok());

    assert!(driver.delete(&res).is_ok());
    driver.finalize().unwrap();
    assert!(backing.snapshot().is_empty());
}

#[test]
fn test_delete_transport_failure_still_clears_entry() {
    let backend = Arc::new(MemoryBackend::new("p1"));
    let backing = MemoryFieldBacking::new();
    let mut driver = driver_over(&backend, Arc::new(backing.clone()));
    let res = resource("foo", &[("name", json!("a"))]);

    driver.start().unwrap();
    driver.create(&res).unwrap();
    backend.set_unavailable(true);
    assert!(matches!(driver.delete(&res), Err(DriverError::Backend(_))));
    driver.finalize().unwrap();
    assert!(backing.snapshot().is_empty());
}

#[test]
fn test_project_mismatch_fails_fast() {
    let backend = Arc::new(MemoryBackend::new("p1"));
    let backing = MemoryFieldBacking::new();
    let mut driver = driver_over(&backend, Arc::new(backing.clone()));
    let res = resource("foo", &[("name", json!("a")), ("project_id", json!("p2"))]);

    driver.start().unwrap();
    assert!(matches!(
        driver.create(&res),
        Err(DriverError::ResourceProjectMismatch { .. })
    ));
    assert_eq!(backend.count("foo"), 0);
}

#[test]
fn test_capabilities_are_configured_kinds() {
    let backend = Arc::new(MemoryBackend::new("p1"));
    let store = TargetFieldStore::new(Arc::new(MemoryFieldBacking::new()));
    let driver = DirectDriver::new(backend, store, ["foo", "bar"]);
    let capabilities = driver.get_capabilities();
    assert_eq!(capabilities.len(), 2);
    assert!(capabilities.contains("bar"));
}

/// Backend object with a private field that never belongs to the resource
#[derive(Debug)]
struct Machine {
    uuid: Uuid,
    name: String,
    secret: String,
}

impl ResourceModel for Machine {
    fn resource_uuid(&self) -> Uuid {
        self.uuid
    }

    fn dump_view(&self) -> AttributeMap {
        let mut view = AttributeMap::new();
        view.insert("uuid".to_string(), json!(self.uuid.to_string()));
        view.insert("name".to_string(), json!(self.name));
        view.insert("secret".to_string(), json!(self.secret));
        view
    }

    fn ignore_fields(&self) -> Vec<String> {
        vec!["secret".to_string()]
    }
}

/// Backend that answers with opaque models, delegating storage to memory
struct ModelBackend {
    inner: MemoryBackend,
}

impl ModelBackend {
    fn model(item: BackendItem) -> Result<BackendItem, BackendError> {
        match item {
            BackendItem::Raw(view) => Ok(BackendItem::Model(Box::new(Machine {
                uuid: item_uuid(&view)?,
                name: view
                    .get("name")
                    .and_then(|v| v.as_str())
                    .unwrap_or_default()
                    .to_string(),
                secret: "hunter2".to_string(),
            }))),
            other => Ok(other),
        }
    }
}

fn item_uuid(view: &AttributeMap) -> Result<Uuid, BackendError> {
    view.get("uuid")
        .and_then(|v| v.as_str())
        .and_then(|s| Uuid::parse_str(s).ok())
        .ok_or_else(|| BackendError::Decode("missing uuid".to_string()))
}

impl BackendClient for ModelBackend {
    fn get(&self, resource: &Resource) -> Result<BackendItem, BackendError> {
        Self::model(self.inner.get(resource)?)
    }

    fn create(&self, resource: &Resource) -> Result<BackendItem, BackendError> {
        Self::model(self.inner.create(resource)?)
    }

    fn update(&self, resource: &Resource) -> Result<BackendItem, BackendError> {
        Self::model(self.inner.update(resource)?)
    }

    fn list(&self, kind: &str) -> Result<Vec<BackendItem>, BackendError> {
        self.inner.list(kind)?.into_iter().map(Self::model).collect()
    }

    fn delete(&self, resource: &Resource) -> Result<(), BackendError> {
        self.inner.delete(resource)
    }
}

#[test]
fn test_opaque_models_drop_ignored_fields() {
    let backend = Arc::new(ModelBackend {
        inner: MemoryBackend::new("p1"),
    });
    let store = TargetFieldStore::new(Arc::new(MemoryFieldBacking::new()));
    let mut driver = DirectDriver::new(backend, store, ["foo"]);
    let res = resource("foo", &[("name", json!("m1"))]);

    driver.start().unwrap();
    let created = driver.create(&res).unwrap();
    assert!(!created.value.contains_key("secret"));
    assert_eq!(created.hash().unwrap(), res.hash().unwrap());

    let listed = driver.list("foo").unwrap();
    assert_eq!(listed.len(), 1);
    assert!(!listed[0].value.contains_key("secret"));
}

/// Backend that answers with fully typed resources
struct TypedBackend {
    inner: MemoryBackend,
}

impl TypedBackend {
    fn typed(item: BackendItem) -> Result<BackendItem, BackendError> {
        match item {
            BackendItem::Raw(view) => {
                let uuid = item_uuid(&view)?;
                Ok(BackendItem::Typed(Resource::new(uuid, "foo", view)))
            }
            other => Ok(other),
        }
    }
}

impl BackendClient for TypedBackend {
    fn get(&self, resource: &Resource) -> Result<BackendItem, BackendError> {
        Self::typed(self.inner.get(resource)?)
    }

    fn create(&self, resource: &Resource) -> Result<BackendItem, BackendError> {
        Self::typed(self.inner.create(resource)?)
    }

    fn update(&self, resource: &Resource) -> Result<BackendItem, BackendError> {
        Self::typed(self.inner.update(resource)?)
    }

    fn list(&self, kind: &str) -> Result<Vec<BackendItem>, BackendError> {
        self.inner.list(kind)?.into_iter().map(Self::typed).collect()
    }

    fn delete(&self, resource: &Resource) -> Result<(), BackendError> {
        self.inner.delete(resource)
    }
}

#[test]
fn test_typed_items_are_filtered_by_ownership() {
    let backend = Arc::new(TypedBackend {
        inner: MemoryBackend::new("p1"),
    });
    let store = TargetFieldStore::new(Arc::new(MemoryFieldBacking::new()));
    let mut driver = DirectDriver::new(backend.clone(), store, ["foo"]);

    let stray = Uuid::new_v4();
    let mut view = AttributeMap::new();
    view.insert("uuid".to_string(), json!(stray.to_string()));
    view.insert("project_id".to_string(), json!("p1"));
    backend.inner.insert_raw("foo", stray, view);

    driver.start().unwrap();
    let owned = driver.create(&resource("foo", &[("name", json!("mine"))])).unwrap();

    let (listed, report) = driver.list_with_report("foo").unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].uuid, owned.uuid);
    // Typed items come back as the backend built them
    assert_eq!(listed[0].value, owned.value);
    assert_eq!(
        report,
        ListReport {
            returned: 1,
            missing_local: 1,
            missing_remote: 0,
        }
    );
}
