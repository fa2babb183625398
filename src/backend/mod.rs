//! Backend Client
//!
//! Capability-scoped CRUD against the remote resource collection. Transport
//! failures are translated into the small [`BackendError`] set at this
//! boundary. Whatever shape a backend returns is resolved here into the
//! closed [`BackendItem`] variant so the driver never inspects response types.

pub mod memory;
pub mod rest;

pub use memory::MemoryBackend;
pub use rest::RestBackendClient;

use crate::error::BackendError;
use crate::model::{value_uuid, Resource};
use crate::types::AttributeMap;
use std::fmt;
use uuid::Uuid;

/// Fields the server owns; never sent on update
pub const SERVER_OWNED_FIELDS: &[&str] = &["created_at", "updated_at", "project_id", "uuid"];

/// A backend-native object that can render itself as an attribute view
pub trait ResourceModel: Send + Sync + fmt::Debug {
    fn resource_uuid(&self) -> Uuid;

    /// Full attribute view of the object
    fn dump_view(&self) -> AttributeMap;

    /// Fields of the view that never belong to the resource
    fn ignore_fields(&self) -> Vec<String> {
        Vec::new()
    }
}

/// Shape of one object returned by a backend
#[derive(Debug)]
pub enum BackendItem {
    /// Already a driver resource; used as-is
    Typed(Resource),
    /// Plain attribute mapping carrying its own `uuid`
    Raw(AttributeMap),
    /// Opaque backend model
    Model(Box<dyn ResourceModel>),
}

impl BackendItem {
    pub fn uuid(&self) -> Option<Uuid> {
        match self {
            BackendItem::Typed(resource) => Some(resource.uuid),
            BackendItem::Raw(view) => value_uuid(view),
            BackendItem::Model(model) => Some(model.resource_uuid()),
        }
    }
}

/// Remote resource collection scoped to one ownership scope (project)
pub trait BackendClient: Send + Sync {
    /// Fails with `ResourceNotFound` if absent remotely
    fn get(&self, resource: &Resource) -> Result<BackendItem, BackendError>;

    /// Injects the resource's own uuid into the sent value
    fn create(&self, resource: &Resource) -> Result<BackendItem, BackendError>;

    /// Sends the value without server-owned fields
    fn update(&self, resource: &Resource) -> Result<BackendItem, BackendError>;

    /// Every resource of `kind` in the client's ownership scope
    fn list(&self, kind: &str) -> Result<Vec<BackendItem>, BackendError>;

    /// Fails with `ResourceNotFound` if already gone; callers treat that as success
    fn delete(&self, resource: &Resource) -> Result<(), BackendError>;
}

/// Value to send on create: the resource's own identity injected, scope checked
pub fn prepare_create_body(
    resource: &Resource,
    project_id: &str,
) -> Result<AttributeMap, BackendError> {
    let mut value = resource.value.clone();
    value.insert(
        "uuid".to_string(),
        serde_json::Value::String(resource.uuid.to_string()),
    );

    // Only one project per client; null and "" mean unset
    if let Some(found) = value.get("project_id").filter(|v| is_set(v)) {
        if found.as_str() != Some(project_id) {
            return Err(BackendError::ResourceProjectMismatch {
                uuid: resource.uuid,
                expected: project_id.to_string(),
                found: match found {
                    serde_json::Value::String(s) => s.clone(),
                    other => other.to_string(),
                },
            });
        }
    }

    Ok(value)
}

fn is_set(value: &serde_json::Value) -> bool {
    match value {
        serde_json::Value::Null => false,
        serde_json::Value::String(s) => !s.is_empty(),
        _ => true,
    }
}

/// Value to send on update: server-owned fields stripped
pub fn prepare_update_body(resource: &Resource) -> AttributeMap {
    resource
        .value
        .iter()
        .filter(|(k, _)| !SERVER_OWNED_FIELDS.contains(&k.as_str()))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}
