//! In-process backend
//!
//! Keeps collections in memory and behaves like the REST backend: it adds
//! server-owned bookkeeping fields to every stored object, scopes listing to
//! one project, and reports conflicts and missing objects with the same
//! errors. Useful for local runs and for exercising the driver.

use crate::backend::{prepare_create_body, prepare_update_body, BackendClient, BackendItem};
use crate::error::BackendError;
use crate::model::Resource;
use crate::types::AttributeMap;
use chrono::Utc;
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use uuid::Uuid;

#[derive(Debug, Default)]
pub struct MemoryBackend {
    project_id: String,
    collections: RwLock<HashMap<String, BTreeMap<Uuid, AttributeMap>>>,
    unavailable: RwLock<bool>,
}

impl MemoryBackend {
    pub fn new(project_id: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            ..Self::default()
        }
    }

    /// Make every mutating call fail with a transport error
    pub fn set_unavailable(&self, unavailable: bool) {
        *self.unavailable.write() = unavailable;
    }

    /// Store an object directly, bypassing the client surface
    pub fn insert_raw(&self, kind: &str, uuid: Uuid, view: AttributeMap) {
        self.collections
            .write()
            .entry(kind.to_string())
            .or_default()
            .insert(uuid, view);
    }

    pub fn raw(&self, kind: &str, uuid: Uuid) -> Option<AttributeMap> {
        self.collections
            .read()
            .get(kind)
            .and_then(|c| c.get(&uuid))
            .cloned()
    }

    pub fn count(&self, kind: &str) -> usize {
        self.collections.read().get(kind).map_or(0, |c| c.len())
    }

    fn ensure_available(&self) -> Result<(), BackendError> {
        if *self.unavailable.read() {
            return Err(BackendError::Transport("backend unavailable".to_string()));
        }
        Ok(())
    }

    fn not_found(resource: &Resource) -> BackendError {
        BackendError::ResourceNotFound {
            kind: resource.kind.clone(),
            uuid: resource.uuid,
        }
    }
}

impl BackendClient for MemoryBackend {
    fn get(&self, resource: &Resource) -> Result<BackendItem, BackendError> {
        self.raw(&resource.kind, resource.uuid)
            .map(BackendItem::Raw)
            .ok_or_else(|| Self::not_found(resource))
    }

    fn create(&self, resource: &Resource) -> Result<BackendItem, BackendError> {
        let mut view = prepare_create_body(resource, &self.project_id)?;
        self.ensure_available()?;

        let mut collections = self.collections.write();
        let collection = collections.entry(resource.kind.clone()).or_default();
        if collection.contains_key(&resource.uuid) {
            return Err(BackendError::ResourceAlreadyExists {
                kind: resource.kind.clone(),
                uuid: resource.uuid,
            });
        }

        let now = Value::String(Utc::now().to_rfc3339());
        view.insert("project_id".to_string(), Value::String(self.project_id.clone()));
        view.insert("created_at".to_string(), now.clone());
        view.insert("updated_at".to_string(), now);
        collection.insert(resource.uuid, view.clone());
        Ok(BackendItem::Raw(view))
    }

    fn update(&self, resource: &Resource) -> Result<BackendItem, BackendError> {
        self.ensure_available()?;
        let body = prepare_update_body(resource);

        let mut collections = self.collections.write();
        let stored = collections
            .get_mut(&resource.kind)
            .and_then(|c| c.get_mut(&resource.uuid))
            .ok_or_else(|| Self::not_found(resource))?;

        for (k, v) in body {
            stored.insert(k, v);
        }
        stored.insert(
            "updated_at".to_string(),
            Value::String(Utc::now().to_rfc3339()),
        );
        Ok(BackendItem::Raw(stored.clone()))
    }

    fn list(&self, kind: &str) -> Result<Vec<BackendItem>, BackendError> {
        let collections = self.collections.read();
        let Some(collection) = collections.get(kind) else {
            return Ok(Vec::new());
        };
        Ok(collection
            .values()
            .filter(|view| {
                view.get("project_id").and_then(Value::as_str) == Some(self.project_id.as_str())
            })
            .cloned()
            .map(BackendItem::Raw)
            .collect())
    }

    fn delete(&self, resource: &Resource) -> Result<(), BackendError> {
        self.ensure_available()?;
        self.collections
            .write()
            .get_mut(&resource.kind)
            .and_then(|c| c.remove(&resource.uuid))
            .map(|_| ())
            .ok_or_else(|| Self::not_found(resource))
    }
}
