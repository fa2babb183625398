//! Target Field Store
//!
//! Local, per-agent record of which attributes of a resource this agent last
//! wrote. Keyed by `(kind, uuid)`; never sent to the backend.
//!
//! A durable [`TargetFieldBacking`] is read once when a reconciliation pass
//! opens ([`TargetFieldStore::load`]) and written once when it commits
//! ([`TargetFieldStore::persist`]). In between, all operations act on the
//! in-memory [`FieldTransaction`]. Dropping a transaction without persisting
//! it discards every change made during the pass.

pub mod json_file;
pub mod persistence;

pub use json_file::JsonFileFieldBacking;
pub use persistence::SledFieldBacking;

use crate::error::StorageError;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use uuid::Uuid;

/// Ownership record for one resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetFieldItem {
    pub kind: String,
    pub uuid: Uuid,
    pub fields: BTreeSet<String>,
}

impl TargetFieldItem {
    pub fn new(kind: impl Into<String>, uuid: Uuid, fields: BTreeSet<String>) -> Self {
        Self {
            kind: kind.into(),
            uuid,
            fields,
        }
    }

    fn key(&self) -> (String, Uuid) {
        (self.kind.clone(), self.uuid)
    }
}

/// Durable backing for the Target Field Store
pub trait TargetFieldBacking: Send + Sync {
    /// Read every stored item
    fn load_all(&self) -> Result<Vec<TargetFieldItem>, StorageError>;

    /// Replace the stored contents with `items`
    fn persist_all(&self, items: &[TargetFieldItem]) -> Result<(), StorageError>;
}

/// Entry point to the store: opens and commits per-pass transactions
pub struct TargetFieldStore {
    backing: Arc<dyn TargetFieldBacking>,
}

impl TargetFieldStore {
    pub fn new(backing: Arc<dyn TargetFieldBacking>) -> Self {
        Self { backing }
    }

    /// Hydrate a working copy from the durable backing
    pub fn load(&self) -> Result<FieldTransaction, StorageError> {
        let items = self.backing.load_all()?;
        let mut working = BTreeMap::new();
        for item in items {
            working.insert(item.key(), item.fields);
        }
        tracing::debug!(items = working.len(), "Loaded target field store");
        Ok(FieldTransaction {
            working,
            dirty: false,
        })
    }

    /// Flush a working copy to the durable backing
    ///
    /// An untouched working copy is not written back.
    pub fn persist(&self, tx: FieldTransaction) -> Result<(), StorageError> {
        if !tx.dirty {
            tracing::debug!("Target field store unchanged, skipping persist");
            return Ok(());
        }
        let items = tx.into_items();
        self.backing.persist_all(&items)?;
        tracing::debug!(items = items.len(), "Persisted target field store");
        Ok(())
    }
}

/// In-memory working copy of the store for one reconciliation pass
#[derive(Debug, Clone, Default)]
pub struct FieldTransaction {
    working: BTreeMap<(String, Uuid), BTreeSet<String>>,
    dirty: bool,
}

impl FieldTransaction {
    pub fn get(&self, kind: &str, uuid: Uuid) -> Result<TargetFieldItem, StorageError> {
        self.working
            .get(&(kind.to_string(), uuid))
            .map(|fields| TargetFieldItem::new(kind, uuid, fields.clone()))
            .ok_or_else(|| StorageError::ItemNotFound {
                kind: kind.to_string(),
                uuid,
            })
    }

    /// Insert an item. Without `force`, an existing entry is an error.
    pub fn create(&mut self, item: TargetFieldItem, force: bool) -> Result<(), StorageError> {
        let key = item.key();
        if !force && self.working.contains_key(&key) {
            return Err(StorageError::ItemAlreadyExists {
                kind: item.kind,
                uuid: item.uuid,
            });
        }
        self.working.insert(key, item.fields);
        self.dirty = true;
        Ok(())
    }

    pub fn update(&mut self, item: TargetFieldItem) -> Result<(), StorageError> {
        match self.working.get_mut(&item.key()) {
            Some(fields) => {
                *fields = item.fields;
                self.dirty = true;
                Ok(())
            }
            None => Err(StorageError::ItemNotFound {
                kind: item.kind,
                uuid: item.uuid,
            }),
        }
    }

    /// Remove an item. With `force`, a missing entry is not an error.
    pub fn delete(&mut self, item: &TargetFieldItem, force: bool) -> Result<(), StorageError> {
        if self.working.remove(&item.key()).is_some() {
            self.dirty = true;
            return Ok(());
        }
        if force {
            return Ok(());
        }
        Err(StorageError::ItemNotFound {
            kind: item.kind.clone(),
            uuid: item.uuid,
        })
    }

    pub fn list(&self, kind: &str) -> Vec<TargetFieldItem> {
        self.working
            .iter()
            .filter(|((k, _), _)| k == kind)
            .map(|((k, uuid), fields)| TargetFieldItem::new(k.clone(), *uuid, fields.clone()))
            .collect()
    }

    pub fn list_all(&self) -> Vec<TargetFieldItem> {
        self.working
            .iter()
            .map(|((k, uuid), fields)| TargetFieldItem::new(k.clone(), *uuid, fields.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.working.len()
    }

    pub fn is_empty(&self) -> bool {
        self.working.is_empty()
    }

    fn into_items(self) -> Vec<TargetFieldItem> {
        self.working
            .into_iter()
            .map(|((kind, uuid), fields)| TargetFieldItem { kind, uuid, fields })
            .collect()
    }
}

/// Backing that lives only as long as the process
#[derive(Debug, Default, Clone)]
pub struct MemoryFieldBacking {
    items: Arc<Mutex<Vec<TargetFieldItem>>>,
}

impl MemoryFieldBacking {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of what has been persisted so far
    pub fn snapshot(&self) -> Vec<TargetFieldItem> {
        self.items.lock().clone()
    }
}

impl TargetFieldBacking for MemoryFieldBacking {
    fn load_all(&self) -> Result<Vec<TargetFieldItem>, StorageError> {
        Ok(self.items.lock().clone())
    }

    fn persist_all(&self, items: &[TargetFieldItem]) -> Result<(), StorageError> {
        *self.items.lock() = items.to_vec();
        Ok(())
    }
}
