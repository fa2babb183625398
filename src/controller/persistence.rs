//! Sled-backed controller store
//!
//! One sled tree per record type, keyed by uuid bytes. Records hold
//! arbitrary JSON values, so they are encoded as JSON rather than bincode.

use crate::controller::ControllerStore;
use crate::error::StorageError;
use crate::model::{ActualResource, Agent, TargetResource};
use crate::tracking::TrackedResource;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;
use uuid::Uuid;

const AGENTS_TREE: &str = "agents";
const TARGETS_TREE: &str = "target_resources";
const ACTUALS_TREE: &str = "actual_resources";
const TRACKED_TREE: &str = "tracked_resources";

pub struct SledControllerStore {
    db: sled::Db,
}

impl SledControllerStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let db = sled::open(path).map_err(|e| StorageError::io("Failed to open sled database", e))?;
        Ok(Self { db })
    }

    fn tree(&self, name: &str) -> Result<sled::Tree, StorageError> {
        self.db
            .open_tree(name)
            .map_err(|e| StorageError::io(&format!("Failed to open tree {}", name), e))
    }

    fn put<T: Serialize>(&self, tree: &str, uuid: Uuid, record: &T) -> Result<(), StorageError> {
        let bytes = serde_json::to_vec(record)
            .map_err(|e| StorageError::Codec(format!("Failed to encode {} record: {}", tree, e)))?;
        self.tree(tree)?
            .insert(uuid.as_bytes(), bytes)
            .map_err(|e| StorageError::io("Failed to put record", e))?;
        Ok(())
    }

    fn get<T: DeserializeOwned>(&self, tree: &str, uuid: Uuid) -> Result<Option<T>, StorageError> {
        match self
            .tree(tree)?
            .get(uuid.as_bytes())
            .map_err(|e| StorageError::io("Failed to get record", e))?
        {
            Some(bytes) => Ok(Some(decode(tree, &bytes)?)),
            None => Ok(None),
        }
    }

    fn list<T: DeserializeOwned>(&self, tree: &str) -> Result<Vec<T>, StorageError> {
        let mut records = Vec::new();
        for entry in self.tree(tree)?.iter() {
            let (_, bytes) = entry.map_err(|e| StorageError::io("Failed to iterate records", e))?;
            records.push(decode(tree, &bytes)?);
        }
        Ok(records)
    }

    fn remove(&self, tree: &str, uuid: Uuid) -> Result<(), StorageError> {
        self.tree(tree)?
            .remove(uuid.as_bytes())
            .map_err(|e| StorageError::io("Failed to remove record", e))?;
        Ok(())
    }

    /// Flush all pending writes to disk
    pub fn flush(&self) -> Result<(), StorageError> {
        self.db
            .flush()
            .map_err(|e| StorageError::io("Failed to flush database", e))?;
        Ok(())
    }
}

fn decode<T: DeserializeOwned>(tree: &str, bytes: &[u8]) -> Result<T, StorageError> {
    serde_json::from_slice(bytes)
        .map_err(|e| StorageError::Codec(format!("Failed to decode {} record: {}", tree, e)))
}

impl ControllerStore for SledControllerStore {
    fn get_agent(&self, uuid: Uuid) -> Result<Option<Agent>, StorageError> {
        self.get(AGENTS_TREE, uuid)
    }

    fn create_agent(&self, agent: &Agent) -> Result<(), StorageError> {
        let bytes = serde_json::to_vec(agent)
            .map_err(|e| StorageError::Codec(format!("Failed to encode agent: {}", e)))?;
        // Atomic insert-if-absent
        let swapped = self
            .tree(AGENTS_TREE)?
            .compare_and_swap(agent.uuid.as_bytes(), None as Option<&[u8]>, Some(bytes))
            .map_err(|e| StorageError::io("Failed to create agent", e))?;
        swapped.map_err(|_| StorageError::ItemAlreadyExists {
            kind: "agent".to_string(),
            uuid: agent.uuid,
        })
    }

    fn update_agent(&self, agent: &Agent) -> Result<(), StorageError> {
        if self.get_agent(agent.uuid)?.is_none() {
            return Err(StorageError::ItemNotFound {
                kind: "agent".to_string(),
                uuid: agent.uuid,
            });
        }
        self.put(AGENTS_TREE, agent.uuid, agent)
    }

    fn put_target(&self, target: &TargetResource) -> Result<(), StorageError> {
        self.put(TARGETS_TREE, target.uuid, target)
    }

    fn get_target(&self, uuid: Uuid) -> Result<Option<TargetResource>, StorageError> {
        self.get(TARGETS_TREE, uuid)
    }

    fn list_targets(&self) -> Result<Vec<TargetResource>, StorageError> {
        self.list(TARGETS_TREE)
    }

    fn remove_target(&self, uuid: Uuid) -> Result<(), StorageError> {
        self.remove(TARGETS_TREE, uuid)
    }

    fn put_actual(&self, actual: &ActualResource) -> Result<(), StorageError> {
        self.put(ACTUALS_TREE, actual.uuid, actual)
    }

    fn get_actual(&self, uuid: Uuid) -> Result<Option<ActualResource>, StorageError> {
        self.get(ACTUALS_TREE, uuid)
    }

    fn list_actuals(&self) -> Result<Vec<ActualResource>, StorageError> {
        self.list(ACTUALS_TREE)
    }

    fn remove_actual(&self, uuid: Uuid) -> Result<(), StorageError> {
        self.remove(ACTUALS_TREE, uuid)
    }

    fn put_tracked(&self, tracked: &TrackedResource) -> Result<(), StorageError> {
        self.put(TRACKED_TREE, tracked.uuid, tracked)
    }

    fn get_tracked(&self, uuid: Uuid) -> Result<Option<TrackedResource>, StorageError> {
        self.get(TRACKED_TREE, uuid)
    }

    fn list_tracked(&self) -> Result<Vec<TrackedResource>, StorageError> {
        self.list(TRACKED_TREE)
    }

    fn remove_tracked(&self, uuid: Uuid) -> Result<(), StorageError> {
        self.remove(TRACKED_TREE, uuid)
    }
}
