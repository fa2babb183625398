//! In-memory controller store

use crate::controller::ControllerStore;
use crate::error::StorageError;
use crate::model::{ActualResource, Agent, TargetResource};
use crate::tracking::TrackedResource;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use uuid::Uuid;

#[derive(Debug, Default)]
struct Records {
    agents: BTreeMap<Uuid, Agent>,
    targets: BTreeMap<Uuid, TargetResource>,
    actuals: BTreeMap<Uuid, ActualResource>,
    tracked: BTreeMap<Uuid, TrackedResource>,
}

#[derive(Debug, Default)]
pub struct MemoryControllerStore {
    records: RwLock<Records>,
}

impl MemoryControllerStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ControllerStore for MemoryControllerStore {
    fn get_agent(&self, uuid: Uuid) -> Result<Option<Agent>, StorageError> {
        Ok(self.records.read().agents.get(&uuid).cloned())
    }

    fn create_agent(&self, agent: &Agent) -> Result<(), StorageError> {
        let mut records = self.records.write();
        if records.agents.contains_key(&agent.uuid) {
            return Err(StorageError::ItemAlreadyExists {
                kind: "agent".to_string(),
                uuid: agent.uuid,
            });
        }
        records.agents.insert(agent.uuid, agent.clone());
        Ok(())
    }

    fn update_agent(&self, agent: &Agent) -> Result<(), StorageError> {
        let mut records = self.records.write();
        match records.agents.get_mut(&agent.uuid) {
            Some(stored) => {
                *stored = agent.clone();
                Ok(())
            }
            None => Err(StorageError::ItemNotFound {
                kind: "agent".to_string(),
                uuid: agent.uuid,
            }),
        }
    }

    fn put_target(&self, target: &TargetResource) -> Result<(), StorageError> {
        self.records.write().targets.insert(target.uuid, target.clone());
        Ok(())
    }

    fn get_target(&self, uuid: Uuid) -> Result<Option<TargetResource>, StorageError> {
        Ok(self.records.read().targets.get(&uuid).cloned())
    }

    fn list_targets(&self) -> Result<Vec<TargetResource>, StorageError> {
        Ok(self.records.read().targets.values().cloned().collect())
    }

    fn remove_target(&self, uuid: Uuid) -> Result<(), StorageError> {
        self.records.write().targets.remove(&uuid);
        Ok(())
    }

    fn put_actual(&self, actual: &ActualResource) -> Result<(), StorageError> {
        self.records.write().actuals.insert(actual.uuid, actual.clone());
        Ok(())
    }

    fn get_actual(&self, uuid: Uuid) -> Result<Option<ActualResource>, StorageError> {
        Ok(self.records.read().actuals.get(&uuid).cloned())
    }

    fn list_actuals(&self) -> Result<Vec<ActualResource>, StorageError> {
        Ok(self.records.read().actuals.values().cloned().collect())
    }

    fn remove_actual(&self, uuid: Uuid) -> Result<(), StorageError> {
        self.records.write().actuals.remove(&uuid);
        Ok(())
    }

    fn put_tracked(&self, tracked: &TrackedResource) -> Result<(), StorageError> {
        self.records.write().tracked.insert(tracked.uuid, tracked.clone());
        Ok(())
    }

    fn get_tracked(&self, uuid: Uuid) -> Result<Option<TrackedResource>, StorageError> {
        Ok(self.records.read().tracked.get(&uuid).cloned())
    }

    fn list_tracked(&self) -> Result<Vec<TrackedResource>, StorageError> {
        Ok(self.records.read().tracked.values().cloned().collect())
    }

    fn remove_tracked(&self, uuid: Uuid) -> Result<(), StorageError> {
        self.records.write().tracked.remove(&uuid);
        Ok(())
    }
}
