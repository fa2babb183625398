//! Controller-side records
//!
//! Agents, target resources, actual resources and tracked resources as the
//! controller tier stores them. The Delta Payload Protocol and dependency
//! tracking read from a [`ControllerStore`]; neither needs more than
//! read-committed freshness, so implementations take no locks across calls.

pub mod memory;
pub mod persistence;

pub use memory::MemoryControllerStore;
pub use persistence::SledControllerStore;

use crate::error::StorageError;
use crate::model::{ActualResource, Agent, TargetResource};
use crate::tracking::TrackedResource;
use chrono::Utc;
use std::collections::BTreeSet;
use tracing::{debug, info, warn};
use uuid::Uuid;

pub trait ControllerStore: Send + Sync {
    fn get_agent(&self, uuid: Uuid) -> Result<Option<Agent>, StorageError>;

    /// Fails with `ItemAlreadyExists` if an agent with this uuid exists
    fn create_agent(&self, agent: &Agent) -> Result<(), StorageError>;

    /// Fails with `ItemNotFound` if the agent is unknown
    fn update_agent(&self, agent: &Agent) -> Result<(), StorageError>;

    fn put_target(&self, target: &TargetResource) -> Result<(), StorageError>;
    fn get_target(&self, uuid: Uuid) -> Result<Option<TargetResource>, StorageError>;
    fn list_targets(&self) -> Result<Vec<TargetResource>, StorageError>;
    /// Remove only this record; see [`ControllerStore::delete_target`]
    fn remove_target(&self, uuid: Uuid) -> Result<(), StorageError>;

    fn put_actual(&self, actual: &ActualResource) -> Result<(), StorageError>;
    fn get_actual(&self, uuid: Uuid) -> Result<Option<ActualResource>, StorageError>;
    fn list_actuals(&self) -> Result<Vec<ActualResource>, StorageError>;
    fn remove_actual(&self, uuid: Uuid) -> Result<(), StorageError>;

    fn put_tracked(&self, tracked: &TrackedResource) -> Result<(), StorageError>;
    fn get_tracked(&self, uuid: Uuid) -> Result<Option<TrackedResource>, StorageError>;
    fn list_tracked(&self) -> Result<Vec<TrackedResource>, StorageError>;
    fn remove_tracked(&self, uuid: Uuid) -> Result<(), StorageError>;

    /// Delete a target and everything that references it
    ///
    /// Tracked resources naming it as watcher or target go with it, and so do
    /// targets that name it as their master.
    fn delete_target(&self, uuid: Uuid) -> Result<(), StorageError> {
        for tracked in self.list_tracked()? {
            if tracked.watcher == uuid || tracked.target == uuid {
                self.remove_tracked(tracked.uuid)?;
            }
        }
        for target in self.list_targets()? {
            if target.master == Some(uuid) {
                self.delete_target(target.uuid)?;
            }
        }
        self.remove_target(uuid)
    }

    /// Targets of `kind` assigned to an agent
    fn targets_for_agent(&self, agent: Uuid, kind: &str) -> Result<Vec<TargetResource>, StorageError> {
        let mut targets: Vec<TargetResource> = self
            .list_targets()?
            .into_iter()
            .filter(|t| t.agent == Some(agent) && t.kind == kind)
            .collect();
        targets.sort_by_key(|t| t.uuid);
        Ok(targets)
    }

    /// Actual resources of `kind` reported from a node
    fn actuals_for_node(&self, node: Uuid, kind: &str) -> Result<Vec<ActualResource>, StorageError> {
        let mut actuals: Vec<ActualResource> = self
            .list_actuals()?
            .into_iter()
            .filter(|a| a.node == Some(node) && a.kind == kind)
            .collect();
        actuals.sort_by_key(|a| a.uuid);
        Ok(actuals)
    }
}

/// What a service declares about itself when it registers as an agent
#[derive(Debug, Clone)]
pub struct AgentSpec {
    pub uuid: Uuid,
    pub name: Option<String>,
    pub capabilities: BTreeSet<String>,
    pub facts: BTreeSet<String>,
    pub node: Uuid,
}

/// Register an agent, or refresh its declaration if it already exists
pub fn register_agent(store: &dyn ControllerStore, spec: &AgentSpec) -> Result<Agent, StorageError> {
    let name = spec
        .name
        .clone()
        .unwrap_or_else(|| format!("agent-{}", spec.uuid));
    let mut agent = Agent::new(spec.uuid, name, spec.node);
    agent.capabilities = spec.capabilities.clone();
    agent.facts = spec.facts.clone();

    match store.create_agent(&agent) {
        Ok(()) => {
            info!(agent = %agent.uuid, "The service registered");
            Ok(agent)
        }
        Err(StorageError::ItemAlreadyExists { .. }) => {
            warn!(agent = %agent.uuid, "The service already registered");
            let mut existing = store
                .get_agent(spec.uuid)?
                .ok_or_else(|| StorageError::ItemNotFound {
                    kind: "agent".to_string(),
                    uuid: spec.uuid,
                })?;
            existing.name = agent.name;
            existing.capabilities = agent.capabilities;
            existing.facts = agent.facts;
            existing.node = agent.node;
            existing.updated_at = Utc::now();
            store.update_agent(&existing)?;
            debug!(agent = %existing.uuid, "Agent declaration refreshed");
            Ok(existing)
        }
        Err(e) => Err(e),
    }
}
