//! Resource records
//!
//! `Resource` is the shape the driver works with. `TargetResource` and
//! `ActualResource` are the controller-side records for desired and observed
//! state; both carry the two content hashes used for drift detection.

use crate::error::HashError;
use crate::hash::{canonical_hash, canonical_hash_subset};
use crate::types::{AgentStatus, AttributeMap, Hash, ResourceStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeSet;
use uuid::Uuid;

/// Base resource shape shared by target and actual resources
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    pub uuid: Uuid,
    pub kind: String,
    pub value: AttributeMap,
    /// Attributes this agent is responsible for. `hash` covers only these.
    #[serde(default)]
    pub target_fields: BTreeSet<String>,
}

impl Resource {
    pub fn new(uuid: Uuid, kind: impl Into<String>, value: AttributeMap) -> Self {
        Self {
            uuid,
            kind: kind.into(),
            value,
            target_fields: BTreeSet::new(),
        }
    }

    /// Desired resource: every attribute of the value is owned
    pub fn target(uuid: Uuid, kind: impl Into<String>, value: AttributeMap) -> Self {
        let target_fields = value.keys().cloned().collect();
        Self {
            uuid,
            kind: kind.into(),
            value,
            target_fields,
        }
    }

    /// Build a resource from a raw attribute view that carries its own `uuid`
    pub fn from_value(
        value: AttributeMap,
        kind: impl Into<String>,
        target_fields: BTreeSet<String>,
    ) -> Option<Self> {
        let uuid = value_uuid(&value)?;
        Some(Self {
            uuid,
            kind: kind.into(),
            value,
            target_fields,
        })
    }

    /// Same identity, new value and field set
    pub fn replace_value(&self, value: AttributeMap, target_fields: BTreeSet<String>) -> Self {
        Self {
            uuid: self.uuid,
            kind: self.kind.clone(),
            value,
            target_fields,
        }
    }

    /// Attribute names present in the value
    pub fn value_fields(&self) -> BTreeSet<String> {
        self.value.keys().cloned().collect()
    }

    /// Digest over the target-fields subset of the value
    pub fn hash(&self) -> Result<Hash, HashError> {
        canonical_hash_subset(&self.value, &self.target_fields)
    }

    /// Digest over the entire value
    pub fn full_hash(&self) -> Result<Hash, HashError> {
        canonical_hash(&self.value)
    }
}

/// Read the `uuid` attribute of a raw view
pub fn value_uuid(value: &AttributeMap) -> Option<Uuid> {
    value
        .get("uuid")
        .and_then(Value::as_str)
        .and_then(|s| Uuid::parse_str(s).ok())
}

/// Desired state for one resource instance, assigned to an agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetResource {
    pub uuid: Uuid,
    pub kind: String,
    pub value: AttributeMap,
    #[serde(default)]
    pub status: ResourceStatus,
    pub agent: Option<Uuid>,
    #[serde(default)]
    pub node: Option<Uuid>,
    #[serde(default)]
    pub master: Option<Uuid>,
    #[serde(default)]
    pub master_hash: Option<Hash>,
    #[serde(default)]
    pub master_full_hash: Option<Hash>,
    pub hash: Hash,
    pub full_hash: Hash,
    pub tracked_at: DateTime<Utc>,
}

/// Fields of a target record that only the controller cares about
const TARGET_SERVER_FIELDS: &[&str] = &[
    "agent",
    "master",
    "node",
    "tracked_at",
    "master_hash",
    "master_full_hash",
];

impl TargetResource {
    /// Wrap a resource as a target. Every attribute of the value is owned.
    pub fn from_resource(resource: &Resource, agent: Option<Uuid>) -> Result<Self, HashError> {
        let mut target = Self {
            uuid: resource.uuid,
            kind: resource.kind.clone(),
            value: resource.value.clone(),
            status: ResourceStatus::New,
            agent,
            node: None,
            master: None,
            master_hash: None,
            master_full_hash: None,
            hash: String::new(),
            full_hash: String::new(),
            tracked_at: Utc::now(),
        };
        target.refresh_hashes()?;
        Ok(target)
    }

    /// View of this target as a driver resource
    pub fn to_resource(&self) -> Resource {
        Resource::target(self.uuid, self.kind.clone(), self.value.clone())
    }

    /// Bind this target to a master; the master's full hash becomes part of ours
    pub fn set_master(&mut self, master: &TargetResource) -> Result<(), HashError> {
        self.master = Some(master.uuid);
        self.master_hash = Some(master.hash.clone());
        self.master_full_hash = Some(master.full_hash.clone());
        self.refresh_hashes()
    }

    /// Replace the value and recompute both hashes
    pub fn set_value(&mut self, value: AttributeMap) -> Result<(), HashError> {
        self.value = value;
        self.refresh_hashes()
    }

    pub fn refresh_hashes(&mut self) -> Result<(), HashError> {
        self.hash = canonical_hash(&self.value)?;
        self.full_hash = match &self.master_full_hash {
            Some(master_full_hash) => canonical_hash(&json!({
                "value": self.value,
                "master_full_hash": master_full_hash,
            }))?,
            None => canonical_hash(&self.value)?,
        };
        Ok(())
    }

    /// Resource view with controller-only fields stripped
    pub fn payload_view(&self) -> Result<Value, HashError> {
        let mut view = serde_json::to_value(self)?;
        if let Value::Object(map) = &mut view {
            for field in TARGET_SERVER_FIELDS {
                map.remove(*field);
            }
        }
        Ok(view)
    }
}

/// Observed state of one resource instance, reported from a node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActualResource {
    pub uuid: Uuid,
    pub kind: String,
    pub value: AttributeMap,
    #[serde(default)]
    pub status: ResourceStatus,
    #[serde(default)]
    pub node: Option<Uuid>,
    pub hash: Hash,
    pub full_hash: Hash,
}

impl ActualResource {
    pub fn from_resource(resource: &Resource, node: Option<Uuid>) -> Result<Self, HashError> {
        Ok(Self {
            uuid: resource.uuid,
            kind: resource.kind.clone(),
            value: resource.value.clone(),
            status: ResourceStatus::Active,
            node,
            hash: resource.hash()?,
            full_hash: resource.full_hash()?,
        })
    }

    pub fn payload_view(&self) -> Result<Value, HashError> {
        let mut view = serde_json::to_value(self)?;
        if let Value::Object(map) = &mut view {
            map.remove("node");
        }
        Ok(view)
    }
}

/// One agent per node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    pub uuid: Uuid,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub capabilities: BTreeSet<String>,
    #[serde(default)]
    pub facts: BTreeSet<String>,
    pub node: Uuid,
    #[serde(default)]
    pub status: AgentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Agent {
    pub fn new(uuid: Uuid, name: impl Into<String>, node: Uuid) -> Self {
        let now = Utc::now();
        Self {
            uuid,
            name: name.into(),
            description: String::new(),
            capabilities: BTreeSet::new(),
            facts: BTreeSet::new(),
            node,
            status: AgentStatus::New,
            created_at: now,
            updated_at: now,
        }
    }

    /// Kinds whose actual resources are reported back to the agent
    ///
    /// Capabilities are always facts too: the agent needs to see what it
    /// already manages.
    pub fn fact_kinds(&self) -> BTreeSet<String> {
        self.facts.union(&self.capabilities).cloned().collect()
    }
}
