//! Delta Payload Protocol
//!
//! An agent polls with the hash of the last payload it applied. The
//! controller assembles the agent's full assignment, hashes it, and answers
//! with empty maps when the hashes match. Any change means the whole payload
//! is sent again; there is no per-field diff.

use crate::controller::ControllerStore;
use crate::error::PayloadError;
use crate::hash::canonical_hash;
use crate::types::Hash;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use tracing::debug;
use uuid::Uuid;

/// Resource views of one kind
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KindResources {
    pub resources: Vec<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Payload {
    pub capabilities: BTreeMap<String, KindResources>,
    pub facts: BTreeMap<String, KindResources>,
    pub hash: Hash,
}

impl Payload {
    /// True for the "nothing changed" answer
    pub fn is_unchanged(&self) -> bool {
        self.capabilities.is_empty() && self.facts.is_empty()
    }
}

/// Hash of the assembled capability and fact maps
fn payload_hash(
    capabilities: &BTreeMap<String, KindResources>,
    facts: &BTreeMap<String, KindResources>,
) -> Result<Hash, PayloadError> {
    Ok(canonical_hash(&json!({
        "capabilities": capabilities,
        "facts": facts,
    }))?)
}

/// Assemble the full payload for an agent
pub fn build_payload(store: &dyn ControllerStore, agent: Uuid) -> Result<Payload, PayloadError> {
    let agent = store.get_agent(agent)?.ok_or(PayloadError::AgentNotFound(agent))?;

    let mut capabilities = BTreeMap::new();
    for kind in &agent.capabilities {
        let resources = store
            .targets_for_agent(agent.uuid, kind)?
            .iter()
            .map(|t| t.payload_view())
            .collect::<Result<Vec<_>, _>>()?;
        capabilities.insert(kind.clone(), KindResources { resources });
    }

    let mut facts = BTreeMap::new();
    for kind in agent.fact_kinds() {
        let resources = store
            .actuals_for_node(agent.node, &kind)?
            .iter()
            .map(|a| a.payload_view())
            .collect::<Result<Vec<_>, _>>()?;
        facts.insert(kind, KindResources { resources });
    }

    let hash = payload_hash(&capabilities, &facts)?;
    Ok(Payload {
        capabilities,
        facts,
        hash,
    })
}

/// Answer an agent's poll
///
/// `schema_version` is accepted for compatibility and does not change the
/// payload shape. An empty `last_known_hash` means the agent has no prior
/// state.
pub fn get_payload(
    store: &dyn ControllerStore,
    agent: Uuid,
    schema_version: u32,
    last_known_hash: &str,
) -> Result<Payload, PayloadError> {
    let payload = build_payload(store, agent)?;
    if !last_known_hash.is_empty() && payload.hash == last_known_hash {
        debug!(agent = %agent, version = schema_version, "Payload unchanged");
        return Ok(Payload {
            hash: payload.hash,
            ..Payload::default()
        });
    }
    debug!(agent = %agent, version = schema_version, hash = %payload.hash, "Sending full payload");
    Ok(payload)
}
