//! Shared primitive types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Flat attribute view of a resource: `string -> json value`
pub type AttributeMap = serde_json::Map<String, serde_json::Value>;

/// Hex-encoded BLAKE3 digest produced by the hash engine
pub type Hash = String;

/// Lifecycle status of target and actual resources
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResourceStatus {
    #[default]
    New,
    Active,
    Error,
    Disabled,
}

impl fmt::Display for ResourceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ResourceStatus::New => "NEW",
            ResourceStatus::Active => "ACTIVE",
            ResourceStatus::Error => "ERROR",
            ResourceStatus::Disabled => "DISABLED",
        };
        f.write_str(s)
    }
}

/// Agents share the resource status set
pub type AgentStatus = ResourceStatus;
