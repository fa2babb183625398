//! Dependency tracking between target resources
//!
//! A watcher target records a snapshot of another target's hashes. When the
//! watched target's full hash moves on, the watcher is stale and its owner
//! should re-derive it and then refresh the snapshot.

use crate::controller::ControllerStore;
use crate::error::StorageError;
use crate::model::TargetResource;
use crate::types::Hash;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

/// A watcher's snapshot of the target it depends on
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackedResource {
    pub uuid: Uuid,
    pub watcher: Uuid,
    pub target: Uuid,
    pub watcher_kind: String,
    pub target_kind: String,
    /// Target's hash when the snapshot was taken
    pub hash: Hash,
    /// Target's full hash when the snapshot was taken
    pub full_hash: Hash,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TrackedResource {
    pub fn new(watcher: &TargetResource, target: &TargetResource) -> Self {
        let now = Utc::now();
        Self {
            uuid: Uuid::new_v4(),
            watcher: watcher.uuid,
            target: target.uuid,
            watcher_kind: watcher.kind.clone(),
            target_kind: target.kind.clone(),
            hash: target.hash.clone(),
            full_hash: target.full_hash.clone(),
            created_at: now,
            updated_at: now,
        }
    }

    /// True when the watched target changed since the snapshot
    pub fn is_stale(&self, target: &TargetResource) -> bool {
        self.full_hash != target.full_hash
    }

    /// Take a fresh snapshot of the target's hashes
    pub fn refresh(&mut self, target: &TargetResource) {
        self.hash = target.hash.clone();
        self.full_hash = target.full_hash.clone();
        self.updated_at = Utc::now();
    }
}

/// A stale tracked resource together with what it is stale against
#[derive(Debug, Clone, PartialEq)]
pub struct OutdatedTracked {
    pub tracked: TrackedResource,
    /// Target's current full hash
    pub current_full_hash: Hash,
    /// Actual resource of the target, if one has been reported
    pub actual: Option<Uuid>,
}

/// Start tracking `target` on behalf of `watcher`
pub fn track(
    store: &dyn ControllerStore,
    watcher: &TargetResource,
    target: &TargetResource,
) -> Result<TrackedResource, StorageError> {
    let tracked = TrackedResource::new(watcher, target);
    store.put_tracked(&tracked)?;
    debug!(watcher = %watcher.uuid, target = %target.uuid, "Tracking target");
    Ok(tracked)
}

/// Refresh a tracked resource against its target's current state
pub fn refresh(store: &dyn ControllerStore, uuid: Uuid) -> Result<TrackedResource, StorageError> {
    let mut tracked = store.get_tracked(uuid)?.ok_or_else(|| StorageError::ItemNotFound {
        kind: "tracked_resource".to_string(),
        uuid,
    })?;
    let target = store
        .get_target(tracked.target)?
        .ok_or_else(|| StorageError::ItemNotFound {
            kind: tracked.target_kind.clone(),
            uuid: tracked.target,
        })?;
    tracked.refresh(&target);
    store.put_tracked(&tracked)?;
    Ok(tracked)
}

/// Every tracked resource whose target moved on since the snapshot
///
/// Snapshots whose target has disappeared are left out; deleting a target
/// removes its tracked resources with it.
pub fn outdated(store: &dyn ControllerStore) -> Result<Vec<OutdatedTracked>, StorageError> {
    let mut result = Vec::new();
    for tracked in store.list_tracked()? {
        let Some(target) = store.get_target(tracked.target)? else {
            continue;
        };
        if !tracked.is_stale(&target) {
            continue;
        }
        let actual = store.get_actual(target.uuid)?.map(|a| a.uuid);
        result.push(OutdatedTracked {
            current_full_hash: target.full_hash,
            actual,
            tracked,
        });
    }
    result.sort_by_key(|o| o.tracked.uuid);
    Ok(result)
}

/// Tracked resources held by a watcher
pub fn dependencies_of(
    store: &dyn ControllerStore,
    watcher: Uuid,
) -> Result<Vec<TrackedResource>, StorageError> {
    Ok(store
        .list_tracked()?
        .into_iter()
        .filter(|t| t.watcher == watcher)
        .collect())
}

/// Tracked resources pointing at a target
pub fn watchers_of(
    store: &dyn ControllerStore,
    target: Uuid,
) -> Result<Vec<TrackedResource>, StorageError> {
    Ok(store
        .list_tracked()?
        .into_iter()
        .filter(|t| t.target == target)
        .collect())
}
