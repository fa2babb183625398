//! Sled-backed persistence for the Target Field Store

use crate::error::StorageError;
use crate::store::{TargetFieldBacking, TargetFieldItem};
use bincode;
use sled;
use std::path::Path;

/// Sled-based implementation of TargetFieldBacking
///
/// Keys are `kind \0 uuid-bytes`, values are the bincode-encoded item.
pub struct SledFieldBacking {
    db: sled::Db,
}

impl SledFieldBacking {
    /// Create a new SledFieldBacking at the given path
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let db = sled::open(path).map_err(|e| StorageError::io("Failed to open sled database", e))?;
        Ok(Self { db })
    }

    fn key(item: &TargetFieldItem) -> Vec<u8> {
        let mut key = Vec::with_capacity(item.kind.len() + 17);
        key.extend_from_slice(item.kind.as_bytes());
        key.push(0);
        key.extend_from_slice(item.uuid.as_bytes());
        key
    }

    /// Flush all pending writes to disk
    pub fn flush(&self) -> Result<(), StorageError> {
        self.db
            .flush()
            .map_err(|e| StorageError::io("Failed to flush database", e))?;
        Ok(())
    }
}

impl TargetFieldBacking for SledFieldBacking {
    fn load_all(&self) -> Result<Vec<TargetFieldItem>, StorageError> {
        let mut items = Vec::new();
        for entry in self.db.iter() {
            let (_, value) = entry.map_err(|e| StorageError::io("Failed to iterate store", e))?;
            let item: TargetFieldItem = bincode::deserialize(&value).map_err(|e| {
                StorageError::Codec(format!("Failed to deserialize target field item: {}", e))
            })?;
            items.push(item);
        }
        Ok(items)
    }

    fn persist_all(&self, items: &[TargetFieldItem]) -> Result<(), StorageError> {
        let mut batch = sled::Batch::default();

        // Drop keys that are no longer present
        let keep: std::collections::HashSet<Vec<u8>> = items.iter().map(Self::key).collect();
        for key in self.db.iter().keys() {
            let key = key.map_err(|e| StorageError::io("Failed to iterate store", e))?;
            if !keep.contains(key.as_ref()) {
                batch.remove(key);
            }
        }

        for item in items {
            let value = bincode::serialize(item).map_err(|e| {
                StorageError::Codec(format!("Failed to serialize target field item: {}", e))
            })?;
            batch.insert(Self::key(item), value);
        }

        self.db
            .apply_batch(batch)
            .map_err(|e| StorageError::io("Failed to apply batch", e))?;
        self.flush()
    }
}
