//! JSON file backing for the Target Field Store
//!
//! Human-readable alternative to sled for small agents. Writes go to a
//! temporary file that is renamed over the target, so a crash mid-write
//! leaves the previous contents intact.

use crate::error::StorageError;
use crate::store::{TargetFieldBacking, TargetFieldItem};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const FIELD_FILE_VERSION: u32 = 1;

#[derive(Serialize, Deserialize)]
struct FieldFile {
    version: u32,
    items: Vec<TargetFieldItem>,
}

pub struct JsonFileFieldBacking {
    path: PathBuf,
}

impl JsonFileFieldBacking {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TargetFieldBacking for JsonFileFieldBacking {
    /// A missing file is an empty store
    fn load_all(&self) -> Result<Vec<TargetFieldItem>, StorageError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let bytes = fs::read(&self.path)
            .map_err(|e| StorageError::io(&format!("Failed to read {:?}", self.path), e))?;
        let file: FieldFile = serde_json::from_slice(&bytes).map_err(|e| {
            StorageError::Codec(format!("Failed to parse {:?}: {}", self.path, e))
        })?;

        if file.version != FIELD_FILE_VERSION {
            return Err(StorageError::Codec(format!(
                "Unsupported target field file version: {} (expected {})",
                file.version, FIELD_FILE_VERSION
            )));
        }

        Ok(file.items)
    }

    fn persist_all(&self, items: &[TargetFieldItem]) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                StorageError::io(&format!("Failed to create directory {:?}", parent), e)
            })?;
        }

        let file = FieldFile {
            version: FIELD_FILE_VERSION,
            items: items.to_vec(),
        };
        let bytes = serde_json::to_vec_pretty(&file)
            .map_err(|e| StorageError::Codec(format!("Failed to encode target fields: {}", e)))?;

        let temp_path = self.path.with_extension("json.tmp");
        fs::write(&temp_path, bytes)
            .map_err(|e| StorageError::io(&format!("Failed to write {:?}", temp_path), e))?;
        fs::rename(&temp_path, &self.path)
            .map_err(|e| StorageError::io(&format!("Failed to rename {:?}", temp_path), e))?;
        Ok(())
    }
}
