//! Configuration System
//!
//! Layered agent configuration: built-in defaults, the global config file,
//! an explicit `--config` file, then `UA__`-prefixed environment variables.
//! A configuration that fails [`AgentConfig::validate`] is never used to build
//! a driver.

use crate::backend::RestBackendClient;
use crate::driver::DirectDriver;
use crate::error::{ConfigError, StorageError};
use crate::logging::LoggingConfig;
use crate::store::json_file::JsonFileFieldBacking;
use crate::store::persistence::SledFieldBacking;
use crate::store::{MemoryFieldBacking, TargetFieldBacking, TargetFieldStore};
use crate::transform::{ResourceTransformer, TransformerMap};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

mod merge {
    pub mod merge_policy;
}
mod sources {
    pub mod env;
    pub mod explicit_file;
    pub mod global_file;
}

pub use sources::global_file::global_config_path;

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentConfig {
    #[serde(default)]
    pub agent: AgentSection,

    #[serde(default)]
    pub backend: BackendConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    /// Per-kind transformers applied to backend views
    #[serde(default)]
    pub transformers: HashMap<String, ResourceTransformer>,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Identity of this agent
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentSection {
    #[serde(default)]
    pub uuid: Option<Uuid>,

    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub description: String,

    /// Node this agent runs on; defaults to the agent uuid
    #[serde(default)]
    pub node: Option<Uuid>,
}

/// Resource backend connection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendConfig {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    #[serde(default)]
    pub project_id: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Kind to collection path; the keys are the driver's capabilities
    #[serde(default)]
    pub collections: BTreeMap<String, String>,
}

fn default_endpoint() -> String {
    "http://localhost:11010/v1/".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            project_id: String::new(),
            timeout_secs: default_timeout_secs(),
            collections: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Sled,
    Json,
    Memory,
}

/// Durable backing of the Target Field Store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,

    #[serde(default = "default_storage_path")]
    pub path: PathBuf,
}

fn default_storage_path() -> PathBuf {
    PathBuf::from(".uagent/target_fields")
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            path: default_storage_path(),
        }
    }
}

impl StorageConfig {
    pub fn open_backing(&self) -> Result<Arc<dyn TargetFieldBacking>, StorageError> {
        Ok(match self.backend {
            StorageBackend::Sled => Arc::new(SledFieldBacking::new(&self.path)?),
            StorageBackend::Json => Arc::new(JsonFileFieldBacking::new(&self.path)),
            StorageBackend::Memory => Arc::new(MemoryFieldBacking::new()),
        })
    }

    pub fn open_store(&self) -> Result<TargetFieldStore, StorageError> {
        Ok(TargetFieldStore::new(self.open_backing()?))
    }
}

/// Configuration validation errors
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    Backend(String),
    Collection(String, String),
    Transformer(String, String),
    Storage(String),
    Logging(String),
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::Backend(msg) => write!(f, "Backend: {}", msg),
            ValidationError::Collection(kind, msg) => write!(f, "Collection '{}': {}", kind, msg),
            ValidationError::Transformer(kind, msg) => {
                write!(f, "Transformer '{}': {}", kind, msg)
            }
            ValidationError::Storage(msg) => write!(f, "Storage: {}", msg),
            ValidationError::Logging(msg) => write!(f, "Logging: {}", msg),
        }
    }
}

impl std::error::Error for ValidationError {}

impl AgentConfig {
    /// Validate the entire configuration, collecting every problem
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        let endpoint = self.backend.endpoint.trim();
        if endpoint.is_empty() {
            errors.push(ValidationError::Backend("endpoint cannot be empty".to_string()));
        } else if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
            errors.push(ValidationError::Backend(format!(
                "endpoint must be an http(s) URL, got '{}'",
                endpoint
            )));
        }
        if self.backend.timeout_secs == 0 {
            errors.push(ValidationError::Backend("timeout_secs must be positive".to_string()));
        }

        for (kind, path) in &self.backend.collections {
            if path.trim_matches('/').is_empty() {
                errors.push(ValidationError::Collection(
                    kind.clone(),
                    "collection path cannot be empty".to_string(),
                ));
            }
        }

        for kind in self.transformers.keys() {
            if !self.backend.collections.contains_key(kind) {
                errors.push(ValidationError::Transformer(
                    kind.clone(),
                    "no collection configured for this kind".to_string(),
                ));
            }
        }

        if self.storage.backend != StorageBackend::Memory
            && self.storage.path.as_os_str().is_empty()
        {
            errors.push(ValidationError::Storage("path cannot be empty".to_string()));
        }

        if let Err(e) = crate::logging::validate(&self.logging) {
            errors.push(ValidationError::Logging(e.to_string()));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Kinds the driver manages
    pub fn capabilities(&self) -> BTreeSet<String> {
        self.backend.collections.keys().cloned().collect()
    }

    pub fn transformer_map(&self) -> TransformerMap {
        TransformerMap::from(self.transformers.clone())
    }

    pub fn backend_client(&self) -> Result<RestBackendClient, ConfigError> {
        RestBackendClient::new(
            self.backend.endpoint.clone(),
            self.backend.collections.clone().into_iter().collect(),
            self.backend.project_id.clone(),
            Duration::from_secs(self.backend.timeout_secs),
        )
        .map_err(|e| ConfigError::Other(e.to_string()))
    }

    /// Build a direct driver against the configured REST backend
    pub fn build_driver(&self) -> Result<DirectDriver, ConfigError> {
        self.validate().map_err(join_errors)?;
        let client = Arc::new(self.backend_client()?);
        let store = self
            .storage
            .open_store()
            .map_err(|e| ConfigError::Other(e.to_string()))?;
        Ok(DirectDriver::new(client, store, self.capabilities()).with_transformers(self.transformer_map()))
    }
}

/// Render validation errors as one `ConfigError::Invalid`
pub fn join_errors(errors: Vec<ValidationError>) -> ConfigError {
    ConfigError::Invalid(
        errors
            .iter()
            .map(|e| format!("  - {}", e))
            .collect::<Vec<_>>()
            .join("\n"),
    )
}

/// Builds an [`AgentConfig`] from its layered sources
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    global_file: Option<PathBuf>,
    explicit_file: Option<PathBuf>,
    use_env: bool,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self {
            global_file: global_config_path(),
            explicit_file: None,
            use_env: true,
        }
    }
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the global file location; `None` skips the global layer
    pub fn with_global_file(mut self, path: Option<PathBuf>) -> Self {
        self.global_file = path;
        self
    }

    /// Layer an explicit file on top of the global one; it must exist
    pub fn with_file(mut self, path: impl AsRef<Path>) -> Self {
        self.explicit_file = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn with_env(mut self, use_env: bool) -> Self {
        self.use_env = use_env;
        self
    }

    pub fn load(&self) -> Result<AgentConfig, ConfigError> {
        let mut builder = merge::merge_policy::builder_with_defaults()?;
        if let Some(path) = &self.global_file {
            builder = sources::global_file::add_to_builder(builder, path)?;
        }
        if let Some(path) = &self.explicit_file {
            builder = sources::explicit_file::add_to_builder(builder, path)?;
        }
        if self.use_env {
            builder = sources::env::add_to_builder(builder);
        }
        Ok(builder.build()?.try_deserialize()?)
    }
}
