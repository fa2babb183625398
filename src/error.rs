//! Error types for the universal agent.
//!
//! Each layer owns its error enum. The driver translates store and backend
//! errors into its own kinds so callers never see raw store errors.

use thiserror::Error;
use uuid::Uuid;

/// Hash Engine errors
#[derive(Debug, Error)]
pub enum HashError {
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for HashError {
    fn from(err: serde_json::Error) -> Self {
        HashError::Serialization(err.to_string())
    }
}

/// Target Field Store and controller record storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Item not found: {kind}/{uuid}")]
    ItemNotFound { kind: String, uuid: Uuid },

    #[error("Item already exists: {kind}/{uuid}")]
    ItemAlreadyExists { kind: String, uuid: Uuid },

    #[error("Storage codec error: {0}")]
    Codec(String),

    #[error("Storage I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl StorageError {
    pub(crate) fn io(context: &str, err: impl std::fmt::Display) -> Self {
        StorageError::IoError(std::io::Error::new(
            std::io::ErrorKind::Other,
            format!("{}: {}", context, err),
        ))
    }
}

/// Backend Client errors
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("Resource not found on backend: {kind}/{uuid}")]
    ResourceNotFound { kind: String, uuid: Uuid },

    #[error("Resource already exists on backend: {kind}/{uuid}")]
    ResourceAlreadyExists { kind: String, uuid: Uuid },

    #[error("Resource {uuid} belongs to project {found}, expected {expected}")]
    ResourceProjectMismatch {
        uuid: Uuid,
        expected: String,
        found: String,
    },

    #[error("No collection configured for kind: {0}")]
    UnknownKind(String),

    #[error("Backend request failed: {0}")]
    Transport(String),

    #[error("Malformed backend response: {0}")]
    Decode(String),
}

/// Reconciliation Driver errors
#[derive(Debug, Error)]
pub enum DriverError {
    #[error("Unsupported capability: {0}")]
    UnsupportedCapability(String),

    #[error("Resource not found: {kind}/{uuid}")]
    ResourceNotFound { kind: String, uuid: Uuid },

    #[error("Resource already exists: {kind}/{uuid}")]
    ResourceAlreadyExists { kind: String, uuid: Uuid },

    #[error("Resource {uuid} does not belong to project {expected} (found {found})")]
    ResourceProjectMismatch {
        uuid: Uuid,
        expected: String,
        found: String,
    },

    #[error("No reconciliation pass is open; call start() first")]
    PassNotStarted,

    #[error("A reconciliation pass is already open")]
    PassAlreadyStarted,

    #[error("Backend error: {0}")]
    Backend(BackendError),

    #[error("Storage error: {0}")]
    Storage(StorageError),

    #[error("Hash error: {0}")]
    Hash(#[from] HashError),
}

impl From<BackendError> for DriverError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::ResourceNotFound { kind, uuid } => {
                DriverError::ResourceNotFound { kind, uuid }
            }
            BackendError::ResourceAlreadyExists { kind, uuid } => {
                DriverError::ResourceAlreadyExists { kind, uuid }
            }
            BackendError::ResourceProjectMismatch {
                uuid,
                expected,
                found,
            } => DriverError::ResourceProjectMismatch {
                uuid,
                expected,
                found,
            },
            other => DriverError::Backend(other),
        }
    }
}

impl From<StorageError> for DriverError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::ItemNotFound { kind, uuid } => DriverError::ResourceNotFound { kind, uuid },
            StorageError::ItemAlreadyExists { kind, uuid } => {
                DriverError::ResourceAlreadyExists { kind, uuid }
            }
            other => DriverError::Storage(other),
        }
    }
}

/// Delta Payload Protocol errors
#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("Agent not found: {0}")]
    AgentNotFound(Uuid),

    #[error("Hash error: {0}")]
    Hash(#[from] HashError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Configuration validation failed:\n{0}")]
    Invalid(String),

    #[error("Configuration error: {0}")]
    Other(String),
}
