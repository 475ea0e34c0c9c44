//! Error types for CADLINK operations

use crate::EntityType;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Storage layer errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StorageError {
    #[error("Duplicate key for {entity_type:?}: {key}")]
    DuplicateKey { entity_type: EntityType, key: String },

    #[error("Entity not found: {entity_type:?} with id {id}")]
    NotFound { entity_type: EntityType, id: Uuid },

    #[error("Transaction failed: {reason}")]
    TransactionFailed { reason: String },

    #[error("Storage lock poisoned")]
    LockPoisoned,
}

/// Validation errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Required field missing: {field}")]
    RequiredFieldMissing { field: String },

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Circular reference detected in {entity_type:?}: {ids:?}")]
    CircularReference {
        entity_type: EntityType,
        ids: Vec<Uuid>,
    },
}

/// Errors raised while decoding CAD configuration values.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("Malformed configuration values: {reason}")]
    Malformed { reason: String },
}

/// Reconciliation and BOM construction errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SyncError {
    #[error("Parent component not found: {external_id}")]
    ParentNotFound { external_id: String },
}

/// Coarse error category surfaced to callers of the sync core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    ValidationFailure,
    DuplicateKey,
    ParentNotFound,
    MalformedConfiguration,
    Storage,
}

/// Master error type for all CADLINK errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CadlinkError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("Sync error: {0}")]
    Sync(#[from] SyncError),
}

impl CadlinkError {
    /// Category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            CadlinkError::Storage(StorageError::DuplicateKey { .. }) => ErrorKind::DuplicateKey,
            CadlinkError::Storage(_) => ErrorKind::Storage,
            CadlinkError::Validation(_) => ErrorKind::ValidationFailure,
            CadlinkError::Configuration(_) => ErrorKind::MalformedConfiguration,
            CadlinkError::Sync(SyncError::ParentNotFound { .. }) => ErrorKind::ParentNotFound,
        }
    }

    pub fn required(field: &str) -> Self {
        CadlinkError::Validation(ValidationError::RequiredFieldMissing {
            field: field.to_string(),
        })
    }

    pub fn invalid(field: &str, reason: impl Into<String>) -> Self {
        CadlinkError::Validation(ValidationError::InvalidValue {
            field: field.to_string(),
            reason: reason.into(),
        })
    }

    pub fn malformed(reason: impl Into<String>) -> Self {
        CadlinkError::Configuration(ConfigurationError::Malformed {
            reason: reason.into(),
        })
    }
}

/// Result type alias for CADLINK operations.
pub type CadlinkResult<T> = Result<T, CadlinkError>;
