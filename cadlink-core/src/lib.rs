//! CADLINK Core - Catalog Types
//!
//! Pure data structures shared by every other crate: identifiers, catalog
//! records, inbound payloads and the error hierarchy. No storage or
//! reconciliation logic lives here.

pub mod audit;
pub mod config;
pub mod entities;
pub mod enums;
pub mod error;
pub mod identity;
pub mod payload;

pub use audit::{AuditAction, AuditSink, ComponentEvent};
pub use config::{SyncConfig, DEFAULT_CATEGORY_KEY, DEFAULT_LOCATION_KEY};
pub use entities::{
    normalize_combination, AttributeLine, AttributeValue, Bom, BomLine, Component, ComponentKey,
    ConfigAttribute, ProductFamily, Variant, EXTERNAL_ATTRIBUTE_PREFIX,
};
pub use enums::{BomType, ComponentKind, EntityType, VariantStrategy};
pub use error::{
    CadlinkError, CadlinkResult, ConfigurationError, ErrorKind, StorageError, SyncError,
    ValidationError,
};
pub use identity::{
    AttributeId, AttributeValueId, BomId, BomLineId, ComponentId, EntityIdType, FamilyId,
    TenantId, TenantScope, Timestamp, VariantId,
};
pub use payload::{BomLineInput, ComponentPayload, ComponentSpec, ConfigurationValues};
