//! Identity types for CADLINK records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::Hash;
use uuid::Uuid;

/// Timestamp type using UTC timezone.
pub type Timestamp = DateTime<Utc>;

/// Common behaviour of the strongly-typed record identifiers.
///
/// Every catalog record is keyed by a UUIDv7 wrapped in its own newtype, so a
/// `VariantId` can never be passed where a `FamilyId` is expected.
pub trait EntityIdType: Copy + Eq + Hash + Ord + fmt::Debug + fmt::Display {
    /// Wrap an existing UUID.
    fn new(uuid: Uuid) -> Self;

    /// Unwrap to the raw UUID.
    fn as_uuid(&self) -> Uuid;

    /// Generate a fresh, timestamp-sortable identifier.
    fn now_v7() -> Self {
        Self::new(Uuid::now_v7())
    }

    /// The nil identifier (all zeroes).
    fn nil() -> Self {
        Self::new(Uuid::nil())
    }
}

macro_rules! define_entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl EntityIdType for $name {
            fn new(uuid: Uuid) -> Self {
                Self(uuid)
            }

            fn as_uuid(&self) -> Uuid {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_entity_id!(
    /// Tenant (company/organization) boundary.
    TenantId
);
define_entity_id!(
    /// Identifier of a synchronized CAD component.
    ComponentId
);
define_entity_id!(
    /// Identifier of a product family (catalog template).
    FamilyId
);
define_entity_id!(
    /// Identifier of a configuration attribute.
    AttributeId
);
define_entity_id!(
    /// Identifier of an attribute value.
    AttributeValueId
);
define_entity_id!(
    /// Identifier of a product variant.
    VariantId
);
define_entity_id!(
    /// Identifier of a bill of materials header.
    BomId
);
define_entity_id!(
    /// Identifier of a bill of materials line.
    BomLineId
);

/// The caller's tenant context.
///
/// Threaded explicitly through every lookup and create call. A record is
/// visible to a scope when it has no tenant (shared) or when its tenant
/// matches the caller's.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TenantScope {
    tenant_id: TenantId,
}

impl TenantScope {
    pub fn new(tenant_id: TenantId) -> Self {
        Self { tenant_id }
    }

    /// The tenant new records are stamped with.
    pub fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }

    /// Global-or-this-tenant visibility rule.
    pub fn can_see(&self, owner: Option<TenantId>) -> bool {
        match owner {
            None => true,
            Some(owner) => owner == self.tenant_id,
        }
    }
}

impl From<TenantId> for TenantScope {
    fn from(tenant_id: TenantId) -> Self {
        Self::new(tenant_id)
    }
}
