//! CADLINK Storage - Storage Traits and In-Memory Implementation
//!
//! Defines the persistence collaborator the sync core runs against: catalog
//! records, tenant-scoped settings, the structural-combination generator and
//! the audit log. Every lookup takes a [`TenantScope`] and applies the
//! global-or-this-tenant visibility rule.

pub mod audit_log;
pub mod combination;
pub mod memory;
pub mod settings;

pub use audit_log::InMemoryAuditLog;
pub use combination::{CombinationGenerator, FirstUngeneratedCombination};
pub use memory::InMemoryCatalog;
pub use settings::{InMemorySettings, SettingsStore};

use cadlink_core::{
    AttributeId, AttributeLine, AttributeValue, AttributeValueId, Bom, BomId, CadlinkResult,
    Component, ComponentId, ComponentKind, ConfigAttribute, FamilyId, ProductFamily, TenantScope,
    Timestamp, Variant, VariantId,
};

// ============================================================================
// UPDATE TYPES
// ============================================================================

/// Update payload for components.
///
/// `None` leaves a field untouched. Nullable fields use a nested `Option`
/// so they can be cleared.
#[derive(Debug, Clone, Default)]
pub struct ComponentUpdate {
    pub name: Option<String>,
    pub kind: Option<ComponentKind>,
    pub version: Option<Option<String>>,
    pub version_identifier: Option<String>,
    pub last_modified: Option<Timestamp>,
    pub configuration_values: Option<Option<String>>,
    pub parent_id: Option<Option<ComponentId>>,
    pub active: Option<bool>,
}

/// Update payload for product families.
#[derive(Debug, Clone, Default)]
pub struct FamilyUpdate {
    pub name: Option<String>,
    pub attribute_lines: Option<Vec<AttributeLine>>,
}

/// Update payload for configuration attributes.
#[derive(Debug, Clone, Default)]
pub struct AttributeUpdate {
    /// New CAD parameter name; external attributes are renamed to match.
    pub parameter_name: Option<String>,
    /// Flag the attribute as CAD-sourced.
    pub mark_external: bool,
}

// ============================================================================
// STORAGE TRAIT
// ============================================================================

/// Persistence and query layer for catalog records.
pub trait CatalogStorage: Send + Sync {
    // === Component Operations ===

    /// Insert a new component. Fails with `DuplicateKey` when another
    /// component already holds the same `(external_id, configuration_name,
    /// tenant)` key.
    fn component_insert(&self, c: &Component) -> CadlinkResult<()>;

    /// Get a component by ID.
    fn component_get(&self, id: ComponentId) -> CadlinkResult<Option<Component>>;

    /// Find the component holding an idempotency key, preferring records
    /// owned by the scope's tenant over shared ones.
    fn component_find_by_key(
        &self,
        scope: &TenantScope,
        external_id: &str,
        configuration_name: Option<&str>,
    ) -> CadlinkResult<Option<Component>>;

    /// First visible component with `external_id`, in `(name, id)` order,
    /// regardless of configuration.
    fn component_find_by_external_id(
        &self,
        scope: &TenantScope,
        external_id: &str,
    ) -> CadlinkResult<Option<Component>>;

    /// Apply an update and return the stored result.
    fn component_update(&self, id: ComponentId, update: ComponentUpdate)
        -> CadlinkResult<Component>;

    /// Direct children of a component in `(name, id)` order.
    fn component_children(&self, id: ComponentId) -> CadlinkResult<Vec<Component>>;

    /// All components visible to the scope in `(name, id)` order.
    fn component_list(&self, scope: &TenantScope) -> CadlinkResult<Vec<Component>>;

    // === Family Operations ===

    fn family_insert(&self, f: &ProductFamily) -> CadlinkResult<()>;

    fn family_get(&self, id: FamilyId) -> CadlinkResult<Option<ProductFamily>>;

    fn family_update(&self, id: FamilyId, update: FamilyUpdate) -> CadlinkResult<ProductFamily>;

    // === Attribute Operations ===

    fn attribute_insert(&self, a: &ConfigAttribute) -> CadlinkResult<()>;

    fn attribute_get(&self, id: AttributeId) -> CadlinkResult<Option<ConfigAttribute>>;

    /// Find a CAD-sourced attribute by its parameter name. Manually
    /// maintained attributes are never returned.
    fn attribute_find_external(
        &self,
        scope: &TenantScope,
        parameter_name: &str,
    ) -> CadlinkResult<Option<ConfigAttribute>>;

    fn attribute_update(
        &self,
        id: AttributeId,
        update: AttributeUpdate,
    ) -> CadlinkResult<ConfigAttribute>;

    // === Attribute Value Operations ===

    fn attribute_value_insert(&self, v: &AttributeValue) -> CadlinkResult<()>;

    fn attribute_value_get(&self, id: AttributeValueId) -> CadlinkResult<Option<AttributeValue>>;

    fn attribute_value_find(
        &self,
        scope: &TenantScope,
        attribute_id: AttributeId,
        name: &str,
    ) -> CadlinkResult<Option<AttributeValue>>;

    // === Variant Operations ===

    fn variant_insert(&self, v: &Variant) -> CadlinkResult<()>;

    fn variant_get(&self, id: VariantId) -> CadlinkResult<Option<Variant>>;

    /// Visible variants of a family in creation order.
    fn variant_list_by_family(
        &self,
        scope: &TenantScope,
        family_id: FamilyId,
    ) -> CadlinkResult<Vec<Variant>>;

    // === BOM Operations ===

    fn bom_insert(&self, b: &Bom) -> CadlinkResult<()>;

    fn bom_get(&self, id: BomId) -> CadlinkResult<Option<Bom>>;

    /// Visible BOM headers of a family in creation order.
    fn bom_list_by_family(&self, scope: &TenantScope, family_id: FamilyId)
        -> CadlinkResult<Vec<Bom>>;

    // === Transactions ===

    /// Run `work` as one atomic unit: on error every write it made is
    /// discarded. The default runs `work` without isolation.
    fn atomic<T, F>(&self, work: F) -> CadlinkResult<T>
    where
        F: FnOnce() -> CadlinkResult<T>,
        Self: Sized,
    {
        work()
    }
}
