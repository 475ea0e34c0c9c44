//! In-memory catalog store.
//!
//! Backs the tests and the standalone API server. All tables live behind a
//! single lock so a transaction can snapshot and restore them as a unit.
//!
//! Every `atomic` call clones the whole catalog, so a transaction costs time
//! and memory proportional to the catalog size. Persistent deployments need
//! a [`CatalogStorage`] backed by a database transaction instead.

use crate::{AttributeUpdate, CatalogStorage, ComponentUpdate, FamilyUpdate};
use cadlink_core::{
    AttributeId, AttributeValue, AttributeValueId, Bom, BomId, CadlinkError, CadlinkResult,
    Component, ComponentId, ComponentKey, ConfigAttribute, EntityIdType, EntityType, FamilyId,
    ProductFamily, StorageError, TenantScope, Variant, VariantId,
};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Debug, Clone, Default)]
struct CatalogTables {
    components: HashMap<ComponentId, Component>,
    component_keys: HashMap<ComponentKey, ComponentId>,
    families: HashMap<FamilyId, ProductFamily>,
    attributes: HashMap<AttributeId, ConfigAttribute>,
    values: HashMap<AttributeValueId, AttributeValue>,
    variants: HashMap<VariantId, Variant>,
    boms: HashMap<BomId, Bom>,
}

/// In-memory [`CatalogStorage`] with component key uniqueness and
/// snapshot-based transactions.
#[derive(Debug, Default)]
pub struct InMemoryCatalog {
    tables: RwLock<CatalogTables>,
    /// Serializes `atomic` blocks.
    tx: Mutex<()>,
}

impl InMemoryCatalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> CadlinkResult<RwLockReadGuard<'_, CatalogTables>> {
        self.tables
            .read()
            .map_err(|_| CadlinkError::Storage(StorageError::LockPoisoned))
    }

    fn write(&self) -> CadlinkResult<RwLockWriteGuard<'_, CatalogTables>> {
        self.tables
            .write()
            .map_err(|_| CadlinkError::Storage(StorageError::LockPoisoned))
    }

    /// Clear all stored data.
    pub fn clear(&self) -> CadlinkResult<()> {
        *self.write()? = CatalogTables::default();
        Ok(())
    }

    pub fn component_count(&self) -> CadlinkResult<usize> {
        Ok(self.read()?.components.len())
    }

    pub fn family_count(&self) -> CadlinkResult<usize> {
        Ok(self.read()?.families.len())
    }

    pub fn attribute_count(&self) -> CadlinkResult<usize> {
        Ok(self.read()?.attributes.len())
    }

    pub fn attribute_value_count(&self) -> CadlinkResult<usize> {
        Ok(self.read()?.values.len())
    }

    pub fn variant_count(&self) -> CadlinkResult<usize> {
        Ok(self.read()?.variants.len())
    }

    pub fn bom_count(&self) -> CadlinkResult<usize> {
        Ok(self.read()?.boms.len())
    }
}

fn not_found(entity_type: EntityType, id: impl EntityIdType) -> CadlinkError {
    CadlinkError::Storage(StorageError::NotFound {
        entity_type,
        id: id.as_uuid(),
    })
}

fn duplicate(entity_type: EntityType, key: impl ToString) -> CadlinkError {
    CadlinkError::Storage(StorageError::DuplicateKey {
        entity_type,
        key: key.to_string(),
    })
}

fn sorted_by_name(mut components: Vec<Component>) -> Vec<Component> {
    components.sort_by(|a, b| {
        a.name
            .cmp(&b.name)
            .then_with(|| a.component_id.cmp(&b.component_id))
    });
    components
}

impl CatalogStorage for InMemoryCatalog {
    // === Component Operations ===

    fn component_insert(&self, c: &Component) -> CadlinkResult<()> {
        let mut tables = self.write()?;
        if tables.components.contains_key(&c.component_id) {
            return Err(duplicate(EntityType::Component, c.component_id));
        }
        let key = c.key();
        if tables.component_keys.contains_key(&key) {
            return Err(duplicate(EntityType::Component, key));
        }
        tables.component_keys.insert(key, c.component_id);
        tables.components.insert(c.component_id, c.clone());
        Ok(())
    }

    fn component_get(&self, id: ComponentId) -> CadlinkResult<Option<Component>> {
        Ok(self.read()?.components.get(&id).cloned())
    }

    fn component_find_by_key(
        &self,
        scope: &TenantScope,
        external_id: &str,
        configuration_name: Option<&str>,
    ) -> CadlinkResult<Option<Component>> {
        let tables = self.read()?;
        let owned = ComponentKey::new(
            external_id,
            configuration_name.map(str::to_string),
            Some(scope.tenant_id()),
        );
        let shared = ComponentKey {
            tenant_id: None,
            ..owned.clone()
        };
        Ok([owned, shared]
            .iter()
            .filter_map(|key| tables.component_keys.get(key))
            .filter_map(|id| tables.components.get(id))
            .next()
            .cloned())
    }

    fn component_find_by_external_id(
        &self,
        scope: &TenantScope,
        external_id: &str,
    ) -> CadlinkResult<Option<Component>> {
        let tables = self.read()?;
        let matches = tables
            .components
            .values()
            .filter(|c| c.external_id == external_id && scope.can_see(c.tenant_id))
            .cloned()
            .collect();
        Ok(sorted_by_name(matches).into_iter().next())
    }

    fn component_update(
        &self,
        id: ComponentId,
        update: ComponentUpdate,
    ) -> CadlinkResult<Component> {
        let mut tables = self.write()?;
        let component = tables
            .components
            .get_mut(&id)
            .ok_or_else(|| not_found(EntityType::Component, id))?;

        if let Some(name) = update.name {
            component.name = name;
        }
        if let Some(kind) = update.kind {
            component.kind = kind;
        }
        if let Some(version) = update.version {
            component.version = version;
        }
        if let Some(version_identifier) = update.version_identifier {
            component.version_identifier = version_identifier;
        }
        if let Some(last_modified) = update.last_modified {
            component.last_modified = last_modified;
        }
        if let Some(configuration_values) = update.configuration_values {
            component.configuration_values = configuration_values;
        }
        if let Some(parent_id) = update.parent_id {
            component.parent_id = parent_id;
        }
        if let Some(active) = update.active {
            component.active = active;
        }
        component.updated_at = Utc::now();

        Ok(component.clone())
    }

    fn component_children(&self, id: ComponentId) -> CadlinkResult<Vec<Component>> {
        let tables = self.read()?;
        let children = tables
            .components
            .values()
            .filter(|c| c.parent_id == Some(id))
            .cloned()
            .collect();
        Ok(sorted_by_name(children))
    }

    fn component_list(&self, scope: &TenantScope) -> CadlinkResult<Vec<Component>> {
        let tables = self.read()?;
        let visible = tables
            .components
            .values()
            .filter(|c| scope.can_see(c.tenant_id))
            .cloned()
            .collect();
        Ok(sorted_by_name(visible))
    }

    // === Family Operations ===

    fn family_insert(&self, f: &ProductFamily) -> CadlinkResult<()> {
        let mut tables = self.write()?;
        if tables.families.contains_key(&f.family_id) {
            return Err(duplicate(EntityType::Family, f.family_id));
        }
        tables.families.insert(f.family_id, f.clone());
        Ok(())
    }

    fn family_get(&self, id: FamilyId) -> CadlinkResult<Option<ProductFamily>> {
        Ok(self.read()?.families.get(&id).cloned())
    }

    fn family_update(&self, id: FamilyId, update: FamilyUpdate) -> CadlinkResult<ProductFamily> {
        let mut tables = self.write()?;
        let family = tables
            .families
            .get_mut(&id)
            .ok_or_else(|| not_found(EntityType::Family, id))?;

        if let Some(name) = update.name {
            family.name = name;
        }
        if let Some(lines) = update.attribute_lines {
            family.attribute_lines = lines;
        }

        Ok(family.clone())
    }

    // === Attribute Operations ===

    fn attribute_insert(&self, a: &ConfigAttribute) -> CadlinkResult<()> {
        let mut tables = self.write()?;
        if tables.attributes.contains_key(&a.attribute_id) {
            return Err(duplicate(EntityType::Attribute, a.attribute_id));
        }
        tables.attributes.insert(a.attribute_id, a.clone());
        Ok(())
    }

    fn attribute_get(&self, id: AttributeId) -> CadlinkResult<Option<ConfigAttribute>> {
        Ok(self.read()?.attributes.get(&id).cloned())
    }

    fn attribute_find_external(
        &self,
        scope: &TenantScope,
        parameter_name: &str,
    ) -> CadlinkResult<Option<ConfigAttribute>> {
        let tables = self.read()?;
        Ok(tables
            .attributes
            .values()
            .filter(|a| {
                a.is_external
                    && a.parameter_name.as_deref() == Some(parameter_name)
                    && scope.can_see(a.tenant_id)
            })
            .min_by_key(|a| (a.tenant_id.is_none(), a.attribute_id))
            .cloned())
    }

    fn attribute_update(
        &self,
        id: AttributeId,
        update: AttributeUpdate,
    ) -> CadlinkResult<ConfigAttribute> {
        let mut tables = self.write()?;
        let attribute = tables
            .attributes
            .get_mut(&id)
            .ok_or_else(|| not_found(EntityType::Attribute, id))?;

        if let Some(parameter_name) = update.parameter_name {
            attribute.rename_parameter(parameter_name);
        }
        if update.mark_external {
            attribute.mark_external();
        }

        Ok(attribute.clone())
    }

    // === Attribute Value Operations ===

    fn attribute_value_insert(&self, v: &AttributeValue) -> CadlinkResult<()> {
        let mut tables = self.write()?;
        if !tables.attributes.contains_key(&v.attribute_id) {
            return Err(not_found(EntityType::Attribute, v.attribute_id));
        }
        if tables.values.contains_key(&v.value_id) {
            return Err(duplicate(EntityType::AttributeValue, v.value_id));
        }
        tables.values.insert(v.value_id, v.clone());
        Ok(())
    }

    fn attribute_value_get(&self, id: AttributeValueId) -> CadlinkResult<Option<AttributeValue>> {
        Ok(self.read()?.values.get(&id).cloned())
    }

    fn attribute_value_find(
        &self,
        scope: &TenantScope,
        attribute_id: AttributeId,
        name: &str,
    ) -> CadlinkResult<Option<AttributeValue>> {
        let tables = self.read()?;
        Ok(tables
            .values
            .values()
            .filter(|v| {
                v.attribute_id == attribute_id && v.name == name && scope.can_see(v.tenant_id)
            })
            .min_by_key(|v| (v.tenant_id.is_none(), v.value_id))
            .cloned())
    }

    // === Variant Operations ===

    fn variant_insert(&self, v: &Variant) -> CadlinkResult<()> {
        let mut tables = self.write()?;
        if !tables.families.contains_key(&v.family_id) {
            return Err(not_found(EntityType::Family, v.family_id));
        }
        if tables.variants.contains_key(&v.variant_id) {
            return Err(duplicate(EntityType::Variant, v.variant_id));
        }
        tables.variants.insert(v.variant_id, v.clone());
        Ok(())
    }

    fn variant_get(&self, id: VariantId) -> CadlinkResult<Option<Variant>> {
        Ok(self.read()?.variants.get(&id).cloned())
    }

    fn variant_list_by_family(
        &self,
        scope: &TenantScope,
        family_id: FamilyId,
    ) -> CadlinkResult<Vec<Variant>> {
        let tables = self.read()?;
        let mut variants: Vec<Variant> = tables
            .variants
            .values()
            .filter(|v| v.family_id == family_id && scope.can_see(v.tenant_id))
            .cloned()
            .collect();
        variants.sort_by_key(|v| v.variant_id);
        Ok(variants)
    }

    // === BOM Operations ===

    fn bom_insert(&self, b: &Bom) -> CadlinkResult<()> {
        let mut tables = self.write()?;
        if !tables.families.contains_key(&b.family_id) {
            return Err(not_found(EntityType::Family, b.family_id));
        }
        if tables.boms.contains_key(&b.bom_id) {
            return Err(duplicate(EntityType::Bom, b.bom_id));
        }
        tables.boms.insert(b.bom_id, b.clone());
        Ok(())
    }

    fn bom_get(&self, id: BomId) -> CadlinkResult<Option<Bom>> {
        Ok(self.read()?.boms.get(&id).cloned())
    }

    fn bom_list_by_family(
        &self,
        scope: &TenantScope,
        family_id: FamilyId,
    ) -> CadlinkResult<Vec<Bom>> {
        let tables = self.read()?;
        let mut boms: Vec<Bom> = tables
            .boms
            .values()
            .filter(|b| b.family_id == family_id && scope.can_see(b.tenant_id))
            .cloned()
            .collect();
        boms.sort_by_key(|b| b.bom_id);
        Ok(boms)
    }

    // === Transactions ===

    fn atomic<T, F>(&self, work: F) -> CadlinkResult<T>
    where
        F: FnOnce() -> CadlinkResult<T>,
    {
        // The guard protects no data, so a poisoned lock is safe to reuse.
        let _serial = self.tx.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let snapshot = self.read()?.clone();
        match work() {
            Ok(value) => Ok(value),
            Err(err) => {
                *self.write()? = snapshot;
                tracing::debug!(error = %err, "Rolled back catalog transaction");
                Err(err)
            }
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
