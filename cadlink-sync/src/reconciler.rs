//! Component reconciliation.
//!
//! Turns a design-tool component description into catalog records: the
//! component itself, its product family, the configuration attributes and
//! values it references and the variant matching its configuration. Every
//! public operation runs inside one storage transaction; audit events are
//! only published once that transaction has committed.

use cadlink_core::{
    normalize_combination, AttributeValue, AttributeValueId, AuditAction, AuditSink, CadlinkError,
    CadlinkResult, Component, ComponentEvent, ComponentId, ComponentPayload, ComponentSpec,
    ConfigAttribute, ConfigurationValues, EntityIdType, EntityType, FamilyId, ProductFamily,
    StorageError, SyncConfig, TenantScope, ValidationError, Variant, VariantStrategy,
    DEFAULT_CATEGORY_KEY, DEFAULT_LOCATION_KEY,
};
use cadlink_storage::{
    CatalogStorage, CombinationGenerator, ComponentUpdate, FamilyUpdate,
    FirstUngeneratedCombination, SettingsStore,
};
use std::collections::HashSet;
use std::sync::Arc;

/// Events collected during a transaction, published after commit.
type PendingEvents = Vec<ComponentEvent>;

/// Reconciles design-tool components into the product catalog.
pub struct Reconciler<S: CatalogStorage> {
    storage: Arc<S>,
    settings: Arc<dyn SettingsStore>,
    combinations: Arc<dyn CombinationGenerator>,
    audit: Option<Arc<dyn AuditSink>>,
    config: SyncConfig,
}

impl<S: CatalogStorage> Reconciler<S> {
    pub fn new(storage: Arc<S>, settings: Arc<dyn SettingsStore>) -> Self {
        Self {
            storage,
            settings,
            combinations: Arc::new(FirstUngeneratedCombination),
            audit: None,
            config: SyncConfig::default(),
        }
    }

    pub fn with_config(mut self, config: SyncConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_audit_sink(mut self, sink: Arc<dyn AuditSink>) -> Self {
        self.audit = Some(sink);
        self
    }

    pub fn with_combination_generator(mut self, generator: Arc<dyn CombinationGenerator>) -> Self {
        self.combinations = generator;
        self
    }

    pub fn storage(&self) -> &Arc<S> {
        &self.storage
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    // ========================================================================
    // COMPONENT UPSERT
    // ========================================================================

    /// Create the component keyed by `(external_id, configuration_name,
    /// tenant)` or, when it already exists, rewrite it from `payload`.
    ///
    /// Rewriting never re-resolves the family or variant of an existing
    /// component.
    pub fn upsert(
        &self,
        scope: &TenantScope,
        payload: &ComponentPayload,
    ) -> CadlinkResult<Component> {
        let spec = payload.validate()?;
        let mut events = PendingEvents::new();
        let component = self.storage.atomic(|| {
            let existing = self.storage.component_find_by_key(
                scope,
                &spec.external_id,
                spec.configuration_name.as_deref(),
            )?;
            match existing {
                Some(existing) => self.write_existing(scope, existing, &spec, &mut events),
                None => self.create_new(scope, &spec, &mut events),
            }
        })?;
        self.publish(events);
        Ok(component)
    }

    /// Create a component without looking for an existing one.
    ///
    /// Fails with `DuplicateKey` when the key is already taken.
    pub fn create(
        &self,
        scope: &TenantScope,
        payload: &ComponentPayload,
    ) -> CadlinkResult<Component> {
        let spec = payload.validate()?;
        let mut events = PendingEvents::new();
        let component = self
            .storage
            .atomic(|| self.create_new(scope, &spec, &mut events))?;
        self.publish(events);
        Ok(component)
    }

    /// Component holding the given key, if visible to `scope`.
    pub fn find(
        &self,
        scope: &TenantScope,
        external_id: &str,
        configuration_name: Option<&str>,
    ) -> CadlinkResult<Option<Component>> {
        self.storage
            .component_find_by_key(scope, external_id, configuration_name)
    }

    /// Soft-deactivate a component; the record is kept.
    pub fn deactivate(
        &self,
        scope: &TenantScope,
        external_id: &str,
        configuration_name: Option<&str>,
    ) -> CadlinkResult<Component> {
        let mut events = PendingEvents::new();
        let component = self.storage.atomic(|| {
            let existing = self
                .storage
                .component_find_by_key(scope, external_id, configuration_name)?
                .ok_or_else(|| {
                    CadlinkError::invalid(
                        "external_id",
                        format!("component '{}' not found", external_id),
                    )
                })?;
            let updated = self.storage.component_update(
                existing.component_id,
                ComponentUpdate {
                    active: Some(false),
                    ..Default::default()
                },
            )?;
            events.push(ComponentEvent::new(
                updated.component_id,
                updated.tenant_id,
                AuditAction::Deactivated,
                "Component deactivated",
            ));
            Ok(updated)
        })?;
        tracing::info!(
            component_id = %component.component_id,
            key = %component.key(),
            "Deactivated component"
        );
        self.publish(events);
        Ok(component)
    }

    fn write_existing(
        &self,
        scope: &TenantScope,
        existing: Component,
        spec: &ComponentSpec,
        events: &mut PendingEvents,
    ) -> CadlinkResult<Component> {
        let updated = self.storage.component_update(
            existing.component_id,
            ComponentUpdate {
                name: Some(spec.name.clone()),
                kind: Some(spec.kind),
                version: Some(spec.version.clone()),
                version_identifier: Some(spec.version_identifier.clone()),
                last_modified: Some(spec.last_modified),
                configuration_values: Some(spec.configuration_raw.clone()),
                parent_id: None,
                active: None,
            },
        )?;
        tracing::info!(
            component_id = %updated.component_id,
            key = %updated.key(),
            version = %updated.version_identifier,
            "Updated component"
        );
        events.push(ComponentEvent::new(
            updated.component_id,
            updated.tenant_id,
            AuditAction::Updated,
            format!("Component updated to {}", spec.version_identifier),
        ));
        self.attach_children(scope, &updated, &spec.children, events)?;
        Ok(updated)
    }

    fn create_new(
        &self,
        scope: &TenantScope,
        spec: &ComponentSpec,
        events: &mut PendingEvents,
    ) -> CadlinkResult<Component> {
        let family = self.family_for(scope, spec)?;
        let variant = match &spec.configuration {
            Some(configuration) => self.configured_variant(scope, family, configuration)?,
            None => self.variant_for(scope, &family, &[])?,
        };

        let component = Component::from_spec(
            spec,
            variant.family_id,
            variant.variant_id,
            Some(scope.tenant_id()),
        );
        self.storage.component_insert(&component)?;
        tracing::info!(
            component_id = %component.component_id,
            key = %component.key(),
            family_id = %component.family_id,
            variant_id = %component.variant_id,
            "Created component"
        );
        events.push(ComponentEvent::new(
            component.component_id,
            component.tenant_id,
            AuditAction::Created,
            format!("Component created from {}", spec.version_identifier),
        ));

        self.attach_children(scope, &component, &spec.children, events)?;
        Ok(component)
    }

    // ========================================================================
    // FAMILY RESOLUTION
    // ========================================================================

    fn family_for(&self, scope: &TenantScope, spec: &ComponentSpec) -> CadlinkResult<ProductFamily> {
        if let Some(family_id) = spec.family_id {
            return self.visible_family(scope, family_id);
        }

        // Configurations of one part share its family. Families are never
        // matched by name.
        if let Some(sibling) = self
            .storage
            .component_find_by_external_id(scope, &spec.external_id)?
        {
            return self.visible_family(scope, sibling.family_id);
        }

        let tenant = Some(scope.tenant_id());
        let family = ProductFamily::new(spec.name.clone(), tenant)
            .with_inventory_location(self.settings.get(DEFAULT_LOCATION_KEY, tenant)?)
            .with_category(self.settings.get(DEFAULT_CATEGORY_KEY, tenant)?);
        self.storage.family_insert(&family)?;
        tracing::debug!(
            family_id = %family.family_id,
            name = %family.name,
            "Created product family"
        );
        Ok(family)
    }

    fn visible_family(&self, scope: &TenantScope, family_id: FamilyId) -> CadlinkResult<ProductFamily> {
        self.storage
            .family_get(family_id)?
            .filter(|family| scope.can_see(family.tenant_id))
            .ok_or_else(|| {
                CadlinkError::invalid(
                    "family_id",
                    format!("product family {} not found", family_id),
                )
            })
    }

    // ========================================================================
    // ATTRIBUTE MANAGEMENT
    // ========================================================================

    /// Find or create the external attribute for a CAD parameter.
    ///
    /// Manually maintained attributes are never picked up, even when their
    /// name matches.
    pub fn resolve_attribute(
        &self,
        scope: &TenantScope,
        parameter_name: &str,
    ) -> CadlinkResult<ConfigAttribute> {
        self.storage
            .atomic(|| self.attribute_for(scope, parameter_name))
    }

    /// Find or create the value `value` of `attribute`.
    pub fn resolve_attribute_value(
        &self,
        scope: &TenantScope,
        attribute: &ConfigAttribute,
        value: &str,
    ) -> CadlinkResult<AttributeValue> {
        self.storage
            .atomic(|| self.value_for(scope, attribute, value))
    }

    fn attribute_for(&self, scope: &TenantScope, parameter_name: &str) -> CadlinkResult<ConfigAttribute> {
        if parameter_name.trim().is_empty() {
            return Err(CadlinkError::required("parameter_name"));
        }
        if let Some(existing) = self.storage.attribute_find_external(scope, parameter_name)? {
            return Ok(existing);
        }

        let attribute = ConfigAttribute::external(parameter_name, Some(scope.tenant_id()));
        self.storage.attribute_insert(&attribute)?;
        tracing::debug!(
            attribute_id = %attribute.attribute_id,
            name = %attribute.name,
            "Created configuration attribute"
        );
        Ok(attribute)
    }

    fn value_for(
        &self,
        scope: &TenantScope,
        attribute: &ConfigAttribute,
        value: &str,
    ) -> CadlinkResult<AttributeValue> {
        if let Some(existing) =
            self.storage
                .attribute_value_find(scope, attribute.attribute_id, value)?
        {
            return Ok(existing);
        }

        let created = AttributeValue::new(attribute.attribute_id, value, Some(scope.tenant_id()));
        self.storage.attribute_value_insert(&created)?;
        tracing::debug!(
            value_id = %created.value_id,
            attribute = %attribute.name,
            value = %created.name,
            "Created attribute value"
        );
        Ok(created)
    }

    // ========================================================================
    // VARIANT RESOLUTION
    // ========================================================================

    /// Variant of `family_id` carrying exactly `value_ids`, created when
    /// missing. Every value must already be attached to the family.
    pub fn resolve_variant(
        &self,
        scope: &TenantScope,
        family_id: FamilyId,
        value_ids: &[AttributeValueId],
    ) -> CadlinkResult<Variant> {
        self.storage.atomic(|| {
            let family = self.visible_family(scope, family_id)?;
            if let Some(stray) = value_ids.iter().find(|id| {
                !family
                    .attribute_lines
                    .iter()
                    .any(|line| line.value_ids.contains(id))
            }) {
                return Err(CadlinkError::invalid(
                    "value_ids",
                    format!("value {} is not attached to family {}", stray, family_id),
                ));
            }
            self.variant_for(scope, &family, value_ids)
        })
    }

    /// The family's variant with an empty combination, created on first use.
    pub fn default_variant(&self, scope: &TenantScope, family_id: FamilyId) -> CadlinkResult<Variant> {
        self.resolve_variant(scope, family_id, &[])
    }

    fn configured_variant(
        &self,
        scope: &TenantScope,
        mut family: ProductFamily,
        configuration: &ConfigurationValues,
    ) -> CadlinkResult<Variant> {
        let mut value_ids = Vec::with_capacity(configuration.len());
        let mut changed = false;
        for (parameter, raw_value) in configuration.iter() {
            let attribute = self.attribute_for(scope, parameter)?;
            let value = self.value_for(scope, &attribute, raw_value)?;
            changed |= family.attach_value(attribute.attribute_id, value.value_id);
            value_ids.push(value.value_id);
        }

        if changed {
            family = self.storage.family_update(
                family.family_id,
                FamilyUpdate {
                    attribute_lines: Some(family.attribute_lines.clone()),
                    ..Default::default()
                },
            )?;
        }
        self.variant_for(scope, &family, &value_ids)
    }

    fn variant_for(
        &self,
        scope: &TenantScope,
        family: &ProductFamily,
        value_ids: &[AttributeValueId],
    ) -> CadlinkResult<Variant> {
        let existing = self
            .storage
            .variant_list_by_family(scope, family.family_id)?;
        if let Some(found) = existing.iter().find(|v| v.matches(value_ids)) {
            return Ok(found.clone());
        }

        let requested = normalize_combination(value_ids.iter().copied());
        let combination = match self.config.variant_strategy {
            VariantStrategy::ExactCombination => requested,
            VariantStrategy::FirstPossible if requested.is_empty() => requested,
            VariantStrategy::FirstPossible => {
                match self.combinations.first_possible(family, &existing) {
                    Some(generated) => {
                        if generated != requested {
                            tracing::warn!(
                                family_id = %family.family_id,
                                requested = ?requested,
                                generated = ?generated,
                                "Generated combination differs from the requested configuration"
                            );
                        }
                        generated
                    }
                    None => {
                        tracing::warn!(
                            family_id = %family.family_id,
                            "No ungenerated combination left, using the requested configuration"
                        );
                        requested
                    }
                }
            }
        };

        let variant = Variant::new(family.family_id, combination, Some(scope.tenant_id()));
        self.storage.variant_insert(&variant)?;
        tracing::debug!(
            variant_id = %variant.variant_id,
            family_id = %family.family_id,
            values = variant.value_ids.len(),
            "Created variant"
        );
        Ok(variant)
    }

    // ========================================================================
    // ASSEMBLY LINKING
    // ========================================================================

    /// Place the components with the given external ids under `parent_id`.
    ///
    /// Fails with a circular reference when a child is the parent itself or
    /// one of its ancestors, and with a validation error when a child is
    /// unknown. Nothing is linked when any child fails.
    pub fn link_children(
        &self,
        scope: &TenantScope,
        parent_id: ComponentId,
        children: &[String],
    ) -> CadlinkResult<Vec<Component>> {
        let mut events = PendingEvents::new();
        let linked = self.storage.atomic(|| {
            let parent = self.visible_component(scope, parent_id)?;
            self.attach_children(scope, &parent, children, &mut events)
        })?;
        self.publish(events);
        Ok(linked)
    }

    /// Direct children of a component, ordered by `(name, id)`.
    pub fn children_of(
        &self,
        scope: &TenantScope,
        component_id: ComponentId,
    ) -> CadlinkResult<Vec<Component>> {
        Ok(self
            .storage
            .component_children(component_id)?
            .into_iter()
            .filter(|c| scope.can_see(c.tenant_id))
            .collect())
    }

    fn visible_component(&self, scope: &TenantScope, id: ComponentId) -> CadlinkResult<Component> {
        self.storage
            .component_get(id)?
            .filter(|c| scope.can_see(c.tenant_id))
            .ok_or_else(|| {
                CadlinkError::Storage(StorageError::NotFound {
                    entity_type: EntityType::Component,
                    id: id.as_uuid(),
                })
            })
    }

    fn attach_children(
        &self,
        scope: &TenantScope,
        parent: &Component,
        children: &[String],
        events: &mut PendingEvents,
    ) -> CadlinkResult<Vec<Component>> {
        let mut linked = Vec::with_capacity(children.len());
        for external_id in children {
            let child = self
                .storage
                .component_find_by_external_id(scope, external_id)?
                .ok_or_else(|| {
                    CadlinkError::invalid(
                        "children",
                        format!("component '{}' not found", external_id),
                    )
                })?;
            self.check_ancestry(parent, &child)?;

            if child.parent_id == Some(parent.component_id) {
                linked.push(child);
                continue;
            }

            let child = self.storage.component_update(
                child.component_id,
                ComponentUpdate {
                    parent_id: Some(Some(parent.component_id)),
                    ..Default::default()
                },
            )?;
            tracing::debug!(
                parent = %parent.key(),
                child = %child.key(),
                "Linked component under assembly"
            );
            events.push(ComponentEvent::new(
                child.component_id,
                child.tenant_id,
                AuditAction::Linked,
                format!("Placed under {}", parent.external_id),
            ));
            linked.push(child);
        }
        Ok(linked)
    }

    /// Rejects `child` when it is `parent` or one of `parent`'s ancestors.
    fn check_ancestry(&self, parent: &Component, child: &Component) -> CadlinkResult<()> {
        let mut path = vec![child.component_id];
        let mut visited = HashSet::new();
        let mut cursor = Some(parent.component_id);

        while let Some(id) = cursor {
            path.push(id);
            if id == child.component_id {
                return Err(ValidationError::CircularReference {
                    entity_type: EntityType::Component,
                    ids: path.iter().map(|id| id.as_uuid()).collect(),
                }
                .into());
            }
            if !visited.insert(id) {
                break;
            }
            cursor = self.storage.component_get(id)?.and_then(|c| c.parent_id);
        }
        Ok(())
    }

    fn publish(&self, events: PendingEvents) {
        if let Some(sink) = &self.audit {
            for event in events {
                sink.record(event);
            }
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
