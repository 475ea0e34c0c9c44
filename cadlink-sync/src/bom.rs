//! Bill of materials construction from design-tool assemblies.

use cadlink_core::{
    Bom, BomLineInput, CadlinkError, CadlinkResult, FamilyId, SyncError, TenantScope,
};
use cadlink_storage::CatalogStorage;
use std::sync::Arc;

/// Builds BOMs for reconciled components, addressing them by external id.
pub struct BomBuilder<S: CatalogStorage> {
    storage: Arc<S>,
}

impl<S: CatalogStorage> BomBuilder<S> {
    pub fn new(storage: Arc<S>) -> Self {
        Self { storage }
    }

    /// Create a `normal` BOM on the family of the component `parent_external_id`.
    ///
    /// Lines whose child cannot be found are skipped. Every call creates a
    /// new BOM header; earlier ones are left in place.
    pub fn build_bom(
        &self,
        scope: &TenantScope,
        parent_external_id: &str,
        lines: &[BomLineInput],
    ) -> CadlinkResult<Bom> {
        if parent_external_id.trim().is_empty() {
            return Err(CadlinkError::required("parent_id"));
        }

        let bom = self.storage.atomic(|| {
            let parent = self
                .storage
                .component_find_by_external_id(scope, parent_external_id)?
                .ok_or_else(|| SyncError::ParentNotFound {
                    external_id: parent_external_id.to_string(),
                })?;

            if let Some(bad) = lines
                .iter()
                .find(|line| !line.quantity.is_finite() || line.quantity <= 0.0)
            {
                return Err(CadlinkError::invalid(
                    "quantity",
                    format!(
                        "quantity {} for '{}' must be a positive number",
                        bad.quantity, bad.external_id
                    ),
                ));
            }

            let mut bom = Bom::new(parent.family_id, Some(scope.tenant_id()));
            for line in lines {
                match self
                    .storage
                    .component_find_by_external_id(scope, &line.external_id)?
                {
                    Some(child) => bom.push_line(child.variant_id, line.quantity),
                    None => {
                        tracing::debug!(
                            parent = %parent_external_id,
                            child = %line.external_id,
                            "Skipping BOM line for unknown component"
                        );
                    }
                }
            }

            self.storage.bom_insert(&bom)?;
            Ok(bom)
        })?;

        tracing::info!(
            bom_id = %bom.bom_id,
            family_id = %bom.family_id,
            parent = %parent_external_id,
            lines = bom.lines.len(),
            skipped = lines.len() - bom.lines.len(),
            "Created bill of materials"
        );
        Ok(bom)
    }

    /// BOM headers of a family visible to `scope`, oldest first.
    pub fn boms_for_family(&self, scope: &TenantScope, family_id: FamilyId) -> CadlinkResult<Vec<Bom>> {
        self.storage.bom_list_by_family(scope, family_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Reconciler;
    use cadlink_core::{BomType, ComponentPayload, EntityIdType, ErrorKind, TenantId};
    use cadlink_storage::{InMemoryCatalog, InMemorySettings};

    struct Harness {
        reconciler: Reconciler<InMemoryCatalog>,
        builder: BomBuilder<InMemoryCatalog>,
        storage: Arc<InMemoryCatalog>,
        scope: TenantScope,
    }

    fn harness() -> Harness {
        let storage = Arc::new(InMemoryCatalog::new());
        Harness {
            reconciler: Reconciler::new(storage.clone(), Arc::new(InMemorySettings::new())),
            builder: BomBuilder::new(storage.clone()),
            storage,
            scope: TenantScope::new(TenantId::now_v7()),
        }
    }

    fn payload(external_id: &str, kind: &str) -> ComponentPayload {
        ComponentPayload {
            external_id: Some(external_id.to_string()),
            name: Some(format!("{} name", external_id)),
            component_kind: Some(kind.to_string()),
            version_identifier: Some("V1".to_string()),
            last_modified: Some("2024-01-01 00:00:00".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_missing_child_is_skipped() {
        let h = harness();
        let parent = h
            .reconciler
            .upsert(&h.scope, &payload("ASSEMBLY_1", "assembly"))
            .unwrap();
        let child = h
            .reconciler
            .upsert(&h.scope, &payload("CHILD_1", "component"))
            .unwrap();

        let bom = h
            .builder
            .build_bom(
                &h.scope,
                "ASSEMBLY_1",
                &[
                    BomLineInput::new("CHILD_1", 2.0),
                    BomLineInput::new("NON_EXISTENT", 1.0),
                ],
            )
            .unwrap();

        assert_eq!(bom.family_id, parent.family_id);
        assert_eq!(bom.bom_type, BomType::Normal);
        assert_eq!(bom.lines.len(), 1);
        assert_eq!(bom.lines[0].variant_id, child.variant_id);
        assert_eq!(bom.lines[0].quantity, 2.0);
        assert_eq!(h.storage.bom_get(bom.bom_id).unwrap(), Some(bom));
    }

    #[test]
    fn test_unknown_parent_creates_nothing() {
        let h = harness();
        let err = h
            .builder
            .build_bom(&h.scope, "NON_EXISTENT", &[BomLineInput::new("CHILD_1", 1.0)])
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::ParentNotFound);
        assert_eq!(err.to_string(), "Sync error: Parent component not found: NON_EXISTENT");
        assert_eq!(h.storage.bom_count().unwrap(), 0);
    }

    #[test]
    fn test_invalid_quantity_creates_nothing() {
        let h = harness();
        h.reconciler
            .upsert(&h.scope, &payload("ASSEMBLY_1", "assembly"))
            .unwrap();
        h.reconciler
            .upsert(&h.scope, &payload("CHILD_1", "component"))
            .unwrap();

        for quantity in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let err = h
                .builder
                .build_bom(
                    &h.scope,
                    "ASSEMBLY_1",
                    &[
                        BomLineInput::new("CHILD_1", 1.0),
                        BomLineInput::new("CHILD_1", quantity),
                    ],
                )
                .unwrap_err();
            assert_eq!(err.kind(), ErrorKind::ValidationFailure);
        }
        assert_eq!(h.storage.bom_count().unwrap(), 0);
    }

    #[test]
    fn test_rebuild_creates_new_header() {
        let h = harness();
        let parent = h
            .reconciler
            .upsert(&h.scope, &payload("ASSEMBLY_1", "assembly"))
            .unwrap();
        h.reconciler
            .upsert(&h.scope, &payload("CHILD_1", "component"))
            .unwrap();

        let lines = [BomLineInput::new("CHILD_1", 1.0)];
        let first = h.builder.build_bom(&h.scope, "ASSEMBLY_1", &lines).unwrap();
        let second = h.builder.build_bom(&h.scope, "ASSEMBLY_1", &lines).unwrap();
        assert_ne!(first.bom_id, second.bom_id);

        let boms = h.builder.boms_for_family(&h.scope, parent.family_id).unwrap();
        assert_eq!(boms.len(), 2);
    }

    #[test]
    fn test_empty_line_list_creates_empty_bom() {
        let h = harness();
        h.reconciler
            .upsert(&h.scope, &payload("ASSEMBLY_1", "assembly"))
            .unwrap();
        let bom = h.builder.build_bom(&h.scope, "ASSEMBLY_1", &[]).unwrap();
        assert!(bom.lines.is_empty());
    }

    #[test]
    fn test_other_tenant_cannot_address_parent() {
        let h = harness();
        h.reconciler
            .upsert(&h.scope, &payload("ASSEMBLY_1", "assembly"))
            .unwrap();

        let other = TenantScope::new(TenantId::now_v7());
        let err = h.builder.build_bom(&other, "ASSEMBLY_1", &[]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ParentNotFound);
    }

    #[test]
    fn test_blank_parent_is_validation_failure() {
        let h = harness();
        let err = h.builder.build_bom(&h.scope, "  ", &[]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValidationFailure);
    }
}
