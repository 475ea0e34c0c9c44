//! Property-Based Tests for the In-Memory Catalog
//!
//! **Property 1: Component Key Uniqueness**
//!
//! For any sequence of component inserts, at most one component SHALL exist
//! per `(external_id, configuration_name, tenant)` key.
//!
//! **Property 2: Tenant Visibility**
//!
//! A record SHALL be visible to a scope iff it is shared or owned by the
//! scope's tenant.
//!
//! **Property 3: Transaction Rollback**
//!
//! A failed `atomic` block SHALL leave no trace in the catalog.

use cadlink_core::{
    CadlinkError, CadlinkResult, Component, ComponentPayload, ConfigAttribute, EntityIdType,
    ErrorKind, ProductFamily, TenantId, TenantScope, VariantId,
};
use cadlink_storage::{CatalogStorage, InMemoryCatalog};
use proptest::prelude::*;
use std::collections::HashSet;

// ============================================================================
// PROPERTY TEST STRATEGIES
// ============================================================================

/// Strategy for component keys drawn from a small pool so collisions happen.
fn key_strategy() -> impl Strategy<Value = (String, Option<String>)> {
    (
        prop::sample::select(vec!["P-1", "P-2", "P-3"]),
        prop::option::of(prop::sample::select(vec!["A", "B"])),
    )
        .prop_map(|(ext, cfg)| (ext.to_string(), cfg.map(str::to_string)))
}

fn parameter_strategy() -> impl Strategy<Value = String> {
    "[A-Z][a-z]{2,10}"
}

fn component(
    family: &ProductFamily,
    tenant: Option<TenantId>,
    external_id: &str,
    configuration_name: Option<&str>,
) -> Result<Component, TestCaseError> {
    let spec = ComponentPayload {
        external_id: Some(external_id.to_string()),
        configuration_name: configuration_name.map(str::to_string),
        name: Some(format!("{} part", external_id)),
        component_kind: Some("part".to_string()),
        version_identifier: Some("V1".to_string()),
        last_modified: Some("2024-01-01T00:00:00Z".to_string()),
        ..Default::default()
    }
    .validate()
    .map_err(|e| TestCaseError::fail(format!("Invalid payload: {}", e)))?;
    Ok(Component::from_spec(
        &spec,
        family.family_id,
        VariantId::now_v7(),
        tenant,
    ))
}

// ============================================================================
// PROPERTY TESTS
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// **Property 1: Component Key Uniqueness**
    ///
    /// Inserting the same key twice SHALL fail with `DuplicateKey` and the
    /// stored count SHALL equal the number of distinct keys.
    #[test]
    fn prop_component_key_uniqueness(keys in prop::collection::vec(key_strategy(), 1..20)) {
        let storage = InMemoryCatalog::new();
        let tenant = TenantId::now_v7();
        let family = ProductFamily::new("Family", Some(tenant));
        storage.family_insert(&family)
            .map_err(|e| TestCaseError::fail(e.to_string()))?;

        let mut seen = HashSet::new();
        for (ext, cfg) in &keys {
            let c = component(&family, Some(tenant), ext, cfg.as_deref())?;
            let result = storage.component_insert(&c);
            if seen.insert((ext.clone(), cfg.clone())) {
                prop_assert!(result.is_ok());
            } else {
                prop_assert_eq!(result.map_err(|e| e.kind()), Err(ErrorKind::DuplicateKey));
            }
        }

        prop_assert_eq!(storage.component_count().map_err(|e| TestCaseError::fail(e.to_string()))?, seen.len());
    }

    /// **Property 2: Tenant Visibility**
    ///
    /// An attribute owned by tenant A SHALL be found by A and never by B;
    /// a shared attribute SHALL be found by both.
    #[test]
    fn prop_attribute_visibility(param in parameter_strategy(), shared in any::<bool>()) {
        let storage = InMemoryCatalog::new();
        let a = TenantScope::new(TenantId::now_v7());
        let b = TenantScope::new(TenantId::now_v7());
        let owner = if shared { None } else { Some(a.tenant_id()) };

        storage.attribute_insert(&ConfigAttribute::external(param.clone(), owner))
            .map_err(|e| TestCaseError::fail(e.to_string()))?;

        let seen_by_a = storage.attribute_find_external(&a, &param)
            .map_err(|e| TestCaseError::fail(e.to_string()))?;
        let seen_by_b = storage.attribute_find_external(&b, &param)
            .map_err(|e| TestCaseError::fail(e.to_string()))?;

        prop_assert!(seen_by_a.is_some());
        prop_assert_eq!(seen_by_b.is_some(), shared);
    }

    /// **Property 3: Transaction Rollback**
    ///
    /// Whatever a failing block inserted SHALL be gone afterwards, and the
    /// records that existed before SHALL still be there.
    #[test]
    fn prop_failed_atomic_leaves_no_trace(
        before in 0usize..5,
        inside in 1usize..5,
    ) {
        let storage = InMemoryCatalog::new();
        for i in 0..before {
            storage.family_insert(&ProductFamily::new(format!("Kept {}", i), None))
                .map_err(|e| TestCaseError::fail(e.to_string()))?;
        }

        let result: CadlinkResult<()> = storage.atomic(|| {
            for i in 0..inside {
                storage.family_insert(&ProductFamily::new(format!("Doomed {}", i), None))?;
            }
            Err(CadlinkError::invalid("quantity", "forced failure"))
        });

        prop_assert!(result.is_err());
        prop_assert_eq!(
            storage.family_count().map_err(|e| TestCaseError::fail(e.to_string()))?,
            before
        );
    }
}
