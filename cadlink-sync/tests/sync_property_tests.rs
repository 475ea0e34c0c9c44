//! Property-Based Tests for Component Reconciliation and BOM Construction
//!
//! **Property 1: Idempotent Upsert**
//!
//! For any sequence of payloads sharing one key, the catalog SHALL hold
//! exactly one component carrying the last payload's fields.
//!
//! **Property 2: Configuration Fan-Out**
//!
//! For any configuration map, the family SHALL carry one external attribute
//! line per parameter and the variant SHALL carry one value per parameter.
//!
//! **Property 3: Missing Children Are Skipped**
//!
//! For any mix of known and unknown children, the BOM SHALL contain exactly
//! the lines whose child is known, in request order.
//!
//! **Property 4: Configurations Share Their Part's Family**
//!
//! For any set of configurations of one external id, every component SHALL
//! land in a single family, with one variant per distinct value set.

use cadlink_core::{
    BomLineInput, ComponentPayload, EntityIdType, TenantId, TenantScope,
};
use cadlink_storage::{CatalogStorage, InMemoryCatalog, InMemorySettings};
use cadlink_sync::{BomBuilder, Reconciler};
use proptest::prelude::*;
use std::collections::BTreeMap;
use std::sync::Arc;

// ============================================================================
// TEST CONFIGURATION
// ============================================================================

fn setup() -> (Reconciler<InMemoryCatalog>, Arc<InMemoryCatalog>, TenantScope) {
    let storage = Arc::new(InMemoryCatalog::new());
    let reconciler = Reconciler::new(storage.clone(), Arc::new(InMemorySettings::new()));
    (reconciler, storage, TenantScope::new(TenantId::now_v7()))
}

fn payload(external_id: &str, name: &str) -> ComponentPayload {
    ComponentPayload {
        external_id: Some(external_id.to_string()),
        name: Some(name.to_string()),
        component_kind: Some("part".to_string()),
        version_identifier: Some("V1".to_string()),
        last_modified: Some("2024-06-01T12:00:00Z".to_string()),
        ..Default::default()
    }
}

fn fail(e: impl std::fmt::Display) -> TestCaseError {
    TestCaseError::fail(e.to_string())
}

// ============================================================================
// PROPERTY TEST STRATEGIES
// ============================================================================

fn name_strategy() -> impl Strategy<Value = String> {
    "[A-Za-z][A-Za-z0-9 ]{0,30}"
}

fn configuration_strategy() -> impl Strategy<Value = BTreeMap<String, String>> {
    prop::collection::btree_map("[A-Z][a-z]{1,8}", "[0-9]{1,4}", 1..6)
}

// ============================================================================
// PROPERTY TESTS
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// **Property 1: Idempotent Upsert**
    #[test]
    fn prop_upsert_is_idempotent(names in prop::collection::vec(name_strategy(), 1..8)) {
        let (reconciler, storage, scope) = setup();

        let mut ids = Vec::new();
        for name in &names {
            let component = reconciler.upsert(&scope, &payload("FUSION_1", name)).map_err(fail)?;
            ids.push(component.component_id);
        }

        prop_assert!(ids.windows(2).all(|w| w[0] == w[1]));
        prop_assert_eq!(storage.component_count().map_err(fail)?, 1);
        prop_assert_eq!(storage.family_count().map_err(fail)?, 1);

        let stored = reconciler.find(&scope, "FUSION_1", None).map_err(fail)?;
        let last = names.last().map(|n| n.trim().to_string());
        prop_assert_eq!(stored.map(|c| c.name), last);
    }

    /// **Property 2: Configuration Fan-Out**
    #[test]
    fn prop_configuration_fan_out(configuration in configuration_strategy()) {
        let (reconciler, storage, scope) = setup();

        let encoded = serde_json::to_string(&configuration).map_err(fail)?;
        let component = reconciler
            .upsert(
                &scope,
                &ComponentPayload {
                    configuration_name: Some("Config".to_string()),
                    configuration_values: Some(serde_json::Value::String(encoded)),
                    ..payload("FUSION_2", "Configured")
                },
            )
            .map_err(fail)?;

        let family = storage
            .family_get(component.family_id)
            .map_err(fail)?
            .ok_or_else(|| fail("family missing"))?;
        prop_assert_eq!(family.attribute_lines.len(), configuration.len());

        for (parameter, value) in &configuration {
            let attribute = storage
                .attribute_find_external(&scope, parameter)
                .map_err(fail)?
                .ok_or_else(|| fail("attribute missing"))?;
            prop_assert_eq!(&attribute.name, &format!("CAD: {}", parameter));

            let line = family
                .line_for(attribute.attribute_id)
                .ok_or_else(|| fail("line missing"))?;
            prop_assert_eq!(line.value_ids.len(), 1);

            let stored = storage
                .attribute_value_get(line.value_ids[0])
                .map_err(fail)?
                .ok_or_else(|| fail("value missing"))?;
            prop_assert_eq!(&stored.name, value);
        }

        let variant = storage
            .variant_get(component.variant_id)
            .map_err(fail)?
            .ok_or_else(|| fail("variant missing"))?;
        prop_assert_eq!(variant.value_ids.len(), configuration.len());
    }

    /// **Property 3: Missing Children Are Skipped**
    #[test]
    fn prop_bom_skips_missing_children(
        children in prop::collection::vec((any::<bool>(), 1u32..100), 0..10),
    ) {
        let (reconciler, storage, scope) = setup();
        let builder = BomBuilder::new(storage.clone());
        reconciler.upsert(&scope, &payload("ASM", "Assembly")).map_err(fail)?;

        let mut lines = Vec::new();
        let mut expected = Vec::new();
        for (i, (exists, quantity)) in children.iter().enumerate() {
            let external_id = format!("CHILD_{}", i);
            if *exists {
                let child = reconciler.upsert(&scope, &payload(&external_id, "Child")).map_err(fail)?;
                expected.push((child.variant_id, f64::from(*quantity)));
            }
            lines.push(BomLineInput::new(external_id, f64::from(*quantity)));
        }

        let bom = builder.build_bom(&scope, "ASM", &lines).map_err(fail)?;
        let actual: Vec<_> = bom.lines.iter().map(|l| (l.variant_id, l.quantity)).collect();
        prop_assert_eq!(actual, expected);
    }

    /// **Property 4: Configurations Share Their Part's Family**
    #[test]
    fn prop_configurations_share_family(
        lengths in prop::collection::btree_set("[0-9]{1,4}", 1..6),
    ) {
        let (reconciler, storage, scope) = setup();

        let mut families = Vec::new();
        let mut variants = Vec::new();
        for (i, length) in lengths.iter().enumerate() {
            let component = reconciler
                .upsert(
                    &scope,
                    &ComponentPayload {
                        configuration_name: Some(format!("Config{}", i)),
                        configuration_values: Some(serde_json::json!({ "Length": length })),
                        ..payload("FUSION_456", "Configured")
                    },
                )
                .map_err(fail)?;
            families.push(component.family_id);
            variants.push(component.variant_id);
        }

        prop_assert!(families.windows(2).all(|w| w[0] == w[1]));
        prop_assert_eq!(storage.family_count().map_err(fail)?, 1);
        variants.sort();
        variants.dedup();
        prop_assert_eq!(variants.len(), lengths.len());
        prop_assert_eq!(storage.component_count().map_err(fail)?, lengths.len());
    }
}
