//! CADLINK Test Utilities
//!
//! Shared test infrastructure for the CADLINK workspace:
//! - Proptest generators for payloads and identifiers
//! - Fixtures for payloads and a ready-made catalog
//! - Assertions on `CadlinkResult` error kinds

pub use cadlink_core::{
    BomLineInput, CadlinkError, CadlinkResult, Component, ComponentKind, ComponentPayload,
    EntityIdType, EntityType, ErrorKind, StorageError, TenantId, TenantScope, Timestamp,
};
pub use cadlink_storage::{InMemoryAuditLog, InMemoryCatalog, InMemorySettings};
pub use cadlink_sync::{BomBuilder, Reconciler};

use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::Arc;

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for CADLINK inputs.

    use super::*;
    use proptest::prelude::*;
    use uuid::Uuid;

    /// Generate a random UUID.
    pub fn arb_uuid() -> impl Strategy<Value = Uuid> {
        any::<[u8; 16]>().prop_map(Uuid::from_bytes)
    }

    /// Generate a random TenantId.
    pub fn arb_tenant_id() -> impl Strategy<Value = TenantId> {
        arb_uuid().prop_map(TenantId::new)
    }

    /// Generate a Timestamp between 2020 and 2030.
    pub fn arb_timestamp() -> impl Strategy<Value = Timestamp> {
        (1577836800i64..1893456000i64).prop_map(|secs| {
            chrono::DateTime::from_timestamp(secs, 0).unwrap_or_else(Utc::now)
        })
    }

    /// Generate a design-tool style external id.
    pub fn arb_external_id() -> impl Strategy<Value = String> {
        "[A-Z]{3,8}_[0-9]{1,6}"
    }

    /// Generate a component name with no surrounding whitespace.
    pub fn arb_component_name() -> impl Strategy<Value = String> {
        "[A-Za-z][A-Za-z0-9 _-]{0,30}[A-Za-z0-9]"
    }

    pub fn arb_component_kind() -> impl Strategy<Value = ComponentKind> {
        prop_oneof![Just(ComponentKind::Part), Just(ComponentKind::Assembly)]
    }

    /// Generate a CAD configuration: parameter name to value.
    pub fn arb_configuration() -> impl Strategy<Value = BTreeMap<String, String>> {
        prop::collection::btree_map("[A-Z][a-z]{1,10}", "[0-9]{1,4}(\\.[0-9]{1,2})?", 1..6)
    }

    /// Generate a valid component payload, optionally configured.
    pub fn arb_payload() -> impl Strategy<Value = ComponentPayload> {
        (
            arb_external_id(),
            arb_component_name(),
            arb_component_kind(),
            arb_timestamp(),
            prop::option::of(("[A-Z][a-z]{2,8}", arb_configuration())),
        )
            .prop_map(|(external_id, name, kind, modified, configured)| {
                let (configuration_name, configuration_values) = match configured {
                    Some((config, values)) => (
                        Some(config),
                        Some(serde_json::Value::Object(
                            values
                                .into_iter()
                                .map(|(k, v)| (k, serde_json::Value::String(v)))
                                .collect(),
                        )),
                    ),
                    None => (None, None),
                };
                ComponentPayload {
                    external_id: Some(external_id),
                    configuration_name,
                    name: Some(name),
                    component_kind: Some(kind.to_string()),
                    version_identifier: Some("V1".to_string()),
                    last_modified: Some(modified.to_rfc3339()),
                    configuration_values,
                    ..Default::default()
                }
            })
    }

    /// Generate a BOM line with a positive quantity.
    pub fn arb_bom_line() -> impl Strategy<Value = BomLineInput> {
        (arb_external_id(), 1u32..1000)
            .prop_map(|(external_id, qty)| BomLineInput::new(external_id, f64::from(qty)))
    }
}

// ============================================================================
// TEST FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-built fixtures for common scenarios.

    use super::*;
    use serde_json::json;

    /// Minimal valid part payload.
    pub fn part_payload(external_id: &str) -> ComponentPayload {
        ComponentPayload {
            external_id: Some(external_id.to_string()),
            name: Some(format!("Part {}", external_id)),
            component_kind: Some("part".to_string()),
            version_identifier: Some("V1".to_string()),
            last_modified: Some("2024-01-01 00:00:00".to_string()),
            ..Default::default()
        }
    }

    /// Assembly payload placing `children` under it.
    pub fn assembly_payload(external_id: &str, children: &[&str]) -> ComponentPayload {
        ComponentPayload {
            name: Some(format!("Assembly {}", external_id)),
            component_kind: Some("assembly".to_string()),
            children: children.iter().map(|c| c.to_string()).collect(),
            ..part_payload(external_id)
        }
    }

    /// Part payload carrying a `Length`/`Width` configuration.
    pub fn configured_payload(external_id: &str, configuration: &str, length: u32, width: u32) -> ComponentPayload {
        ComponentPayload {
            configuration_name: Some(configuration.to_string()),
            configuration_values: Some(json!({ "Length": length.to_string(), "Width": width.to_string() })),
            ..part_payload(external_id)
        }
    }

    /// Everything a test needs to drive the sync layer against one tenant.
    pub struct Catalog {
        pub storage: Arc<InMemoryCatalog>,
        pub settings: Arc<InMemorySettings>,
        pub audit: Arc<InMemoryAuditLog>,
        pub reconciler: Arc<Reconciler<InMemoryCatalog>>,
        pub bom_builder: Arc<BomBuilder<InMemoryCatalog>>,
        pub scope: TenantScope,
    }

    /// Empty catalog wired with default settings and an audit log.
    pub fn catalog() -> Catalog {
        let storage = Arc::new(InMemoryCatalog::new());
        let settings = Arc::new(InMemorySettings::new());
        let audit = Arc::new(InMemoryAuditLog::new());
        let reconciler = Reconciler::new(storage.clone(), settings.clone())
            .with_audit_sink(audit.clone());
        Catalog {
            bom_builder: Arc::new(BomBuilder::new(storage.clone())),
            reconciler: Arc::new(reconciler),
            storage,
            settings,
            audit,
            scope: TenantScope::new(TenantId::now_v7()),
        }
    }
}

// ============================================================================
// CUSTOM ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Assertions for CADLINK results.

    use super::*;

    /// Assert that a CadlinkResult is Ok.
    #[track_caller]
    pub fn assert_ok<T: std::fmt::Debug>(result: &CadlinkResult<T>) {
        assert!(result.is_ok(), "Expected Ok, got Err: {:?}", result);
    }

    /// Assert that a CadlinkResult failed with the given kind.
    #[track_caller]
    pub fn assert_kind<T: std::fmt::Debug>(result: &CadlinkResult<T>, kind: ErrorKind) {
        match result {
            Err(e) => assert_eq!(e.kind(), kind, "Wrong error kind for {}", e),
            Ok(v) => panic!("Expected {:?} error, got Ok({:?})", kind, v),
        }
    }

    #[track_caller]
    pub fn assert_validation_error<T: std::fmt::Debug>(result: &CadlinkResult<T>) {
        assert_kind(result, ErrorKind::ValidationFailure);
    }

    #[track_caller]
    pub fn assert_duplicate_key<T: std::fmt::Debug>(result: &CadlinkResult<T>) {
        assert_kind(result, ErrorKind::DuplicateKey);
    }

    /// Assert that a CadlinkResult is a NotFound storage error.
    #[track_caller]
    pub fn assert_not_found<T: std::fmt::Debug>(result: &CadlinkResult<T>, entity_type: EntityType) {
        match result {
            Err(CadlinkError::Storage(StorageError::NotFound { entity_type: et, .. })) => {
                assert_eq!(*et, entity_type, "Wrong entity type in NotFound error");
            }
            other => panic!("Expected NotFound error for {:?}, got: {:?}", entity_type, other),
        }
    }

    /// Assert that a component is owned by the scope's tenant and active.
    #[track_caller]
    pub fn assert_owned_active(component: &Component, scope: &TenantScope) {
        assert_eq!(component.tenant_id, Some(scope.tenant_id()));
        assert!(component.active, "component {} is inactive", component.external_id);
    }
}

// ============================================================================
// TESTS
// ============================================================================
