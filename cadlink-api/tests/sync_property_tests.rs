//! Property-Based Tests for the HTTP Sync Surface
//!
//! **Property 1: Idempotent Submission**
//!
//! For any valid component payload, submitting it any number of times
//! through `POST /cad_api/component` SHALL answer with the same component id
//! and leave exactly one stored component.
//!
//! **Property 2: Envelope Shape**
//!
//! Every answer, success or failure, SHALL decode as a sync response whose
//! `success` flag agrees with the HTTP status and which carries exactly one
//! of `id` or `error`.

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use cadlink_api::{create_api_router, generate_jwt_token, AppState, AuthConfig, SyncResponse};
use cadlink_core::ComponentPayload;
use cadlink_test_utils::{
    fixtures::{self, Catalog},
    generators::{arb_bom_line, arb_external_id, arb_payload},
};
use proptest::prelude::*;
use tower::ServiceExt;

// ============================================================================
// TEST HELPERS
// ============================================================================

const API_KEY: &str = "property_service_key";

fn test_auth_config() -> AuthConfig {
    let mut config = AuthConfig::default()
        .with_jwt_secret("property_test_secret_with_enough_entropy")
        .unwrap();
    config.add_api_key(API_KEY.to_string());
    config
}

fn test_app(catalog: &Catalog) -> Router {
    let state = AppState::new(catalog.reconciler.clone(), catalog.bom_builder.clone());
    create_api_router(state, test_auth_config())
}

async fn post_component(app: Router, token: &str, payload: &ComponentPayload) -> (StatusCode, SyncResponse) {
    let request = Request::builder()
        .method("POST")
        .uri("/cad_api/component")
        .header("content-type", "application/json")
        .header("authorization", format!("Bearer {}", token))
        .body(Body::from(serde_json::to_vec(payload).unwrap()))
        .unwrap();
    decode(app.oneshot(request).await.unwrap()).await
}

async fn post_bom(app: Router, catalog: &Catalog, body: serde_json::Value) -> (StatusCode, SyncResponse) {
    let request = Request::builder()
        .method("POST")
        .uri("/cad_api/bom")
        .header("content-type", "application/json")
        .header("x-api-key", API_KEY)
        .header("x-tenant-id", catalog.scope.tenant_id().to_string())
        .body(Body::from(body.to_string()))
        .unwrap();
    decode(app.oneshot(request).await.unwrap()).await
}

async fn decode(response: axum::response::Response) -> (StatusCode, SyncResponse) {
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

fn assert_envelope(status: StatusCode, body: &SyncResponse) {
    assert_eq!(body.success, status.is_success(), "status {} vs {:?}", status, body);
    assert_ne!(body.id.is_some(), body.error.is_some(), "{:?}", body);
}

// ============================================================================
// PROPERTY TESTS
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// **Property 1: Idempotent Submission**
    #[test]
    fn prop_component_submission_is_idempotent(
        payload in arb_payload(),
        repeats in 2usize..4,
    ) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let catalog = fixtures::catalog();
            let token = generate_jwt_token(
                &test_auth_config(),
                "designer".to_string(),
                Some(catalog.scope.tenant_id()),
                vec![],
            )
            .unwrap();

            let mut ids = Vec::new();
            for _ in 0..repeats {
                let (status, body) = post_component(test_app(&catalog), &token, &payload).await;
                assert_envelope(status, &body);
                prop_assert_eq!(status, StatusCode::OK);
                ids.push(body.id);
            }

            prop_assert!(ids.windows(2).all(|w| w[0] == w[1]));
            prop_assert_eq!(catalog.storage.component_count().unwrap(), 1);
            Ok(())
        })?;
    }

    /// **Property 2: Envelope Shape** for arbitrary BOM submissions.
    #[test]
    fn prop_bom_answers_with_envelope(
        parent in arb_external_id(),
        create_parent in any::<bool>(),
        lines in prop::collection::vec(arb_bom_line(), 0..5),
    ) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let catalog = fixtures::catalog();
            if create_parent {
                catalog
                    .reconciler
                    .upsert(&catalog.scope, &fixtures::assembly_payload(&parent, &[]))
                    .unwrap();
            }

            let body = serde_json::json!({ "parent_id": parent, "components": lines });
            let (status, response) = post_bom(test_app(&catalog), &catalog, body).await;
            assert_envelope(status, &response);

            if create_parent {
                prop_assert_eq!(status, StatusCode::OK);
                prop_assert_eq!(catalog.storage.bom_count().unwrap(), 1);
            } else {
                prop_assert_eq!(status, StatusCode::NOT_FOUND);
                prop_assert_eq!(catalog.storage.bom_count().unwrap(), 0);
            }
            Ok(())
        })?;
    }

    /// Requests without credentials never reach the catalog.
    #[test]
    fn prop_unauthenticated_requests_write_nothing(payload in arb_payload()) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let catalog = fixtures::catalog();
            let request = Request::builder()
                .method("POST")
                .uri("/cad_api/component")
                .header("content-type", "application/json")
                .body(Body::from(serde_json::to_vec(&payload).unwrap()))
                .unwrap();

            let (status, body) = decode(test_app(&catalog).oneshot(request).await.unwrap()).await;
            assert_envelope(status, &body);
            prop_assert_eq!(status, StatusCode::UNAUTHORIZED);
            prop_assert_eq!(catalog.storage.component_count().unwrap(), 0);
            Ok(())
        })?;
    }
}
