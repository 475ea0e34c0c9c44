//! Component submission route.
//!
//! The design tool posts one component at a time; the handler runs the
//! reconciler's upsert on the blocking pool and answers with the id of the
//! component record.

use std::sync::Arc;

use axum::{extract::rejection::JsonRejection, extract::State, routing::post, Json, Router};
use cadlink_core::{ComponentPayload, EntityIdType};

use crate::{
    error::ApiResult,
    middleware::{session_auth_middleware, AuthExtractor, AuthMiddlewareState},
    state::{AppState, CatalogReconciler},
    types::SyncResponse,
};

// ============================================================================
// ROUTE HANDLERS
// ============================================================================

/// POST /cad_api/component - Create or update a component
#[cfg_attr(feature = "openapi", utoipa::path(
    post,
    path = "/cad_api/component",
    tag = "Components",
    request_body = ComponentPayload,
    responses(
        (status = 200, description = "Component created or updated", body = SyncResponse),
        (status = 400, description = "Invalid payload or configuration", body = SyncResponse),
        (status = 401, description = "Missing or invalid session token", body = SyncResponse),
        (status = 409, description = "Component key already taken", body = SyncResponse),
        (status = 500, description = "Internal error", body = SyncResponse),
    ),
    security(
        ("bearer_auth" = [])
    )
))]
pub async fn submit_component(
    State(reconciler): State<Arc<CatalogReconciler>>,
    AuthExtractor(auth): AuthExtractor,
    payload: Result<Json<ComponentPayload>, JsonRejection>,
) -> ApiResult<Json<SyncResponse>> {
    let Json(payload) = payload?;
    let scope = auth.scope();

    let component =
        tokio::task::spawn_blocking(move || reconciler.upsert(&scope, &payload)).await??;

    tracing::info!(
        user_id = %auth.user_id,
        tenant_id = %auth.tenant_id,
        component_id = %component.component_id,
        external_id = %component.external_id,
        "Component submitted"
    );
    Ok(Json(SyncResponse::success(component.component_id.as_uuid())))
}

// ============================================================================
// ROUTER
// ============================================================================

/// Component routes, guarded by session authentication.
pub fn create_router(state: AppState, auth_state: AuthMiddlewareState) -> Router {
    Router::new()
        .route("/component", post(submit_component))
        .route_layer(axum::middleware::from_fn_with_state(
            auth_state,
            session_auth_middleware,
        ))
        .with_state(state)
}
