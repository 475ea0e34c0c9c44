//! BOM submission route.

use std::sync::Arc;

use axum::{extract::rejection::JsonRejection, extract::State, routing::post, Json, Router};
use cadlink_core::EntityIdType;

use crate::{
    error::ApiResult,
    middleware::{api_key_auth_middleware, AuthExtractor, AuthMiddlewareState},
    state::{AppState, CatalogBomBuilder},
    types::{SubmitBomRequest, SyncResponse},
};

// ============================================================================
// ROUTE HANDLERS
// ============================================================================

/// POST /cad_api/bom - Create a bill of materials for an assembly
///
/// Lines naming unknown components are skipped.
#[cfg_attr(feature = "openapi", utoipa::path(
    post,
    path = "/cad_api/bom",
    tag = "BOMs",
    request_body = SubmitBomRequest,
    params(
        ("X-Tenant-ID" = String, Header, description = "Tenant the BOM belongs to"),
    ),
    responses(
        (status = 200, description = "BOM created", body = SyncResponse),
        (status = 400, description = "Invalid request", body = SyncResponse),
        (status = 401, description = "Missing or invalid API key", body = SyncResponse),
        (status = 404, description = "Parent component not found", body = SyncResponse),
        (status = 500, description = "Internal error", body = SyncResponse),
    ),
    security(
        ("api_key" = [])
    )
))]
pub async fn submit_bom(
    State(builder): State<Arc<CatalogBomBuilder>>,
    AuthExtractor(auth): AuthExtractor,
    request: Result<Json<SubmitBomRequest>, JsonRejection>,
) -> ApiResult<Json<SyncResponse>> {
    let Json(request) = request?;
    let scope = auth.scope();

    let bom = tokio::task::spawn_blocking(move || {
        builder.build_bom(&scope, &request.parent_id, &request.components)
    })
    .await??;

    tracing::info!(
        user_id = %auth.user_id,
        tenant_id = %auth.tenant_id,
        bom_id = %bom.bom_id,
        lines = bom.lines.len(),
        "BOM submitted"
    );
    Ok(Json(SyncResponse::success(bom.bom_id.as_uuid())))
}

// ============================================================================
// ROUTER
// ============================================================================

/// BOM routes, guarded by API-key authentication.
pub fn create_router(state: AppState, auth_state: AuthMiddlewareState) -> Router {
    Router::new()
        .route("/bom", post(submit_bom))
        .route_layer(axum::middleware::from_fn_with_state(
            auth_state,
            api_key_auth_middleware,
        ))
        .with_state(state)
}
