//! REST API Routes Module
//!
//! - `POST /cad_api/component` (session token)
//! - `POST /cad_api/bom` (service API key)
//! - `GET /health/live` (public)
//! - `GET /openapi.json` (public, `openapi` feature)
//!
//! Every response, including those of panicking handlers, carries the
//! `SyncResponse` envelope.

pub mod bom;
pub mod component;
pub mod health;

use std::any::Any;

use axum::{response::IntoResponse, response::Response, Router};
use tower_http::{catch_panic::CatchPanicLayer, trace::TraceLayer};

use crate::auth::AuthConfig;
use crate::error::ApiError;
use crate::middleware::AuthMiddlewareState;
use crate::state::AppState;

pub use bom::create_router as bom_router;
pub use component::create_router as component_router;
pub use health::create_router as health_router;

// ============================================================================
// OPENAPI ENDPOINT
// ============================================================================

#[cfg(feature = "openapi")]
async fn openapi_json() -> impl IntoResponse {
    use utoipa::OpenApi;
    axum::Json(crate::openapi::ApiDoc::openapi())
}

// ============================================================================
// PANIC HANDLING
// ============================================================================

/// Turn a handler panic into a failed `SyncResponse`.
///
/// The panic payload is logged, never sent to the caller.
fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = panic.downcast_ref::<String>() {
        s.as_str()
    } else if let Some(s) = panic.downcast_ref::<&str>() {
        s
    } else {
        "unknown panic payload"
    };
    tracing::error!(panic = %detail, "Request handler panicked");
    ApiError::internal_error("Internal error while processing request").into_response()
}

/// Wrap a router with panic recovery and request tracing.
pub fn with_envelope_layers(router: Router) -> Router {
    router
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(TraceLayer::new_for_http())
}

// ============================================================================
// ROUTER
// ============================================================================

/// Create the complete API router.
pub fn create_api_router(state: AppState, auth_config: AuthConfig) -> Router {
    let auth_state = AuthMiddlewareState::new(auth_config);

    let cad_api = Router::new()
        .merge(component::create_router(state.clone(), auth_state.clone()))
        .merge(bom::create_router(state.clone(), auth_state));

    let router = Router::new()
        .nest("/cad_api", cad_api)
        .nest("/health", health::create_router(state));

    #[cfg(feature = "openapi")]
    let router = router.route("/openapi.json", axum::routing::get(openapi_json));

    with_envelope_layers(router)
}
