//! CADLINK API - HTTP surface of the catalog synchronization layer
//!
//! Exposes component and BOM submission over Axum. Handlers authenticate the
//! caller, scope the request to its tenant and hand the payload to the
//! reconciler or BOM builder from `cadlink-sync`.

pub mod auth;
pub mod config;
pub mod error;
pub mod macros;
pub mod middleware;
#[cfg(feature = "openapi")]
pub mod openapi;
pub mod routes;
pub mod state;
pub mod telemetry;
pub mod types;

// Re-export commonly used types
pub use auth::{
    authenticate_api_key, authenticate_jwt, extract_tenant_id, generate_jwt_token,
    validate_api_key, validate_jwt_token, AuthConfig, AuthContext, AuthMethod, Claims,
    FixedClock, JwtClock, SystemClock,
};
pub use config::ApiConfig;
pub use error::{ApiError, ApiResult, ErrorCode};
pub use middleware::{
    api_key_auth_middleware, session_auth_middleware, AuthExtractor, AuthMiddlewareState,
};
#[cfg(feature = "openapi")]
pub use openapi::ApiDoc;
pub use routes::{create_api_router, with_envelope_layers};
pub use state::{AppState, CatalogBomBuilder, CatalogReconciler};
pub use telemetry::{init_tracing, LogFormat};
pub use types::*;
