//! OpenAPI Specification for CADLINK API
//!
//! Generated by utoipa from the route annotations and request/response types.

use utoipa::openapi::security::{ApiKey, ApiKeyValue, HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::error::{ApiError, ErrorCode};
use crate::routes::health::{HealthDetails, HealthResponse, HealthStatus};
use crate::routes::{bom, component, health};
use crate::types::{SubmitBomRequest, SyncResponse};

use cadlink_core::{BomLineInput, ComponentPayload};

/// OpenAPI document for the CADLINK API.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "CADLINK API",
        version = "0.4.0",
        description = "Synchronizes CAD components and assemblies into a product catalog",
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    ),
    servers(
        (url = "http://localhost:3000", description = "Local Development")
    ),
    tags(
        (name = "Components", description = "Component and configuration upserts from the design tool"),
        (name = "BOMs", description = "Bills of materials for assemblies"),
        (name = "Health", description = "Liveness probes")
    ),
    paths(
        component::submit_component,
        bom::submit_bom,
        health::liveness,
    ),
    components(
        schemas(
            ComponentPayload,
            BomLineInput,
            SubmitBomRequest,
            SyncResponse,
            ApiError,
            ErrorCode,
            HealthResponse,
            HealthStatus,
            HealthDetails,
        )
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

/// Registers the two authentication schemes.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "api_key",
                SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new("X-API-Key"))),
            );
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

impl ApiDoc {
    /// Pretty-printed JSON of the document.
    pub fn to_json() -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&Self::openapi())
    }
}
