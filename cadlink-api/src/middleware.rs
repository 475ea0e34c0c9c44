//! Axum Middleware for Authentication
//!
//! This module provides Axum middleware that:
//! - Authenticates end-user sessions (Authorization: Bearer) for component submission
//! - Authenticates services (X-API-Key) for BOM submission
//! - Extracts tenant context from headers or token claims
//! - Injects AuthContext into request extensions
//! - Answers 401 with the failure envelope for unauthenticated requests

use crate::auth::{authenticate_api_key, authenticate_jwt, bearer_token, AuthConfig, AuthContext};
use crate::error::{ApiError, ApiResult};
use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{request::Parts, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;

// ============================================================================
// MIDDLEWARE STATE
// ============================================================================

/// Shared state for authentication middleware.
#[derive(Debug, Clone)]
pub struct AuthMiddlewareState {
    pub auth_config: Arc<AuthConfig>,
}

impl AuthMiddlewareState {
    pub fn new(auth_config: AuthConfig) -> Self {
        Self {
            auth_config: Arc::new(auth_config),
        }
    }
}

// ============================================================================
// MIDDLEWARE FUNCTIONS
// ============================================================================

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|h| h.to_str().ok())
}

fn authenticate_session(config: &AuthConfig, headers: &HeaderMap) -> ApiResult<AuthContext> {
    let auth_header = header(headers, "authorization").ok_or_else(|| {
        ApiError::unauthorized("Authentication required: provide an Authorization: Bearer token")
    })?;
    let token = bearer_token(auth_header)?;
    authenticate_jwt(config, token, header(headers, "x-tenant-id"))
}

fn authenticate_service(config: &AuthConfig, headers: &HeaderMap) -> ApiResult<AuthContext> {
    let api_key = header(headers, "x-api-key").ok_or_else(|| {
        ApiError::unauthorized("Authentication required: provide an X-API-Key header")
    })?;
    authenticate_api_key(config, api_key, header(headers, "x-tenant-id"))
}

/// Require an end-user session token.
///
/// API keys are not accepted here: component submission always runs on
/// behalf of a user.
pub async fn session_auth_middleware(
    State(state): State<AuthMiddlewareState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthMiddlewareError> {
    let auth_context =
        authenticate_session(&state.auth_config, request.headers()).map_err(AuthMiddlewareError)?;

    tracing::debug!(
        user_id = %auth_context.user_id,
        tenant_id = %auth_context.tenant_id,
        "Session authenticated"
    );
    request.extensions_mut().insert(auth_context);
    Ok(next.run(request).await)
}

/// Require a service API key.
pub async fn api_key_auth_middleware(
    State(state): State<AuthMiddlewareState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthMiddlewareError> {
    let auth_context =
        authenticate_service(&state.auth_config, request.headers()).map_err(AuthMiddlewareError)?;

    tracing::debug!(
        user_id = %auth_context.user_id,
        tenant_id = %auth_context.tenant_id,
        "Service authenticated"
    );
    request.extensions_mut().insert(auth_context);
    Ok(next.run(request).await)
}

// ============================================================================
// ERROR HANDLING
// ============================================================================

/// Error wrapper for middleware that implements IntoResponse.
#[derive(Debug)]
pub struct AuthMiddlewareError(pub ApiError);

impl IntoResponse for AuthMiddlewareError {
    fn into_response(self) -> Response {
        self.0.into_response()
    }
}

// ============================================================================
// TYPED EXTRACTOR
// ============================================================================

/// Typed Axum extractor for authentication context.
///
/// One of the auth middlewares must run before the handler; without it the
/// extractor answers 500.
#[derive(Debug, Clone)]
pub struct AuthExtractor(pub AuthContext);

#[async_trait]
impl<S> FromRequestParts<S> for AuthExtractor
where
    S: Send + Sync,
{
    type Rejection = AuthMiddlewareError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthContext>()
            .cloned()
            .map(AuthExtractor)
            .ok_or_else(|| {
                AuthMiddlewareError(ApiError::internal_error(
                    "AuthContext not found in request extensions. \
                     Ensure an auth middleware is applied to this route.",
                ))
            })
    }
}

impl std::ops::Deref for AuthExtractor {
    type Target = AuthContext;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

// ============================================================================
// TESTS
// ============================================================================
