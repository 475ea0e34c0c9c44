//! Authentication Module
//!
//! The two CAD API operations authenticate differently:
//! 1. Component submission runs as an end-user session (Authorization: Bearer JWT)
//! 2. BOM submission runs as a service (X-API-Key header)
//!
//! Both resolve to an [`AuthContext`] whose tenant scopes every catalog call.
//! The tenant comes from the X-Tenant-ID header, or for sessions from the
//! JWT `tenant_id` claim.

use crate::error::{ApiError, ApiResult};
use cadlink_core::{EntityIdType, TenantId, TenantScope};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use uuid::Uuid;

const INSECURE_DEFAULT_SECRET: &str = "INSECURE_DEFAULT_SECRET_CHANGE_IN_PRODUCTION";

// ============================================================================
// CLOCK ABSTRACTION
// ============================================================================

/// Clock abstraction for JWT time validation.
///
/// Token times are checked here rather than inside `jsonwebtoken` so tests can
/// pin the current time.
pub trait JwtClock: Send + Sync {
    /// Current time as Unix epoch seconds.
    fn now_epoch_secs(&self) -> i64;
}

/// Production clock using system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl JwtClock for SystemClock {
    fn now_epoch_secs(&self) -> i64 {
        chrono::Utc::now().timestamp()
    }
}

/// Fixed clock for deterministic tests.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub i64);

impl JwtClock for FixedClock {
    fn now_epoch_secs(&self) -> i64 {
        self.0
    }
}

// ============================================================================
// JWT SECRET (TYPE-SAFE)
// ============================================================================

/// JWT signing secret that never shows up in logs.
#[derive(Clone)]
pub struct JwtSecret(SecretString);

impl JwtSecret {
    /// Create a new JWT secret.
    ///
    /// # Errors
    /// Returns error if the secret is empty.
    pub fn new(secret: String) -> ApiResult<Self> {
        if secret.is_empty() {
            return Err(ApiError::missing_field("jwt_secret"));
        }
        Ok(Self(SecretString::new(secret.into())))
    }

    /// Expose the secret value (only for cryptographic operations).
    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }

    pub fn len(&self) -> usize {
        self.0.expose_secret().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.expose_secret().is_empty()
    }

    /// Check if the secret is the insecure default.
    pub fn is_insecure_default(&self) -> bool {
        self.0.expose_secret() == INSECURE_DEFAULT_SECRET
    }
}

impl std::fmt::Debug for JwtSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "JwtSecret([REDACTED, {} chars])", self.len())
    }
}

// ============================================================================
// CONFIGURATION
// ============================================================================

/// Authentication configuration.
#[derive(Clone)]
pub struct AuthConfig {
    /// Valid service API keys
    pub api_keys: HashSet<String>,

    /// JWT secret key for signing and verification
    pub jwt_secret: JwtSecret,

    /// JWT algorithm (default: HS256)
    pub jwt_algorithm: Algorithm,

    /// JWT token expiration in seconds (default: 1 hour)
    pub jwt_expiration_secs: i64,

    /// JWT clock skew tolerance in seconds (default: 60)
    pub jwt_clock_skew_secs: i64,

    /// Whether a request must name its tenant
    pub require_tenant_header: bool,

    /// Clock for JWT time validation
    pub clock: Arc<dyn JwtClock>,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("api_keys", &format!("[{} keys]", self.api_keys.len()))
            .field("jwt_secret", &self.jwt_secret)
            .field("jwt_algorithm", &self.jwt_algorithm)
            .field("jwt_expiration_secs", &self.jwt_expiration_secs)
            .field("jwt_clock_skew_secs", &self.jwt_clock_skew_secs)
            .field("require_tenant_header", &self.require_tenant_header)
            .field("clock", &"<JwtClock>")
            .finish()
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            api_keys: HashSet::new(),
            jwt_secret: build_jwt_secret(INSECURE_DEFAULT_SECRET.to_string()),
            jwt_algorithm: Algorithm::HS256,
            jwt_expiration_secs: 3600,
            jwt_clock_skew_secs: 60,
            require_tenant_header: true,
            clock: Arc::new(SystemClock),
        }
    }
}

impl AuthConfig {
    /// Create authentication configuration from environment variables.
    ///
    /// # Environment Variables
    /// - `CADLINK_API_KEYS`: Comma-separated list of valid service API keys
    /// - `CADLINK_JWT_SECRET`: JWT signing secret
    /// - `CADLINK_JWT_EXPIRATION_SECS`: JWT token expiration (default: 3600)
    /// - `CADLINK_JWT_CLOCK_SKEW_SECS`: JWT clock skew tolerance (default: 60)
    /// - `CADLINK_REQUIRE_TENANT_HEADER`: Whether a tenant must be named (default: true)
    pub fn from_env() -> Self {
        let api_keys = std::env::var("CADLINK_API_KEYS")
            .map(|keys| {
                keys.split(',')
                    .map(str::trim)
                    .filter(|k| !k.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        let secret_str = std::env::var("CADLINK_JWT_SECRET")
            .unwrap_or_else(|_| INSECURE_DEFAULT_SECRET.to_string());

        Self {
            api_keys,
            jwt_secret: build_jwt_secret(secret_str),
            jwt_algorithm: Algorithm::HS256,
            jwt_expiration_secs: std::env::var("CADLINK_JWT_EXPIRATION_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(3600),
            jwt_clock_skew_secs: std::env::var("CADLINK_JWT_CLOCK_SKEW_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(60),
            require_tenant_header: std::env::var("CADLINK_REQUIRE_TENANT_HEADER")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(true),
            clock: Arc::new(SystemClock),
        }
    }

    /// Refuse insecure secrets in production, warn about them elsewhere.
    pub fn validate_for_production(&self, is_production: bool) -> ApiResult<()> {
        if self.jwt_secret.is_insecure_default() {
            if is_production {
                return Err(ApiError::invalid_input(
                    "Cannot start server in production with insecure JWT secret. \
                     Set CADLINK_JWT_SECRET to a secure value.",
                ));
            }
            tracing::warn!(
                "Using insecure default JWT secret. Set CADLINK_JWT_SECRET before deploying."
            );
        } else if self.jwt_secret.len() < 32 {
            if is_production {
                return Err(ApiError::invalid_input(format!(
                    "JWT secret is too short for production use ({} chars). \
                     It must be at least 32 characters long.",
                    self.jwt_secret.len()
                )));
            }
            tracing::warn!(
                length = self.jwt_secret.len(),
                "JWT secret is shorter than 32 characters"
            );
        }

        if self.api_keys.is_empty() {
            tracing::warn!("No API keys configured; BOM submission will reject every request");
        }
        Ok(())
    }

    /// Add an API key to the valid set.
    pub fn add_api_key(&mut self, key: String) {
        self.api_keys.insert(key);
    }

    /// Check if an API key is valid.
    pub fn is_valid_api_key(&self, key: &str) -> bool {
        self.api_keys.contains(key)
    }

    /// Replace the signing secret.
    pub fn with_jwt_secret(mut self, secret: impl Into<String>) -> ApiResult<Self> {
        self.jwt_secret = JwtSecret::new(secret.into())?;
        Ok(self)
    }

    pub fn with_clock(mut self, clock: Arc<dyn JwtClock>) -> Self {
        self.clock = clock;
        self
    }
}

fn build_jwt_secret(secret_str: String) -> JwtSecret {
    let normalized = if secret_str.trim().is_empty() {
        INSECURE_DEFAULT_SECRET.to_string()
    } else {
        secret_str
    };

    match JwtSecret::new(normalized) {
        Ok(secret) => secret,
        Err(_) => JwtSecret(SecretString::new(INSECURE_DEFAULT_SECRET.to_string().into())),
    }
}

// ============================================================================
// JWT CLAIMS
// ============================================================================

/// JWT claims of an end-user session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration time (Unix timestamp)
    pub exp: i64,

    /// Tenant the session works in
    pub tenant_id: Option<String>,

    #[serde(default)]
    pub roles: Vec<String>,
}

impl Claims {
    /// Create new claims for a user using a clock.
    pub fn new(
        user_id: String,
        tenant_id: Option<TenantId>,
        expiration_secs: i64,
        clock: &dyn JwtClock,
    ) -> Self {
        let now = clock.now_epoch_secs();

        Self {
            sub: user_id,
            iat: now,
            exp: now + expiration_secs,
            tenant_id: tenant_id.map(|id| id.to_string()),
            roles: Vec::new(),
        }
    }

    pub fn with_roles(mut self, roles: Vec<String>) -> Self {
        self.roles.extend(roles);
        self
    }

    /// Get the tenant ID as TenantId.
    pub fn tenant_id(&self) -> Option<TenantId> {
        self.tenant_id
            .as_ref()
            .and_then(|s| Uuid::parse_str(s).ok())
            .map(TenantId::new)
    }
}

// ============================================================================
// AUTHENTICATION CONTEXT
// ============================================================================

/// Authentication context injected into request extensions by the middleware.
#[derive(Debug, Clone)]
pub struct AuthContext {
    /// User ID (JWT subject or API key identifier)
    pub user_id: String,

    pub tenant_id: TenantId,

    pub roles: Vec<String>,

    pub auth_method: AuthMethod,
}

impl AuthContext {
    pub fn new(
        user_id: String,
        tenant_id: TenantId,
        roles: Vec<String>,
        auth_method: AuthMethod,
    ) -> Self {
        Self {
            user_id,
            tenant_id,
            roles,
            auth_method,
        }
    }

    /// Catalog scope of the authenticated tenant.
    pub fn scope(&self) -> TenantScope {
        TenantScope::new(self.tenant_id)
    }
}

/// Authentication method used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMethod {
    /// Service API key
    ApiKey,

    /// End-user session token
    Jwt,
}

// ============================================================================
// AUTHENTICATION FUNCTIONS
// ============================================================================

/// Validate an API key.
pub fn validate_api_key(config: &AuthConfig, api_key: &str) -> ApiResult<()> {
    if config.is_valid_api_key(api_key) {
        Ok(())
    } else {
        Err(ApiError::unauthorized("Invalid API key"))
    }
}

fn validate_claim_times(now: i64, exp: i64, leeway_secs: i64) -> ApiResult<()> {
    if exp < now - leeway_secs {
        return Err(ApiError::token_expired());
    }
    Ok(())
}

/// Validate a JWT token and extract claims.
///
/// `jsonwebtoken` only checks the signature; expiry is checked against the
/// configured clock.
pub fn validate_jwt_token(config: &AuthConfig, token: &str) -> ApiResult<Claims> {
    let decoding_key = DecodingKey::from_secret(config.jwt_secret.expose().as_bytes());

    let mut validation = Validation::new(config.jwt_algorithm);
    validation.validate_exp = false;
    validation.validate_nbf = false;
    validation.required_spec_claims = HashSet::from(["exp".to_string()]);

    let token_data =
        decode::<Claims>(token, &decoding_key, &validation).map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::InvalidToken => {
                ApiError::invalid_token("Token is invalid")
            }
            jsonwebtoken::errors::ErrorKind::InvalidSignature => {
                ApiError::invalid_token("Token signature is invalid")
            }
            _ => ApiError::invalid_token(format!("Token validation failed: {}", e)),
        })?;

    let claims = token_data.claims;

    let now = config.clock.now_epoch_secs();
    if now < 0 {
        tracing::error!(
            timestamp = now,
            "System clock returned pre-epoch time - server time is broken"
        );
        return Err(ApiError::internal_error("Server time configuration error"));
    }

    validate_claim_times(now, claims.exp, config.jwt_clock_skew_secs)?;

    Ok(claims)
}

/// Generate a session token for a user.
pub fn generate_jwt_token(
    config: &AuthConfig,
    user_id: String,
    tenant_id: Option<TenantId>,
    roles: Vec<String>,
) -> ApiResult<String> {
    let claims = Claims::new(user_id, tenant_id, config.jwt_expiration_secs, &*config.clock)
        .with_roles(roles);

    let encoding_key = EncodingKey::from_secret(config.jwt_secret.expose().as_bytes());
    let header = Header::new(config.jwt_algorithm);

    encode(&header, &claims, &encoding_key)
        .map_err(|e| ApiError::internal_error(format!("Failed to generate token: {}", e)))
}

/// Parse the X-Tenant-ID header as a UUID.
pub fn extract_tenant_id(header_value: &str) -> ApiResult<TenantId> {
    let uuid = Uuid::parse_str(header_value.trim())
        .map_err(|_| ApiError::invalid_format("X-Tenant-ID", "valid UUID"))?;
    Ok(TenantId::new(uuid))
}

/// Authenticate a service call by API key; the tenant comes from X-Tenant-ID.
pub fn authenticate_api_key(
    config: &AuthConfig,
    api_key: &str,
    tenant_id_header: Option<&str>,
) -> ApiResult<AuthContext> {
    validate_api_key(config, api_key)?;

    let tenant_id = match tenant_id_header {
        Some(header) => extract_tenant_id(header)?,
        None if config.require_tenant_header => {
            return Err(ApiError::missing_field("X-Tenant-ID"));
        }
        // single-tenant deployments
        None => TenantId::nil(),
    };

    let prefix: String = api_key.chars().take(8).collect();

    Ok(AuthContext::new(
        format!("api_key_{}", prefix),
        tenant_id,
        vec!["api_user".to_string()],
        AuthMethod::ApiKey,
    ))
}

/// Authenticate an end-user session by bearer token.
///
/// The X-Tenant-ID header takes precedence over the token's `tenant_id` claim.
pub fn authenticate_jwt(
    config: &AuthConfig,
    token: &str,
    tenant_id_header: Option<&str>,
) -> ApiResult<AuthContext> {
    let claims = validate_jwt_token(config, token)?;

    let tenant_id = if let Some(header) = tenant_id_header {
        extract_tenant_id(header)?
    } else if let Some(claimed) = claims.tenant_id() {
        claimed
    } else if config.require_tenant_header {
        return Err(ApiError::missing_field("X-Tenant-ID or JWT tenant_id claim"));
    } else {
        TenantId::nil()
    };

    Ok(AuthContext::new(claims.sub, tenant_id, claims.roles, AuthMethod::Jwt))
}

/// Pull the token out of an `Authorization: Bearer` header value.
pub fn bearer_token(auth_header: &str) -> ApiResult<&str> {
    auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| ApiError::invalid_token("Authorization header must use Bearer scheme"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    /// 2024-01-01 00:00:00 UTC
    const NOW: i64 = 1704067200;

    fn test_config() -> AuthConfig {
        let mut config = AuthConfig::default()
            .with_jwt_secret("test_secret_that_is_long_enough_for_hs256")
            .unwrap()
            .with_clock(Arc::new(FixedClock(NOW)));
        config.add_api_key("test_key_123".to_string());
        config
    }

    #[test]
    fn test_jwt_secret_is_redacted() {
        let secret = JwtSecret::new("super-secret".to_string()).unwrap();
        let debug = format!("{:?}", secret);
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("12 chars"));
        assert!(JwtSecret::new(String::new()).is_err());
    }

    #[test]
    fn test_blank_secret_falls_back_to_default() {
        assert!(build_jwt_secret("   ".to_string()).is_insecure_default());
        assert!(AuthConfig::default().validate_for_production(true).is_err());
        assert!(AuthConfig::default().validate_for_production(false).is_ok());
    }

    #[test]
    fn test_jwt_round_trip_carries_tenant() {
        let config = test_config();
        let tenant = TenantId::now_v7();
        let token =
            generate_jwt_token(&config, "designer".to_string(), Some(tenant), vec![]).unwrap();

        let ctx = authenticate_jwt(&config, &token, None).unwrap();
        assert_eq!(ctx.user_id, "designer");
        assert_eq!(ctx.tenant_id, tenant);
        assert_eq!(ctx.auth_method, AuthMethod::Jwt);
    }

    #[test]
    fn test_tenant_header_overrides_claim() {
        let config = test_config();
        let claimed = TenantId::now_v7();
        let header = TenantId::now_v7();
        let token =
            generate_jwt_token(&config, "designer".to_string(), Some(claimed), vec![]).unwrap();

        let ctx = authenticate_jwt(&config, &token, Some(&header.to_string())).unwrap();
        assert_eq!(ctx.tenant_id, header);
    }

    #[test]
    fn test_expired_token_rejected() {
        let config = test_config();
        let token = generate_jwt_token(
            &config,
            "designer".to_string(),
            Some(TenantId::now_v7()),
            vec![],
        )
        .unwrap();

        let later = test_config().with_clock(Arc::new(FixedClock(NOW + 3600 + 61)));
        let err = validate_jwt_token(&later, &token).unwrap_err();
        assert_eq!(err.code, ErrorCode::TokenExpired);

        let within_skew = test_config().with_clock(Arc::new(FixedClock(NOW + 3600 + 59)));
        assert!(validate_jwt_token(&within_skew, &token).is_ok());
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let config = test_config();
        let token = generate_jwt_token(&config, "designer".to_string(), None, vec![]).unwrap();

        let other = test_config().with_jwt_secret("a_completely_different_secret_value").unwrap();
        let err = validate_jwt_token(&other, &token).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidToken);
    }

    #[test]
    fn test_session_without_tenant_rejected() {
        let config = test_config();
        let token = generate_jwt_token(&config, "designer".to_string(), None, vec![]).unwrap();
        let err = authenticate_jwt(&config, &token, None).unwrap_err();
        assert_eq!(err.code, ErrorCode::MissingField);
    }

    #[test]
    fn test_api_key_authentication() {
        let config = test_config();
        let tenant = TenantId::now_v7();

        let ctx = authenticate_api_key(&config, "test_key_123", Some(&tenant.to_string())).unwrap();
        assert_eq!(ctx.tenant_id, tenant);
        assert_eq!(ctx.user_id, "api_key_test_key");
        assert_eq!(ctx.auth_method, AuthMethod::ApiKey);

        let err = authenticate_api_key(&config, "wrong", Some(&tenant.to_string())).unwrap_err();
        assert_eq!(err.code, ErrorCode::Unauthorized);

        let err = authenticate_api_key(&config, "test_key_123", None).unwrap_err();
        assert_eq!(err.code, ErrorCode::MissingField);

        let err = authenticate_api_key(&config, "test_key_123", Some("not-a-uuid")).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidFormat);
    }

    #[test]
    fn test_optional_tenant_defaults_to_nil() {
        let mut config = test_config();
        config.require_tenant_header = false;
        let ctx = authenticate_api_key(&config, "test_key_123", None).unwrap();
        assert_eq!(ctx.tenant_id, TenantId::nil());
    }

    #[test]
    fn test_bearer_token_parsing() {
        assert_eq!(bearer_token("Bearer abc.def").unwrap(), "abc.def");
        assert_eq!(bearer_token("Basic abc").unwrap_err().code, ErrorCode::InvalidToken);
        assert_eq!(bearer_token("Bearer ").unwrap_err().code, ErrorCode::InvalidToken);
    }
}
