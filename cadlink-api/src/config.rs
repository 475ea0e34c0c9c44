//! API Configuration Module
//!
//! Server settings loaded from environment variables with development
//! defaults.

use std::net::SocketAddr;

use cadlink_core::{SyncConfig, VariantStrategy};

use crate::error::{ApiError, ApiResult};
use crate::telemetry::LogFormat;

// ============================================================================
// API CONFIGURATION
// ============================================================================

/// Server, logging and reconciler settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    /// Interface to bind (default: 0.0.0.0)
    pub bind_host: String,

    /// Port to listen on (default: 3000)
    pub port: u16,

    pub log_format: LogFormat,

    /// How the reconciler materializes missing variants.
    pub variant_strategy: VariantStrategy,

    /// Global default inventory location of new product families.
    pub default_location: Option<String>,

    /// Global default category of new product families.
    pub default_category: Option<String>,

    /// Deployment environment name (development, production, ...)
    pub environment: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_host: "0.0.0.0".to_string(),
            port: 3000,
            log_format: LogFormat::Json,
            variant_strategy: VariantStrategy::default(),
            default_location: None,
            default_category: None,
            environment: "development".to_string(),
        }
    }
}

impl ApiConfig {
    /// Create ApiConfig from environment variables.
    ///
    /// Environment variables:
    /// - `CADLINK_API_BIND`: Interface to bind (default: 0.0.0.0)
    /// - `PORT` or `CADLINK_API_PORT`: Listen port (default: 3000)
    /// - `CADLINK_LOG_FORMAT`: "json" or "pretty" (default: json)
    /// - `CADLINK_VARIANT_STRATEGY`: "exact_combination" or "first_possible"
    /// - `CADLINK_DEFAULT_LOCATION`: Default inventory location of new families
    /// - `CADLINK_DEFAULT_CATEGORY`: Default category of new families
    /// - `CADLINK_ENVIRONMENT`: Deployment environment (default: development)
    pub fn from_env() -> ApiResult<Self> {
        let defaults = Self::default();

        let port = match std::env::var("PORT")
            .ok()
            .or_else(|| std::env::var("CADLINK_API_PORT").ok())
        {
            Some(raw) => raw
                .trim()
                .parse::<u16>()
                .map_err(|_| ApiError::invalid_input(format!("Invalid port value: {}", raw)))?,
            None => defaults.port,
        };

        let log_format = match std::env::var("CADLINK_LOG_FORMAT") {
            Ok(raw) => raw.parse().map_err(ApiError::invalid_input)?,
            Err(_) => defaults.log_format,
        };

        let variant_strategy = match std::env::var("CADLINK_VARIANT_STRATEGY") {
            Ok(raw) => raw.parse().map_err(ApiError::invalid_input)?,
            Err(_) => defaults.variant_strategy,
        };

        Ok(Self {
            bind_host: std::env::var("CADLINK_API_BIND").unwrap_or(defaults.bind_host),
            port,
            log_format,
            variant_strategy,
            default_location: non_empty_var("CADLINK_DEFAULT_LOCATION"),
            default_category: non_empty_var("CADLINK_DEFAULT_CATEGORY"),
            environment: std::env::var("CADLINK_ENVIRONMENT")
                .map(|e| e.to_lowercase())
                .unwrap_or(defaults.environment),
        })
    }

    /// Socket address to listen on.
    pub fn bind_addr(&self) -> ApiResult<SocketAddr> {
        let addr = format!("{}:{}", self.bind_host, self.port);
        addr.parse::<SocketAddr>()
            .map_err(|e| ApiError::invalid_input(format!("Invalid bind address {}: {}", addr, e)))
    }

    pub fn is_production(&self) -> bool {
        matches!(self.environment.as_str(), "production" | "prod")
    }

    /// Reconciler settings derived from this configuration.
    pub fn sync_config(&self) -> SyncConfig {
        SyncConfig::default().with_variant_strategy(self.variant_strategy)
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
