//! Error Types for CADLINK API
//!
//! This module defines error handling for the API layer, including:
//! - ApiError struct carried through handlers and middleware
//! - ErrorCode enum for categorizing errors
//! - IntoResponse implementation rendering the `SyncResponse` envelope
//!
//! Every error leaves the server as `{success: false, error}` with the HTTP
//! status of its code.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use cadlink_core::{CadlinkError, ErrorKind};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::SyncResponse;

// ============================================================================
// ERROR CODE ENUM
// ============================================================================

/// Error codes for API responses.
///
/// Each error code maps to a specific HTTP status code and represents
/// a category of error that can occur during API operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // ========================================================================
    // Authentication Errors (401)
    // ========================================================================
    /// Request lacks valid authentication credentials
    Unauthorized,

    /// Authentication token is invalid or malformed
    InvalidToken,

    /// Authentication token has expired
    TokenExpired,

    // ========================================================================
    // Validation Errors (400)
    // ========================================================================
    /// Payload validation failed
    ValidationFailed,

    /// Request body could not be decoded
    InvalidInput,

    /// Required field or header is missing from request
    MissingField,

    /// Field format is incorrect
    InvalidFormat,

    /// CAD configuration is not a JSON object of scalars
    MalformedConfiguration,

    // ========================================================================
    // Not Found / Conflict Errors (404, 409)
    // ========================================================================
    /// Referenced parent component does not exist
    ParentNotFound,

    /// Component with the same key already exists
    EntityAlreadyExists,

    // ========================================================================
    // Server Errors (500)
    // ========================================================================
    /// Internal server error
    InternalError,

    /// Catalog storage operation failed
    StorageError,
}

impl ErrorCode {
    /// Get the HTTP status code for this error code.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ErrorCode::Unauthorized | ErrorCode::InvalidToken | ErrorCode::TokenExpired => {
                StatusCode::UNAUTHORIZED
            }

            ErrorCode::ValidationFailed
            | ErrorCode::InvalidInput
            | ErrorCode::MissingField
            | ErrorCode::InvalidFormat
            | ErrorCode::MalformedConfiguration => StatusCode::BAD_REQUEST,

            ErrorCode::ParentNotFound => StatusCode::NOT_FOUND,

            ErrorCode::EntityAlreadyExists => StatusCode::CONFLICT,

            ErrorCode::InternalError | ErrorCode::StorageError => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Get a default message for this error code.
    pub fn default_message(&self) -> &'static str {
        match self {
            ErrorCode::Unauthorized => "Authentication required",
            ErrorCode::InvalidToken => "Invalid authentication token",
            ErrorCode::TokenExpired => "Authentication token has expired",
            ErrorCode::ValidationFailed => "Request validation failed",
            ErrorCode::InvalidInput => "Invalid input data",
            ErrorCode::MissingField => "Required field is missing",
            ErrorCode::InvalidFormat => "Invalid format",
            ErrorCode::MalformedConfiguration => "Malformed configuration",
            ErrorCode::ParentNotFound => "Parent component not found",
            ErrorCode::EntityAlreadyExists => "Entity already exists",
            ErrorCode::InternalError => "Internal server error",
            ErrorCode::StorageError => "Catalog storage operation failed",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

// ============================================================================
// API ERROR STRUCT
// ============================================================================

/// Structured error for API operations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ApiError {
    /// Error code categorizing the error
    pub code: ErrorCode,

    /// Human-readable error message
    pub message: String,
}

impl ApiError {
    /// Create a new API error with the given code and message.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Create a new API error with the given code, using the default message.
    pub fn from_code(code: ErrorCode) -> Self {
        Self::new(code, code.default_message())
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        self.code.status_code()
    }

    // ========================================================================
    // Convenience constructors for common errors
    // ========================================================================

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Unauthorized, message)
    }

    pub fn invalid_token(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidToken, message)
    }

    pub fn token_expired() -> Self {
        Self::from_code(ErrorCode::TokenExpired)
    }

    pub fn validation_failed(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ValidationFailed, message)
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidInput, message)
    }

    /// Create a MissingField error.
    pub fn missing_field(field: &str) -> Self {
        Self::new(
            ErrorCode::MissingField,
            format!("Required field '{}' is missing", field),
        )
    }

    /// Create an InvalidFormat error.
    pub fn invalid_format(field: &str, expected: &str) -> Self {
        Self::new(
            ErrorCode::InvalidFormat,
            format!("Field '{}' has invalid format, expected {}", field, expected),
        )
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

// ============================================================================
// AXUM INTEGRATION
// ============================================================================

/// Render the error as a failed `SyncResponse`.
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(code = %self.code, message = %self.message, "Request failed");
        } else {
            tracing::warn!(code = %self.code, message = %self.message, "Request rejected");
        }
        (status, Json(SyncResponse::failure(self.message))).into_response()
    }
}

// ============================================================================
// CONVERSIONS
// ============================================================================

/// Core errors keep their own message; the kind picks the code.
impl From<CadlinkError> for ApiError {
    fn from(err: CadlinkError) -> Self {
        let code = match err.kind() {
            ErrorKind::ValidationFailure => ErrorCode::ValidationFailed,
            ErrorKind::MalformedConfiguration => ErrorCode::MalformedConfiguration,
            ErrorKind::DuplicateKey => ErrorCode::EntityAlreadyExists,
            ErrorKind::ParentNotFound => ErrorCode::ParentNotFound,
            ErrorKind::Storage => ErrorCode::StorageError,
        };
        ApiError::new(code, err.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::invalid_input(format!("Invalid JSON body: {}", rejection.body_text()))
    }
}

/// A blocking sync task that panicked or was cancelled.
impl From<tokio::task::JoinError> for ApiError {
    fn from(err: tokio::task::JoinError) -> Self {
        if err.is_panic() {
            tracing::error!("Sync task panicked: {}", err);
            ApiError::internal_error("Internal error while processing request")
        } else {
            ApiError::internal_error("Request processing was cancelled")
        }
    }
}

// ============================================================================
// RESULT TYPE ALIAS
// ============================================================================

/// Result type alias for API operations.
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use cadlink_core::{EntityType, StorageError, SyncError};

    #[test]
    fn test_error_code_status_mapping() {
        assert_eq!(ErrorCode::Unauthorized.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(ErrorCode::TokenExpired.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(ErrorCode::ValidationFailed.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ErrorCode::ParentNotFound.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(ErrorCode::EntityAlreadyExists.status_code(), StatusCode::CONFLICT);
        assert_eq!(ErrorCode::StorageError.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_core_error_mapping() {
        let err = ApiError::from(CadlinkError::required("name"));
        assert_eq!(err.code, ErrorCode::ValidationFailed);
        assert!(err.message.contains("name"));

        let err = ApiError::from(CadlinkError::malformed("expected a JSON object"));
        assert_eq!(err.code, ErrorCode::MalformedConfiguration);

        let err = ApiError::from(CadlinkError::from(SyncError::ParentNotFound {
            external_id: "NON_EXISTENT".to_string(),
        }));
        assert_eq!(err.code, ErrorCode::ParentNotFound);
        assert_eq!(err.message, "Sync error: Parent component not found: NON_EXISTENT");

        let err = ApiError::from(CadlinkError::from(StorageError::DuplicateKey {
            entity_type: EntityType::Component,
            key: "P-1".to_string(),
        }));
        assert_eq!(err.code, ErrorCode::EntityAlreadyExists);

        let err = ApiError::from(CadlinkError::from(StorageError::LockPoisoned));
        assert_eq!(err.code, ErrorCode::StorageError);
    }

    #[test]
    fn test_error_serialization() -> Result<(), serde_json::Error> {
        let err = ApiError::unauthorized("Invalid token");
        let json = serde_json::to_string(&err)?;

        assert!(json.contains("UNAUTHORIZED"));
        assert!(json.contains("Invalid token"));

        let deserialized: ApiError = serde_json::from_str(&json)?;
        assert_eq!(deserialized, err);
        Ok(())
    }

    #[test]
    fn test_error_display() {
        let err = ApiError::missing_field("X-Tenant-ID");
        let display = format!("{}", err);

        assert!(display.contains("MissingField"));
        assert!(display.contains("X-Tenant-ID"));
    }
}
