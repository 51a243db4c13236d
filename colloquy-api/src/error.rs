//! Error Types for the Colloquy API
//!
//! Every failing endpoint answers with an [`ApiError`] body and the status
//! code of its [`ErrorCode`]. Engine errors convert through
//! `From<ColloquyError>`; internal details are logged, not returned.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use colloquy_core::{ColloquyError, LlmError, StorageError, ToolError};
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// ERROR CODE ENUM
// ============================================================================

/// Error codes for API responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Validation (400)
    ValidationFailed,
    InvalidInput,
    MissingField,

    // Not found (404)
    EntityNotFound,
    ConversationNotFound,

    // Upstream model (429, 502)
    TooManyRequests,
    UpstreamError,

    // Server (500, 503, 504)
    InternalError,
    StorageError,
    ServiceUnavailable,
    Timeout,
}

impl ErrorCode {
    /// Get the HTTP status code for this error code.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ErrorCode::ValidationFailed | ErrorCode::InvalidInput | ErrorCode::MissingField => {
                StatusCode::BAD_REQUEST
            }

            ErrorCode::EntityNotFound | ErrorCode::ConversationNotFound => StatusCode::NOT_FOUND,

            ErrorCode::TooManyRequests => StatusCode::TOO_MANY_REQUESTS,
            ErrorCode::UpstreamError => StatusCode::BAD_GATEWAY,

            ErrorCode::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            ErrorCode::Timeout => StatusCode::GATEWAY_TIMEOUT,
            ErrorCode::InternalError | ErrorCode::StorageError => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Get a default message for this error code.
    pub fn default_message(&self) -> &'static str {
        match self {
            ErrorCode::ValidationFailed => "Request validation failed",
            ErrorCode::InvalidInput => "Invalid input data",
            ErrorCode::MissingField => "Required field is missing",
            ErrorCode::EntityNotFound => "Entity not found",
            ErrorCode::ConversationNotFound => "Conversation not found",
            ErrorCode::TooManyRequests => "Rate limit exceeded",
            ErrorCode::UpstreamError => "Model provider request failed",
            ErrorCode::InternalError => "Internal server error",
            ErrorCode::StorageError => "Transcript storage failed",
            ErrorCode::ServiceUnavailable => "Service temporarily unavailable",
            ErrorCode::Timeout => "Operation timed out",
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

/// Structured error response for API operations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ApiError {
    /// Error code categorizing the error
    pub code: ErrorCode,
    /// Human-readable error message
    pub message: String,
    /// Optional additional details, such as the conversation a turn belonged to
    #[serde(skip_serializing_if = "Option::is_none")]
    #[cfg_attr(feature = "openapi", schema(value_type = Option<Object>))]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn from_code(code: ErrorCode) -> Self {
        Self {
            code,
            message: code.default_message().to_string(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn status_code(&self) -> StatusCode {
        self.code.status_code()
    }

    // ========================================================================
    // Convenience constructors for common errors
    // ========================================================================

    pub fn validation_failed(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ValidationFailed, message)
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidInput, message)
    }

    pub fn missing_field(field: &str) -> Self {
        Self::new(
            ErrorCode::MissingField,
            format!("Required field '{}' is missing", field),
        )
    }

    pub fn entity_not_found(entity_type: &str, id: impl fmt::Display) -> Self {
        Self::new(
            ErrorCode::EntityNotFound,
            format!("{} with id {} not found", entity_type, id),
        )
    }

    pub fn conversation_not_found(conversation_id: impl fmt::Display) -> Self {
        Self::new(
            ErrorCode::ConversationNotFound,
            format!("Conversation {} not found", conversation_id),
        )
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ServiceUnavailable, message)
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

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        (status, Json(self)).into_response()
    }
}

// ============================================================================
// CONVERSIONS
// ============================================================================

impl From<ColloquyError> for ApiError {
    fn from(err: ColloquyError) -> Self {
        match err {
            ColloquyError::Validation(e) => ApiError::validation_failed(e.to_string()),
            ColloquyError::Storage(StorageError::NotFound { entity, id }) => {
                ApiError::entity_not_found(&entity, id)
            }
            ColloquyError::Storage(e) => {
                tracing::error!(error = %e, "transcript storage error");
                ApiError::from_code(ErrorCode::StorageError)
            }
            ColloquyError::Llm(LlmError::RateLimited { provider }) => ApiError::new(
                ErrorCode::TooManyRequests,
                format!("Rate limited by {}", provider),
            ),
            ColloquyError::Llm(LlmError::ProviderNotConfigured) => {
                ApiError::service_unavailable("No model provider configured")
            }
            ColloquyError::Llm(e) => {
                tracing::error!(error = %e, "model provider error");
                ApiError::from_code(ErrorCode::UpstreamError)
            }
            ColloquyError::Tool(ToolError::InvalidInput { tool, reason }) => {
                ApiError::invalid_input(format!("Invalid input for {}: {}", tool, reason))
            }
            ColloquyError::Tool(e) => {
                tracing::error!(error = %e, "tool error");
                ApiError::internal_error("Tool execution failed")
            }
            ColloquyError::Config(e) => {
                tracing::error!(error = %e, "configuration error");
                ApiError::internal_error(e.to_string())
            }
        }
    }
}

impl From<ToolError> for ApiError {
    fn from(err: ToolError) -> Self {
        ColloquyError::from(err).into()
    }
}

/// Result type for API handlers.
pub type ApiResult<T> = Result<T, ApiError>;
