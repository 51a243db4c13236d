//! Error types for colloquy operations

use thiserror::Error;

/// Transcript storage errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StorageError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    #[error("Insert failed for {entity}: {reason}")]
    InsertFailed { entity: String, reason: String },

    #[error("Transaction failed: {reason}")]
    TransactionFailed { reason: String },

    #[error("Serialization failed: {reason}")]
    Serialization { reason: String },

    #[error("Schema version mismatch: found {found}, expected {expected}")]
    SchemaMismatch { found: u32, expected: u32 },

    #[error("Storage lock poisoned")]
    LockPoisoned,
}

/// Model provider errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LlmError {
    #[error("No model provider configured")]
    ProviderNotConfigured,

    #[error("Request to {provider} failed with status {status}: {message}")]
    RequestFailed {
        provider: String,
        status: u16,
        message: String,
    },

    #[error("Rate limited by {provider}")]
    RateLimited { provider: String },

    #[error("Invalid API key for {provider}")]
    InvalidApiKey { provider: String },

    #[error("Invalid response from {provider}: {reason}")]
    InvalidResponse { provider: String, reason: String },

    #[error("Provider {provider} error: {message}")]
    ProviderError { provider: String, message: String },

    #[error("Stream from {provider} interrupted: {reason}")]
    StreamInterrupted { provider: String, reason: String },
}

/// Tool invocation faults.
///
/// Domain failures (insufficient stock, unknown item) are not faults; tools
/// report those inside their structured result with `success: false`.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ToolError {
    #[error("Invalid input for tool {tool}: {reason}")]
    InvalidInput { tool: String, reason: String },

    #[error("Tool {tool} failed: {reason}")]
    Failed { tool: String, reason: String },

    #[error("Tool {tool} panicked: {reason}")]
    Panicked { tool: String, reason: String },

    #[error("Tool {tool} is registered twice")]
    DuplicateRegistration { tool: String },
}

/// Validation errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Required field missing: {field}")]
    RequiredFieldMissing { field: String },

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required configuration field: {field}")]
    MissingRequired { field: String },

    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

/// Master error type for all colloquy errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ColloquyError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

/// Result type alias for colloquy operations.
pub type ColloquyResult<T> = Result<T, ColloquyError>;

impl ColloquyError {
    /// Wrap a serde_json failure as a storage serialization error.
    pub fn serialization(err: impl std::fmt::Display) -> Self {
        ColloquyError::Storage(StorageError::Serialization {
            reason: err.to_string(),
        })
    }
}
