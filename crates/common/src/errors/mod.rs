//! Error types for the DocHub backend
//!
//! Provides a comprehensive error handling system with:
//! - Distinct error types for different failure modes
//! - HTTP status code mapping
//! - Structured error responses
//! - Error codes for client handling

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

/// Error codes for machine-readable error identification
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Validation errors (1xxx)
    ValidationError,
    MissingField,
    InvalidFormat,
    UnsupportedFileType,

    // Resource errors (4xxx)
    NotFound,
    ProjectNotFound,
    SourceNotFound,
    DocumentNotFound,
    ConversationNotFound,

    // Conflict errors (5xxx)
    Conflict,
    SyncInProgress,

    // Database errors (7xxx)
    DatabaseError,
    ConnectionError,

    // External service errors (8xxx)
    UpstreamError,
    RepositoryFetchError,
    UpstreamRateLimited,
    EmbeddingError,
    EmbeddingTimeout,
    CompletionError,

    // Internal errors (9xxx)
    InternalError,
    ConfigurationError,
    DimensionMismatch,
    SerializationError,

    // Service unavailable
    ServiceUnavailable,
}

impl ErrorCode {
    /// Get the numeric code for this error
    pub fn as_code(&self) -> u16 {
        match self {
            // Validation (1xxx)
            ErrorCode::ValidationError => 1001,
            ErrorCode::MissingField => 1002,
            ErrorCode::InvalidFormat => 1003,
            ErrorCode::UnsupportedFileType => 1004,

            // Resources (4xxx)
            ErrorCode::NotFound => 4001,
            ErrorCode::ProjectNotFound => 4002,
            ErrorCode::SourceNotFound => 4003,
            ErrorCode::DocumentNotFound => 4004,
            ErrorCode::ConversationNotFound => 4005,

            // Conflicts (5xxx)
            ErrorCode::Conflict => 5001,
            ErrorCode::SyncInProgress => 5002,

            // Database (7xxx)
            ErrorCode::DatabaseError => 7001,
            ErrorCode::ConnectionError => 7002,

            // External (8xxx)
            ErrorCode::UpstreamError => 8001,
            ErrorCode::RepositoryFetchError => 8002,
            ErrorCode::UpstreamRateLimited => 8003,
            ErrorCode::EmbeddingError => 8004,
            ErrorCode::EmbeddingTimeout => 8005,
            ErrorCode::CompletionError => 8006,

            // Internal (9xxx)
            ErrorCode::InternalError => 9001,
            ErrorCode::ConfigurationError => 9002,
            ErrorCode::DimensionMismatch => 9003,
            ErrorCode::SerializationError => 9004,

            ErrorCode::ServiceUnavailable => 9999,
        }
    }
}

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Validation errors
    #[error("Validation failed: {message}")]
    Validation {
        message: String,
        field: Option<String>,
    },

    #[error("Required field missing: {field}")]
    MissingField { field: String },

    #[error("Invalid format: {message}")]
    InvalidFormat { message: String },

    #[error("Unsupported file type: {extension}")]
    UnsupportedFileType { extension: String },

    // Resource errors
    #[error("Resource not found: {resource_type} with id {id}")]
    NotFound { resource_type: String, id: String },

    #[error("Project not found: {id}")]
    ProjectNotFound { id: String },

    #[error("Source not found: {id}")]
    SourceNotFound { id: String },

    #[error("Document not found: {id}")]
    DocumentNotFound { id: String },

    #[error("Conversation not found: {id}")]
    ConversationNotFound { id: String },

    // Conflict errors
    #[error("Sync already in progress for source {source_id}")]
    SyncInProgress { source_id: String },

    // Database errors
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("Database connection error: {message}")]
    DatabaseConnection { message: String },

    // External service errors
    #[error("Repository fetch error: {message}")]
    RepositoryFetch { message: String },

    #[error("Upstream rate limit exceeded: {message}")]
    UpstreamRateLimited { message: String },

    #[error("Embedding service error: {message}")]
    EmbeddingError { message: String },

    #[error("Embedding timeout after {timeout_ms}ms")]
    EmbeddingTimeout { timeout_ms: u64 },

    #[error("Language model error: {message}")]
    CompletionError { message: String },

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    // Internal errors
    #[error("Internal server error: {message}")]
    Internal { message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Service unavailable: {message}")]
    ServiceUnavailable { message: String },

    // Generic
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl AppError {
    /// Get the error code for this error
    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::Validation { .. } => ErrorCode::ValidationError,
            AppError::MissingField { .. } => ErrorCode::MissingField,
            AppError::InvalidFormat { .. } => ErrorCode::InvalidFormat,
            AppError::UnsupportedFileType { .. } => ErrorCode::UnsupportedFileType,
            AppError::NotFound { .. } => ErrorCode::NotFound,
            AppError::ProjectNotFound { .. } => ErrorCode::ProjectNotFound,
            AppError::SourceNotFound { .. } => ErrorCode::SourceNotFound,
            AppError::DocumentNotFound { .. } => ErrorCode::DocumentNotFound,
            AppError::ConversationNotFound { .. } => ErrorCode::ConversationNotFound,
            AppError::SyncInProgress { .. } => ErrorCode::SyncInProgress,
            AppError::Database(_) => ErrorCode::DatabaseError,
            AppError::DatabaseConnection { .. } => ErrorCode::ConnectionError,
            AppError::RepositoryFetch { .. } => ErrorCode::RepositoryFetchError,
            AppError::UpstreamRateLimited { .. } => ErrorCode::UpstreamRateLimited,
            AppError::EmbeddingError { .. } => ErrorCode::EmbeddingError,
            AppError::EmbeddingTimeout { .. } => ErrorCode::EmbeddingTimeout,
            AppError::CompletionError { .. } => ErrorCode::CompletionError,
            AppError::HttpClient(_) => ErrorCode::UpstreamError,
            AppError::Internal { .. } => ErrorCode::InternalError,
            AppError::Configuration { .. } => ErrorCode::ConfigurationError,
            AppError::DimensionMismatch { .. } => ErrorCode::DimensionMismatch,
            AppError::Serialization(_) => ErrorCode::SerializationError,
            AppError::ServiceUnavailable { .. } => ErrorCode::ServiceUnavailable,
            AppError::Other(_) => ErrorCode::InternalError,
        }
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            // 422 Unprocessable Entity
            AppError::Validation { .. }
            | AppError::MissingField { .. }
            | AppError::InvalidFormat { .. }
            | AppError::UnsupportedFileType { .. } => StatusCode::UNPROCESSABLE_ENTITY,

            // 404 Not Found
            AppError::NotFound { .. }
            | AppError::ProjectNotFound { .. }
            | AppError::SourceNotFound { .. }
            | AppError::DocumentNotFound { .. }
            | AppError::ConversationNotFound { .. } => StatusCode::NOT_FOUND,

            // 409 Conflict
            AppError::SyncInProgress { .. } => StatusCode::CONFLICT,

            // 500 Internal Server Error
            AppError::Database(_)
            | AppError::DatabaseConnection { .. }
            | AppError::Internal { .. }
            | AppError::Configuration { .. }
            | AppError::DimensionMismatch { .. }
            | AppError::Serialization(_)
            | AppError::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,

            // 502 Bad Gateway
            AppError::RepositoryFetch { .. }
            | AppError::UpstreamRateLimited { .. }
            | AppError::EmbeddingError { .. }
            | AppError::EmbeddingTimeout { .. }
            | AppError::CompletionError { .. }
            | AppError::HttpClient(_) => StatusCode::BAD_GATEWAY,

            // 503 Service Unavailable
            AppError::ServiceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Check if this error should be logged at error level
    pub fn is_server_error(&self) -> bool {
        self.status_code().is_server_error()
    }

    /// Check if this error is a client error
    pub fn is_client_error(&self) -> bool {
        self.status_code().is_client_error()
    }

    /// Whether a retry of the failed operation could succeed.
    ///
    /// Validation and configuration failures are permanent; upstream
    /// failures are transient. Dimension mismatches must never be retried.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            AppError::RepositoryFetch { .. }
                | AppError::UpstreamRateLimited { .. }
                | AppError::EmbeddingError { .. }
                | AppError::EmbeddingTimeout { .. }
                | AppError::CompletionError { .. }
                | AppError::HttpClient(_)
                | AppError::ServiceUnavailable { .. }
        )
    }
}

/// Structured error response for API
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetails,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetails {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.code();
        let message = self.to_string();

        // Log based on severity
        if self.is_server_error() {
            tracing::error!(
                error = %message,
                code = ?code,
                status = status.as_u16(),
                "Server error"
            );
        } else if self.is_client_error() {
            tracing::warn!(
                error = %message,
                code = ?code,
                status = status.as_u16(),
                "Client error"
            );
        }

        let body = ErrorResponse {
            error: ErrorDetails {
                code,
                message,
                details: None,
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Internal {
            message: err.to_string(),
        }
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Configuration {
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_mapping() {
        let err = AppError::ProjectNotFound { id: "test".into() };
        assert_eq!(err.code(), ErrorCode::ProjectNotFound);
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_validation_error() {
        let err = AppError::Validation {
            message: "Query must not be empty".into(),
            field: Some("query".into()),
        };
        assert_eq!(err.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
        assert!(!err.is_server_error());
        assert!(err.is_client_error());
    }

    #[test]
    fn test_sync_conflict() {
        let err = AppError::SyncInProgress {
            source_id: "abc".into(),
        };
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
        assert_eq!(err.code().as_code(), 5002);
    }

    #[test]
    fn test_dimension_mismatch_is_permanent() {
        let err = AppError::DimensionMismatch {
            expected: 768,
            actual: 1536,
        };
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!err.is_transient());
    }

    #[test]
    fn test_upstream_errors_are_transient() {
        let err = AppError::EmbeddingError {
            message: "connection refused".into(),
        };
        assert_eq!(err.status_code(), StatusCode::BAD_GATEWAY);
        assert!(err.is_transient());
    }
}
