//! Error Handling
//!
//! Unified error types for the retrieval pipeline and its host.
//! Uses thiserror for ergonomic error definitions.

use agentic_rag_core::CoreError;
use agentic_rag_llm::LlmError;
use thiserror::Error;

use crate::services::embedding::EmbeddingError;

/// Application-wide error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Invalid parameters or settings; retrying will not help
    #[error("Configuration error: {0}")]
    Config(String),

    /// A vector's length differs from the index dimensionality
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// The embedding backend failed; usually transient
    #[error("Embedding unavailable: {0}")]
    EmbeddingUnavailable(String),

    /// The relevance scorer or reranking agent failed
    #[error("Rerank unavailable: {0}")]
    RerankUnavailable(String),

    /// Text generation failed outside of reranking
    #[error("Generation unavailable: {0}")]
    GenerationUnavailable(String),

    /// A document could not be read or decoded
    #[error("Document load error: {0}")]
    DocumentLoad(String),

    /// File I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Not found errors
    #[error("Not found: {0}")]
    NotFound(String),

    /// Generic internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for application errors
pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a dimension mismatch error
    pub fn dimension_mismatch(expected: usize, actual: usize) -> Self {
        Self::DimensionMismatch { expected, actual }
    }

    /// Create an embedding unavailable error
    pub fn embedding(msg: impl Into<String>) -> Self {
        Self::EmbeddingUnavailable(msg.into())
    }

    /// Create a rerank unavailable error
    pub fn rerank(msg: impl Into<String>) -> Self {
        Self::RerankUnavailable(msg.into())
    }

    /// Create a document load error
    pub fn document_load(msg: impl Into<String>) -> Self {
        Self::DocumentLoad(msg.into())
    }

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a not found error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

impl From<EmbeddingError> for AppError {
    fn from(err: EmbeddingError) -> Self {
        match err {
            EmbeddingError::InvalidConfig { message } => AppError::Config(message),
            other => AppError::EmbeddingUnavailable(other.to_string()),
        }
    }
}

/// Generation failures outside reranking. The rerankers map `LlmError`
/// to `RerankUnavailable` themselves.
impl From<LlmError> for AppError {
    fn from(err: LlmError) -> Self {
        AppError::GenerationUnavailable(err.to_string())
    }
}

impl From<CoreError> for AppError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Config(msg) => AppError::Config(msg),
            CoreError::Io(e) => AppError::Io(e),
            CoreError::Serialization(e) => AppError::Serialization(e),
            CoreError::Validation(msg) => AppError::Validation(msg),
            CoreError::Internal(msg) => AppError::Internal(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = AppError::config("chunk_overlap must be smaller than chunk_size");
        assert_eq!(
            err.to_string(),
            "Configuration error: chunk_overlap must be smaller than chunk_size"
        );
    }

    #[test]
    fn test_dimension_mismatch_display() {
        let err = AppError::dimension_mismatch(384, 768);
        assert_eq!(err.to_string(), "Dimension mismatch: expected 384, got 768");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let app_err: AppError = io_err.into();
        assert!(matches!(app_err, AppError::Io(_)));
    }

    #[test]
    fn test_embedding_error_conversion() {
        let err: AppError = EmbeddingError::NetworkError {
            message: "reset".to_string(),
        }
        .into();
        assert!(matches!(err, AppError::EmbeddingUnavailable(_)));

        let err: AppError = EmbeddingError::InvalidConfig {
            message: "no model".to_string(),
        }
        .into();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[test]
    fn test_llm_error_conversion() {
        let err: AppError = LlmError::RateLimited {
            message: "slow down".to_string(),
            retry_after: None,
        }
        .into();
        assert!(matches!(err, AppError::GenerationUnavailable(_)));
    }

    #[test]
    fn test_core_error_conversion() {
        let err: AppError = CoreError::config("bad proxy").into();
        assert!(matches!(err, AppError::Config(_)));
    }
}
