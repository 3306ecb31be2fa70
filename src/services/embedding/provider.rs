//! Embedding Provider Abstraction Layer
//!
//! Defines the async `EmbeddingProvider` trait and supporting types for
//! pluggable embedding backends. The retrieval pipeline only ever sees this
//! trait; which backend sits behind it is a construction-time decision.
//!
//! Every implementation must return unit-norm rows so that inner product
//! search equals cosine similarity.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

use agentic_rag_core::ProxyConfig;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that can occur during embedding operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EmbeddingError {
    /// Authentication failed (invalid or missing API key).
    AuthenticationFailed { message: String },

    /// The requested model was not found or is not available.
    ModelNotFound { model: String },

    /// The provider is not reachable or not running.
    ProviderUnavailable { message: String },

    /// The input batch exceeds the provider's maximum batch size.
    BatchSizeLimitExceeded {
        requested: usize,
        max_allowed: usize,
    },

    /// The input text exceeds the provider's maximum token/character limit.
    InputTooLong { message: String },

    /// A network or connection error occurred, including timeouts.
    NetworkError { message: String },

    /// The provider returned an unexpected or unparseable response.
    ParseError { message: String },

    /// The provider returned an HTTP error.
    ServerError {
        message: String,
        status: Option<u16>,
    },

    /// Rate limit exceeded.
    RateLimited {
        message: String,
        retry_after: Option<u32>,
    },

    /// Configuration is invalid or incomplete.
    InvalidConfig { message: String },

    /// Any other error.
    Other { message: String },
}

impl fmt::Display for EmbeddingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AuthenticationFailed { message } => {
                write!(f, "authentication failed: {}", message)
            }
            Self::ModelNotFound { model } => write!(f, "model not found: {}", model),
            Self::ProviderUnavailable { message } => {
                write!(f, "provider unavailable: {}", message)
            }
            Self::BatchSizeLimitExceeded {
                requested,
                max_allowed,
            } => write!(
                f,
                "batch size {} exceeds maximum {}",
                requested, max_allowed
            ),
            Self::InputTooLong { message } => write!(f, "input too long: {}", message),
            Self::NetworkError { message } => write!(f, "network error: {}", message),
            Self::ParseError { message } => write!(f, "parse error: {}", message),
            Self::ServerError { message, status } => {
                if let Some(code) = status {
                    write!(f, "server error (HTTP {}): {}", code, message)
                } else {
                    write!(f, "server error: {}", message)
                }
            }
            Self::RateLimited { message, .. } => write!(f, "rate limited: {}", message),
            Self::InvalidConfig { message } => write!(f, "invalid config: {}", message),
            Self::Other { message } => write!(f, "{}", message),
        }
    }
}

impl std::error::Error for EmbeddingError {}

impl EmbeddingError {
    /// Whether this error is transient and the operation should be retried.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            EmbeddingError::NetworkError { .. }
                | EmbeddingError::RateLimited { .. }
                | EmbeddingError::ServerError { .. }
                | EmbeddingError::ProviderUnavailable { .. }
        )
    }

    /// For rate-limited errors, return the suggested wait time in seconds.
    pub fn retry_after_secs(&self) -> Option<u64> {
        if let EmbeddingError::RateLimited { retry_after, .. } = self {
            retry_after.map(|s| s as u64)
        } else {
            None
        }
    }
}

impl From<agentic_rag_core::CoreError> for EmbeddingError {
    fn from(err: agentic_rag_core::CoreError) -> Self {
        EmbeddingError::InvalidConfig {
            message: err.to_string(),
        }
    }
}

/// Convenience alias for embedding operation results.
pub type EmbeddingResult<T> = Result<T, EmbeddingError>;

// ---------------------------------------------------------------------------
// Provider type enum
// ---------------------------------------------------------------------------

/// Identifies the embedding backend type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmbeddingProviderType {
    /// Local feature hashing (no model, no network).
    Hashing,
    /// Ollama local embedding models.
    Ollama,
    /// OpenAI embedding models (text-embedding-3-small, etc.).
    #[serde(rename = "openai")]
    OpenAI,
    /// Hugging Face hosted feature extraction.
    HfInference,
    /// Local ONNX sentence-transformers via fastembed.
    FastEmbed,
}

impl EmbeddingProviderType {
    /// Returns the default capability metadata for this provider type.
    pub fn default_capability(&self) -> EmbeddingProviderCapability {
        match self {
            Self::Hashing => EmbeddingProviderCapability {
                provider_type: *self,
                display_name: "Feature hashing (Local)".to_string(),
                is_local: true,
                requires_api_key: false,
                default_model: "hashing".to_string(),
                default_dimension: 384,
                max_batch_size: 1024,
                supported_dimensions: None,
            },
            Self::Ollama => EmbeddingProviderCapability {
                provider_type: *self,
                display_name: "Ollama".to_string(),
                is_local: true,
                requires_api_key: false,
                default_model: "nomic-embed-text".to_string(),
                default_dimension: 768,
                max_batch_size: 64,
                supported_dimensions: None,
            },
            Self::OpenAI => EmbeddingProviderCapability {
                provider_type: *self,
                display_name: "OpenAI".to_string(),
                is_local: false,
                requires_api_key: true,
                default_model: "text-embedding-3-small".to_string(),
                default_dimension: 1536,
                max_batch_size: 2048,
                supported_dimensions: Some(vec![256, 512, 1024, 1536, 3072]),
            },
            Self::HfInference => EmbeddingProviderCapability {
                provider_type: *self,
                display_name: "Hugging Face Inference".to_string(),
                is_local: false,
                requires_api_key: true,
                default_model: "sentence-transformers/all-MiniLM-L6-v2".to_string(),
                default_dimension: 384,
                max_batch_size: 32,
                supported_dimensions: None,
            },
            Self::FastEmbed => EmbeddingProviderCapability {
                provider_type: *self,
                display_name: "FastEmbed (Local)".to_string(),
                is_local: true,
                requires_api_key: false,
                default_model: "sentence-transformers/all-MiniLM-L6-v2".to_string(),
                default_dimension: 384,
                max_batch_size: 256,
                supported_dimensions: None,
            },
        }
    }
}

impl fmt::Display for EmbeddingProviderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hashing => write!(f, "hashing"),
            Self::Ollama => write!(f, "ollama"),
            Self::OpenAI => write!(f, "openai"),
            Self::HfInference => write!(f, "hf_inference"),
            Self::FastEmbed => write!(f, "fastembed"),
        }
    }
}

impl std::str::FromStr for EmbeddingProviderType {
    type Err = EmbeddingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hashing" => Ok(Self::Hashing),
            "ollama" => Ok(Self::Ollama),
            "openai" => Ok(Self::OpenAI),
            "hf_inference" | "hf-inference" | "huggingface" => Ok(Self::HfInference),
            "fastembed" | "local" => Ok(Self::FastEmbed),
            other => Err(EmbeddingError::InvalidConfig {
                message: format!("unknown embedding provider '{}'", other),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// Provider configuration
// ---------------------------------------------------------------------------

/// Configuration for an embedding provider instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingProviderConfig {
    /// The embedding backend type.
    pub provider: EmbeddingProviderType,

    /// Model identifier (e.g., "text-embedding-3-small", "nomic-embed-text").
    pub model: String,

    /// API key for remote providers. Not needed for local providers.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Base URL override for the provider API.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// Desired embedding dimension. If `None`, the provider's default is used.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dimension: Option<usize>,

    /// Maximum number of texts to embed in a single request.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// HTTP timeout for remote providers, in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Resolved proxy configuration. None means a direct connection.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub proxy: Option<ProxyConfig>,
}

fn default_batch_size() -> usize {
    32
}

fn default_timeout_secs() -> u64 {
    60
}

impl EmbeddingProviderConfig {
    /// Create a new configuration with sensible defaults for the given provider type.
    pub fn new(provider: EmbeddingProviderType) -> Self {
        let capability = provider.default_capability();
        Self {
            provider,
            model: capability.default_model,
            api_key: None,
            base_url: None,
            dimension: None,
            batch_size: capability.max_batch_size.min(default_batch_size()),
            timeout_secs: default_timeout_secs(),
            proxy: None,
        }
    }

    /// Validate the configuration and return the first failure found.
    pub fn validate(&self) -> EmbeddingResult<()> {
        let capability = self.provider.default_capability();

        if capability.requires_api_key
            && self.api_key.as_deref().map_or(true, |k| k.trim().is_empty())
        {
            return Err(EmbeddingError::InvalidConfig {
                message: format!(
                    "{} requires an API key but none was provided",
                    capability.display_name
                ),
            });
        }

        if self.model.trim().is_empty() {
            return Err(EmbeddingError::InvalidConfig {
                message: "model name must not be empty".to_string(),
            });
        }

        if self.batch_size == 0 {
            return Err(EmbeddingError::InvalidConfig {
                message: "batch_size must be at least 1".to_string(),
            });
        }
        if self.batch_size > capability.max_batch_size {
            return Err(EmbeddingError::InvalidConfig {
                message: format!(
                    "batch_size {} exceeds {} maximum of {}",
                    self.batch_size, capability.display_name, capability.max_batch_size
                ),
            });
        }

        if let Some(dim) = self.dimension {
            if dim == 0 {
                return Err(EmbeddingError::InvalidConfig {
                    message: "dimension must be at least 1".to_string(),
                });
            }
            if let Some(ref supported) = capability.supported_dimensions {
                if !supported.contains(&dim) {
                    return Err(EmbeddingError::InvalidConfig {
                        message: format!(
                            "dimension {} is not supported by {}; supported: {:?}",
                            dim, capability.display_name, supported
                        ),
                    });
                }
            }
        }

        Ok(())
    }

    /// Returns the effective dimension: the configured dimension or the provider's default.
    pub fn effective_dimension(&self) -> usize {
        self.dimension
            .unwrap_or(self.provider.default_capability().default_dimension)
    }

    /// Returns the effective model name (trimmed).
    pub fn effective_model(&self) -> &str {
        self.model.trim()
    }
}

impl Default for EmbeddingProviderConfig {
    fn default() -> Self {
        Self::new(EmbeddingProviderType::Hashing)
    }
}

// ---------------------------------------------------------------------------
// Provider capability metadata
// ---------------------------------------------------------------------------

/// Metadata describing a provider's capabilities and defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingProviderCapability {
    pub provider_type: EmbeddingProviderType,
    pub display_name: String,
    pub is_local: bool,
    pub requires_api_key: bool,
    pub default_model: String,
    pub default_dimension: usize,
    pub max_batch_size: usize,
    /// `None` means the dimension is fixed by the model.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supported_dimensions: Option<Vec<usize>>,
}

// ---------------------------------------------------------------------------
// Embedding provider trait
// ---------------------------------------------------------------------------

/// Async trait for embedding providers.
///
/// Implementations produce dense, L2-normalized vectors. The trait is
/// object-safe and `Send + Sync` so one instance can be shared through
/// `Arc<dyn EmbeddingProvider>` across Tokio tasks.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a batch of texts. One row per input, in input order.
    async fn embed_documents(&self, documents: &[&str]) -> EmbeddingResult<Vec<Vec<f32>>>;

    /// Embed a single query text.
    ///
    /// The default implementation delegates to `embed_documents` with a
    /// single-element slice.
    async fn embed_query(&self, query: &str) -> EmbeddingResult<Vec<f32>> {
        let results = self.embed_documents(&[query]).await?;
        results.into_iter().next().ok_or_else(|| EmbeddingError::Other {
            message: "embed_documents returned empty results for single query".to_string(),
        })
    }

    /// Dimensionality of produced vectors, or 0 while still unknown.
    fn dimension(&self) -> usize;

    /// Check if the provider is healthy and reachable.
    async fn health_check(&self) -> EmbeddingResult<()>;

    /// Maximum number of texts accepted by one `embed_documents` call.
    fn max_batch_size(&self) -> usize;

    /// Returns the provider type identifier.
    fn provider_type(&self) -> EmbeddingProviderType;

    /// Returns a human-readable name for this provider instance.
    fn display_name(&self) -> &str;
}

/// Scale `vector` to unit length in place. Zero vectors are left untouched.
pub fn l2_normalize(vector: &mut [f32]) {
    let norm: f32 = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > f32::EPSILON {
        for v in vector.iter_mut() {
            *v /= norm;
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
