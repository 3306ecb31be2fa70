//! LLM Types
//!
//! Configuration and error types for text generation providers.

use agentic_rag_core::error::CoreError;
use agentic_rag_core::proxy::ProxyConfig;
use serde::{Deserialize, Serialize};

/// Supported text generation backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderType {
    /// Canned responses, no network. The default.
    Mock,
    #[serde(rename = "openai")]
    OpenAI,
    Ollama,
    /// Hugging Face hosted text generation.
    HfInference,
}

impl ProviderType {
    /// Default model for this backend.
    pub fn default_model(&self) -> &'static str {
        match self {
            ProviderType::Mock => "mock",
            ProviderType::OpenAI => "gpt-4o-mini",
            ProviderType::Ollama => "qwen2.5:0.5b",
            ProviderType::HfInference => "Qwen/Qwen2.5-0.5B-Instruct",
        }
    }

    /// Whether requests need an API key or token.
    pub fn requires_api_key(&self) -> bool {
        matches!(self, ProviderType::OpenAI | ProviderType::HfInference)
    }
}

impl std::fmt::Display for ProviderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderType::Mock => write!(f, "mock"),
            ProviderType::OpenAI => write!(f, "openai"),
            ProviderType::Ollama => write!(f, "ollama"),
            ProviderType::HfInference => write!(f, "hf_inference"),
        }
    }
}

impl std::str::FromStr for ProviderType {
    type Err = LlmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mock" => Ok(ProviderType::Mock),
            "openai" => Ok(ProviderType::OpenAI),
            "ollama" => Ok(ProviderType::Ollama),
            "hf_inference" | "hf-inference" | "huggingface" => Ok(ProviderType::HfInference),
            other => Err(LlmError::InvalidRequest {
                message: format!("unknown provider '{}'", other),
            }),
        }
    }
}

/// Configuration for a text generation provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// The provider type
    pub provider: ProviderType,
    /// API key or token (not needed for Mock and Ollama)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Base URL override (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Model name to use
    pub model: String,
    /// Maximum tokens to generate
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Attempts per request for transient failures (OpenAI, HF inference)
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Resolved proxy for this provider. None means a direct connection.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub proxy: Option<ProxyConfig>,
}

fn default_max_tokens() -> u32 {
    800
}

fn default_temperature() -> f32 {
    0.2
}

fn default_max_retries() -> u32 {
    3
}

fn default_timeout_secs() -> u64 {
    60
}

impl ProviderConfig {
    /// Defaults for the given backend.
    pub fn new(provider: ProviderType) -> Self {
        Self {
            provider,
            model: provider.default_model().to_string(),
            ..Default::default()
        }
    }

    /// Validate the configuration, returning the first problem found.
    pub fn validate(&self) -> LlmResult<()> {
        if self.provider.requires_api_key()
            && self.api_key.as_deref().map_or(true, |k| k.trim().is_empty())
        {
            return Err(LlmError::AuthenticationFailed {
                message: format!("API key not configured for {}", self.provider),
            });
        }
        if self.model.trim().is_empty() {
            return Err(LlmError::InvalidRequest {
                message: "model name must not be empty".to_string(),
            });
        }
        if self.max_tokens == 0 {
            return Err(LlmError::InvalidRequest {
                message: "max_tokens must be at least 1".to_string(),
            });
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(LlmError::InvalidRequest {
                message: format!("temperature {} outside [0, 2]", self.temperature),
            });
        }
        Ok(())
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            provider: ProviderType::Mock,
            api_key: None,
            base_url: None,
            model: ProviderType::Mock.default_model().to_string(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            max_retries: default_max_retries(),
            timeout_secs: default_timeout_secs(),
            proxy: None,
        }
    }
}

/// Error types for LLM operations
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LlmError {
    /// Authentication failed (invalid or missing API key)
    AuthenticationFailed { message: String },
    /// Rate limit exceeded
    RateLimited {
        message: String,
        retry_after: Option<u32>,
    },
    /// Model not found or not available
    ModelNotFound { model: String },
    /// Invalid request (bad parameters)
    InvalidRequest { message: String },
    /// Server error from the provider
    ServerError {
        message: String,
        status: Option<u16>,
    },
    /// Network/connection error
    NetworkError { message: String },
    /// Response parsing error
    ParseError { message: String },
    /// Provider not available (e.g., Ollama not running, model still loading)
    ProviderUnavailable { message: String },
    /// Other error
    Other { message: String },
}

impl LlmError {
    /// Whether the request may succeed if sent again.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            LlmError::RateLimited { .. }
                | LlmError::ServerError { .. }
                | LlmError::NetworkError { .. }
                | LlmError::ProviderUnavailable { .. }
        )
    }
}

impl std::fmt::Display for LlmError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LlmError::AuthenticationFailed { message } => {
                write!(f, "Authentication failed: {}", message)
            }
            LlmError::RateLimited { message, .. } => {
                write!(f, "Rate limited: {}", message)
            }
            LlmError::ModelNotFound { model } => {
                write!(f, "Model not found: {}", model)
            }
            LlmError::InvalidRequest { message } => {
                write!(f, "Invalid request: {}", message)
            }
            LlmError::ServerError { message, status } => {
                if let Some(s) = status {
                    write!(f, "Server error ({}): {}", s, message)
                } else {
                    write!(f, "Server error: {}", message)
                }
            }
            LlmError::NetworkError { message } => {
                write!(f, "Network error: {}", message)
            }
            LlmError::ParseError { message } => {
                write!(f, "Parse error: {}", message)
            }
            LlmError::ProviderUnavailable { message } => {
                write!(f, "Provider unavailable: {}", message)
            }
            LlmError::Other { message } => {
                write!(f, "Error: {}", message)
            }
        }
    }
}

impl std::error::Error for LlmError {}

impl From<CoreError> for LlmError {
    fn from(err: CoreError) -> Self {
        LlmError::InvalidRequest {
            message: err.to_string(),
        }
    }
}

/// Result type for LLM operations
pub type LlmResult<T> = Result<T, LlmError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_config_default() {
        let config = ProviderConfig::default();
        assert_eq!(config.provider, ProviderType::Mock);
        assert_eq!(config.max_tokens, 800);
        assert!((config.temperature - 0.2).abs() < f32::EPSILON);
        assert_eq!(config.max_retries, 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_provider_config_serialization() {
        let config = ProviderConfig {
            api_key: Some("sk-test".to_string()),
            max_tokens: 256,
            ..ProviderConfig::new(ProviderType::OpenAI)
        };

        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("\"provider\":\"openai\""));
        let parsed: ProviderConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.model, "gpt-4o-mini");
        assert_eq!(parsed.max_tokens, 256);
    }

    #[test]
    fn test_missing_fields_take_defaults() {
        let parsed: ProviderConfig =
            serde_json::from_str(r#"{"provider":"hf_inference","model":"m"}"#).unwrap();
        assert_eq!(parsed.provider, ProviderType::HfInference);
        assert_eq!(parsed.max_tokens, 800);
        assert_eq!(parsed.timeout_secs, 60);
    }

    #[test]
    fn test_remote_provider_requires_key() {
        let config = ProviderConfig::new(ProviderType::OpenAI);
        assert!(matches!(
            config.validate(),
            Err(LlmError::AuthenticationFailed { .. })
        ));

        let ollama = ProviderConfig::new(ProviderType::Ollama);
        assert!(ollama.validate().is_ok());
    }

    #[test]
    fn test_temperature_bounds() {
        let config = ProviderConfig {
            temperature: 3.5,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(LlmError::InvalidRequest { .. })
        ));
    }

    #[test]
    fn test_provider_type_parse() {
        assert_eq!("OpenAI".parse::<ProviderType>().unwrap(), ProviderType::OpenAI);
        assert_eq!(
            "hf-inference".parse::<ProviderType>().unwrap(),
            ProviderType::HfInference
        );
        assert!("anthropic".parse::<ProviderType>().is_err());
    }

    #[test]
    fn test_llm_error_display_and_retry() {
        let err = LlmError::AuthenticationFailed {
            message: "Invalid API key".to_string(),
        };
        assert!(err.to_string().contains("Authentication failed"));
        assert!(!err.is_retryable());

        let err = LlmError::RateLimited {
            message: "Too many requests".to_string(),
            retry_after: Some(60),
        };
        assert!(err.to_string().contains("Rate limited"));
        assert!(err.is_retryable());
    }
}
