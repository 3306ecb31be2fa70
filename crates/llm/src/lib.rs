//! Agentic RAG LLM
//!
//! Unified text generation interface over several backends:
//! - Mock (offline, default)
//! - OpenAI and OpenAI-compatible endpoints
//! - Ollama (local inference)
//! - Hugging Face Inference API
//!
//! Also provides the shared HTTP client factory.

pub mod hf_inference;
pub mod http_client;
pub mod mock;
pub mod ollama;
pub mod openai;
pub mod provider;
pub mod types;

use std::sync::Arc;

// Re-export main types
pub use hf_inference::HfInferenceProvider;
pub use http_client::build_http_client;
pub use mock::MockProvider;
pub use ollama::OllamaProvider;
pub use openai::OpenAIProvider;
pub use provider::LlmProvider;
pub use types::*;

/// Build the provider selected by `config.provider`.
pub fn create_provider(config: ProviderConfig) -> LlmResult<Arc<dyn LlmProvider>> {
    config.validate()?;
    tracing::debug!(provider = %config.provider, model = %config.model, "creating LLM provider");
    let provider: Arc<dyn LlmProvider> = match config.provider {
        ProviderType::Mock => Arc::new(MockProvider::new(config)),
        ProviderType::OpenAI => Arc::new(OpenAIProvider::new(config)?),
        ProviderType::Ollama => Arc::new(OllamaProvider::new(config)?),
        ProviderType::HfInference => Arc::new(HfInferenceProvider::new(config)?),
    };
    Ok(provider)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_provider_dispatches_on_type() {
        let mock = create_provider(ProviderConfig::default()).unwrap();
        assert_eq!(mock.name(), "mock");

        let openai = create_provider(ProviderConfig {
            api_key: Some("sk-test".to_string()),
            ..ProviderConfig::new(ProviderType::OpenAI)
        })
        .unwrap();
        assert_eq!(openai.name(), "openai");
        assert_eq!(openai.model(), "gpt-4o-mini");
    }

    #[test]
    fn create_provider_validates_first() {
        let result = create_provider(ProviderConfig::new(ProviderType::HfInference));
        assert!(matches!(result, Err(LlmError::AuthenticationFailed { .. })));
    }
}
