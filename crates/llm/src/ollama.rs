//! Ollama Provider
//!
//! Local text generation through the ollama-rs native SDK. No API key.

use std::time::Duration;

use async_trait::async_trait;
use ollama_rs::generation::chat::request::ChatMessageRequest;
use ollama_rs::generation::chat::ChatMessage;
use ollama_rs::models::ModelOptions;
use ollama_rs::Ollama;

use super::provider::LlmProvider;
use super::types::{LlmError, LlmResult, ProviderConfig};
use crate::http_client::build_http_client;

/// Default Ollama API endpoint
const OLLAMA_DEFAULT_URL: &str = "http://localhost:11434";

/// Ollama provider for local inference
pub struct OllamaProvider {
    config: ProviderConfig,
    client: Ollama,
}

impl OllamaProvider {
    /// Create a new Ollama provider with the given configuration
    pub fn new(config: ProviderConfig) -> LlmResult<Self> {
        let base_url = config
            .base_url
            .as_deref()
            .unwrap_or(OLLAMA_DEFAULT_URL)
            .to_string();
        let client = Self::create_client(&base_url, &config)?;
        Ok(Self { config, client })
    }

    /// Parse host and port out of `base_url`; an unparseable URL falls back
    /// to the SDK default of localhost:11434.
    fn create_client(base_url: &str, config: &ProviderConfig) -> LlmResult<Ollama> {
        let Ok(parsed) = url::Url::parse(base_url) else {
            return Ok(Ollama::default());
        };
        let host = parsed.host_str().unwrap_or("localhost");
        let port = parsed.port().unwrap_or(11434);
        let host_url = format!("{}://{}", parsed.scheme(), host);
        let http_client = build_http_client(
            config.proxy.as_ref(),
            Some(Duration::from_secs(config.timeout_secs)),
        )?;
        Ok(Ollama::new_with_client(host_url, port, http_client))
    }

    fn base_url(&self) -> &str {
        self.config
            .base_url
            .as_deref()
            .unwrap_or(OLLAMA_DEFAULT_URL)
    }

    fn build_chat_request(&self, system: &str, prompt: &str) -> ChatMessageRequest {
        let messages = vec![
            ChatMessage::system(system.to_string()),
            ChatMessage::user(prompt.to_string()),
        ];
        let mut opts = ModelOptions::default().temperature(self.config.temperature);
        if self.config.max_tokens > 0 {
            opts = opts.num_predict(self.config.max_tokens as i32);
        }
        ChatMessageRequest::new(self.config.model.clone(), messages).options(opts)
    }

    fn map_ollama_error(&self, err: ollama_rs::error::OllamaError) -> LlmError {
        let msg = err.to_string();
        if msg.contains("connect") || msg.contains("Connection refused") {
            LlmError::ProviderUnavailable {
                message: format!("Cannot connect to Ollama at {}: {}", self.base_url(), msg),
            }
        } else if msg.contains("not found") || msg.contains("404") {
            LlmError::ModelNotFound {
                model: self.config.model.clone(),
            }
        } else {
            LlmError::NetworkError { message: msg }
        }
    }
}

#[async_trait]
impl LlmProvider for OllamaProvider {
    fn name(&self) -> &'static str {
        "ollama"
    }

    fn model(&self) -> &str {
        &self.config.model
    }

    async fn generate(&self, system: &str, prompt: &str) -> LlmResult<String> {
        let request = self.build_chat_request(system, prompt);
        let response = self
            .client
            .send_chat_messages(request)
            .await
            .map_err(|e| self.map_ollama_error(e))?;

        Ok(response.message.content)
    }

    async fn health_check(&self) -> LlmResult<()> {
        self.client
            .list_local_models()
            .await
            .map_err(|e| self.map_ollama_error(e))?;
        Ok(())
    }

    fn config(&self) -> &ProviderConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ProviderType;

    #[test]
    fn test_provider_creation_with_defaults() {
        let provider = OllamaProvider::new(ProviderConfig::new(ProviderType::Ollama)).unwrap();
        assert_eq!(provider.name(), "ollama");
        assert_eq!(provider.model(), "qwen2.5:0.5b");
        assert_eq!(provider.base_url(), OLLAMA_DEFAULT_URL);
    }

    #[test]
    fn test_custom_base_url() {
        let provider = OllamaProvider::new(ProviderConfig {
            base_url: Some("http://gpu-box:11500".to_string()),
            ..ProviderConfig::new(ProviderType::Ollama)
        })
        .unwrap();
        assert_eq!(provider.base_url(), "http://gpu-box:11500");
    }
}
