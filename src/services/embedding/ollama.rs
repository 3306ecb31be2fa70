//! Ollama Embedding Provider
//!
//! Local embedding models served by Ollama, through the `ollama-rs` SDK.
//! No API key. The dimension is learned from the first response.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use ollama_rs::generation::embeddings::request::{EmbeddingsInput, GenerateEmbeddingsRequest};
use ollama_rs::Ollama;

use agentic_rag_llm::build_http_client;

use super::provider::{
    l2_normalize, EmbeddingError, EmbeddingProvider, EmbeddingProviderConfig,
    EmbeddingProviderType, EmbeddingResult,
};

/// Default Ollama API endpoint.
const OLLAMA_DEFAULT_URL: &str = "http://localhost:11434";

/// Default embedding model.
const DEFAULT_MODEL: &str = "nomic-embed-text";

/// Maximum batch size for Ollama embedding requests.
const MAX_BATCH_SIZE: usize = 64;

pub struct OllamaEmbeddingProvider {
    client: Ollama,
    model: String,
    /// 0 until the first successful call unless configured.
    dimension: AtomicUsize,
    display_name: String,
    base_url: String,
}

impl OllamaEmbeddingProvider {
    pub fn new(config: &EmbeddingProviderConfig) -> EmbeddingResult<Self> {
        let model = if config.model.trim().is_empty() {
            DEFAULT_MODEL.to_string()
        } else {
            config.model.clone()
        };

        let base_url = config
            .base_url
            .as_deref()
            .unwrap_or(OLLAMA_DEFAULT_URL)
            .to_string();

        let client = Self::create_client(&base_url, config)?;
        let display_name = format!("Ollama ({})", model);

        Ok(Self {
            client,
            model,
            dimension: AtomicUsize::new(config.dimension.unwrap_or(0)),
            display_name,
            base_url,
        })
    }

    fn create_client(base_url: &str, config: &EmbeddingProviderConfig) -> EmbeddingResult<Ollama> {
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

    fn map_ollama_error(&self, err: ollama_rs::error::OllamaError) -> EmbeddingError {
        let msg = err.to_string();

        if msg.contains("connect") || msg.contains("Connection refused") {
            EmbeddingError::ProviderUnavailable {
                message: format!(
                    "Cannot connect to Ollama at {}. Is the server running? Start it with: ollama serve",
                    self.base_url
                ),
            }
        } else if msg.contains("not found") || msg.contains("404") {
            EmbeddingError::ModelNotFound {
                model: self.model.clone(),
            }
        } else {
            EmbeddingError::NetworkError { message: msg }
        }
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaEmbeddingProvider {
    async fn embed_documents(&self, documents: &[&str]) -> EmbeddingResult<Vec<Vec<f32>>> {
        if documents.is_empty() {
            return Ok(Vec::new());
        }

        if documents.len() > MAX_BATCH_SIZE {
            return Err(EmbeddingError::BatchSizeLimitExceeded {
                requested: documents.len(),
                max_allowed: MAX_BATCH_SIZE,
            });
        }

        let input = EmbeddingsInput::from(documents.to_vec());
        let request = GenerateEmbeddingsRequest::new(self.model.clone(), input);

        let response = self
            .client
            .generate_embeddings(request)
            .await
            .map_err(|e| self.map_ollama_error(e))?;

        if response.embeddings.len() != documents.len() {
            return Err(EmbeddingError::ParseError {
                message: format!(
                    "expected {} embeddings but Ollama returned {}",
                    documents.len(),
                    response.embeddings.len()
                ),
            });
        }

        let mut embeddings = response.embeddings;
        for row in embeddings.iter_mut() {
            l2_normalize(row);
        }
        if let Some(first) = embeddings.first().filter(|r| !r.is_empty()) {
            self.dimension.store(first.len(), Ordering::Relaxed);
        }

        Ok(embeddings)
    }

    fn dimension(&self) -> usize {
        self.dimension.load(Ordering::Relaxed)
    }

    async fn health_check(&self) -> EmbeddingResult<()> {
        let models = self
            .client
            .list_local_models()
            .await
            .map_err(|e| self.map_ollama_error(e))?;

        let model_base = self.model.split(':').next().unwrap_or(&self.model);
        let available = models.iter().any(|m| {
            let local_base = m.name.split(':').next().unwrap_or(&m.name);
            local_base == model_base || m.name == self.model
        });

        if available {
            Ok(())
        } else {
            Err(EmbeddingError::ModelNotFound {
                model: format!(
                    "'{}' is not available locally. Pull it with: ollama pull {}",
                    self.model, self.model
                ),
            })
        }
    }

    fn max_batch_size(&self) -> usize {
        MAX_BATCH_SIZE
    }

    fn provider_type(&self) -> EmbeddingProviderType {
        EmbeddingProviderType::Ollama
    }

    fn display_name(&self) -> &str {
        &self.display_name
    }
}
