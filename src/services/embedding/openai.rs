//! OpenAI Embedding Provider
//!
//! Embeddings via `POST {base_url}` (default `https://api.openai.com/v1/embeddings`)
//! with body `{ model, input: [...], dimensions? }`. Works with any
//! OpenAI-compatible server through `base_url`.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use agentic_rag_llm::build_http_client;

use super::provider::{
    l2_normalize, EmbeddingError, EmbeddingProvider, EmbeddingProviderConfig,
    EmbeddingProviderType, EmbeddingResult,
};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

const OPENAI_EMBEDDING_API_URL: &str = "https://api.openai.com/v1/embeddings";

const DEFAULT_MODEL: &str = "text-embedding-3-small";

const DEFAULT_DIMENSION: usize = 1536;

const MAX_BATCH_SIZE: usize = 2048;

// ---------------------------------------------------------------------------
// API response types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct OpenAIEmbeddingResponse {
    data: Vec<OpenAIEmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct OpenAIEmbeddingData {
    embedding: Vec<f32>,
    index: usize,
}

#[derive(Debug, Deserialize)]
struct OpenAIErrorResponse {
    error: Option<OpenAIErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct OpenAIErrorDetail {
    message: Option<String>,
}

// ---------------------------------------------------------------------------
// Provider implementation
// ---------------------------------------------------------------------------

pub struct OpenAIEmbeddingProvider {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
    dimension: usize,
    display_name: String,
}

impl OpenAIEmbeddingProvider {
    pub fn new(config: &EmbeddingProviderConfig) -> EmbeddingResult<Self> {
        let model = if config.model.trim().is_empty() {
            DEFAULT_MODEL.to_string()
        } else {
            config.model.clone()
        };

        let base_url = config
            .base_url
            .as_deref()
            .unwrap_or(OPENAI_EMBEDDING_API_URL)
            .to_string();

        let client = build_http_client(
            config.proxy.as_ref(),
            Some(Duration::from_secs(config.timeout_secs)),
        )?;

        Ok(Self {
            client,
            api_key: config.api_key.clone().unwrap_or_default(),
            display_name: format!("OpenAI ({})", model),
            model,
            base_url,
            dimension: config.dimension.unwrap_or(DEFAULT_DIMENSION),
        })
    }

    fn build_request_body(&self, input: &[&str]) -> serde_json::Value {
        let mut body = serde_json::json!({
            "model": self.model,
            "input": input,
        });

        // Only text-embedding-3 models accept a reduced output size.
        if self.dimension != DEFAULT_DIMENSION || self.model.contains("text-embedding-3") {
            body["dimensions"] = serde_json::json!(self.dimension);
        }

        body
    }

    async fn post_embeddings(
        &self,
        body: &serde_json::Value,
    ) -> EmbeddingResult<OpenAIEmbeddingResponse> {
        if self.api_key.is_empty() {
            return Err(EmbeddingError::AuthenticationFailed {
                message: "OpenAI API key is not configured".to_string(),
            });
        }

        let response = self
            .client
            .post(&self.base_url)
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| self.map_reqwest_error(e))?;

        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| EmbeddingError::NetworkError {
                message: format!("failed to read response body: {}", e),
            })?;

        if status == 200 {
            serde_json::from_str::<OpenAIEmbeddingResponse>(&text).map_err(|e| {
                EmbeddingError::ParseError {
                    message: format!("failed to parse embedding response: {}", e),
                }
            })
        } else {
            Err(self.map_http_error(status, &text))
        }
    }

    fn map_reqwest_error(&self, err: reqwest::Error) -> EmbeddingError {
        if err.is_connect() {
            EmbeddingError::ProviderUnavailable {
                message: format!("Cannot connect to {}: {}", self.base_url, err),
            }
        } else if err.is_timeout() {
            EmbeddingError::NetworkError {
                message: format!("request to {} timed out", self.base_url),
            }
        } else {
            EmbeddingError::NetworkError {
                message: err.to_string(),
            }
        }
    }

    fn map_http_error(&self, status: u16, body_text: &str) -> EmbeddingError {
        let detail = serde_json::from_str::<OpenAIErrorResponse>(body_text)
            .ok()
            .and_then(|r| r.error)
            .and_then(|d| d.message);
        let message = detail.as_deref().unwrap_or(body_text);

        match status {
            401 | 403 => EmbeddingError::AuthenticationFailed {
                message: format!("OpenAI: {}", message),
            },
            429 => EmbeddingError::RateLimited {
                message: format!("OpenAI rate limit exceeded: {}", message),
                retry_after: None,
            },
            400 if message.contains("token") || message.contains("length") => {
                EmbeddingError::InputTooLong {
                    message: format!("OpenAI: {}", message),
                }
            }
            400 => EmbeddingError::InvalidConfig {
                message: format!("OpenAI bad request: {}", message),
            },
            404 => EmbeddingError::ModelNotFound {
                model: format!("'{}' not found at {}: {}", self.model, self.base_url, message),
            },
            _ => EmbeddingError::ServerError {
                message: format!("OpenAI (HTTP {}): {}", status, message),
                status: Some(status),
            },
        }
    }

    /// Restore input order and normalize each row.
    fn extract_embeddings(
        mut response: OpenAIEmbeddingResponse,
        expected_count: usize,
    ) -> EmbeddingResult<Vec<Vec<f32>>> {
        if response.data.len() != expected_count {
            return Err(EmbeddingError::ParseError {
                message: format!(
                    "expected {} embeddings but OpenAI returned {}",
                    expected_count,
                    response.data.len()
                ),
            });
        }

        response.data.sort_by_key(|d| d.index);

        Ok(response
            .data
            .into_iter()
            .map(|d| {
                let mut row = d.embedding;
                l2_normalize(&mut row);
                row
            })
            .collect())
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAIEmbeddingProvider {
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

        let body = self.build_request_body(documents);
        let response = self.post_embeddings(&body).await?;
        Self::extract_embeddings(response, documents.len())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn health_check(&self) -> EmbeddingResult<()> {
        self.embed_documents(&["health check"]).await.map(|_| ())
    }

    fn max_batch_size(&self) -> usize {
        MAX_BATCH_SIZE
    }

    fn provider_type(&self) -> EmbeddingProviderType {
        EmbeddingProviderType::OpenAI
    }

    fn display_name(&self) -> &str {
        &self.display_name
    }
}
