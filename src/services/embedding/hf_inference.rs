//! Hugging Face Inference Embedding Provider
//!
//! Hosted sentence-transformers through the feature-extraction pipeline:
//! `POST {base_url}/pipeline/feature-extraction/{model}` with
//! `{ "inputs": [...] }`. Models that return per-token vectors are mean
//! pooled before normalization.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use agentic_rag_llm::build_http_client;

use super::provider::{
    l2_normalize, EmbeddingError, EmbeddingProvider, EmbeddingProviderConfig,
    EmbeddingProviderType, EmbeddingResult,
};

const HF_INFERENCE_URL: &str = "https://api-inference.huggingface.co";

const DEFAULT_MODEL: &str = "sentence-transformers/all-MiniLM-L6-v2";

const DEFAULT_DIMENSION: usize = 384;

const MAX_BATCH_SIZE: usize = 32;

/// One row of feature-extraction output.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum FeatureOutput {
    /// Sentence-level vector, already pooled by the model.
    Pooled(Vec<f32>),
    /// Token-level vectors.
    Tokens(Vec<Vec<f32>>),
}

impl FeatureOutput {
    fn into_sentence_vector(self) -> EmbeddingResult<Vec<f32>> {
        let mut vector = match self {
            FeatureOutput::Pooled(v) => v,
            FeatureOutput::Tokens(tokens) => mean_pool(&tokens)?,
        };
        l2_normalize(&mut vector);
        Ok(vector)
    }
}

fn mean_pool(tokens: &[Vec<f32>]) -> EmbeddingResult<Vec<f32>> {
    let Some(first) = tokens.first() else {
        return Err(EmbeddingError::ParseError {
            message: "feature extraction returned no token vectors".to_string(),
        });
    };
    let width = first.len();
    let mut sum = vec![0.0f32; width];
    for token in tokens {
        if token.len() != width {
            return Err(EmbeddingError::ParseError {
                message: "token vectors have inconsistent widths".to_string(),
            });
        }
        for (acc, v) in sum.iter_mut().zip(token) {
            *acc += v;
        }
    }
    let count = tokens.len() as f32;
    for v in sum.iter_mut() {
        *v /= count;
    }
    Ok(sum)
}

pub struct HfInferenceEmbeddingProvider {
    client: reqwest::Client,
    api_token: String,
    model: String,
    endpoint: String,
    /// Configured width until the first response reports the real one.
    dimension: AtomicUsize,
    display_name: String,
}

impl HfInferenceEmbeddingProvider {
    pub fn new(config: &EmbeddingProviderConfig) -> EmbeddingResult<Self> {
        let model = if config.model.trim().is_empty() {
            DEFAULT_MODEL.to_string()
        } else {
            config.model.trim().to_string()
        };
        let base = config
            .base_url
            .as_deref()
            .unwrap_or(HF_INFERENCE_URL)
            .trim_end_matches('/');
        let endpoint = format!("{}/pipeline/feature-extraction/{}", base, model);

        let client = build_http_client(
            config.proxy.as_ref(),
            Some(Duration::from_secs(config.timeout_secs)),
        )?;

        Ok(Self {
            client,
            api_token: config.api_key.clone().unwrap_or_default(),
            display_name: format!("HF Inference ({})", model),
            model,
            endpoint,
            dimension: AtomicUsize::new(config.dimension.unwrap_or(DEFAULT_DIMENSION)),
        })
    }

    fn map_http_error(&self, status: u16, body: &str) -> EmbeddingError {
        match status {
            401 | 403 => EmbeddingError::AuthenticationFailed {
                message: format!("Hugging Face rejected the token: {}", body),
            },
            404 => EmbeddingError::ModelNotFound {
                model: self.model.clone(),
            },
            429 => EmbeddingError::RateLimited {
                message: body.to_string(),
                retry_after: None,
            },
            // 503 while the model is loading
            503 => EmbeddingError::ProviderUnavailable {
                message: format!("model {} is loading: {}", self.model, body),
            },
            _ => EmbeddingError::ServerError {
                message: body.to_string(),
                status: Some(status),
            },
        }
    }

    fn parse_rows(body: &str, expected: usize) -> EmbeddingResult<Vec<Vec<f32>>> {
        let rows: Vec<FeatureOutput> =
            serde_json::from_str(body).map_err(|e| EmbeddingError::ParseError {
                message: format!("unexpected feature-extraction response: {}", e),
            })?;
        if rows.len() != expected {
            return Err(EmbeddingError::ParseError {
                message: format!(
                    "expected {} embeddings but Hugging Face returned {}",
                    expected,
                    rows.len()
                ),
            });
        }
        rows.into_iter()
            .map(FeatureOutput::into_sentence_vector)
            .collect()
    }
}

#[async_trait]
impl EmbeddingProvider for HfInferenceEmbeddingProvider {
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
        if self.api_token.is_empty() {
            return Err(EmbeddingError::AuthenticationFailed {
                message: "Hugging Face API token is not configured".to_string(),
            });
        }

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_token)
            .json(&serde_json::json!({ "inputs": documents }))
            .send()
            .await
            .map_err(|e| EmbeddingError::NetworkError {
                message: e.to_string(),
            })?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| EmbeddingError::NetworkError {
                message: e.to_string(),
            })?;

        if status != 200 {
            return Err(self.map_http_error(status, &body));
        }

        let rows = Self::parse_rows(&body, documents.len())?;
        if let Some(first) = rows.first().filter(|r| !r.is_empty()) {
            self.dimension.store(first.len(), Ordering::Relaxed);
        }
        Ok(rows)
    }

    fn dimension(&self) -> usize {
        self.dimension.load(Ordering::Relaxed)
    }

    async fn health_check(&self) -> EmbeddingResult<()> {
        self.embed_documents(&["health check"]).await.map(|_| ())
    }

    fn max_batch_size(&self) -> usize {
        MAX_BATCH_SIZE
    }

    fn provider_type(&self) -> EmbeddingProviderType {
        EmbeddingProviderType::HfInference
    }

    fn display_name(&self) -> &str {
        &self.display_name
    }
}
