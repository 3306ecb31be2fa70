//! FastEmbed Embedding Provider
//!
//! Runs sentence-transformer models locally through ONNX Runtime. Only
//! compiled with the `local-models` feature. Model files are downloaded on
//! first use into fastembed's cache directory.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};

use super::provider::{
    l2_normalize, EmbeddingError, EmbeddingProvider, EmbeddingProviderConfig,
    EmbeddingProviderType, EmbeddingResult,
};

const MAX_BATCH_SIZE: usize = 256;

/// Map a model id to a fastembed model and its output width.
fn resolve_model(name: &str) -> EmbeddingResult<(EmbeddingModel, usize)> {
    match name.trim() {
        "" | "sentence-transformers/all-MiniLM-L6-v2" | "all-MiniLM-L6-v2" => {
            Ok((EmbeddingModel::AllMiniLML6V2, 384))
        }
        "BAAI/bge-small-en-v1.5" | "bge-small-en-v1.5" => Ok((EmbeddingModel::BGESmallENV15, 384)),
        "BAAI/bge-base-en-v1.5" | "bge-base-en-v1.5" => Ok((EmbeddingModel::BGEBaseENV15, 768)),
        other => Err(EmbeddingError::ModelNotFound {
            model: format!("'{}' is not bundled with fastembed", other),
        }),
    }
}

pub struct FastEmbedProvider {
    model: Arc<Mutex<TextEmbedding>>,
    dimension: usize,
    display_name: String,
}

impl FastEmbedProvider {
    pub fn new(config: &EmbeddingProviderConfig) -> EmbeddingResult<Self> {
        let (model_kind, dimension) = resolve_model(&config.model)?;
        let model = TextEmbedding::try_new(InitOptions::new(model_kind)).map_err(|e| {
            EmbeddingError::ProviderUnavailable {
                message: format!("failed to load fastembed model: {}", e),
            }
        })?;

        tracing::info!(model = %config.model, dimension, "loaded local embedding model");

        Ok(Self {
            model: Arc::new(Mutex::new(model)),
            dimension,
            display_name: format!("FastEmbed ({})", config.model),
        })
    }
}

#[async_trait]
impl EmbeddingProvider for FastEmbedProvider {
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

        let model = Arc::clone(&self.model);
        let owned: Vec<String> = documents.iter().map(|d| d.to_string()).collect();

        // ONNX inference is CPU bound
        let rows = tokio::task::spawn_blocking(move || {
            let mut guard = model.lock().map_err(|_| EmbeddingError::Other {
                message: "fastembed model lock poisoned".to_string(),
            })?;
            guard
                .embed(owned, None)
                .map_err(|e| EmbeddingError::Other {
                    message: format!("fastembed inference failed: {}", e),
                })
        })
        .await
        .map_err(|e| EmbeddingError::Other {
            message: format!("embedding task failed: {}", e),
        })??;

        Ok(rows
            .into_iter()
            .map(|mut row| {
                l2_normalize(&mut row);
                row
            })
            .collect())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn health_check(&self) -> EmbeddingResult<()> {
        Ok(())
    }

    fn max_batch_size(&self) -> usize {
        MAX_BATCH_SIZE
    }

    fn provider_type(&self) -> EmbeddingProviderType {
        EmbeddingProviderType::FastEmbed
    }

    fn display_name(&self) -> &str {
        &self.display_name
    }
}
