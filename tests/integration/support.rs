//! Stub capabilities shared by the integration tests.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use agentic_rag::models::settings::RagSettings;
use agentic_rag::services::embedding::{
    EmbeddingError, EmbeddingProvider, EmbeddingProviderType, EmbeddingResult,
    HashingEmbeddingProvider,
};
use agentic_rag::services::knowledge::scorer::LexicalScorer;
use agentic_rag::services::knowledge::{
    CrossEncoderReranker, FlatIndex, IndexFactory, Reranker, ScoredChunk, VectorIndex,
};
use agentic_rag::{AppResult, RetrievalPipeline};

pub fn small_settings() -> RagSettings {
    RagSettings {
        chunk_size: 120,
        chunk_overlap: 20,
        ..RagSettings::default()
    }
}

pub fn lexical_reranker() -> Arc<dyn Reranker> {
    Arc::new(CrossEncoderReranker::new(Arc::new(LexicalScorer)))
}

/// Hashing embedder, lexical reranker, flat index.
pub fn local_pipeline() -> RetrievalPipeline {
    RetrievalPipeline::new(
        Arc::new(HashingEmbeddingProvider::new(128).unwrap()),
        lexical_reranker(),
        small_settings(),
    )
    .unwrap()
}

// ---------------------------------------------------------------------------
// RecordingIndex
// ---------------------------------------------------------------------------

/// Flat index that remembers every `top_k` it was asked for.
pub struct RecordingIndex {
    inner: FlatIndex,
    requested: Arc<Mutex<Vec<usize>>>,
}

impl VectorIndex for RecordingIndex {
    fn add(&mut self, vectors: &[Vec<f32>]) -> AppResult<()> {
        self.inner.add(vectors)
    }

    fn search(&self, query: &[f32], top_k: usize) -> AppResult<Vec<ScoredChunk>> {
        self.requested.lock().unwrap().push(top_k);
        self.inner.search(query, top_k)
    }

    fn size(&self) -> usize {
        self.inner.size()
    }

    fn dimension(&self) -> usize {
        self.inner.dimension()
    }
}

pub fn recording_factory() -> (IndexFactory, Arc<Mutex<Vec<usize>>>) {
    let requested = Arc::new(Mutex::new(Vec::new()));
    let shared = requested.clone();
    let factory: IndexFactory = Arc::new(move |dimension| {
        Ok(Box::new(RecordingIndex {
            inner: FlatIndex::new(dimension)?,
            requested: shared.clone(),
        }) as Box<dyn VectorIndex>)
    });
    (factory, requested)
}

// ---------------------------------------------------------------------------
// ShapeShiftingEmbedder
// ---------------------------------------------------------------------------

/// Four-dimensional vectors, except five for any text containing "wide".
pub struct ShapeShiftingEmbedder;

#[async_trait]
impl EmbeddingProvider for ShapeShiftingEmbedder {
    async fn embed_documents(&self, documents: &[&str]) -> EmbeddingResult<Vec<Vec<f32>>> {
        Ok(documents
            .iter()
            .map(|text| {
                let dim = if text.contains("wide") { 5 } else { 4 };
                let mut v = vec![0.0; dim];
                v[0] = 1.0;
                v
            })
            .collect())
    }

    fn dimension(&self) -> usize {
        4
    }

    async fn health_check(&self) -> EmbeddingResult<()> {
        Ok(())
    }

    fn max_batch_size(&self) -> usize {
        64
    }

    fn provider_type(&self) -> EmbeddingProviderType {
        EmbeddingProviderType::Hashing
    }

    fn display_name(&self) -> &str {
        "shape-shifting"
    }
}

// ---------------------------------------------------------------------------
// UnavailableEmbedder
// ---------------------------------------------------------------------------

pub struct UnavailableEmbedder;

#[async_trait]
impl EmbeddingProvider for UnavailableEmbedder {
    async fn embed_documents(&self, _documents: &[&str]) -> EmbeddingResult<Vec<Vec<f32>>> {
        Err(EmbeddingError::ProviderUnavailable {
            message: "connection refused".to_string(),
        })
    }

    fn dimension(&self) -> usize {
        0
    }

    async fn health_check(&self) -> EmbeddingResult<()> {
        Err(EmbeddingError::ProviderUnavailable {
            message: "connection refused".to_string(),
        })
    }

    fn max_batch_size(&self) -> usize {
        64
    }

    fn provider_type(&self) -> EmbeddingProviderType {
        EmbeddingProviderType::Ollama
    }

    fn display_name(&self) -> &str {
        "unavailable"
    }
}
