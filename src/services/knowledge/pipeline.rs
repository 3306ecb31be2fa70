//! Retrieval Pipeline
//!
//! Orchestrates ingestion and querying:
//! load -> chunk -> embed -> index, then embed -> over-fetch -> rerank.
//!
//! The pipeline is the only owner of chunk identity. A chunk's id is its row
//! in the vector index, assigned at commit time and never reused. The index
//! and the chunk registry live behind one lock and are only ever appended
//! together, so their lengths always agree.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};

use agentic_rag_llm::{create_provider, LlmProvider};

use crate::models::knowledge::{
    ChunkRecord, IngestStats, InlineDocument, LoadedDocument, QueryRequest, QueryResponse,
};
use crate::models::settings::{AppConfig, RagSettings};
use crate::services::embedding::{build_embedder, EmbeddingProvider};
use crate::services::knowledge::chunker::WindowChunker;
use crate::services::knowledge::loaders::{
    collect_document_paths, expand_document_paths, load_document, load_inline,
};
use crate::services::knowledge::reranker::{
    AgentReranker, Candidate, CrossEncoderReranker, Reranker,
};
use crate::services::knowledge::scorer::build_scorer;
use crate::services::knowledge::vector_index::{flat_index_factory, IndexFactory, VectorIndex};
use crate::utils::error::{AppError, AppResult};

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

/// Index plus registry. `chunks[i].chunk_id == i` and
/// `chunks.len() == index.size()` whenever the lock is released.
#[derive(Default)]
struct IndexState {
    /// Created from the first committed batch's dimensionality
    index: Option<Box<dyn VectorIndex>>,
    chunks: Vec<ChunkRecord>,
}

/// One document's chunks and their embeddings, waiting for commit.
struct PendingBatch {
    source: String,
    chunks: Vec<String>,
    vectors: Vec<Vec<f32>>,
}

// ---------------------------------------------------------------------------
// RetrievalPipeline
// ---------------------------------------------------------------------------

pub struct RetrievalPipeline {
    embedder: Arc<dyn EmbeddingProvider>,
    chunker: WindowChunker,
    reranker: Arc<dyn Reranker>,
    agent_reranker: Option<Arc<dyn Reranker>>,
    index_factory: IndexFactory,
    settings: RagSettings,
    state: RwLock<IndexState>,
    /// Serializes ingestion calls
    ingest_lock: Mutex<()>,
}

impl RetrievalPipeline {
    /// Pipeline with a flat index and no agent reranker.
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        reranker: Arc<dyn Reranker>,
        settings: RagSettings,
    ) -> AppResult<Self> {
        settings.validate().map_err(AppError::config)?;
        let chunker = WindowChunker::new(settings.chunk_size, settings.chunk_overlap)?;

        Ok(Self {
            embedder,
            chunker,
            reranker,
            agent_reranker: None,
            index_factory: flat_index_factory(),
            settings,
            state: RwLock::new(IndexState::default()),
            ingest_lock: Mutex::new(()),
        })
    }

    pub fn with_agent_reranker(mut self, reranker: Arc<dyn Reranker>) -> Self {
        self.agent_reranker = Some(reranker);
        self
    }

    pub fn with_index_factory(mut self, factory: IndexFactory) -> Self {
        self.index_factory = factory;
        self
    }

    /// Build every collaborator from configuration.
    ///
    /// The agent reranker uses `llm` when given, otherwise a provider built
    /// from the `llm` section. It is skipped entirely when
    /// `rag.enable_agent_reranker` is off.
    pub fn from_config(config: &AppConfig, llm: Option<Arc<dyn LlmProvider>>) -> AppResult<Self> {
        config.validate().map_err(AppError::config)?;

        let embedder = build_embedder(config)?;
        let scorer = build_scorer(config)?;
        let mut pipeline = Self::new(
            embedder,
            Arc::new(CrossEncoderReranker::new(scorer)),
            config.rag.clone(),
        )?;

        if config.rag.enable_agent_reranker {
            let provider = match llm {
                Some(provider) => provider,
                None => create_provider(config.llm_config())
                    .map_err(|e| AppError::config(format!("agent reranker: {}", e)))?,
            };
            tracing::info!(
                provider = provider.name(),
                model = provider.model(),
                "agent reranker enabled"
            );
            pipeline = pipeline.with_agent_reranker(Arc::new(AgentReranker::new(provider)));
        }

        Ok(pipeline)
    }

    pub fn settings(&self) -> &RagSettings {
        &self.settings
    }

    pub fn has_agent_reranker(&self) -> bool {
        self.agent_reranker.is_some()
    }

    pub fn embedder(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.embedder
    }

    // -----------------------------------------------------------------------
    // Ingestion
    // -----------------------------------------------------------------------

    /// Chunk, embed and commit `(source, content)` pairs.
    ///
    /// All documents of one call are committed together or not at all.
    /// Documents that yield no chunks are skipped but still counted.
    pub async fn ingest_documents(
        &self,
        documents: Vec<(String, String)>,
    ) -> AppResult<IngestStats> {
        let _guard = self.ingest_lock.lock().await;
        let document_count = documents.len();

        let mut expected_dim = {
            let state = self.state.read().await;
            state.index.as_ref().map(|index| index.dimension())
        };

        let mut pending = Vec::new();
        for (source, content) in documents {
            let chunks = self.chunker.chunk(&content);
            if chunks.is_empty() {
                tracing::debug!(source = %source, "document produced no chunks, skipping");
                continue;
            }

            let refs: Vec<&str> = chunks.iter().map(String::as_str).collect();
            let vectors = self.embedder.embed_documents(&refs).await?;
            if vectors.len() != chunks.len() {
                return Err(AppError::embedding(format!(
                    "embedder returned {} vectors for {} chunks of {}",
                    vectors.len(),
                    chunks.len(),
                    source
                )));
            }

            let dim = *expected_dim.get_or_insert(vectors[0].len());
            if let Some(bad) = vectors.iter().find(|v| v.len() != dim) {
                return Err(AppError::dimension_mismatch(dim, bad.len()));
            }

            pending.push(PendingBatch {
                source,
                chunks,
                vectors,
            });
        }

        let (added, index_size) = self.commit(pending).await?;
        tracing::info!(
            documents = document_count,
            chunks = added,
            index_size,
            "ingestion committed"
        );

        Ok(IngestStats {
            documents: document_count,
            chunks: added,
            index_size,
        })
    }

    /// Append every pending batch. Nothing in here awaits once the write
    /// lock is held, so the append is all or nothing.
    async fn commit(&self, pending: Vec<PendingBatch>) -> AppResult<(usize, usize)> {
        let mut state = self.state.write().await;
        if pending.is_empty() {
            return Ok((0, state.chunks.len()));
        }

        let vectors: Vec<Vec<f32>> = pending
            .iter()
            .flat_map(|batch| batch.vectors.iter().cloned())
            .collect();

        // A freshly built index is only stored once the rows are in
        let mut fresh: Option<Box<dyn VectorIndex>> = None;
        let index = match state.index.as_mut() {
            Some(index) => index,
            None => fresh.insert((self.index_factory)(vectors[0].len())?),
        };
        index.add(&vectors)?;

        if let Some(index) = fresh {
            tracing::debug!(dimension = index.dimension(), "vector index created");
            state.index = Some(index);
        }

        let mut next_id = state.chunks.len();
        for batch in pending {
            for text in batch.chunks {
                state.chunks.push(ChunkRecord {
                    chunk_id: next_id,
                    source: batch.source.clone(),
                    text,
                });
                next_id += 1;
            }
        }

        Ok((vectors.len(), state.chunks.len()))
    }

    /// Load files from disk and ingest them. Directories contribute the
    /// files directly inside them. A load failure aborts before anything is
    /// embedded.
    pub async fn ingest_paths(&self, paths: &[PathBuf]) -> AppResult<IngestStats> {
        let owned = paths.to_vec();
        let loaded = tokio::task::spawn_blocking(move || {
            expand_document_paths(&owned)?
                .iter()
                .map(|path| load_document(path))
                .collect::<AppResult<Vec<LoadedDocument>>>()
        })
        .await
        .map_err(|e| AppError::internal(format!("document loading task failed: {}", e)))??;

        self.ingest_loaded(loaded).await
    }

    /// Ingest in-memory documents, decoding each by its format hint.
    pub async fn ingest_inline(&self, documents: Vec<InlineDocument>) -> AppResult<IngestStats> {
        let loaded = documents
            .iter()
            .map(load_inline)
            .collect::<AppResult<Vec<_>>>()?;
        self.ingest_loaded(loaded).await
    }

    /// Ingest every regular file directly inside `dir`, in name order.
    pub async fn ingest_directory(&self, dir: &Path) -> AppResult<IngestStats> {
        let owned = dir.to_path_buf();
        let paths = tokio::task::spawn_blocking(move || collect_document_paths(&owned))
            .await
            .map_err(|e| AppError::internal(format!("directory listing task failed: {}", e)))??;

        if paths.is_empty() {
            return Err(AppError::not_found(format!(
                "No documents found in {}",
                dir.display()
            )));
        }

        tracing::debug!(dir = %dir.display(), files = paths.len(), "ingesting directory");
        self.ingest_paths(&paths).await
    }

    async fn ingest_loaded(&self, documents: Vec<LoadedDocument>) -> AppResult<IngestStats> {
        self.ingest_documents(
            documents
                .into_iter()
                .map(|doc| (doc.source, doc.content))
                .collect(),
        )
        .await
    }

    // -----------------------------------------------------------------------
    // Query
    // -----------------------------------------------------------------------

    /// Best `top_k` chunks for `text`, best first.
    ///
    /// Coarse retrieval fetches `top_k * overfetch_factor` candidates which
    /// the reranker narrows down. An empty pipeline returns no results.
    pub async fn query(
        &self,
        text: &str,
        top_k: usize,
        use_agent_reranker: bool,
    ) -> AppResult<Vec<ChunkRecord>> {
        if top_k == 0 || self.state.read().await.chunks.is_empty() {
            return Ok(Vec::new());
        }

        let query_vector = self.embedder.embed_query(text).await?;
        let fetch_k = top_k
            .saturating_mul(self.settings.overfetch_factor)
            .max(top_k);

        let candidates: Vec<Candidate> = {
            let state = self.state.read().await;
            let Some(index) = state.index.as_ref() else {
                return Ok(Vec::new());
            };
            index
                .search(&query_vector, fetch_k)?
                .into_iter()
                .filter_map(|hit| {
                    state.chunks.get(hit.chunk_id).map(|record| Candidate {
                        chunk_id: hit.chunk_id,
                        text: record.text.clone(),
                        retrieval_score: hit.score,
                    })
                })
                .collect()
        };

        let reranker = self.select_reranker(use_agent_reranker);
        tracing::debug!(
            candidates = candidates.len(),
            fetch_k,
            top_k,
            reranker = reranker.name(),
            "reranking candidates"
        );
        let ranked = reranker.rerank(text, candidates, top_k).await?;

        let state = self.state.read().await;
        Ok(ranked
            .into_iter()
            .filter_map(|candidate| state.chunks.get(candidate.chunk_id).cloned())
            .collect())
    }

    fn select_reranker(&self, use_agent: bool) -> &Arc<dyn Reranker> {
        match (&self.agent_reranker, use_agent) {
            (Some(agent), true) => agent,
            (None, true) => {
                tracing::warn!("agent reranker requested but not configured, using numeric reranker");
                &self.reranker
            }
            _ => &self.reranker,
        }
    }

    /// Validate a request, run it and echo the query back.
    pub async fn handle_query(&self, request: QueryRequest) -> AppResult<QueryResponse> {
        if request.query.trim().is_empty() {
            return Err(AppError::validation("query must not be empty"));
        }
        if request.top_k == 0 || request.top_k > self.settings.max_top_k {
            return Err(AppError::validation(format!(
                "top_k must be between 1 and {}",
                self.settings.max_top_k
            )));
        }

        let results = self
            .query(&request.query, request.top_k, request.use_agent_reranker)
            .await?;
        Ok(QueryResponse {
            query: request.query,
            results,
        })
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub async fn indexed_chunks(&self) -> usize {
        self.state.read().await.chunks.len()
    }

    pub async fn get_chunk(&self, chunk_id: usize) -> Option<ChunkRecord> {
        self.state.read().await.chunks.get(chunk_id).cloned()
    }

    /// Index dimensionality, or `None` before the first commit.
    pub async fn dimension(&self) -> Option<usize> {
        self.state
            .read()
            .await
            .index
            .as_ref()
            .map(|index| index.dimension())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
