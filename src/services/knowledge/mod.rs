//! Knowledge System
//!
//! The retrieval pipeline and its parts:
//! - `chunker`: overlapping character windows
//! - `loaders`: plain text, CSV, JSON and PDF decoding
//! - `vector_index`: exact inner-product search
//! - `scorer`: pairwise relevance scoring backends
//! - `reranker`: cross-encoder and agent reranking
//! - `pipeline`: `RetrievalPipeline` orchestrating ingest and query

pub mod chunker;
pub mod loaders;
pub mod pipeline;
pub mod reranker;
pub mod scorer;
pub mod vector_index;

pub use chunker::{chunk_text, WindowChunker};
pub use pipeline::RetrievalPipeline;
pub use reranker::{AgentReranker, Candidate, CrossEncoderReranker, Reranker};
pub use scorer::{build_scorer, RelevanceScorer, RerankerConfig, ScorerType};
pub use vector_index::{flat_index_factory, FlatIndex, IndexFactory, ScoredChunk, VectorIndex};
