//! Services
//!
//! Business logic for the retrieval core.

pub mod embedding;
pub mod knowledge;

pub use embedding::{build_embedder, EmbeddingManager, EmbeddingProvider};
pub use knowledge::RetrievalPipeline;
