//! Agentic RAG - Retrieval Core Library
//!
//! Turns documents into searchable chunks and answers similarity queries
//! with two-stage ranking. It includes:
//! - Business logic services (chunking, embedding, indexing, reranking)
//! - Storage layer (JSON config)
//! - Data models and utilities

pub mod models;
pub mod services;
pub mod storage;
pub mod utils;

pub use models::knowledge::{ChunkRecord, IngestStats, InlineDocument, QueryRequest, QueryResponse};
pub use models::response::*;
pub use models::settings::{AppConfig, RagSettings};
pub use services::knowledge::RetrievalPipeline;
pub use storage::ConfigService;
pub use utils::error::{AppError, AppResult};
