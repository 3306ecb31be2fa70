//! Knowledge Models
//!
//! Records and request/response types exchanged with the retrieval pipeline.

use std::path::Path;

use serde::{Deserialize, Serialize};

/// One committed chunk. `chunk_id` equals its row in the vector index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkRecord {
    pub chunk_id: usize,
    pub source: String,
    pub text: String,
}

/// Counts reported after an ingestion call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct IngestStats {
    /// Documents received, including ones that produced no chunks
    pub documents: usize,
    /// Chunks committed by this call
    pub chunks: usize,
    /// Total rows in the index afterwards
    pub index_size: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryRequest {
    pub query: String,
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    #[serde(default)]
    pub use_agent_reranker: bool,
}

fn default_top_k() -> usize {
    5
}

impl QueryRequest {
    pub fn new(query: impl Into<String>, top_k: usize) -> Self {
        Self {
            query: query.into(),
            top_k,
            use_agent_reranker: false,
        }
    }

    pub fn with_agent(mut self, use_agent: bool) -> Self {
        self.use_agent_reranker = use_agent;
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResponse {
    pub query: String,
    pub results: Vec<ChunkRecord>,
}

/// Supported input formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentFormat {
    PlainText,
    Csv,
    Json,
    Pdf,
}

impl DocumentFormat {
    /// Guess from the file extension. Anything unknown is read as text.
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        match ext.as_deref() {
            Some("csv") => DocumentFormat::Csv,
            Some("json") => DocumentFormat::Json,
            Some("pdf") => DocumentFormat::Pdf,
            _ => DocumentFormat::PlainText,
        }
    }
}

/// A document supplied in memory rather than by path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InlineDocument {
    pub source: String,
    pub content: Vec<u8>,
    /// Inferred from `source` when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<DocumentFormat>,
}

impl InlineDocument {
    pub fn text(source: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            content: content.into().into_bytes(),
            format: Some(DocumentFormat::PlainText),
        }
    }

    pub fn resolved_format(&self) -> DocumentFormat {
        self.format
            .unwrap_or_else(|| DocumentFormat::from_path(Path::new(&self.source)))
    }
}

/// Text extracted from one document, ready for chunking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedDocument {
    pub source: String,
    pub content: String,
}
