//! Vector Index
//!
//! Append-only store of embedding rows with exact inner-product search.
//! Row position is the chunk id: the first row added is 0, the next 1, and
//! so on. Rows are never removed or reordered.
//!
//! `FlatIndex` keeps every row in one contiguous row-major buffer and scans
//! all of them per query. With unit-norm rows the inner product equals
//! cosine similarity.

use std::cmp::Ordering;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::utils::error::{AppError, AppResult};

/// One search hit. Higher scores are more similar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoredChunk {
    pub chunk_id: usize,
    pub score: f32,
}

/// Best first; equal scores fall back to ascending chunk id.
fn rank_order(a: &ScoredChunk, b: &ScoredChunk) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| a.chunk_id.cmp(&b.chunk_id))
}

pub trait VectorIndex: Send + Sync {
    /// Append rows. Every row must match `dimension()`; on any mismatch
    /// nothing is added.
    fn add(&mut self, vectors: &[Vec<f32>]) -> AppResult<()>;

    /// Up to `top_k` rows, best first.
    fn search(&self, query: &[f32], top_k: usize) -> AppResult<Vec<ScoredChunk>>;

    fn size(&self) -> usize;

    fn dimension(&self) -> usize;
}

/// Builds an empty index for a given dimensionality.
pub type IndexFactory = Arc<dyn Fn(usize) -> AppResult<Box<dyn VectorIndex>> + Send + Sync>;

/// Factory producing [`FlatIndex`] instances.
pub fn flat_index_factory() -> IndexFactory {
    Arc::new(|dimension| Ok(Box::new(FlatIndex::new(dimension)?) as Box<dyn VectorIndex>))
}

// ---------------------------------------------------------------------------
// FlatIndex
// ---------------------------------------------------------------------------

/// Exact brute-force index.
#[derive(Debug, Clone)]
pub struct FlatIndex {
    dimension: usize,
    data: Vec<f32>,
}

impl FlatIndex {
    pub fn new(dimension: usize) -> AppResult<Self> {
        if dimension == 0 {
            return Err(AppError::dimension_mismatch(1, 0));
        }
        Ok(Self {
            dimension,
            data: Vec::new(),
        })
    }

    fn rows(&self) -> impl Iterator<Item = &[f32]> {
        self.data.chunks_exact(self.dimension)
    }
}

impl VectorIndex for FlatIndex {
    fn add(&mut self, vectors: &[Vec<f32>]) -> AppResult<()> {
        if let Some(bad) = vectors.iter().find(|v| v.len() != self.dimension) {
            return Err(AppError::dimension_mismatch(self.dimension, bad.len()));
        }
        self.data.reserve(vectors.len() * self.dimension);
        for v in vectors {
            self.data.extend_from_slice(v);
        }
        Ok(())
    }

    fn search(&self, query: &[f32], top_k: usize) -> AppResult<Vec<ScoredChunk>> {
        if query.len() != self.dimension {
            return Err(AppError::dimension_mismatch(self.dimension, query.len()));
        }
        if top_k == 0 || self.data.is_empty() {
            return Ok(Vec::new());
        }

        let mut scored: Vec<ScoredChunk> = self
            .rows()
            .enumerate()
            .map(|(chunk_id, row)| ScoredChunk {
                chunk_id,
                score: row.iter().zip(query).map(|(a, b)| a * b).sum(),
            })
            .collect();

        if top_k < scored.len() {
            scored.select_nth_unstable_by(top_k - 1, rank_order);
            scored.truncate(top_k);
        }
        scored.sort_by(rank_order);
        Ok(scored)
    }

    fn size(&self) -> usize {
        self.data.len() / self.dimension
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
