//! Feature Hashing Embedding Provider
//!
//! Deterministic bag-of-words vectors: each lowercase alphanumeric token is
//! hashed into one of `dimension` buckets, term counts accumulate, and the
//! result is L2-normalized. No model files and no network, so it works in
//! air-gapped setups and tests. Lexical overlap only; no semantics.

use async_trait::async_trait;

use super::provider::{
    l2_normalize, EmbeddingError, EmbeddingProvider, EmbeddingProviderType, EmbeddingResult,
};

const MAX_BATCH_SIZE: usize = 1024;

pub struct HashingEmbeddingProvider {
    dimension: usize,
    display_name: String,
}

impl HashingEmbeddingProvider {
    pub fn new(dimension: usize) -> EmbeddingResult<Self> {
        if dimension == 0 {
            return Err(EmbeddingError::InvalidConfig {
                message: "hashing dimension must be at least 1".to_string(),
            });
        }
        Ok(Self {
            dimension,
            display_name: format!("Feature hashing ({}d)", dimension),
        })
    }

    fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
        text.split(|c: char| !c.is_alphanumeric())
            .filter(|s| !s.is_empty())
            .map(|s| s.to_lowercase())
    }

    fn bucket(&self, token: &str) -> usize {
        let mut h: u32 = 0;
        for b in token.bytes() {
            h = h.wrapping_mul(31).wrapping_add(b as u32);
        }
        (h as usize) % self.dimension
    }

    /// Text with no tokens maps to the zero vector.
    pub fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut vec = vec![0.0f32; self.dimension];
        for token in Self::tokenize(text) {
            vec[self.bucket(&token)] += 1.0;
        }
        l2_normalize(&mut vec);
        vec
    }
}

#[async_trait]
impl EmbeddingProvider for HashingEmbeddingProvider {
    async fn embed_documents(&self, documents: &[&str]) -> EmbeddingResult<Vec<Vec<f32>>> {
        if documents.len() > MAX_BATCH_SIZE {
            return Err(EmbeddingError::BatchSizeLimitExceeded {
                requested: documents.len(),
                max_allowed: MAX_BATCH_SIZE,
            });
        }
        Ok(documents.iter().map(|d| self.embed_text(d)).collect())
    }

    async fn embed_query(&self, query: &str) -> EmbeddingResult<Vec<f32>> {
        Ok(self.embed_text(query))
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
        EmbeddingProviderType::Hashing
    }

    fn display_name(&self) -> &str {
        &self.display_name
    }
}
