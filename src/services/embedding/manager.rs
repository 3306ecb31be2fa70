//! Embedding Manager
//!
//! Wraps one embedding provider with the policies every backend needs:
//! batch chunking by the provider's limit, a content-level cache keyed by
//! provider/model/dimension/text hash, retry with exponential backoff for
//! transient errors, and a per-call timeout.
//!
//! The manager itself implements [`EmbeddingProvider`], so the pipeline
//! receives it as a plain `Arc<dyn EmbeddingProvider>`.
//!
//! ## Thread Safety
//!
//! `mini_moka::sync::Cache` is internally synchronized; the manager needs no
//! extra locking.

use std::time::Duration;

use async_trait::async_trait;
use mini_moka::sync::{Cache, ConcurrentCacheExt};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::provider::{
    EmbeddingError, EmbeddingProvider, EmbeddingProviderType, EmbeddingResult,
};

/// Maximum delay cap between retries.
const RETRY_MAX_DELAY_MS: u64 = 10_000;

/// Cached vectors expire after this long.
const CACHE_TTL: Duration = Duration::from_secs(30 * 60);

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Policy knobs for the [`EmbeddingManager`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingManagerConfig {
    #[serde(default = "default_cache_enabled")]
    pub cache_enabled: bool,

    #[serde(default = "default_cache_max_entries")]
    pub cache_max_entries: usize,

    /// Total attempts per batch, including the first.
    #[serde(default = "default_max_retries")]
    pub max_retries: usize,

    /// First backoff delay; doubles on each retry.
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,

    /// Upper bound for a single provider call.
    #[serde(default = "default_call_timeout_secs")]
    pub call_timeout_secs: u64,
}

fn default_cache_enabled() -> bool {
    true
}

fn default_cache_max_entries() -> usize {
    10_000
}

fn default_max_retries() -> usize {
    3
}

fn default_retry_base_delay_ms() -> u64 {
    500
}

fn default_call_timeout_secs() -> u64 {
    60
}

impl Default for EmbeddingManagerConfig {
    fn default() -> Self {
        Self {
            cache_enabled: default_cache_enabled(),
            cache_max_entries: default_cache_max_entries(),
            max_retries: default_max_retries(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
            call_timeout_secs: default_call_timeout_secs(),
        }
    }
}

impl EmbeddingManagerConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.max_retries == 0 {
            return Err("embedding_manager.max_retries must be at least 1".to_string());
        }
        if self.call_timeout_secs == 0 {
            return Err("embedding_manager.call_timeout_secs must be at least 1".to_string());
        }
        if self.cache_enabled && self.cache_max_entries == 0 {
            return Err("embedding_manager.cache_max_entries must be positive when the cache is enabled".to_string());
        }
        Ok(())
    }
}

/// Exponential backoff for the given zero-based attempt, capped at
/// [`RETRY_MAX_DELAY_MS`]. Saturates instead of overflowing.
fn backoff_delay_ms(base_ms: u64, attempt: usize) -> u64 {
    let factor = u32::try_from(attempt)
        .ok()
        .and_then(|shift| 1u64.checked_shl(shift))
        .unwrap_or(u64::MAX);
    base_ms.saturating_mul(factor).min(RETRY_MAX_DELAY_MS)
}

// ---------------------------------------------------------------------------
// Cache key
// ---------------------------------------------------------------------------

/// Identical (provider, model, dimension, text) requests share one entry.
/// Reads and writes both take the dimension the provider reports, so a
/// reconfigured provider never sees vectors from its old shape.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    provider: EmbeddingProviderType,
    model: String,
    dimension: usize,
    text_hash: [u8; 32],
}

impl CacheKey {
    fn new(provider: &dyn EmbeddingProvider, text: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(text.as_bytes());
        Self {
            provider: provider.provider_type(),
            model: provider.display_name().to_string(),
            dimension: provider.dimension(),
            text_hash: hasher.finalize().into(),
        }
    }
}

// ---------------------------------------------------------------------------
// EmbeddingManager
// ---------------------------------------------------------------------------

pub struct EmbeddingManager {
    provider: Box<dyn EmbeddingProvider>,
    cache: Option<Cache<CacheKey, Vec<f32>>>,
    config: EmbeddingManagerConfig,
}

impl EmbeddingManager {
    pub fn new(provider: Box<dyn EmbeddingProvider>, config: EmbeddingManagerConfig) -> Self {
        let cache = if config.cache_enabled {
            Some(
                Cache::builder()
                    .max_capacity(config.cache_max_entries as u64)
                    .time_to_live(CACHE_TTL)
                    .build(),
            )
        } else {
            None
        };

        Self {
            provider,
            cache,
            config,
        }
    }

    pub fn config(&self) -> &EmbeddingManagerConfig {
        &self.config
    }

    /// Number of cached vectors. Always 0 with the cache disabled.
    pub fn cache_entry_count(&self) -> u64 {
        self.cache.as_ref().map_or(0, |c| {
            c.sync();
            c.entry_count()
        })
    }

    // -----------------------------------------------------------------------
    // Internal helpers
    // -----------------------------------------------------------------------

    /// One provider call bounded by the configured timeout.
    async fn call_with_timeout(&self, batch: &[&str]) -> EmbeddingResult<Vec<Vec<f32>>> {
        let limit = Duration::from_secs(self.config.call_timeout_secs);
        match tokio::time::timeout(limit, self.provider.embed_documents(batch)).await {
            Ok(result) => result,
            Err(_) => Err(EmbeddingError::NetworkError {
                message: format!(
                    "{} did not answer within {}s",
                    self.provider.display_name(),
                    self.config.call_timeout_secs
                ),
            }),
        }
    }

    /// Embed one batch, retrying transient failures with exponential backoff.
    /// Rate-limit hints from the provider take precedence over the backoff.
    async fn embed_batch_with_retry(&self, batch: &[&str]) -> EmbeddingResult<Vec<Vec<f32>>> {
        let max_attempts = self.config.max_retries.max(1);
        let mut last_err: Option<EmbeddingError> = None;

        for attempt in 0..max_attempts {
            match self.call_with_timeout(batch).await {
                Ok(rows) => {
                    if rows.len() != batch.len() {
                        return Err(EmbeddingError::ParseError {
                            message: format!(
                                "{} returned {} vectors for {} inputs",
                                self.provider.display_name(),
                                rows.len(),
                                batch.len()
                            ),
                        });
                    }
                    return Ok(rows);
                }
                Err(err) => {
                    if !err.is_retryable() || attempt + 1 == max_attempts {
                        return Err(err);
                    }

                    let wait_ms = match err.retry_after_secs() {
                        Some(secs) => secs.saturating_mul(1000),
                        None => backoff_delay_ms(self.config.retry_base_delay_ms, attempt),
                    };

                    tracing::warn!(
                        attempt = attempt + 1,
                        max_attempts,
                        wait_ms,
                        error = %err,
                        "embedding call failed with a retryable error, backing off"
                    );

                    last_err = Some(err);
                    tokio::time::sleep(Duration::from_millis(wait_ms)).await;
                }
            }
        }

        Err(last_err.unwrap_or_else(|| EmbeddingError::Other {
            message: "retry attempts exhausted".to_string(),
        }))
    }

    fn cache_get(&self, text: &str) -> Option<Vec<f32>> {
        let cache = self.cache.as_ref()?;
        cache.get(&CacheKey::new(self.provider.as_ref(), text))
    }

    fn cache_put(&self, text: &str, embedding: &[f32]) {
        if let Some(ref cache) = self.cache {
            cache.insert(
                CacheKey::new(self.provider.as_ref(), text),
                embedding.to_vec(),
            );
        }
    }
}

#[async_trait]
impl EmbeddingProvider for EmbeddingManager {
    /// Cache misses are embedded in provider-sized batches; output order
    /// always matches input order.
    async fn embed_documents(&self, documents: &[&str]) -> EmbeddingResult<Vec<Vec<f32>>> {
        if documents.is_empty() {
            return Ok(Vec::new());
        }

        let mut results: Vec<Option<Vec<f32>>> = Vec::with_capacity(documents.len());
        let mut missing: Vec<usize> = Vec::new();
        for (i, doc) in documents.iter().enumerate() {
            let hit = self.cache_get(doc);
            if hit.is_none() {
                missing.push(i);
            }
            results.push(hit);
        }

        if !missing.is_empty() {
            let texts: Vec<&str> = missing.iter().map(|&i| documents[i]).collect();
            let max_batch = self.provider.max_batch_size().max(1);
            let mut fresh: Vec<Vec<f32>> = Vec::with_capacity(texts.len());
            for chunk in texts.chunks(max_batch) {
                fresh.extend(self.embed_batch_with_retry(chunk).await?);
            }

            tracing::debug!(
                provider = self.provider.display_name(),
                requested = documents.len(),
                embedded = fresh.len(),
                "embedded documents"
            );

            for (&original, row) in missing.iter().zip(fresh) {
                self.cache_put(documents[original], &row);
                results[original] = Some(row);
            }
        }

        results
            .into_iter()
            .map(|row| {
                row.ok_or_else(|| EmbeddingError::Other {
                    message: "embedding missing after batch assembly".to_string(),
                })
            })
            .collect()
    }

    async fn embed_query(&self, query: &str) -> EmbeddingResult<Vec<f32>> {
        let rows = self.embed_documents(&[query]).await?;
        rows.into_iter().next().ok_or_else(|| EmbeddingError::Other {
            message: "no embedding returned for query".to_string(),
        })
    }

    fn dimension(&self) -> usize {
        self.provider.dimension()
    }

    async fn health_check(&self) -> EmbeddingResult<()> {
        self.provider.health_check().await
    }

    fn max_batch_size(&self) -> usize {
        usize::MAX
    }

    fn provider_type(&self) -> EmbeddingProviderType {
        self.provider.provider_type()
    }

    fn display_name(&self) -> &str {
        self.provider.display_name()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
