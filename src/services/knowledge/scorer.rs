//! Relevance Scorers
//!
//! The numeric relevance capability behind the cross-encoder reranker. A
//! scorer rates each `(query, passage)` pair independently; higher is more
//! relevant. Scores only need to be comparable within one call.
//!
//! - `LexicalScorer`: keyword overlap, local and deterministic
//! - `HfCrossEncoderScorer`: hosted cross-encoder via the HF text-classification task
//! - `FastEmbedScorer`: local ONNX cross-encoder (`local-models` feature)

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use agentic_rag_core::ProxyConfig;
use agentic_rag_llm::build_http_client;

use crate::models::settings::AppConfig;
use crate::utils::error::{AppError, AppResult};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Which relevance scorer backs the cross-encoder reranker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScorerType {
    Lexical,
    HfInference,
    FastEmbed,
}

impl ScorerType {
    pub fn default_model(&self) -> &'static str {
        match self {
            ScorerType::Lexical => "lexical",
            ScorerType::HfInference => "cross-encoder/ms-marco-MiniLM-L-6-v2",
            ScorerType::FastEmbed => "BAAI/bge-reranker-base",
        }
    }
}

impl std::fmt::Display for ScorerType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScorerType::Lexical => write!(f, "lexical"),
            ScorerType::HfInference => write!(f, "hf_inference"),
            ScorerType::FastEmbed => write!(f, "fastembed"),
        }
    }
}

impl std::str::FromStr for ScorerType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lexical" => Ok(ScorerType::Lexical),
            "hf_inference" | "hf-inference" | "huggingface" => Ok(ScorerType::HfInference),
            "fastembed" | "local" => Ok(ScorerType::FastEmbed),
            other => Err(AppError::config(format!("unknown reranker scorer '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RerankerConfig {
    pub scorer: ScorerType,
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub proxy: Option<ProxyConfig>,
}

fn default_timeout_secs() -> u64 {
    60
}

impl RerankerConfig {
    pub fn new(scorer: ScorerType) -> Self {
        Self {
            scorer,
            model: scorer.default_model().to_string(),
            api_key: None,
            base_url: None,
            timeout_secs: default_timeout_secs(),
            proxy: None,
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.model.trim().is_empty() {
            return Err("reranker.model must not be empty".to_string());
        }
        if self.scorer == ScorerType::HfInference
            && self.api_key.as_deref().map_or(true, |k| k.trim().is_empty())
        {
            return Err("the hf_inference reranker requires an API token".to_string());
        }
        if self.timeout_secs == 0 {
            return Err("reranker.timeout_secs must be at least 1".to_string());
        }
        Ok(())
    }
}

impl Default for RerankerConfig {
    fn default() -> Self {
        Self::new(ScorerType::Lexical)
    }
}

// ---------------------------------------------------------------------------
// Capability
// ---------------------------------------------------------------------------

#[async_trait]
pub trait RelevanceScorer: Send + Sync {
    /// One score per passage, in passage order.
    async fn score(&self, query: &str, passages: &[&str]) -> AppResult<Vec<f32>>;

    fn name(&self) -> &str;
}

// ---------------------------------------------------------------------------
// Lexical
// ---------------------------------------------------------------------------

/// Fraction of distinct query terms that occur in the passage.
pub struct LexicalScorer;

impl LexicalScorer {
    fn terms(text: &str) -> HashSet<String> {
        text.split(|c: char| !c.is_alphanumeric())
            .filter(|s| !s.is_empty())
            .map(|s| s.to_lowercase())
            .collect()
    }

    pub fn score_pair(query: &str, passage: &str) -> f32 {
        let query_terms = Self::terms(query);
        if query_terms.is_empty() {
            return 0.0;
        }
        let passage_terms = Self::terms(passage);
        let overlap = query_terms.intersection(&passage_terms).count() as f32;
        overlap / query_terms.len() as f32
    }
}

#[async_trait]
impl RelevanceScorer for LexicalScorer {
    async fn score(&self, query: &str, passages: &[&str]) -> AppResult<Vec<f32>> {
        Ok(passages
            .iter()
            .map(|p| Self::score_pair(query, p))
            .collect())
    }

    fn name(&self) -> &str {
        "lexical"
    }
}

// ---------------------------------------------------------------------------
// Hugging Face hosted cross-encoder
// ---------------------------------------------------------------------------

const HF_INFERENCE_URL: &str = "https://api-inference.huggingface.co";

#[derive(Debug, Deserialize)]
struct LabelScore {
    score: f32,
}

/// Text-classification output for one pair: a single label or the full
/// label distribution.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum PairOutput {
    Single(LabelScore),
    Labels(Vec<LabelScore>),
}

impl PairOutput {
    fn relevance(&self) -> Option<f32> {
        match self {
            PairOutput::Single(l) => Some(l.score),
            PairOutput::Labels(labels) => labels.iter().map(|l| l.score).reduce(f32::max),
        }
    }
}

pub struct HfCrossEncoderScorer {
    client: reqwest::Client,
    endpoint: String,
    api_token: String,
    model: String,
}

impl HfCrossEncoderScorer {
    pub fn new(config: &RerankerConfig) -> AppResult<Self> {
        let base = config
            .base_url
            .as_deref()
            .unwrap_or(HF_INFERENCE_URL)
            .trim_end_matches('/');
        let client = build_http_client(
            config.proxy.as_ref(),
            Some(Duration::from_secs(config.timeout_secs)),
        )?;
        Ok(Self {
            client,
            endpoint: format!("{}/models/{}", base, config.model.trim()),
            api_token: config.api_key.clone().unwrap_or_default(),
            model: config.model.trim().to_string(),
        })
    }

    fn request_body(query: &str, passages: &[&str]) -> serde_json::Value {
        let inputs: Vec<serde_json::Value> = passages
            .iter()
            .map(|p| serde_json::json!({ "text": query, "text_pair": p }))
            .collect();
        serde_json::json!({ "inputs": inputs })
    }

    fn parse_scores(body: &str, expected: usize) -> AppResult<Vec<f32>> {
        let rows: Vec<PairOutput> = serde_json::from_str(body)
            .map_err(|e| AppError::rerank(format!("unexpected scorer response: {}", e)))?;
        if rows.len() != expected {
            return Err(AppError::rerank(format!(
                "scorer returned {} scores for {} passages",
                rows.len(),
                expected
            )));
        }
        rows.iter()
            .map(|r| {
                r.relevance()
                    .ok_or_else(|| AppError::rerank("scorer returned an empty label list"))
            })
            .collect()
    }
}

#[async_trait]
impl RelevanceScorer for HfCrossEncoderScorer {
    async fn score(&self, query: &str, passages: &[&str]) -> AppResult<Vec<f32>> {
        if passages.is_empty() {
            return Ok(Vec::new());
        }

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_token)
            .json(&Self::request_body(query, passages))
            .send()
            .await
            .map_err(|e| AppError::rerank(format!("{}: {}", self.model, e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AppError::rerank(e.to_string()))?;
        if !status.is_success() {
            return Err(AppError::rerank(format!(
                "{} returned HTTP {}: {}",
                self.model,
                status.as_u16(),
                body
            )));
        }

        Self::parse_scores(&body, passages.len())
    }

    fn name(&self) -> &str {
        &self.model
    }
}

// ---------------------------------------------------------------------------
// FastEmbed local cross-encoder
// ---------------------------------------------------------------------------

#[cfg(feature = "local-models")]
pub use local::FastEmbedScorer;

#[cfg(feature = "local-models")]
mod local {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use fastembed::{RerankInitOptions, RerankerModel, TextRerank};

    use super::{RelevanceScorer, RerankerConfig};
    use crate::utils::error::{AppError, AppResult};

    fn resolve_model(name: &str) -> AppResult<RerankerModel> {
        match name.trim() {
            "" | "BAAI/bge-reranker-base" => Ok(RerankerModel::BGERerankerBase),
            "BAAI/bge-reranker-v2-m3" => Ok(RerankerModel::BGERerankerV2M3),
            "jinaai/jina-reranker-v1-turbo-en" => Ok(RerankerModel::JINARerankerV1TurboEn),
            other => Err(AppError::config(format!(
                "reranker model '{}' is not bundled with fastembed",
                other
            ))),
        }
    }

    pub struct FastEmbedScorer {
        model: Arc<Mutex<TextRerank>>,
        name: String,
    }

    impl FastEmbedScorer {
        pub fn new(config: &RerankerConfig) -> AppResult<Self> {
            let kind = resolve_model(&config.model)?;
            let model = TextRerank::try_new(RerankInitOptions::new(kind))
                .map_err(|e| AppError::rerank(format!("failed to load reranker: {}", e)))?;
            Ok(Self {
                model: Arc::new(Mutex::new(model)),
                name: config.model.clone(),
            })
        }
    }

    #[async_trait]
    impl RelevanceScorer for FastEmbedScorer {
        async fn score(&self, query: &str, passages: &[&str]) -> AppResult<Vec<f32>> {
            if passages.is_empty() {
                return Ok(Vec::new());
            }
            let model = Arc::clone(&self.model);
            let query = query.to_string();
            let docs: Vec<String> = passages.iter().map(|p| p.to_string()).collect();
            let count = docs.len();

            let ranked = tokio::task::spawn_blocking(move || {
                let mut guard = model
                    .lock()
                    .map_err(|_| AppError::rerank("reranker model lock poisoned"))?;
                guard
                    .rerank(query, docs, false, None)
                    .map_err(|e| AppError::rerank(e.to_string()))
            })
            .await
            .map_err(|e| AppError::internal(e.to_string()))??;

            // fastembed returns results sorted by score; restore passage order
            let mut scores = vec![f32::NEG_INFINITY; count];
            for result in ranked {
                if let Some(slot) = scores.get_mut(result.index) {
                    *slot = result.score;
                }
            }
            Ok(scores)
        }

        fn name(&self) -> &str {
            &self.name
        }
    }
}

// ---------------------------------------------------------------------------
// Factory
// ---------------------------------------------------------------------------

/// Build the relevance scorer named in the reranker section.
pub fn build_scorer(config: &AppConfig) -> AppResult<Arc<dyn RelevanceScorer>> {
    let reranker = config.reranker_config();
    reranker.validate().map_err(AppError::config)?;

    let scorer: Arc<dyn RelevanceScorer> = match reranker.scorer {
        ScorerType::Lexical => Arc::new(LexicalScorer),
        ScorerType::HfInference => Arc::new(HfCrossEncoderScorer::new(&reranker)?),
        #[cfg(feature = "local-models")]
        ScorerType::FastEmbed => Arc::new(FastEmbedScorer::new(&reranker)?),
        #[cfg(not(feature = "local-models"))]
        ScorerType::FastEmbed => {
            return Err(AppError::config(
                "the fastembed scorer requires building with the `local-models` feature",
            ))
        }
    };

    tracing::info!(scorer = %reranker.scorer, model = %reranker.model, "relevance scorer ready");
    Ok(scorer)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
