//! Settings Models
//!
//! Application configuration stored in config.json, plus environment
//! overrides with the `AGENTIC_RAG_` prefix.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use agentic_rag_core::ProxyConfig;
use agentic_rag_llm::{ProviderConfig, ProviderType};

use crate::services::embedding::{
    EmbeddingManagerConfig, EmbeddingProviderConfig, EmbeddingProviderType,
};
use crate::services::knowledge::scorer::{RerankerConfig, ScorerType};

/// Prefix shared by every environment override.
pub const ENV_PREFIX: &str = "AGENTIC_RAG_";

/// Retrieval and chunking parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RagSettings {
    /// Window length in characters
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    /// Characters shared by consecutive windows
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,
    /// Coarse retrieval fetches `top_k * overfetch_factor` candidates
    #[serde(default = "default_overfetch_factor")]
    pub overfetch_factor: usize,
    #[serde(default = "default_max_top_k")]
    pub max_top_k: usize,
    #[serde(default = "default_top_k")]
    pub default_top_k: usize,
    /// Build the LLM agent reranker alongside the numeric one
    #[serde(default = "default_enable_agent_reranker")]
    pub enable_agent_reranker: bool,
}

fn default_chunk_size() -> usize {
    600
}

fn default_chunk_overlap() -> usize {
    120
}

fn default_overfetch_factor() -> usize {
    3
}

fn default_max_top_k() -> usize {
    20
}

fn default_top_k() -> usize {
    5
}

fn default_enable_agent_reranker() -> bool {
    true
}

impl Default for RagSettings {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            overfetch_factor: default_overfetch_factor(),
            max_top_k: default_max_top_k(),
            default_top_k: default_top_k(),
            enable_agent_reranker: default_enable_agent_reranker(),
        }
    }
}

impl RagSettings {
    pub fn validate(&self) -> Result<(), String> {
        if self.chunk_size == 0 {
            return Err("chunk_size must be positive".to_string());
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            ));
        }
        if self.overfetch_factor == 0 {
            return Err("overfetch_factor must be at least 1".to_string());
        }
        if self.max_top_k == 0 {
            return Err("max_top_k must be at least 1".to_string());
        }
        if self.default_top_k == 0 || self.default_top_k > self.max_top_k {
            return Err(format!(
                "default_top_k must be between 1 and max_top_k ({})",
                self.max_top_k
            ));
        }
        Ok(())
    }
}

/// Application configuration stored in config.json
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    /// Text generation backend used by the agent reranker
    #[serde(default)]
    pub llm: ProviderConfig,
    #[serde(default)]
    pub embedding: EmbeddingProviderConfig,
    #[serde(default)]
    pub embedding_manager: EmbeddingManagerConfig,
    #[serde(default)]
    pub reranker: RerankerConfig,
    #[serde(default)]
    pub rag: RagSettings,
    /// Applied to every remote backend whose own section has no proxy
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxy: Option<ProxyConfig>,
}

impl AppConfig {
    /// Generation settings with the global proxy resolved.
    pub fn llm_config(&self) -> ProviderConfig {
        let mut config = self.llm.clone();
        if config.proxy.is_none() {
            config.proxy = self.proxy.clone();
        }
        config
    }

    /// Embedding settings with the global proxy resolved.
    pub fn embedding_config(&self) -> EmbeddingProviderConfig {
        let mut config = self.embedding.clone();
        if config.proxy.is_none() {
            config.proxy = self.proxy.clone();
        }
        config
    }

    /// Reranker settings with the global proxy resolved.
    pub fn reranker_config(&self) -> RerankerConfig {
        let mut config = self.reranker.clone();
        if config.proxy.is_none() {
            config.proxy = self.proxy.clone();
        }
        config
    }

    /// Apply `AGENTIC_RAG_*` overrides from `vars`. Unknown keys are ignored.
    ///
    /// `PROVIDER` resets the generation model to that backend's default and
    /// `RERANKER_SCORER` does the same for the scorer model, unless the
    /// matching `*_MODEL` key is also present.
    pub fn apply_env_overrides<I>(&mut self, vars: I) -> Result<(), String>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let vars: HashMap<String, String> = vars
            .into_iter()
            .filter_map(|(k, v)| {
                k.strip_prefix(ENV_PREFIX)
                    .map(|name| (name.to_string(), v))
            })
            .collect();
        let get = |name: &str| vars.get(name).map(|v| v.trim().to_string());

        // Generation
        if let Some(provider) = get("PROVIDER") {
            let provider: ProviderType = provider.parse().map_err(|e| format!("{}", e))?;
            self.llm.provider = provider;
            self.llm.model = provider.default_model().to_string();
        }
        if let Some(model) = get("LLM_MODEL") {
            self.llm.model = model;
        }
        if let Some(url) = get("LLM_BASE_URL") {
            self.llm.base_url = Some(url);
        }
        if let Some(max_tokens) = get("MAX_TOKENS") {
            self.llm.max_tokens = parse_number("MAX_TOKENS", &max_tokens)?;
        }
        if let Some(temperature) = get("TEMPERATURE") {
            self.llm.temperature = parse_number("TEMPERATURE", &temperature)?;
        }

        // Embedding
        if let Some(provider) = get("EMBEDDING_PROVIDER") {
            let provider: EmbeddingProviderType =
                provider.parse().map_err(|e| format!("{}", e))?;
            self.embedding = EmbeddingProviderConfig {
                proxy: self.embedding.proxy.take(),
                ..EmbeddingProviderConfig::new(provider)
            };
        }
        if let Some(model) = get("EMBEDDING_MODEL") {
            self.embedding.model = model;
        }

        // Reranker
        if let Some(scorer) = get("RERANKER_SCORER") {
            let scorer: ScorerType = scorer.parse().map_err(|e| format!("{}", e))?;
            self.reranker.scorer = scorer;
            self.reranker.model = scorer.default_model().to_string();
        }
        if let Some(model) = get("RERANKER_MODEL") {
            self.reranker.model = model;
        }

        // Credentials go to whichever sections talk to that service
        if let Some(key) = get("OPENAI_API_KEY") {
            if self.llm.provider == ProviderType::OpenAI {
                self.llm.api_key = Some(key.clone());
            }
            if self.embedding.provider == EmbeddingProviderType::OpenAI {
                self.embedding.api_key = Some(key);
            }
        }
        if let Some(token) = get("HF_API_TOKEN") {
            if self.llm.provider == ProviderType::HfInference {
                self.llm.api_key = Some(token.clone());
            }
            if self.embedding.provider == EmbeddingProviderType::HfInference {
                self.embedding.api_key = Some(token.clone());
            }
            if self.reranker.scorer == ScorerType::HfInference {
                self.reranker.api_key = Some(token);
            }
        }

        // Retrieval
        if let Some(size) = get("CHUNK_SIZE") {
            self.rag.chunk_size = parse_number("CHUNK_SIZE", &size)?;
        }
        if let Some(overlap) = get("CHUNK_OVERLAP") {
            self.rag.chunk_overlap = parse_number("CHUNK_OVERLAP", &overlap)?;
        }
        if let Some(factor) = get("OVERFETCH_FACTOR") {
            self.rag.overfetch_factor = parse_number("OVERFETCH_FACTOR", &factor)?;
        }

        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        self.llm.validate().map_err(|e| format!("llm: {}", e))?;
        self.embedding
            .validate()
            .map_err(|e| format!("embedding: {}", e))?;
        self.embedding_manager.validate()?;
        self.reranker.validate()?;
        self.rag.validate()?;
        if let Some(ref proxy) = self.proxy {
            proxy.validate().map_err(|e| format!("proxy: {}", e))?;
        }
        Ok(())
    }
}

fn parse_number<T: std::str::FromStr>(name: &str, value: &str) -> Result<T, String> {
    value
        .parse()
        .map_err(|_| format!("{}{} is not a valid number: '{}'", ENV_PREFIX, name, value))
}
