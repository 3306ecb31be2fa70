//! Embedding Services
//!
//! The embedder capability and its backends. `build_embedder` is the single
//! construction point: it picks the backend named in the configuration and
//! wraps it in the [`EmbeddingManager`].

pub mod hashing;
pub mod hf_inference;
#[cfg(feature = "local-models")]
pub mod local;
pub mod manager;
pub mod ollama;
pub mod openai;
pub mod provider;

use std::sync::Arc;

pub use hashing::HashingEmbeddingProvider;
pub use hf_inference::HfInferenceEmbeddingProvider;
#[cfg(feature = "local-models")]
pub use local::FastEmbedProvider;
pub use manager::{EmbeddingManager, EmbeddingManagerConfig};
pub use ollama::OllamaEmbeddingProvider;
pub use openai::OpenAIEmbeddingProvider;
pub use provider::{
    l2_normalize, EmbeddingError, EmbeddingProvider, EmbeddingProviderCapability,
    EmbeddingProviderConfig, EmbeddingProviderType, EmbeddingResult,
};

use crate::models::settings::AppConfig;
use crate::utils::error::{AppError, AppResult};

/// Build a raw backend from its configuration.
pub fn build_provider(
    config: &EmbeddingProviderConfig,
) -> EmbeddingResult<Box<dyn EmbeddingProvider>> {
    config.validate()?;

    match config.provider {
        EmbeddingProviderType::Hashing => Ok(Box::new(HashingEmbeddingProvider::new(
            config.effective_dimension(),
        )?)),
        EmbeddingProviderType::Ollama => Ok(Box::new(OllamaEmbeddingProvider::new(config)?)),
        EmbeddingProviderType::OpenAI => Ok(Box::new(OpenAIEmbeddingProvider::new(config)?)),
        EmbeddingProviderType::HfInference => {
            Ok(Box::new(HfInferenceEmbeddingProvider::new(config)?))
        }
        #[cfg(feature = "local-models")]
        EmbeddingProviderType::FastEmbed => Ok(Box::new(FastEmbedProvider::new(config)?)),
        #[cfg(not(feature = "local-models"))]
        EmbeddingProviderType::FastEmbed => Err(EmbeddingError::InvalidConfig {
            message: "the fastembed provider requires building with the `local-models` feature"
                .to_string(),
        }),
    }
}

/// Build the embedder described by `config`, wrapped in the caching,
/// retrying manager.
pub fn build_embedder(config: &AppConfig) -> AppResult<Arc<dyn EmbeddingProvider>> {
    let provider_config = config.embedding_config();
    let provider = build_provider(&provider_config)?;

    config
        .embedding_manager
        .validate()
        .map_err(AppError::config)?;

    tracing::info!(
        provider = %provider_config.provider,
        model = provider_config.effective_model(),
        "embedding backend ready"
    );

    Ok(Arc::new(EmbeddingManager::new(
        provider,
        config.embedding_manager.clone(),
    )))
}
