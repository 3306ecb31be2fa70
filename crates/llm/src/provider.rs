//! LLM Provider Trait
//!
//! Defines the common interface for all text generation providers, plus the
//! HTTP error mapping and retry helpers the remote providers share.

use std::future::Future;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use backoff::{ExponentialBackoff, ExponentialBackoffBuilder};

use super::types::{LlmError, LlmResult, ProviderConfig};

/// Trait that all text generation providers must implement.
///
/// Generation is a single system + user turn returning plain text. Retries,
/// timeouts and transport concerns stay inside the implementation.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Returns the provider name for identification.
    fn name(&self) -> &'static str;

    /// Returns the current model being used.
    fn model(&self) -> &str;

    /// Generate a completion for one system instruction and one user prompt.
    async fn generate(&self, system: &str, prompt: &str) -> LlmResult<String>;

    /// Check if the provider is healthy and reachable.
    async fn health_check(&self) -> LlmResult<()>;

    /// Get the configuration for this provider.
    fn config(&self) -> &ProviderConfig;
}

/// Helper function to create an error for missing API key
pub fn missing_api_key_error(provider: &str) -> LlmError {
    LlmError::AuthenticationFailed {
        message: format!("API key not configured for {}", provider),
    }
}

/// Helper function to parse HTTP error status codes
pub fn parse_http_error(status: u16, body: &str, provider: &str) -> LlmError {
    match status {
        401 => LlmError::AuthenticationFailed {
            message: format!("{}: Invalid API key", provider),
        },
        403 => LlmError::AuthenticationFailed {
            message: format!("{}: Access denied", provider),
        },
        404 => LlmError::ModelNotFound {
            model: body.to_string(),
        },
        429 => LlmError::RateLimited {
            message: body.to_string(),
            retry_after: None,
        },
        400 | 422 => LlmError::InvalidRequest {
            message: body.to_string(),
        },
        // HF returns 503 while a cold model is loading.
        503 => LlmError::ProviderUnavailable {
            message: format!("{}: {}", provider, body),
        },
        500..=599 => LlmError::ServerError {
            message: body.to_string(),
            status: Some(status),
        },
        _ => LlmError::Other {
            message: format!("HTTP {}: {}", status, body),
        },
    }
}

/// Map a reqwest transport failure.
pub fn map_transport_error(err: reqwest::Error, provider: &str) -> LlmError {
    if err.is_connect() {
        LlmError::ProviderUnavailable {
            message: format!("{}: {}", provider, err),
        }
    } else if err.is_timeout() {
        LlmError::NetworkError {
            message: format!("{}: request timed out: {}", provider, err),
        }
    } else {
        LlmError::NetworkError {
            message: err.to_string(),
        }
    }
}

/// Exponential backoff between 1 and 8 seconds.
pub fn default_backoff() -> ExponentialBackoff {
    ExponentialBackoffBuilder::new()
        .with_initial_interval(Duration::from_secs(1))
        .with_max_interval(Duration::from_secs(8))
        .with_multiplier(2.0)
        .with_max_elapsed_time(Some(Duration::from_secs(60)))
        .build()
}

/// Run `operation` until it succeeds, fails permanently, or `max_attempts`
/// calls have been made. Only retryable `LlmError`s are retried.
pub async fn retry_transient<T, F, Fut>(
    provider: &str,
    max_attempts: u32,
    policy: ExponentialBackoff,
    operation: F,
) -> LlmResult<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = LlmResult<T>>,
{
    let max_attempts = max_attempts.max(1);
    let attempts = AtomicU32::new(0);
    let attempts = &attempts;
    let operation = &operation;

    backoff::future::retry(policy, move || async move {
        let attempt = attempts.fetch_add(1, Ordering::Relaxed) + 1;
        operation().await.map_err(|err| {
            if err.is_retryable() && attempt < max_attempts {
                tracing::warn!(
                    provider,
                    attempt,
                    max_attempts,
                    error = %err,
                    "transient provider error, backing off"
                );
                backoff::Error::transient(err)
            } else {
                backoff::Error::permanent(err)
            }
        })
    })
    .await
}
