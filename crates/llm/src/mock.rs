//! Mock Provider
//!
//! Offline provider returning a fixed reply. Used as the default backend and
//! as a test double: every call is recorded so prompts can be inspected.

use std::sync::Mutex;

use async_trait::async_trait;

use super::provider::LlmProvider;
use super::types::{LlmError, LlmResult, ProviderConfig};

/// Reply used when no canned response is configured.
pub const DEFAULT_MOCK_REPLY: &str =
    "# Mock output\ndef example():\n    return 'Replace with real model output'\n";

/// One recorded `generate` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub system: String,
    pub prompt: String,
}

pub struct MockProvider {
    config: ProviderConfig,
    reply: Result<String, LlmError>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl MockProvider {
    pub fn new(config: ProviderConfig) -> Self {
        Self {
            config,
            reply: Ok(DEFAULT_MOCK_REPLY.to_string()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Always answer with `reply`.
    pub fn with_reply(reply: impl Into<String>) -> Self {
        Self {
            reply: Ok(reply.into()),
            ..Self::new(ProviderConfig::default())
        }
    }

    /// Always fail with `error`.
    pub fn failing(error: LlmError) -> Self {
        Self {
            reply: Err(error),
            ..Self::new(ProviderConfig::default())
        }
    }

    /// Calls made so far, oldest first.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls
            .lock()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new(ProviderConfig::default())
    }
}

#[async_trait]
impl LlmProvider for MockProvider {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn model(&self) -> &str {
        &self.config.model
    }

    async fn generate(&self, system: &str, prompt: &str) -> LlmResult<String> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(RecordedCall {
                system: system.to_string(),
                prompt: prompt.to_string(),
            });
        }
        self.reply.clone()
    }

    async fn health_check(&self) -> LlmResult<()> {
        Ok(())
    }

    fn config(&self) -> &ProviderConfig {
        &self.config
    }
}
