//! Hugging Face Inference Provider
//!
//! Hosted open-weight text generation via the Hugging Face Inference API.
//! The system and user turns are folded into a single chat-template prompt.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use super::provider::{
    default_backoff, map_transport_error, missing_api_key_error, parse_http_error,
    retry_transient, LlmProvider,
};
use super::types::{LlmError, LlmResult, ProviderConfig};
use crate::http_client::build_http_client;

/// Default Inference API root; the model id is appended as `/models/{model}`.
const HF_INFERENCE_URL: &str = "https://api-inference.huggingface.co";

/// Hugging Face hosted text generation provider
pub struct HfInferenceProvider {
    config: ProviderConfig,
    client: reqwest::Client,
}

impl HfInferenceProvider {
    pub fn new(config: ProviderConfig) -> LlmResult<Self> {
        let client = build_http_client(
            config.proxy.as_ref(),
            Some(Duration::from_secs(config.timeout_secs)),
        )?;
        Ok(Self { config, client })
    }

    fn endpoint(&self) -> String {
        let root = self
            .config
            .base_url
            .as_deref()
            .unwrap_or(HF_INFERENCE_URL)
            .trim_end_matches('/');
        format!("{}/models/{}", root, self.config.model)
    }

    /// Zephyr-style chat template understood by most instruct models on the hub.
    pub fn format_prompt(system: &str, prompt: &str) -> String {
        format!(
            "<|system|>\n{}\n</s>\n<|user|>\n{}\n</s>\n<|assistant|>\n",
            system, prompt
        )
    }

    fn build_request_body(&self, system: &str, prompt: &str) -> serde_json::Value {
        serde_json::json!({
            "inputs": Self::format_prompt(system, prompt),
            "parameters": {
                "max_new_tokens": self.config.max_tokens,
                "temperature": self.config.temperature,
                "return_full_text": false,
            },
        })
    }

    async fn send_once(&self, token: &str, body: &serde_json::Value) -> LlmResult<String> {
        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(token)
            .json(body)
            .send()
            .await
            .map_err(|e| map_transport_error(e, "hf_inference"))?;

        let status = response.status().as_u16();
        let body_text = response.text().await.map_err(|e| LlmError::NetworkError {
            message: e.to_string(),
        })?;

        if status != 200 {
            return Err(parse_http_error(status, &body_text, "hf_inference"));
        }

        Self::parse_generated_text(&body_text)
    }

    /// The API answers with either a list of generations or a single object.
    fn parse_generated_text(body: &str) -> LlmResult<String> {
        let parsed: GenerationResponse =
            serde_json::from_str(body).map_err(|e| LlmError::ParseError {
                message: format!("Failed to parse text generation response: {}", e),
            })?;

        let text = match parsed {
            GenerationResponse::Many(items) => items
                .into_iter()
                .next()
                .map(|g| g.generated_text)
                .ok_or_else(|| LlmError::ParseError {
                    message: "empty generation list".to_string(),
                })?,
            GenerationResponse::One(g) => g.generated_text,
        };
        Ok(text.trim().to_string())
    }
}

#[async_trait]
impl LlmProvider for HfInferenceProvider {
    fn name(&self) -> &'static str {
        "hf_inference"
    }

    fn model(&self) -> &str {
        &self.config.model
    }

    async fn generate(&self, system: &str, prompt: &str) -> LlmResult<String> {
        let token = self
            .config
            .api_key
            .as_deref()
            .ok_or_else(|| missing_api_key_error("hf_inference"))?;

        let body = self.build_request_body(system, prompt);
        let body = &body;
        retry_transient(
            "hf_inference",
            self.config.max_retries,
            default_backoff(),
            move || self.send_once(token, body),
        )
        .await
    }

    async fn health_check(&self) -> LlmResult<()> {
        self.generate("Reply with OK.", "ping").await.map(|_| ())
    }

    fn config(&self) -> &ProviderConfig {
        &self.config
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum GenerationResponse {
    Many(Vec<Generation>),
    One(Generation),
}

#[derive(Debug, Deserialize)]
struct Generation {
    generated_text: String,
}
