//! Anthropic Claude provider

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use crate::types::ProviderResult;

use super::http::{self, Exchange};
use super::types::{GenerateParams, LlmProvider, PROVIDER_TIMEOUT, ProviderSettings};

pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
pub const DEFAULT_MODEL: &str = "claude-3-5-sonnet-latest";
/// Anthropic requires max_tokens on every request
pub const DEFAULT_MAX_TOKENS: u32 = 512;
const API_VERSION: &str = "2023-06-01";

/// Anthropic Claude provider
pub struct AnthropicProvider {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    timeout: Duration,
}

impl std::fmt::Debug for AnthropicProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnthropicProvider")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish()
    }
}

impl AnthropicProvider {
    pub fn new(client: Client, settings: &ProviderSettings) -> Self {
        Self {
            client,
            api_key: settings.api_key.clone(),
            base_url: settings.base_url_or(DEFAULT_BASE_URL),
            model: settings.model_or(DEFAULT_MODEL),
            timeout: PROVIDER_TIMEOUT,
        }
    }

    /// Override the per-call timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn to_anthropic_request<'a>(model: &'a str, params: &'a GenerateParams) -> AnthropicRequest<'a> {
        AnthropicRequest {
            model,
            max_tokens: params.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            system: params.system.as_deref(),
            messages: vec![AnthropicMessage {
                role: "user",
                content: &params.prompt,
            }],
            temperature: params.temperature,
        }
    }

    /// Content comes back as a list of blocks; only text blocks are kept
    fn from_anthropic_response(body: &Value, latency_ms: u64) -> ProviderResult {
        let output = http::join_text(body.get("content"), Some("text"));

        ProviderResult::success("anthropic", output, latency_ms)
            .with_finish_reason(http::str_field(body, "stop_reason"))
            .with_usage(body.get("usage").cloned())
    }
}

#[async_trait]
impl LlmProvider for AnthropicProvider {
    fn provider_name(&self) -> &str {
        "anthropic"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn generate(&self, params: &GenerateParams) -> ProviderResult {
        let url = format!("{}/v1/messages", self.base_url);
        let body = Self::to_anthropic_request(&self.model, params);

        debug!(
            "Anthropic request: model={}, max_tokens={}",
            self.model, body.max_tokens
        );

        let mut request = self
            .client
            .post(&url)
            .header("anthropic-version", API_VERSION)
            .header("content-type", "application/json")
            .json(&body);
        if !self.api_key.is_empty() {
            request = request.header("x-api-key", &self.api_key);
        }

        match http::post_json("anthropic", request, self.timeout).await {
            Exchange {
                latency_ms,
                outcome: Ok(body),
            } => Self::from_anthropic_response(&body, latency_ms),
            Exchange {
                latency_ms,
                outcome: Err(error),
            } => ProviderResult::failure("anthropic", error, latency_ms),
        }
    }
}

// ── Anthropic wire types ──

#[derive(Debug, Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    messages: Vec<AnthropicMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Serialize)]
struct AnthropicMessage<'a> {
    role: &'static str,
    content: &'a str,
}
