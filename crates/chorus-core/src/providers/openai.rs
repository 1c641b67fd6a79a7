//! OpenAI provider (chat completions)

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use crate::types::ProviderResult;

use super::http::{self, Exchange};
use super::types::{GenerateParams, LlmProvider, PROVIDER_TIMEOUT, ProviderSettings};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// OpenAI provider, also the wire format behind every OpenAI-compatible endpoint
pub struct OpenAiProvider {
    client: Client,
    name: String,
    api_key: String,
    endpoint: String,
    model: String,
    timeout: Duration,
}

impl std::fmt::Debug for OpenAiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiProvider")
            .field("name", &self.name)
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .finish()
    }
}

impl OpenAiProvider {
    pub fn new(client: Client, settings: &ProviderSettings) -> Self {
        Self::with_endpoint(
            client,
            "openai",
            format!("{}/chat/completions", settings.base_url_or(DEFAULT_BASE_URL)),
            settings.api_key.clone(),
            settings.model_or(DEFAULT_MODEL),
        )
    }

    /// Point at an arbitrary chat-completions URL under a custom provider name
    pub fn with_endpoint(
        client: Client,
        name: impl Into<String>,
        endpoint: impl Into<String>,
        api_key: String,
        model: String,
    ) -> Self {
        Self {
            client,
            name: name.into(),
            api_key,
            endpoint: endpoint.into(),
            model,
            timeout: PROVIDER_TIMEOUT,
        }
    }

    /// Override the per-call timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Build the OpenAI request body from generic parameters
    fn to_openai_request<'a>(model: &'a str, params: &'a GenerateParams) -> OpenAiRequest<'a> {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = params.system.as_deref() {
            messages.push(OpenAiMessage {
                role: "system",
                content: system,
            });
        }
        messages.push(OpenAiMessage {
            role: "user",
            content: &params.prompt,
        });

        OpenAiRequest {
            model,
            messages,
            temperature: params.temperature,
            max_tokens: params.max_tokens,
        }
    }

    /// Pull output, finish reason and usage out of a chat-completions body.
    /// Missing fields default to empty/absent.
    fn from_openai_response(name: &str, body: &Value, latency_ms: u64) -> ProviderResult {
        let choice = body.get("choices").and_then(|c| c.get(0));
        let output = choice
            .and_then(|c| c.get("message"))
            .and_then(|m| http::str_field(m, "content"))
            .unwrap_or_default();
        let finish_reason = choice.and_then(|c| http::str_field(c, "finish_reason"));

        ProviderResult::success(name, output, latency_ms)
            .with_finish_reason(finish_reason)
            .with_usage(body.get("usage").cloned())
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    fn provider_name(&self) -> &str {
        &self.name
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn generate(&self, params: &GenerateParams) -> ProviderResult {
        let body = Self::to_openai_request(&self.model, params);

        debug!(
            "{} request: model={}, messages={}",
            self.name,
            self.model,
            body.messages.len()
        );

        let mut request = self
            .client
            .post(&self.endpoint)
            .header("Content-Type", "application/json")
            .json(&body);
        if !self.api_key.is_empty() {
            request = request.bearer_auth(&self.api_key);
        }

        match http::post_json(&self.name, request, self.timeout).await {
            Exchange {
                latency_ms,
                outcome: Ok(body),
            } => Self::from_openai_response(&self.name, &body, latency_ms),
            Exchange {
                latency_ms,
                outcome: Err(error),
            } => ProviderResult::failure(&self.name, error, latency_ms),
        }
    }
}

// ── OpenAI wire types ──

#[derive(Debug, Serialize)]
struct OpenAiRequest<'a> {
    model: &'a str,
    messages: Vec<OpenAiMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Serialize)]
struct OpenAiMessage<'a> {
    role: &'static str,
    content: &'a str,
}
