//! Google Gemini provider

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use crate::types::ProviderResult;

use super::http::{self, Exchange};
use super::types::{GenerateParams, LlmProvider, PROVIDER_TIMEOUT, ProviderSettings};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_MODEL: &str = "gemini-1.5-pro";

/// Google Gemini provider
pub struct GoogleProvider {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    timeout: Duration,
}

impl std::fmt::Debug for GoogleProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleProvider")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish()
    }
}

impl GoogleProvider {
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

    /// System prompt and user prompt travel as parts of a single user turn
    fn to_gemini_request(params: &GenerateParams) -> GeminiRequest<'_> {
        let mut parts = Vec::with_capacity(2);
        if let Some(system) = params.system.as_deref() {
            parts.push(GeminiPart { text: system });
        }
        parts.push(GeminiPart {
            text: &params.prompt,
        });

        // Gemini only receives generation settings alongside a temperature
        let generation_config = params.temperature.map(|temperature| GeminiGenerationConfig {
            temperature,
            max_output_tokens: params.max_tokens,
        });

        GeminiRequest {
            contents: vec![GeminiContent { role: "user", parts }],
            generation_config,
        }
    }

    fn from_gemini_response(body: &Value, latency_ms: u64) -> ProviderResult {
        let candidate = body.get("candidates").and_then(|c| c.get(0));
        let output = http::join_text(
            candidate
                .and_then(|c| c.get("content"))
                .and_then(|c| c.get("parts")),
            None,
        );
        let finish_reason = candidate.and_then(|c| http::str_field(c, "finishReason"));

        ProviderResult::success("google", output, latency_ms)
            .with_finish_reason(finish_reason)
            .with_usage(body.get("usageMetadata").cloned())
    }
}

#[async_trait]
impl LlmProvider for GoogleProvider {
    fn provider_name(&self) -> &str {
        "google"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn generate(&self, params: &GenerateParams) -> ProviderResult {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        );
        let body = Self::to_gemini_request(params);

        debug!(
            "Gemini request: model={}, parts={}",
            self.model,
            body.contents[0].parts.len()
        );

        let mut request = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(&body);
        if !self.api_key.is_empty() {
            request = request.query(&[("key", self.api_key.as_str())]);
        }

        match http::post_json("google", request, self.timeout).await {
            Exchange {
                latency_ms,
                outcome: Ok(body),
            } => Self::from_gemini_response(&body, latency_ms),
            Exchange {
                latency_ms,
                outcome: Err(error),
            } => ProviderResult::failure("google", error, latency_ms),
        }
    }
}

// ── Gemini wire types ──

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest<'a> {
    contents: Vec<GeminiContent<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GeminiGenerationConfig>,
}

#[derive(Debug, Serialize)]
struct GeminiContent<'a> {
    role: &'static str,
    parts: Vec<GeminiPart<'a>>,
}

#[derive(Debug, Serialize)]
struct GeminiPart<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
}
