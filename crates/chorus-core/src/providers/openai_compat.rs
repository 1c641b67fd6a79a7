//! OpenAI-compatible providers (Mistral, Perplexity, self-hosted gateways)
//!
//! Reuses the OpenAI wire format with a provider-specific endpoint.

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

use crate::types::ProviderResult;

use super::openai::OpenAiProvider;
use super::types::{GenerateParams, LlmProvider, ProviderSettings};

pub const MISTRAL_BASE_URL: &str = "https://api.mistral.ai";
pub const MISTRAL_MODEL: &str = "mistral-large-latest";
pub const PERPLEXITY_BASE_URL: &str = "https://api.perplexity.ai";
pub const PERPLEXITY_MODEL: &str = "llama-3.1-sonar-large-128k-online";

/// OpenAI-compatible provider that wraps [`OpenAiProvider`] under its own name
pub struct OpenAiCompatProvider {
    inner: OpenAiProvider,
}

impl std::fmt::Debug for OpenAiCompatProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiCompatProvider")
            .field("inner", &self.inner)
            .finish()
    }
}

impl OpenAiCompatProvider {
    /// Create a new OpenAI-compatible provider.
    ///
    /// - `name`: registry key (e.g. "mistral", "groq")
    /// - `endpoint`: full chat-completions URL
    pub fn new(
        client: Client,
        name: impl Into<String>,
        endpoint: impl Into<String>,
        api_key: String,
        model: String,
    ) -> Self {
        Self {
            inner: OpenAiProvider::with_endpoint(client, name, endpoint, api_key, model),
        }
    }

    pub fn mistral(client: Client, settings: &ProviderSettings) -> Self {
        Self::new(
            client,
            "mistral",
            format!("{}/v1/chat/completions", settings.base_url_or(MISTRAL_BASE_URL)),
            settings.api_key.clone(),
            settings.model_or(MISTRAL_MODEL),
        )
    }

    pub fn perplexity(client: Client, settings: &ProviderSettings) -> Self {
        Self::new(
            client,
            "perplexity",
            format!("{}/chat/completions", settings.base_url_or(PERPLEXITY_BASE_URL)),
            settings.api_key.clone(),
            settings.model_or(PERPLEXITY_MODEL),
        )
    }

    /// Override the per-call timeout
    pub fn with_timeout(self, timeout: Duration) -> Self {
        Self {
            inner: self.inner.with_timeout(timeout),
        }
    }

    pub fn endpoint(&self) -> &str {
        self.inner.endpoint()
    }
}

#[async_trait]
impl LlmProvider for OpenAiCompatProvider {
    fn provider_name(&self) -> &str {
        self.inner.provider_name()
    }

    fn model(&self) -> &str {
        self.inner.model()
    }

    async fn generate(&self, params: &GenerateParams) -> ProviderResult {
        self.inner.generate(params).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_mistral_defaults() {
        let p = OpenAiCompatProvider::mistral(Client::new(), &ProviderSettings::default());
        assert_eq!(p.provider_name(), "mistral");
        assert_eq!(p.model(), MISTRAL_MODEL);
        assert_eq!(p.endpoint(), "https://api.mistral.ai/v1/chat/completions");
    }

    #[test]
    fn test_perplexity_defaults() {
        let p = OpenAiCompatProvider::perplexity(Client::new(), &ProviderSettings::default());
        assert_eq!(p.provider_name(), "perplexity");
        assert_eq!(p.model(), PERPLEXITY_MODEL);
        assert_eq!(p.endpoint(), "https://api.perplexity.ai/chat/completions");
    }

    #[test]
    fn test_compat_provider_debug_hides_key() {
        let p = OpenAiCompatProvider::new(
            Client::new(),
            "groq",
            "https://api.groq.com/openai/v1/chat/completions",
            "gsk_secret".to_string(),
            "llama3-70b".to_string(),
        );
        let debug = format!("{:?}", p);
        assert!(!debug.contains("gsk_secret"));
        assert!(debug.contains("groq"));
    }

    #[tokio::test]
    async fn test_results_carry_compat_name() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("authorization", "Bearer m-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"content": "bonjour"}, "finish_reason": "stop"}]
            })))
            .mount(&server)
            .await;

        let p = OpenAiCompatProvider::mistral(
            Client::new(),
            &ProviderSettings {
                api_key: "m-key".into(),
                base_url: Some(server.uri()),
                model: None,
            },
        );
        let r = p.generate(&GenerateParams::new("hello")).await;
        assert_eq!(r.provider_id, "mistral");
        assert_eq!(r.output, "bonjour");
    }
}
