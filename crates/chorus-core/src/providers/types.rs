//! Provider-agnostic types for multi-model fan-out

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::types::{GenerationRequest, ProviderResult};

/// Upper bound on a single outbound provider call
pub const PROVIDER_TIMEOUT: Duration = Duration::from_secs(60);

/// Generation parameters shared by every call in one fan-out
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerateParams {
    pub prompt: String,
    pub system: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl GenerateParams {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Default::default()
        }
    }

    /// Same parameters as `request`, with the prompt swapped out
    pub fn from_request(request: &GenerationRequest, prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            system: request.system_prompt.clone().filter(|s| !s.is_empty()),
            temperature: Some(request.temperature),
            max_tokens: request.max_tokens,
        }
    }
}

/// Trait that all LLM providers implement
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Registry key and the id stamped on every result (e.g. "openai")
    fn provider_name(&self) -> &str;

    /// Model identifier sent upstream (e.g. "gpt-4o-mini")
    fn model(&self) -> &str;

    /// Run one generation. Never fails: transport errors, bad statuses and
    /// timeouts come back as a result with `error` set.
    async fn generate(&self, params: &GenerateParams) -> ProviderResult;
}

/// Connection settings for one provider
#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProviderSettings {
    #[serde(default)]
    pub api_key: String,
    /// Overrides the built-in endpoint root
    #[serde(default)]
    pub base_url: Option<String>,
    /// Overrides the built-in model
    #[serde(default)]
    pub model: Option<String>,
}

impl ProviderSettings {
    pub fn with_key(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            ..Default::default()
        }
    }

    pub fn base_url_or(&self, default: &str) -> String {
        self.base_url
            .as_deref()
            .filter(|url| !url.is_empty())
            .unwrap_or(default)
            .trim_end_matches('/')
            .to_string()
    }

    pub fn model_or(&self, default: &str) -> String {
        self.model
            .as_deref()
            .filter(|m| !m.is_empty())
            .unwrap_or(default)
            .to_string()
    }
}

impl std::fmt::Debug for ProviderSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderSettings")
            .field("api_key", &mask_secret(&self.api_key))
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish()
    }
}

/// Settings for every built-in provider
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProvidersSettings {
    #[serde(default)]
    pub openai: ProviderSettings,
    #[serde(default)]
    pub anthropic: ProviderSettings,
    #[serde(default)]
    pub google: ProviderSettings,
    #[serde(default)]
    pub mistral: ProviderSettings,
    #[serde(default)]
    pub perplexity: ProviderSettings,
}

/// Mask a secret for Debug output / logs.
/// Shows first 3 and last 4 chars for keys longer than 7 chars, otherwise "***".
pub fn mask_secret(s: &str) -> String {
    if s.is_empty() {
        return "(empty)".to_string();
    }
    let chars: Vec<char> = s.chars().collect();
    if chars.len() > 7 {
        let prefix: String = chars[..3].iter().collect();
        let suffix: String = chars[chars.len() - 4..].iter().collect();
        format!("{}...{}", prefix, suffix)
    } else {
        "***".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_params_from_request() {
        let req = GenerationRequest::new("raw", vec!["openai".into()])
            .with_system_prompt("be brief")
            .with_max_tokens(64);
        let params = GenerateParams::from_request(&req, "enhanced");
        assert_eq!(params.prompt, "enhanced");
        assert_eq!(params.system.as_deref(), Some("be brief"));
        assert_eq!(params.temperature, Some(0.7));
        assert_eq!(params.max_tokens, Some(64));
    }

    #[test]
    fn test_params_drop_empty_system() {
        let req = GenerationRequest::new("raw", vec!["openai".into()]).with_system_prompt("");
        assert!(GenerateParams::from_request(&req, "raw").system.is_none());
    }

    #[test]
    fn test_settings_overrides() {
        let settings = ProviderSettings {
            api_key: "k".into(),
            base_url: Some("http://localhost:9000/".into()),
            model: None,
        };
        assert_eq!(settings.base_url_or("https://api.openai.com/v1"), "http://localhost:9000");
        assert_eq!(settings.model_or("gpt-4o-mini"), "gpt-4o-mini");

        let empty = ProviderSettings {
            base_url: Some(String::new()),
            model: Some(String::new()),
            ..Default::default()
        };
        assert_eq!(empty.base_url_or("https://x"), "https://x");
        assert_eq!(empty.model_or("m"), "m");
    }

    #[test]
    fn test_settings_debug_hides_key() {
        let settings = ProviderSettings::with_key("sk-secret-key-123");
        let debug = format!("{:?}", settings);
        assert!(!debug.contains("sk-secret-key-123"));
        assert!(debug.contains("sk-...-123"));
    }

    #[test]
    fn test_mask_secret() {
        assert_eq!(mask_secret(""), "(empty)");
        assert_eq!(mask_secret("short"), "***");
        assert_eq!(mask_secret("abcdefghij"), "abc...ghij");
    }
}
