//! Shared types for chorus-core

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::error::HubError;

/// Temperature used when a request does not specify one
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

/// Inclusive temperature bounds accepted by every provider
pub const TEMPERATURE_RANGE: std::ops::RangeInclusive<f32> = 0.0..=2.0;

/// Error text recorded for provider ids missing from the registry
pub const UNKNOWN_PROVIDER: &str = "Unknown provider";

/// A prompt to fan out to one or more providers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub prompt: String,
    /// Provider ids in the order results should come back; duplicates are kept
    #[serde(rename = "models")]
    pub provider_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
    /// Absent or `null` means [`DEFAULT_TEMPERATURE`]
    #[serde(default = "default_temperature", deserialize_with = "temperature_or_default")]
    pub temperature: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

fn default_temperature() -> f32 {
    DEFAULT_TEMPERATURE
}

/// Accepts an explicit `null` temperature as the default
pub fn temperature_or_default<'de, D>(deserializer: D) -> Result<f32, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<f32>::deserialize(deserializer)?.unwrap_or(DEFAULT_TEMPERATURE))
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>, provider_ids: Vec<String>) -> Self {
        Self {
            prompt: prompt.into(),
            provider_ids,
            system_prompt: None,
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: None,
        }
    }

    pub fn with_system_prompt(mut self, system: impl Into<String>) -> Self {
        self.system_prompt = Some(system.into());
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Check the request-level invariants before any provider is called
    pub fn validate(&self) -> Result<(), HubError> {
        if self.prompt.is_empty() {
            return Err(HubError::InvalidRequest("prompt must not be empty".into()));
        }
        if self.provider_ids.is_empty() {
            return Err(HubError::InvalidRequest(
                "at least one provider must be selected".into(),
            ));
        }
        if let Some(id) = self.provider_ids.iter().find(|id| id.is_empty()) {
            return Err(HubError::InvalidRequest(format!(
                "provider id must not be empty (got {:?})",
                id
            )));
        }
        if !TEMPERATURE_RANGE.contains(&self.temperature) {
            return Err(HubError::InvalidRequest(format!(
                "temperature must be between 0.0 and 2.0 (got {})",
                self.temperature
            )));
        }
        if self.max_tokens == Some(0) {
            return Err(HubError::InvalidRequest("max_tokens must be at least 1".into()));
        }
        Ok(())
    }
}

/// Normalized outcome of one provider call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderResult {
    #[serde(rename = "model")]
    pub provider_id: String,
    pub output: String,
    pub latency_ms: u64,
    #[serde(default)]
    pub finish_reason: Option<String>,
    #[serde(default)]
    pub usage: Option<Map<String, Value>>,
    #[serde(default)]
    pub error: Option<String>,
}

impl ProviderResult {
    pub fn success(provider_id: impl Into<String>, output: impl Into<String>, latency_ms: u64) -> Self {
        Self {
            provider_id: provider_id.into(),
            output: output.into(),
            latency_ms,
            finish_reason: None,
            usage: None,
            error: None,
        }
    }

    pub fn failure(provider_id: impl Into<String>, error: impl Into<String>, latency_ms: u64) -> Self {
        Self {
            provider_id: provider_id.into(),
            output: String::new(),
            latency_ms,
            finish_reason: None,
            usage: None,
            error: Some(error.into()),
        }
    }

    /// Placeholder for an id the registry could not resolve
    pub fn unknown_provider(provider_id: impl Into<String>) -> Self {
        Self::failure(provider_id, UNKNOWN_PROVIDER, 0)
    }

    pub fn with_finish_reason(mut self, finish_reason: Option<String>) -> Self {
        self.finish_reason = finish_reason;
        self
    }

    /// Attach provider usage; anything that is not a JSON object is dropped
    pub fn with_usage(mut self, usage: Option<Value>) -> Self {
        self.usage = match usage {
            Some(Value::Object(map)) => Some(map),
            _ => None,
        };
        self
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Aggregated fan-out result, one entry per requested provider id
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerationResponse {
    #[serde(rename = "responses")]
    pub results: Vec<ProviderResult>,
}

impl GenerationResponse {
    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|r| r.is_success()).count()
    }
}

/// Who authored a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

impl std::fmt::Display for ChatRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Assistant => write!(f, "assistant"),
        }
    }
}

/// One entry in a session transcript
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    /// Only set on assistant messages
    #[serde(
        rename = "model_responses",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub provider_results: Option<Vec<ProviderResult>>,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
            timestamp: Utc::now(),
            provider_results: None,
        }
    }

    pub fn assistant(content: impl Into<String>, results: Vec<ProviderResult>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
            timestamp: Utc::now(),
            provider_results: Some(results),
        }
    }
}

/// An in-memory conversation thread
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatSession {
    pub id: String,
    pub title: String,
    pub messages: Vec<ChatMessage>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
