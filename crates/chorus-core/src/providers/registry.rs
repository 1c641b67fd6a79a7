//! Provider registry: resolves provider ids to adapters

use std::collections::HashMap;
use std::sync::Arc;

use reqwest::Client;
use tracing::{debug, info};

use super::anthropic::AnthropicProvider;
use super::google::GoogleProvider;
use super::openai::OpenAiProvider;
use super::openai_compat::OpenAiCompatProvider;
use super::types::{LlmProvider, ProvidersSettings};

/// Id and effective model of a registered provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderInfo {
    pub id: String,
    pub model: String,
}

/// Maps provider ids to adapter instances
#[derive(Default)]
pub struct ProviderRegistry {
    providers: HashMap<String, Arc<dyn LlmProvider>>,
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("providers", &self.ids())
            .finish()
    }
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the five built-in providers, sharing one connection pool
    pub fn from_settings(settings: &ProvidersSettings) -> Self {
        let client = Client::new();
        let mut registry = Self::new();
        registry.register(Arc::new(OpenAiProvider::new(client.clone(), &settings.openai)));
        registry.register(Arc::new(AnthropicProvider::new(
            client.clone(),
            &settings.anthropic,
        )));
        registry.register(Arc::new(GoogleProvider::new(client.clone(), &settings.google)));
        registry.register(Arc::new(OpenAiCompatProvider::mistral(
            client.clone(),
            &settings.mistral,
        )));
        registry.register(Arc::new(OpenAiCompatProvider::perplexity(
            client,
            &settings.perplexity,
        )));
        info!("Registered {} providers: {}", registry.len(), registry.ids().join(", "));
        registry
    }

    /// Register a provider under its own name, replacing any previous one
    pub fn register(&mut self, provider: Arc<dyn LlmProvider>) -> Option<Arc<dyn LlmProvider>> {
        let id = provider.provider_name().to_string();
        debug!("Registering provider {} ({})", id, provider.model());
        self.providers.insert(id, provider)
    }

    pub fn resolve(&self, id: &str) -> Option<Arc<dyn LlmProvider>> {
        self.providers.get(id).cloned()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.providers.contains_key(id)
    }

    /// Registered ids, sorted
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.providers.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Registered providers with their models, sorted by id
    pub fn describe(&self) -> Vec<ProviderInfo> {
        let mut infos: Vec<ProviderInfo> = self
            .providers
            .iter()
            .map(|(id, p)| ProviderInfo {
                id: id.clone(),
                model: p.model().to_string(),
            })
            .collect();
        infos.sort_by(|a, b| a.id.cmp(&b.id));
        infos
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::types::{GenerateParams, ProviderSettings};
    use crate::types::ProviderResult;
    use async_trait::async_trait;

    struct NamedProvider {
        name: &'static str,
        model_name: &'static str,
    }

    #[async_trait]
    impl LlmProvider for NamedProvider {
        fn provider_name(&self) -> &str {
            self.name
        }
        fn model(&self) -> &str {
            self.model_name
        }
        async fn generate(&self, _params: &GenerateParams) -> ProviderResult {
            ProviderResult::success(self.name, self.model_name, 0)
        }
    }

    #[test]
    fn test_resolve_registered_and_unknown() {
        let mut registry = ProviderRegistry::new();
        assert!(registry.is_empty());
        registry.register(Arc::new(NamedProvider {
            name: "stub",
            model_name: "m1",
        }));
        assert_eq!(registry.len(), 1);
        assert!(registry.contains("stub"));
        assert_eq!(registry.resolve("stub").unwrap().model(), "m1");
        assert!(registry.resolve("unknown").is_none());
    }

    #[test]
    fn test_register_replaces_same_name() {
        let mut registry = ProviderRegistry::new();
        assert!(registry
            .register(Arc::new(NamedProvider {
                name: "stub",
                model_name: "m1",
            }))
            .is_none());
        let previous = registry.register(Arc::new(NamedProvider {
            name: "stub",
            model_name: "m2",
        }));
        assert_eq!(previous.unwrap().model(), "m1");
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.resolve("stub").unwrap().model(), "m2");
    }

    #[test]
    fn test_builtin_providers() {
        let settings = ProvidersSettings {
            openai: ProviderSettings {
                model: Some("gpt-4o".into()),
                ..Default::default()
            },
            ..Default::default()
        };
        let registry = ProviderRegistry::from_settings(&settings);
        assert_eq!(
            registry.ids(),
            vec!["anthropic", "google", "mistral", "openai", "perplexity"]
        );
        let openai = registry
            .describe()
            .into_iter()
            .find(|p| p.id == "openai")
            .unwrap();
        assert_eq!(openai.model, "gpt-4o");
        assert_eq!(registry.resolve("google").unwrap().model(), "gemini-1.5-pro");
    }
}
