//! Multi-provider LLM abstraction layer
//!
//! Supports OpenAI, Anthropic, Google Gemini, Mistral, Perplexity and any
//! OpenAI-compatible endpoint. Providers implement the [`LlmProvider`] trait
//! and are looked up by id through the [`ProviderRegistry`].

pub mod anthropic;
pub mod google;
mod http;
pub mod openai;
pub mod openai_compat;
pub mod registry;
pub mod types;

pub use registry::{ProviderInfo, ProviderRegistry};
pub use types::{
    GenerateParams, LlmProvider, PROVIDER_TIMEOUT, ProviderSettings, ProvidersSettings,
    mask_secret,
};
