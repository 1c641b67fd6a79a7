//! chorus-core - fan-out engine for the chorus gateway
//!
//! This crate provides:
//! - Provider adapters for OpenAI, Anthropic, Google Gemini, Mistral and Perplexity
//! - A registry that resolves provider ids to adapters
//! - A dispatcher that queries many providers concurrently
//! - An in-memory session store and the context builder for session turns

pub mod context;
pub mod dispatcher;
pub mod error;
pub mod hub;
pub mod providers;
pub mod session;
pub mod types;

// Re-export main types for convenience
pub use context::{CONTEXT_WINDOW, build_enhanced_prompt};
pub use dispatcher::Dispatcher;
pub use error::HubError;
pub use hub::Hub;
pub use providers::{
    GenerateParams, LlmProvider, ProviderInfo, ProviderRegistry, ProviderSettings,
    ProvidersSettings,
};
pub use session::SessionStore;
pub use types::{
    ChatMessage, ChatRole, ChatSession, GenerationRequest, GenerationResponse, ProviderResult,
};
