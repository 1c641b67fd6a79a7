//! Hub: registry, dispatcher and session store behind one handle
//!
//! Built once at startup and shared (usually as `Arc<Hub>`) by whatever
//! transport sits in front of it.

use std::sync::Arc;

use tracing::debug;

use crate::context::build_enhanced_prompt;
use crate::dispatcher::Dispatcher;
use crate::error::HubError;
use crate::providers::{GenerateParams, ProviderRegistry};
use crate::session::SessionStore;
use crate::types::{ChatMessage, ChatSession, GenerationRequest, GenerationResponse};

#[derive(Debug)]
pub struct Hub {
    dispatcher: Dispatcher,
    sessions: SessionStore,
}

impl Hub {
    pub fn new(registry: ProviderRegistry) -> Self {
        Self::with_registry(Arc::new(registry))
    }

    pub fn with_registry(registry: Arc<ProviderRegistry>) -> Self {
        Self {
            dispatcher: Dispatcher::new(registry),
            sessions: SessionStore::new(),
        }
    }

    pub fn registry(&self) -> &ProviderRegistry {
        self.dispatcher.registry()
    }

    /// Stateless fan-out of one prompt
    pub async fn generate(&self, request: &GenerationRequest) -> Result<GenerationResponse, HubError> {
        request.validate()?;
        let params = GenerateParams::from_request(request, request.prompt.clone());
        let results = self.dispatcher.dispatch(params, &request.provider_ids).await;
        Ok(GenerationResponse { results })
    }

    /// One conversational turn inside a session.
    ///
    /// The session is checked before any provider is called. Providers get
    /// the prompt enhanced with recent user turns; the user message is stored
    /// raw and the assistant message stores the enhanced prompt plus every
    /// provider result.
    pub async fn send_message(
        &self,
        session_id: &str,
        request: &GenerationRequest,
    ) -> Result<GenerationResponse, HubError> {
        request.validate()?;
        let session = self
            .sessions
            .get_session(session_id)
            .ok_or_else(|| HubError::SessionNotFound(session_id.to_string()))?;

        let enhanced = build_enhanced_prompt(&session, &request.prompt);
        self.sessions
            .add_message(session_id, ChatMessage::user(request.prompt.clone()))
            .ok_or_else(|| HubError::SessionNotFound(session_id.to_string()))?;

        let params = GenerateParams::from_request(request, enhanced.clone());
        let results = self.dispatcher.dispatch(params, &request.provider_ids).await;

        // The session may have been deleted while providers were answering
        self.sessions
            .add_message(session_id, ChatMessage::assistant(enhanced, results.clone()))
            .ok_or_else(|| HubError::SessionNotFound(session_id.to_string()))?;

        let response = GenerationResponse { results };
        debug!(
            "Session {} turn done: {}/{} providers succeeded",
            session_id,
            response.succeeded(),
            response.results.len()
        );
        Ok(response)
    }

    pub fn create_session(&self, title: &str) -> ChatSession {
        self.sessions.create_session(title)
    }

    pub fn get_session(&self, id: &str) -> Result<ChatSession, HubError> {
        self.sessions
            .get_session(id)
            .ok_or_else(|| HubError::SessionNotFound(id.to_string()))
    }

    pub fn list_sessions(&self) -> Vec<ChatSession> {
        self.sessions.list_sessions()
    }

    pub fn rename_session(&self, id: &str, title: &str) -> Result<ChatSession, HubError> {
        self.sessions
            .update_title(id, title)
            .ok_or_else(|| HubError::SessionNotFound(id.to_string()))
    }

    pub fn delete_session(&self, id: &str) -> Result<(), HubError> {
        if self.sessions.delete_session(id) {
            Ok(())
        } else {
            Err(HubError::SessionNotFound(id.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::LlmProvider;
    use crate::types::{ChatRole, ProviderResult, UNKNOWN_PROVIDER};
    use async_trait::async_trait;
    use std::time::Duration;

    /// Echoes the prompt it was sent
    struct EchoProvider;

    #[async_trait]
    impl LlmProvider for EchoProvider {
        fn provider_name(&self) -> &str {
            "echo"
        }
        fn model(&self) -> &str {
            "echo-1"
        }
        async fn generate(&self, params: &GenerateParams) -> ProviderResult {
            ProviderResult::success("echo", params.prompt.clone(), 1)
        }
    }

    /// Answers after a delay
    struct SlowProvider;

    #[async_trait]
    impl LlmProvider for SlowProvider {
        fn provider_name(&self) -> &str {
            "slow"
        }
        fn model(&self) -> &str {
            "slow-1"
        }
        async fn generate(&self, _params: &GenerateParams) -> ProviderResult {
            tokio::time::sleep(Duration::from_millis(100)).await;
            ProviderResult::success("slow", "late", 100)
        }
    }

    fn hub() -> Hub {
        let mut registry = ProviderRegistry::new();
        registry.register(Arc::new(EchoProvider));
        registry.register(Arc::new(SlowProvider));
        Hub::new(registry)
    }

    fn request(prompt: &str, ids: &[&str]) -> GenerationRequest {
        GenerationRequest::new(prompt, ids.iter().map(|s| s.to_string()).collect())
    }

    #[tokio::test]
    async fn test_generate_keeps_cardinality() {
        let hub = hub();
        let resp = hub.generate(&request("hi", &["echo", "ghost", "echo"])).await.unwrap();
        assert_eq!(resp.results.len(), 3);
        assert_eq!(resp.results[0].output, "hi");
        assert_eq!(resp.results[1].error.as_deref(), Some(UNKNOWN_PROVIDER));
        assert_eq!(resp.succeeded(), 2);
    }

    #[tokio::test]
    async fn test_generate_rejects_invalid_request() {
        let hub = hub();
        let err = hub.generate(&request("hi", &[])).await.unwrap_err();
        assert!(matches!(err, HubError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn test_all_providers_failing_is_still_ok() {
        let hub = hub();
        let resp = hub.generate(&request("hi", &["x", "y"])).await.unwrap();
        assert_eq!(resp.results.len(), 2);
        assert_eq!(resp.succeeded(), 0);
    }

    #[tokio::test]
    async fn test_send_message_unknown_session() {
        let hub = hub();
        let err = hub
            .send_message("missing", &request("hi", &["echo"]))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_send_message_records_both_turns() {
        let hub = hub();
        let session = hub.create_session("Math");

        let first = hub
            .send_message(&session.id, &request("2+2?", &["echo"]))
            .await
            .unwrap();
        // No history yet: providers get the raw content
        assert_eq!(first.results[0].output, "2+2?");

        let second = hub
            .send_message(&session.id, &request("and 3+3?", &["echo"]))
            .await
            .unwrap();
        let expected = "Previous conversation:\nUser: 2+2?\n\nCurrent question: and 3+3?";
        assert_eq!(second.results[0].output, expected);

        let stored = hub.get_session(&session.id).unwrap();
        assert_eq!(stored.messages.len(), 4);
        assert_eq!(stored.messages[0].role, ChatRole::User);
        assert_eq!(stored.messages[0].content, "2+2?");
        assert_eq!(stored.messages[2].content, "and 3+3?");
        let assistant = &stored.messages[3];
        assert_eq!(assistant.role, ChatRole::Assistant);
        assert_eq!(assistant.content, expected);
        assert_eq!(assistant.provider_results.as_ref().unwrap(), &second.results);
        assert!(stored.updated_at >= stored.created_at);
    }

    #[tokio::test]
    async fn test_session_deleted_mid_flight() {
        let hub = Arc::new(hub());
        let session = hub.create_session("doomed");

        let turn = {
            let hub = hub.clone();
            let id = session.id.clone();
            tokio::spawn(async move { hub.send_message(&id, &request("hi", &["slow"])).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        hub.delete_session(&session.id).unwrap();

        let err = turn.await.unwrap().unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_session_passthroughs() {
        let hub = hub();
        let s = hub.create_session("one");
        assert_eq!(hub.list_sessions().len(), 1);
        assert_eq!(hub.rename_session(&s.id, "two").unwrap().title, "two");
        assert!(hub.rename_session("missing", "x").unwrap_err().is_not_found());
        hub.delete_session(&s.id).unwrap();
        assert!(hub.get_session(&s.id).unwrap_err().is_not_found());
        assert!(hub.delete_session(&s.id).unwrap_err().is_not_found());
    }
}
