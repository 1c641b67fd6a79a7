//! Conversation context for session-scoped prompts

use tracing::debug;

use crate::types::{ChatRole, ChatSession};

/// How many trailing messages are considered for context
pub const CONTEXT_WINDOW: usize = 5;

/// Prefix `new_content` with the user turns among the session's last
/// [`CONTEXT_WINDOW`] messages.
///
/// `session` must be the history *before* the new user message is appended.
/// Assistant messages are skipped so earlier provider answers are never fed
/// back to every provider. With no prior user turns in the window the new
/// content is returned unchanged.
pub fn build_enhanced_prompt(session: &ChatSession, new_content: &str) -> String {
    let start = session.messages.len().saturating_sub(CONTEXT_WINDOW);
    let history: Vec<String> = session.messages[start..]
        .iter()
        .filter(|m| m.role == ChatRole::User)
        .map(|m| format!("User: {}", m.content))
        .collect();

    if history.is_empty() {
        return new_content.to_string();
    }

    debug!(
        "Enhancing prompt for session {} with {} prior user turns",
        session.id,
        history.len()
    );
    format!(
        "Previous conversation:\n{}\n\nCurrent question: {}",
        history.join("\n\n"),
        new_content
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ChatMessage, ProviderResult};
    use chrono::Utc;

    fn session_with(messages: Vec<ChatMessage>) -> ChatSession {
        let now = Utc::now();
        ChatSession {
            id: "s1".to_string(),
            title: "test".to_string(),
            messages,
            created_at: now,
            updated_at: now,
        }
    }

    fn assistant(content: &str) -> ChatMessage {
        ChatMessage::assistant(content, vec![ProviderResult::success("openai", "answer", 5)])
    }

    #[test]
    fn test_empty_session_returns_content_verbatim() {
        let session = session_with(vec![]);
        assert_eq!(build_enhanced_prompt(&session, "What is Rust?"), "What is Rust?");
    }

    #[test]
    fn test_only_user_turns_are_included() {
        let session = session_with(vec![
            ChatMessage::user("first"),
            assistant("first"),
            ChatMessage::user("second"),
            assistant("second"),
            ChatMessage::user("third"),
        ]);
        let prompt = build_enhanced_prompt(&session, "fourth");
        assert_eq!(
            prompt,
            "Previous conversation:\nUser: first\n\nUser: second\n\nUser: third\n\nCurrent question: fourth"
        );
        assert!(!prompt.contains("answer"));
    }

    #[test]
    fn test_window_is_last_five_messages() {
        let session = session_with(vec![
            ChatMessage::user("too old"),
            ChatMessage::user("u1"),
            assistant("a1"),
            ChatMessage::user("u2"),
            assistant("a2"),
            ChatMessage::user("u3"),
        ]);
        let prompt = build_enhanced_prompt(&session, "next");
        assert!(!prompt.contains("too old"));
        assert!(prompt.contains("User: u1\n\nUser: u2\n\nUser: u3"));
    }

    #[test]
    fn test_only_assistant_turns_in_window() {
        let session = session_with(vec![
            ChatMessage::user("outside"),
            assistant("a1"),
            assistant("a2"),
            assistant("a3"),
            assistant("a4"),
            assistant("a5"),
        ]);
        assert_eq!(build_enhanced_prompt(&session, "plain"), "plain");
    }
}
