//! Session management for in-memory chat transcripts

use chrono::Utc;
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info};

use crate::types::{ChatMessage, ChatSession};

/// Owns every chat session for the lifetime of the process.
///
/// All operations take one store-wide lock for a short, synchronous critical
/// section and hand out clones, so callers never observe a half-applied
/// write and no lock is ever held across an `.await`.
#[derive(Debug, Default)]
pub struct SessionStore {
    inner: RwLock<Sessions>,
}

#[derive(Debug, Default)]
struct Sessions {
    by_id: HashMap<String, ChatSession>,
    /// Ids in creation order
    order: Vec<String>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, Sessions> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Sessions> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Create an empty session with a fresh id
    pub fn create_session(&self, title: &str) -> ChatSession {
        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now();
        let session = ChatSession {
            id: id.clone(),
            title: title.to_string(),
            messages: Vec::new(),
            created_at: now,
            updated_at: now,
        };

        let mut sessions = self.write();
        sessions.by_id.insert(id.clone(), session.clone());
        sessions.order.push(id.clone());
        info!("Created session '{}' ({})", title, id);
        session
    }

    pub fn get_session(&self, id: &str) -> Option<ChatSession> {
        self.read().by_id.get(id).cloned()
    }

    /// Snapshot of every session, oldest first
    pub fn list_sessions(&self) -> Vec<ChatSession> {
        let sessions = self.read();
        sessions
            .order
            .iter()
            .filter_map(|id| sessions.by_id.get(id).cloned())
            .collect()
    }

    /// Append a message and refresh `updated_at`
    pub fn add_message(&self, id: &str, message: ChatMessage) -> Option<ChatSession> {
        let mut sessions = self.write();
        let session = sessions.by_id.get_mut(id)?;
        session.messages.push(message);
        touch(session);
        debug!(
            "Session '{}' now has {} messages",
            id,
            session.messages.len()
        );
        Some(session.clone())
    }

    pub fn update_title(&self, id: &str, title: &str) -> Option<ChatSession> {
        let mut sessions = self.write();
        let session = sessions.by_id.get_mut(id)?;
        session.title = title.to_string();
        touch(session);
        Some(session.clone())
    }

    /// Remove a session; `false` if it did not exist
    pub fn delete_session(&self, id: &str) -> bool {
        let mut sessions = self.write();
        if sessions.by_id.remove(id).is_none() {
            return false;
        }
        sessions.order.retain(|existing| existing != id);
        info!("Deleted session {}", id);
        true
    }

    /// Number of live sessions
    pub fn len(&self) -> usize {
        self.read().by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Refresh `updated_at` without ever moving it backwards
fn touch(session: &mut ChatSession) {
    session.updated_at = Utc::now().max(session.updated_at);
}
