//! Request-level failures surfaced to the transport layer

use thiserror::Error;

/// Errors that abort a whole request.
///
/// Individual provider failures never show up here; they are recorded on the
/// matching [`ProviderResult`](crate::ProviderResult) instead.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HubError {
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl HubError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::SessionNotFound(_))
    }
}
