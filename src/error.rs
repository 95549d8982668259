//! Error types for the study timer

use thiserror::Error;

/// Errors surfaced by the timer core
///
/// Configuration errors are returned to the caller. Persistence errors never
/// propagate as `Err`; they travel inside a discard outcome instead.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TimerError {
    /// Customization rejected; the previous configuration is unchanged
    #[error("invalid timer settings: {0}")]
    InvalidSettings(String),

    /// No timer method with this id in the catalog
    #[error("timer method not found: {0}")]
    NotFound(String),

    /// A method definition violates the catalog invariants
    #[error("invalid timer method '{id}': {reason}")]
    InvalidMethod { id: String, reason: String },

    /// Session storage rejected a write
    #[error("failed to save study session {session_id}: {message}")]
    Persistence { session_id: String, message: String },
}

impl TimerError {
    pub(crate) fn invalid_settings(reason: impl Into<String>) -> Self {
        TimerError::InvalidSettings(reason.into())
    }

    pub(crate) fn invalid_method(id: &str, reason: impl Into<String>) -> Self {
        TimerError::InvalidMethod {
            id: id.to_string(),
            reason: reason.into(),
        }
    }
}
