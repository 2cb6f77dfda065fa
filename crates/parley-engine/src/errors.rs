//! Engine error types.

use parley_llm::ModelError;

/// Errors that can occur in the session engine.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The caller is not the session owner.
    #[error("This chat is not yours.")]
    Forbidden,

    /// Session not found.
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    /// Message not found in the log.
    #[error("Message not found: {0}")]
    MessageNotFound(String),

    /// Tool invocation not found in the log.
    #[error("Tool invocation not found: {0}")]
    InvocationNotFound(String),

    /// A message with this ID is already in the log.
    #[error("Duplicate message: {0}")]
    DuplicateMessage(String),

    /// The invocation is not in a state that accepts this operation.
    #[error("Invalid transition for tool call {tool_call_id}")]
    InvalidTransition {
        /// Tool call ID.
        tool_call_id: String,
    },

    /// Model request or stream error.
    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    /// The session actor is gone (engine shutting down).
    #[error("Session closed")]
    Closed,
}

impl EngineError {
    /// Error category string for event emission.
    #[must_use]
    pub fn category(&self) -> &str {
        match self {
            Self::Forbidden => "forbidden",
            Self::SessionNotFound(_) => "session_not_found",
            Self::MessageNotFound(_) => "message_not_found",
            Self::InvocationNotFound(_) => "invocation_not_found",
            Self::DuplicateMessage(_) => "duplicate_message",
            Self::InvalidTransition { .. } => "invalid_transition",
            Self::Model(e) => e.category(),
            Self::Closed => "closed",
        }
    }

    /// Whether the error is recoverable (the caller can retry).
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Model(e) => e.is_retryable(),
            Self::Forbidden
            | Self::SessionNotFound(_)
            | Self::MessageNotFound(_)
            | Self::InvocationNotFound(_)
            | Self::DuplicateMessage(_)
            | Self::InvalidTransition { .. }
            | Self::Closed => false,
        }
    }
}
