//! # Model client trait
//!
//! Core abstraction for the language model backend. The engine consumes a
//! boxed [`futures::Stream`] of [`ModelEvent`]s, so the turn pipeline is
//! independent of the underlying API format and fully testable with scripted
//! streams.

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use parley_core::{Message, ToolSchema};

/// Result type alias for model operations.
pub type ModelResult<T> = Result<T, ModelError>;

/// Boxed stream of [`ModelEvent`]s returned by [`ModelClient::stream`].
pub type ModelEventStream = Pin<Box<dyn Stream<Item = Result<ModelEvent, ModelError>> + Send>>;

// ─────────────────────────────────────────────────────────────────────────────
// Errors
// ─────────────────────────────────────────────────────────────────────────────

/// Errors that can occur during model operations.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// SSE stream parsing failed.
    #[error("SSE parse error: {message}")]
    SseParse {
        /// Error description.
        message: String,
    },

    /// Authentication failed (invalid or missing API key).
    #[error("Auth error: {message}")]
    Auth {
        /// Error description.
        message: String,
    },

    /// The API returned an error response.
    #[error("API error ({status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Error description.
        message: String,
        /// Whether this error can be retried.
        retryable: bool,
    },

    /// Stream was cancelled by the caller.
    #[error("Stream cancelled")]
    Cancelled,
}

impl ModelError {
    /// Whether this error is retryable by the caller.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http(e) => {
                e.is_timeout()
                    || e.is_connect()
                    || e.status().is_some_and(|s| {
                        s == reqwest::StatusCode::TOO_MANY_REQUESTS || s.is_server_error()
                    })
            }
            Self::Api { retryable, .. } => *retryable,
            Self::Json(_) | Self::SseParse { .. } | Self::Auth { .. } | Self::Cancelled => false,
        }
    }

    /// Error category string for event emission.
    #[must_use]
    pub fn category(&self) -> &str {
        match self {
            Self::Http(_) => "network",
            Self::Json(_) | Self::SseParse { .. } => "parse",
            Self::Auth { .. } => "auth",
            Self::Api { .. } => "api",
            Self::Cancelled => "cancelled",
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Stream events
// ─────────────────────────────────────────────────────────────────────────────

/// A tool call proposal parsed from the model stream.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProposedToolCall {
    /// Tool call ID assigned by the model.
    pub id: String,
    /// Tool name.
    pub name: String,
    /// Arguments (JSON object).
    pub args: Map<String, Value>,
}

/// Why the model stopped generating.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// Natural end of response.
    EndTurn,
    /// The model wants tool results before continuing.
    ToolCalls,
    /// Hit the max output token limit.
    MaxTokens,
    /// Anything else the API reports.
    Other,
}

impl StopReason {
    /// Map an OpenAI `finish_reason` string.
    #[must_use]
    pub fn from_finish_reason(reason: &str) -> Self {
        match reason {
            "stop" => Self::EndTurn,
            "tool_calls" => Self::ToolCalls,
            "length" => Self::MaxTokens,
            _ => Self::Other,
        }
    }
}

/// One event from the model stream.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ModelEvent {
    /// Incremental text content.
    TextDelta {
        /// Text fragment.
        delta: String,
    },
    /// A fully assembled tool call proposal.
    ToolCall(ProposedToolCall),
    /// The stream completed.
    Done {
        /// Why generation stopped.
        stop_reason: StopReason,
    },
}

// ─────────────────────────────────────────────────────────────────────────────
// Request context and trait
// ─────────────────────────────────────────────────────────────────────────────

/// Full context for one model request.
#[derive(Clone, Debug, Default)]
pub struct ModelContext {
    /// System prompt, if any.
    pub system_prompt: Option<String>,
    /// Conversation history.
    pub messages: Vec<Message>,
    /// Tool schemas offered to the model.
    pub tools: Vec<ToolSchema>,
}

/// The language model behind a session.
///
/// Implementors must be `Send + Sync` for use across async tasks.
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Current model ID (e.g. `"gpt-4o-2024-11-20"`).
    fn model(&self) -> &str;

    /// Stream a response for one turn.
    ///
    /// The caller consumes events until [`ModelEvent::Done`] or an error.
    async fn stream(&self, context: &ModelContext) -> ModelResult<ModelEventStream>;

    /// One-shot, non-streaming completion (used for title summarization).
    async fn complete(&self, prompt: &str) -> ModelResult<String>;
}
