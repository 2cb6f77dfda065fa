//! The conversation data model.
//!
//! A session's log is an ordered sequence of [`Message`]s. Once appended, a
//! message's `id`, `role`, and `created_at` never change; only the parts that
//! belong to a pending tool invocation may be updated in place, and only
//! until that invocation settles.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{MessageId, ToolCallId};
use crate::invocation::ToolInvocation;

// ─────────────────────────────────────────────────────────────────────────────
// Role and parts
// ─────────────────────────────────────────────────────────────────────────────

/// Who produced a message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// The session owner (or a scheduled task on their behalf).
    User,
    /// The model.
    Assistant,
    /// Engine-injected context.
    System,
}

/// One element of a message's ordered content.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Part {
    /// Immutable text content.
    Text {
        /// The text.
        text: String,
    },
    /// A tool call and its life-cycle state.
    ToolInvocation(ToolInvocation),
}

impl Part {
    /// Text part constructor.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    /// Returns the invocation if this part is one.
    #[must_use]
    pub fn as_invocation(&self) -> Option<&ToolInvocation> {
        match self {
            Self::ToolInvocation(inv) => Some(inv),
            Self::Text { .. } => None,
        }
    }

    /// Mutable access to the invocation if this part is one.
    pub fn as_invocation_mut(&mut self) -> Option<&mut ToolInvocation> {
        match self {
            Self::ToolInvocation(inv) => Some(inv),
            Self::Text { .. } => None,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Message
// ─────────────────────────────────────────────────────────────────────────────

/// One conversational turn in the log.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Stable identifier, unique within the session.
    pub id: MessageId,
    /// Producer of the message.
    pub role: Role,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Ordered content parts.
    pub parts: Vec<Part>,
}

impl Message {
    /// Create a message with a fresh ID and the current time.
    #[must_use]
    pub fn new(role: Role, parts: Vec<Part>) -> Self {
        Self {
            id: MessageId::new(),
            role,
            created_at: Utc::now(),
            parts,
        }
    }

    /// A plain-text user message.
    #[must_use]
    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Role::User, vec![Part::text(text)])
    }

    /// A plain-text assistant message.
    #[must_use]
    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(Role::Assistant, vec![Part::text(text)])
    }

    /// A plain-text system message.
    #[must_use]
    pub fn system(text: impl Into<String>) -> Self {
        Self::new(Role::System, vec![Part::text(text)])
    }

    /// Concatenated text of all text parts.
    #[must_use]
    pub fn text(&self) -> String {
        self.parts
            .iter()
            .filter_map(|p| match p {
                Part::Text { text } => Some(text.as_str()),
                Part::ToolInvocation(_) => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// All tool invocations in this message, in part order.
    pub fn invocations(&self) -> impl Iterator<Item = &ToolInvocation> {
        self.parts.iter().filter_map(Part::as_invocation)
    }

    /// Invocations still waiting on a human decision.
    pub fn pending_invocations(&self) -> impl Iterator<Item = &ToolInvocation> {
        self.invocations()
            .filter(|inv| inv.state.is_awaiting_confirmation())
    }

    /// Mutable lookup of an invocation by its tool call ID.
    pub fn invocation_mut(&mut self, tool_call_id: &ToolCallId) -> Option<&mut ToolInvocation> {
        self.parts
            .iter_mut()
            .filter_map(Part::as_invocation_mut)
            .find(|inv| &inv.tool_call_id == tool_call_id)
    }
}
