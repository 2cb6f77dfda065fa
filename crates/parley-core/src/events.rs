//! Turn output events.
//!
//! A turn's caller receives one ordered stream of [`TurnEvent`]s: text deltas
//! and tool life-cycle events, in the order the model and the coordinator
//! produced them, closed by exactly one [`TurnEvent::Done`] (or cut short by
//! cancellation).

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::ids::ToolCallId;
use crate::invocation::ToolOutcome;

/// One element of the merged turn output stream.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum TurnEvent {
    /// Incremental model text.
    TextDelta {
        /// Text fragment.
        delta: String,
    },

    /// The model proposed a tool call.
    #[serde(rename_all = "camelCase")]
    ToolCallProposed {
        /// Tool call ID.
        tool_call_id: ToolCallId,
        /// Tool name.
        tool_name: String,
        /// Arguments the model supplied.
        args: Map<String, Value>,
    },

    /// The call needs human approval; the turn will end with it pending.
    #[serde(rename_all = "camelCase")]
    ToolAwaitingConfirmation {
        /// Tool call ID.
        tool_call_id: ToolCallId,
        /// Tool name.
        tool_name: String,
    },

    /// The executor started running a tool.
    #[serde(rename_all = "camelCase")]
    ToolExecutionStart {
        /// Tool call ID.
        tool_call_id: ToolCallId,
        /// Tool name.
        tool_name: String,
    },

    /// A tool finished and its result was attached.
    #[serde(rename_all = "camelCase")]
    ToolResult {
        /// Tool call ID.
        tool_call_id: ToolCallId,
        /// The attached outcome.
        outcome: ToolOutcome,
    },

    /// The model stream failed; the turn ends early but the session survives.
    TurnFailed {
        /// Error description.
        error: String,
        /// Error category for the caller's telemetry.
        category: String,
    },

    /// The turn is complete; no further events follow.
    #[serde(rename_all = "camelCase")]
    Done {
        /// `true` when an invocation was left awaiting confirmation — the
        /// caller should disable new input until it is resolved.
        pending_confirmation: bool,
    },
}

impl TurnEvent {
    /// Whether this event closes the stream.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done { .. })
    }
}
