//! Tool invocation state machine.
//!
//! Every tool call proposed by the model is tracked as a [`ToolInvocation`]
//! with an explicit [`InvocationState`]. All state changes go through one
//! transition function, so the human-in-the-loop confirmation flow is
//! auditable and unit-testable without any streaming or model machinery.
//!
//! The state graph:
//!
//! ```text
//! Proposed ──require confirmation──▶ AwaitingConfirmation ──▶ Confirmed ─┐
//!    │                                        │                          │
//!    │                                        └──▶ Rejected ──────────┐  │
//!    │                                                                ▼  ▼
//!    └────────────────▶ Executed ◀────────────────────────────────────┼──┘
//!                          │                                          │
//!                          └──────────▶ ResultAttached ◀──────────────┘
//! ```
//!
//! Resolution signals (approve/reject) arriving for an invocation that is not
//! awaiting confirmation are idempotent no-ops; the human may click twice, or
//! a stale client may resolve a call that already settled.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::ids::ToolCallId;

// ─────────────────────────────────────────────────────────────────────────────
// State machine
// ─────────────────────────────────────────────────────────────────────────────

/// Life-cycle state of a tool invocation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvocationState {
    /// The model emitted the call; not yet classified or executed.
    Proposed,
    /// Waiting for an explicit human decision.
    AwaitingConfirmation,
    /// The human approved execution.
    Confirmed,
    /// The human declined execution. Terminal input; a declined sentinel
    /// result is attached without running the tool.
    Rejected,
    /// The tool executor ran (successfully or not).
    Executed,
    /// The result (or declined sentinel) is attached. Terminal.
    ResultAttached,
}

/// The human's decision on an invocation awaiting confirmation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    /// Execute the tool.
    Approved,
    /// Skip execution; attach the declined sentinel.
    Rejected,
}

/// Inputs to the invocation state machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Input {
    /// The registry flagged this tool as confirmation-required.
    RequireConfirmation,
    /// The human's decision arrived.
    Resolve(Resolution),
    /// The executor is about to run the tool.
    BeginExecution,
    /// A result payload is being attached.
    AttachResult,
}

/// Outcome of applying an [`Input`] to an [`InvocationState`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Transition {
    /// The state advanced.
    Advanced(InvocationState),
    /// The input is a harmless repeat (e.g. resolving a settled call).
    Idempotent,
    /// The input is not legal from the current state.
    Invalid,
}

impl InvocationState {
    /// Apply one input, returning the transition outcome.
    ///
    /// `Rejected` and `Executed` are each reachable at most once; no path
    /// skips a required confirmation step.
    #[must_use]
    pub fn transition(self, input: Input) -> Transition {
        use InvocationState::{
            AwaitingConfirmation, Confirmed, Executed, Proposed, Rejected, ResultAttached,
        };
        match (self, input) {
            (Proposed, Input::RequireConfirmation) => Transition::Advanced(AwaitingConfirmation),

            (AwaitingConfirmation, Input::Resolve(Resolution::Approved)) => {
                Transition::Advanced(Confirmed)
            }
            (AwaitingConfirmation, Input::Resolve(Resolution::Rejected)) => {
                Transition::Advanced(Rejected)
            }
            // A decision for a call that is not awaiting one is a no-op.
            (_, Input::Resolve(_)) => Transition::Idempotent,

            (Proposed | Confirmed, Input::BeginExecution) => Transition::Advanced(Executed),

            (Executed | Rejected, Input::AttachResult) => Transition::Advanced(ResultAttached),

            _ => Transition::Invalid,
        }
    }

    /// Whether this invocation still needs a human decision.
    #[must_use]
    pub fn is_awaiting_confirmation(self) -> bool {
        matches!(self, Self::AwaitingConfirmation)
    }

    /// Whether the invocation has settled (result attached).
    #[must_use]
    pub fn is_settled(self) -> bool {
        matches!(self, Self::ResultAttached)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tool outcome
// ─────────────────────────────────────────────────────────────────────────────

/// Result payload attached to a settled invocation.
///
/// Execution failures are outcomes too (`is_error: true`) — they feed back to
/// the model on the next turn instead of failing the session.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolOutcome {
    /// Tool output text (or error description).
    pub content: String,
    /// Whether the execution errored or was declined.
    pub is_error: bool,
}

impl ToolOutcome {
    /// Successful execution output.
    #[must_use]
    pub fn ok(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            is_error: false,
        }
    }

    /// Execution failure captured as a result payload.
    #[must_use]
    pub fn error(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            is_error: true,
        }
    }

    /// The sentinel attached when the human rejects an invocation.
    #[must_use]
    pub fn declined() -> Self {
        Self::error("User declined tool execution")
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tool invocation
// ─────────────────────────────────────────────────────────────────────────────

/// One tool call proposed by the model within a turn.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolInvocation {
    /// ID assigned by the model; unique within the message.
    pub tool_call_id: ToolCallId,
    /// Name of the tool being invoked.
    pub tool_name: String,
    /// Current life-cycle state.
    pub state: InvocationState,
    /// Arguments the model supplied (JSON object).
    pub args: Map<String, Value>,
    /// Attached result, present once settled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<ToolOutcome>,
}

impl ToolInvocation {
    /// Create a freshly proposed invocation.
    #[must_use]
    pub fn proposed(
        tool_call_id: impl Into<ToolCallId>,
        tool_name: impl Into<String>,
        args: Map<String, Value>,
    ) -> Self {
        Self {
            tool_call_id: tool_call_id.into(),
            tool_name: tool_name.into(),
            state: InvocationState::Proposed,
            args,
            result: None,
        }
    }

    /// Apply one input to this invocation's state, mutating on advance.
    pub fn apply(&mut self, input: Input) -> Transition {
        let t = self.state.transition(input);
        if let Transition::Advanced(next) = t {
            self.state = next;
        }
        t
    }

    /// Attach an outcome, advancing to `ResultAttached`.
    ///
    /// Returns `Transition::Invalid` (and leaves the existing result intact)
    /// if the invocation is not in a state that accepts a result.
    pub fn attach(&mut self, outcome: ToolOutcome) -> Transition {
        let t = self.apply(Input::AttachResult);
        if matches!(t, Transition::Advanced(_)) {
            self.result = Some(outcome);
        }
        t
    }
}
