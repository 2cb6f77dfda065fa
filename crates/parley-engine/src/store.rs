//! Append-only message log.
//!
//! The store is plain owned data living inside a session actor; the actor's
//! mailbox serializes every mutation, so readers never observe a torn write.
//! Appended messages are immutable except for their tool invocation parts,
//! which advance through the invocation state machine until they settle.

use std::collections::HashSet;

use parley_core::{Message, MessageId, ToolCallId, ToolInvocation, ToolOutcome, Transition};

use crate::errors::EngineError;

/// Ordered, append-only log of one session's messages.
#[derive(Debug, Default)]
pub struct MessageStore {
    messages: Vec<Message>,
    ids: HashSet<MessageId>,
}

impl MessageStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message. Fails if a message with the same ID is already
    /// in the log.
    pub fn append(&mut self, message: Message) -> Result<(), EngineError> {
        if !self.ids.insert(message.id.clone()) {
            return Err(EngineError::DuplicateMessage(message.id.to_string()));
        }
        self.messages.push(message);
        Ok(())
    }

    /// Attach a tool outcome to an invocation within a specific message.
    ///
    /// Fails if the message or invocation is unknown, or if the invocation
    /// is not in a state that accepts a result (already attached, or never
    /// executed/rejected).
    pub fn attach_tool_result(
        &mut self,
        message_id: &MessageId,
        tool_call_id: &ToolCallId,
        outcome: ToolOutcome,
    ) -> Result<(), EngineError> {
        let message = self
            .messages
            .iter_mut()
            .find(|m| &m.id == message_id)
            .ok_or_else(|| EngineError::MessageNotFound(message_id.to_string()))?;
        let invocation = message
            .invocation_mut(tool_call_id)
            .ok_or_else(|| EngineError::InvocationNotFound(tool_call_id.to_string()))?;
        match invocation.attach(outcome) {
            Transition::Advanced(_) => Ok(()),
            Transition::Idempotent | Transition::Invalid => Err(EngineError::InvalidTransition {
                tool_call_id: tool_call_id.to_string(),
            }),
        }
    }

    /// Snapshot of the full log.
    #[must_use]
    pub fn read_all(&self) -> Vec<Message> {
        self.messages.clone()
    }

    /// Number of messages in the log.
    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Whether the log is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// The most recent message, if any.
    #[must_use]
    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Find an unsettled invocation by tool call ID, searching from the
    /// newest message.
    pub fn find_invocation_mut(
        &mut self,
        tool_call_id: &ToolCallId,
    ) -> Option<(&MessageId, &mut ToolInvocation)> {
        self.messages.iter_mut().rev().find_map(|m| {
            let id = &m.id;
            m.parts
                .iter_mut()
                .filter_map(parley_core::Part::as_invocation_mut)
                .find(|inv| &inv.tool_call_id == tool_call_id)
                .map(|inv| (id, inv))
        })
    }

    /// IDs of invocations currently awaiting a human decision, in log order.
    #[must_use]
    pub fn awaiting_confirmation(&self) -> Vec<(MessageId, ToolCallId)> {
        self.invocations_where(|inv| inv.state.is_awaiting_confirmation())
    }

    /// IDs of invocations ready to run or to receive their sentinel:
    /// confirmed-but-not-executed and rejected-without-result, in log order.
    #[must_use]
    pub fn unsettled_resolved(&self) -> Vec<(MessageId, ToolCallId)> {
        use parley_core::InvocationState::{Confirmed, Rejected};
        self.invocations_where(|inv| matches!(inv.state, Confirmed | Rejected))
    }

    fn invocations_where(
        &self,
        pred: impl Fn(&ToolInvocation) -> bool,
    ) -> Vec<(MessageId, ToolCallId)> {
        self.messages
            .iter()
            .flat_map(|m| {
                m.invocations()
                    .filter(|inv| pred(inv))
                    .map(|inv| (m.id.clone(), inv.tool_call_id.clone()))
            })
            .collect()
    }
}
