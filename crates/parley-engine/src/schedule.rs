//! Scheduled task injection.
//!
//! An external scheduler fires a task by appending a synthetic user message
//! to the session; the model is not invoked. The next real turn sees the
//! task in its history like any other user input.

use parley_core::Message;

/// The user message appended when a scheduled task fires.
#[must_use]
pub fn scheduled_task_message(description: &str) -> Message {
    Message::user(format!("Running scheduled task: {description}"))
}
