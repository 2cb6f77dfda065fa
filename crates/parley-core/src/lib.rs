//! # parley-core
//!
//! Foundation types for the Parley session engine.
//!
//! This crate provides the shared vocabulary that the other Parley crates
//! depend on:
//!
//! - **Branded IDs**: `SessionId`, `MessageId`, `ToolCallId` as newtypes for
//!   type safety
//! - **Messages**: the append-only conversation model — `Message`, `Role`,
//!   `Part`
//! - **Tool invocations**: the `InvocationState` machine with a single
//!   transition function, plus `ToolOutcome`
//! - **Tool schemas**: `ToolSchema` definitions sent to the model
//! - **Turn events**: `TurnEvent`, the ordered output stream element

#![deny(unsafe_code)]

pub mod events;
pub mod ids;
pub mod invocation;
pub mod message;
pub mod tool;

pub use events::TurnEvent;
pub use ids::{MessageId, SessionId, ToolCallId};
pub use invocation::{Input, InvocationState, Resolution, ToolInvocation, ToolOutcome, Transition};
pub use message::{Message, Part, Role};
pub use tool::{ToolParameterSchema, ToolSchema};
