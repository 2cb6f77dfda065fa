//! # parley-llm
//!
//! Model client abstraction for the Parley session engine.
//!
//! [`ModelClient`] is the seam between the engine and whichever language
//! model backs it: a streaming `stream` call used for turns and a one-shot
//! `complete` call used by the title summarizer. [`OpenAiClient`] implements
//! the trait against the OpenAI chat-completions API over SSE.

#![deny(unsafe_code)]

pub mod client;
pub mod openai;

pub use client::{
    ModelClient, ModelContext, ModelError, ModelEvent, ModelEventStream, ModelResult,
    ProposedToolCall, StopReason,
};
pub use openai::{OpenAiClient, OpenAiConfig};
