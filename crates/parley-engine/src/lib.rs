//! # parley-engine
//!
//! Per-conversation chat session engine with human-in-the-loop tool
//! confirmation.
//!
//! - **Gate**: one owner per session, claimed on first use or fixed out of band
//! - **Store**: append-only message log with in-place invocation settlement
//! - **Coordinator**: tool call classification, human decisions, execution
//! - **Merger**: model stream fan-in onto the turn output channel
//! - **Turn runner**: drain -> stream -> tools loop up to the step ceiling
//! - **Titler**: fire-and-forget summarization of short transcripts
//! - **Session actor**: one task per session, serializing every mutation
//! - **Engine**: the facade routing operations to session actors

pub mod config;
pub mod coordinator;
pub mod engine;
pub mod errors;
pub mod gate;
pub mod merger;
pub mod schedule;
pub mod store;
pub mod titler;
pub mod turn;

mod session;
#[cfg(test)]
mod testsupport;

pub use config::{EngineConfig, DEFAULT_MAX_STEPS};
pub use engine::{SessionEngine, TurnHandle};
pub use errors::EngineError;
pub use gate::{
    GateDecision, OwnerPolicy, SessionGate, DENIED_MESSAGE, POLICY_VIOLATION_CLOSE_CODE,
};
pub use store::MessageStore;
