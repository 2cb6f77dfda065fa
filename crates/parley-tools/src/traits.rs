//! The tool trait and execution context.

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;

use parley_core::{ToolOutcome, ToolSchema};

use crate::errors::ToolError;

/// Execution context passed to every tool invocation.
#[derive(Clone, Debug)]
pub struct ToolContext {
    /// ID of the tool call being executed.
    pub tool_call_id: String,
    /// Session the call belongs to.
    pub session_id: String,
    /// Cancellation token for cooperative cancellation.
    pub cancellation: CancellationToken,
}

/// The trait every Parley tool implements.
///
/// Tools flagged `requires_confirmation` are never executed until an explicit
/// human approval arrives; the engine parks the invocation in
/// `AwaitingConfirmation` instead.
#[async_trait]
pub trait ParleyTool: Send + Sync {
    /// Tool name — the exact string sent to/from the model.
    fn name(&self) -> &str;

    /// Human-readable description for the model.
    fn description(&self) -> &str;

    /// Whether execution needs explicit human approval first.
    fn requires_confirmation(&self) -> bool {
        false
    }

    /// JSON Schema for the tool's parameters.
    fn schema(&self) -> ToolSchema;

    /// Execute the tool with the model-supplied arguments.
    async fn execute(
        &self,
        args: &Map<String, Value>,
        ctx: &ToolContext,
    ) -> Result<ToolOutcome, ToolError>;
}
