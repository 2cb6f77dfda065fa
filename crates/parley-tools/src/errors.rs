//! Tool execution errors.

/// Errors a tool executor can return.
///
/// These never escape the coordinator as session failures: execution errors
/// are folded into the invocation's result payload so the conversation can
/// continue with the failure visible to the model.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    /// Arguments failed validation.
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    /// The tool's backing operation failed.
    #[error("Execution failed: {0}")]
    Execution(String),

    /// Execution was cancelled via the context token.
    #[error("Execution cancelled")]
    Cancelled,
}
