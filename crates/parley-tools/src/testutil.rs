//! Scripted tools for engine tests.
//!
//! Not gated behind `cfg(test)` because the engine crate's tests depend on
//! these helpers across the crate boundary.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Map, Value};

use parley_core::{ToolOutcome, ToolParameterSchema, ToolSchema};

use crate::errors::ToolError;
use crate::registry::ToolRegistry;
use crate::traits::{ParleyTool, ToolContext};

/// A tool that returns a fixed outcome and counts its executions.
pub struct ScriptedTool {
    name: String,
    requires_confirmation: bool,
    outcome: Result<ToolOutcome, String>,
    delay: Option<Duration>,
    executions: AtomicUsize,
}

impl ScriptedTool {
    /// A tool that succeeds with the given content.
    #[must_use]
    pub fn ok(name: &str, content: &str) -> Self {
        Self {
            name: name.into(),
            requires_confirmation: false,
            outcome: Ok(ToolOutcome::ok(content)),
            delay: None,
            executions: AtomicUsize::new(0),
        }
    }

    /// A tool that fails with the given error message.
    #[must_use]
    pub fn failing(name: &str, error: &str) -> Self {
        Self {
            name: name.into(),
            requires_confirmation: false,
            outcome: Err(error.into()),
            delay: None,
            executions: AtomicUsize::new(0),
        }
    }

    /// Mark this tool as requiring human confirmation.
    #[must_use]
    pub fn confirmed(mut self) -> Self {
        self.requires_confirmation = true;
        self
    }

    /// Add an artificial execution delay (for ordering tests).
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// How many times `execute` ran.
    #[must_use]
    pub fn executions(&self) -> usize {
        self.executions.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ParleyTool for ScriptedTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        "scripted test tool"
    }

    fn requires_confirmation(&self) -> bool {
        self.requires_confirmation
    }

    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: self.name.clone(),
            description: self.description().into(),
            parameters: ToolParameterSchema::empty_object(),
        }
    }

    async fn execute(
        &self,
        _args: &Map<String, Value>,
        _ctx: &ToolContext,
    ) -> Result<ToolOutcome, ToolError> {
        let _ = self.executions.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match &self.outcome {
            Ok(outcome) => Ok(outcome.clone()),
            Err(msg) => Err(ToolError::Execution(msg.clone())),
        }
    }
}

/// Build a registry from the given tools.
#[must_use]
pub fn registry_of(tools: Vec<Arc<dyn ParleyTool>>) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    for tool in tools {
        registry.register(tool);
    }
    registry
}
