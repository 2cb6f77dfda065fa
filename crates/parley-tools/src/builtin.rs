//! Built-in demo tools.
//!
//! The default pair the engine registers: a local-time lookup that executes
//! automatically, and a weather lookup that requires human confirmation —
//! one tool on each side of the approval gate.

use async_trait::async_trait;
use chrono::Local;
use serde_json::{Map, Value, json};

use parley_core::{ToolOutcome, ToolParameterSchema, ToolSchema};

use crate::errors::ToolError;
use crate::traits::{ParleyTool, ToolContext};

// ─────────────────────────────────────────────────────────────────────────────
// Local time
// ─────────────────────────────────────────────────────────────────────────────

/// Returns the server-local time. Executes without confirmation.
pub struct LocalTimeTool;

#[async_trait]
impl ParleyTool for LocalTimeTool {
    fn name(&self) -> &str {
        "get_local_time"
    }

    fn description(&self) -> &str {
        "Get the current local time for a specified location"
    }

    fn schema(&self) -> ToolSchema {
        let mut props = Map::new();
        let _ = props.insert("location".into(), json!({"type": "string"}));
        ToolSchema {
            name: self.name().into(),
            description: self.description().into(),
            parameters: ToolParameterSchema {
                schema_type: "object".into(),
                properties: Some(props),
                required: Some(vec!["location".into()]),
                extra: Map::new(),
            },
        }
    }

    async fn execute(
        &self,
        _args: &Map<String, Value>,
        _ctx: &ToolContext,
    ) -> Result<ToolOutcome, ToolError> {
        Ok(ToolOutcome::ok(
            Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        ))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Weather
// ─────────────────────────────────────────────────────────────────────────────

/// Weather lookup stub. Requires human confirmation before executing.
pub struct WeatherTool;

#[async_trait]
impl ParleyTool for WeatherTool {
    fn name(&self) -> &str {
        "get_weather"
    }

    fn description(&self) -> &str {
        "Get current weather information for a city"
    }

    fn requires_confirmation(&self) -> bool {
        true
    }

    fn schema(&self) -> ToolSchema {
        let mut props = Map::new();
        let _ = props.insert("city".into(), json!({"type": "string"}));
        ToolSchema {
            name: self.name().into(),
            description: self.description().into(),
            parameters: ToolParameterSchema {
                schema_type: "object".into(),
                properties: Some(props),
                required: Some(vec!["city".into()]),
                extra: Map::new(),
            },
        }
    }

    async fn execute(
        &self,
        args: &Map<String, Value>,
        _ctx: &ToolContext,
    ) -> Result<ToolOutcome, ToolError> {
        let city = args
            .get("city")
            .and_then(Value::as_str)
            .ok_or_else(|| ToolError::InvalidArguments("missing required field: city".into()))?;
        Ok(ToolOutcome::ok(format!(
            "The weather in {city} is sunny, 72F"
        )))
    }
}

#[cfg(test)]
mod tests {
    use tokio_util::sync::CancellationToken;

    use super::*;

    fn ctx() -> ToolContext {
        ToolContext {
            tool_call_id: "tc-1".into(),
            session_id: "s-1".into(),
            cancellation: CancellationToken::new(),
        }
    }

    #[tokio::test]
    async fn local_time_executes_without_confirmation() {
        let tool = LocalTimeTool;
        assert!(!tool.requires_confirmation());
        let outcome = tool.execute(&Map::new(), &ctx()).await.unwrap();
        assert!(!outcome.is_error);
        assert!(!outcome.content.is_empty());
    }

    #[tokio::test]
    async fn weather_requires_confirmation() {
        let tool = WeatherTool;
        assert!(tool.requires_confirmation());

        let mut args = Map::new();
        let _ = args.insert("city".into(), json!("Boston"));
        let outcome = tool.execute(&args, &ctx()).await.unwrap();
        assert!(outcome.content.contains("Boston"));
    }

    #[tokio::test]
    async fn weather_rejects_missing_city() {
        let tool = WeatherTool;
        let err = tool.execute(&Map::new(), &ctx()).await.unwrap_err();
        assert!(err.to_string().contains("city"));
    }

    #[test]
    fn schemas_declare_required_fields() {
        let schema = WeatherTool.schema();
        assert_eq!(schema.name, "get_weather");
        assert_eq!(schema.parameters.required.as_deref(), Some(&["city".to_owned()][..]));
    }
}
