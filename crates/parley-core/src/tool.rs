//! Tool schema types sent to the model.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// JSON Schema-compatible parameter definition for a tool.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolParameterSchema {
    /// Top-level JSON Schema type.
    #[serde(rename = "type")]
    pub schema_type: String,
    /// Property definitions (when type is `object`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<serde_json::Map<String, Value>>,
    /// Required property names.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required: Option<Vec<String>>,
    /// Catch-all for additional JSON Schema properties.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

impl ToolParameterSchema {
    /// An `object` schema with no declared properties.
    #[must_use]
    pub fn empty_object() -> Self {
        Self {
            schema_type: "object".into(),
            properties: None,
            required: None,
            extra: serde_json::Map::new(),
        }
    }
}

/// A tool definition the model can invoke.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolSchema {
    /// Tool name (unique identifier).
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// JSON Schema for the tool's parameters.
    pub parameters: ToolParameterSchema,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn empty_object_schema() {
        let schema = ToolParameterSchema::empty_object();
        let json = serde_json::to_value(&schema).unwrap();
        assert_eq!(json, json!({"type": "object"}));
    }

    #[test]
    fn schema_serde_roundtrip() {
        let mut props = serde_json::Map::new();
        let _ = props.insert("city".into(), json!({"type": "string"}));
        let schema = ToolSchema {
            name: "get_weather".into(),
            description: "Look up current weather for a city".into(),
            parameters: ToolParameterSchema {
                schema_type: "object".into(),
                properties: Some(props),
                required: Some(vec!["city".into()]),
                extra: serde_json::Map::new(),
            },
        };
        let json = serde_json::to_string(&schema).unwrap();
        let back: ToolSchema = serde_json::from_str(&json).unwrap();
        assert_eq!(back, schema);
    }
}
