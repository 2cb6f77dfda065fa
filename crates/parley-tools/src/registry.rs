//! Tool registry — static name → tool configuration.
//!
//! The registry is built once at engine construction and read-only
//! thereafter: which tools exist and which require confirmation is
//! configuration, not session state.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use parley_core::ToolSchema;

use crate::traits::ParleyTool;

/// Central registry mapping tool names to their implementations.
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn ParleyTool>>,
}

impl ToolRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Register a tool. Overwrites any existing tool with the same name.
    pub fn register(&mut self, tool: Arc<dyn ParleyTool>) {
        debug!(tool_name = tool.name(), "tool registered");
        let _ = self.tools.insert(tool.name().to_owned(), tool);
    }

    /// Look up a tool by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<dyn ParleyTool>> {
        self.tools.get(name).cloned()
    }

    /// Whether the named tool requires human confirmation.
    ///
    /// Unknown tools report `false`; the coordinator surfaces the lookup
    /// failure at execution time instead.
    #[must_use]
    pub fn requires_confirmation(&self, name: &str) -> bool {
        self.tools
            .get(name)
            .is_some_and(|t| t.requires_confirmation())
    }

    /// All tool schemas for the model, sorted by name for a stable order.
    #[must_use]
    pub fn schemas(&self) -> Vec<ToolSchema> {
        let mut schemas: Vec<ToolSchema> = self.tools.values().map(|t| t.schema()).collect();
        schemas.sort_by(|a, b| a.name.cmp(&b.name));
        schemas
    }

    /// All tool names, sorted alphabetically.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.keys().cloned().collect();
        names.sort();
        names
    }

    /// Number of registered tools.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Whether the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Whether a tool with the given name is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtin::{LocalTimeTool, WeatherTool};

    fn registry() -> ToolRegistry {
        let mut r = ToolRegistry::new();
        r.register(Arc::new(LocalTimeTool));
        r.register(Arc::new(WeatherTool));
        r
    }

    #[test]
    fn register_and_get() {
        let r = registry();
        assert_eq!(r.len(), 2);
        assert!(r.contains("get_weather"));
        assert!(r.get("get_local_time").is_some());
        assert!(r.get("nonexistent").is_none());
    }

    #[test]
    fn confirmation_flags() {
        let r = registry();
        assert!(r.requires_confirmation("get_weather"));
        assert!(!r.requires_confirmation("get_local_time"));
        // Unknown tools never gate the turn on confirmation
        assert!(!r.requires_confirmation("nonexistent"));
    }

    #[test]
    fn schemas_are_sorted_by_name() {
        let r = registry();
        let schemas = r.schemas();
        assert_eq!(schemas[0].name, "get_local_time");
        assert_eq!(schemas[1].name, "get_weather");
    }

    #[test]
    fn reregistering_overwrites() {
        let mut r = registry();
        r.register(Arc::new(WeatherTool));
        assert_eq!(r.len(), 2);
    }

    #[test]
    fn empty_registry() {
        let r = ToolRegistry::new();
        assert!(r.is_empty());
        assert!(r.names().is_empty());
        assert!(r.schemas().is_empty());
    }
}
