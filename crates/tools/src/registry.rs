use std::collections::HashMap;
use std::sync::Arc;

use deskhand_core::{Error, Result};
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::browser::BrowserTool;
use crate::computer::ComputerTool;
use crate::files::FilesTool;
use crate::shell::ShellTool;
use crate::vision::SeeImageTool;
use crate::{Tool, ToolContext};

#[derive(Clone)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    pub fn with_defaults() -> Self {
        let mut registry = Self::new();

        // Persistent command sessions (the core)
        registry.register(Arc::new(ShellTool));

        // Desktop input and screenshots
        registry.register(Arc::new(ComputerTool));

        // Sandbox browser service client
        registry.register(Arc::new(BrowserTool));

        // Workspace file operations
        registry.register(Arc::new(FilesTool));

        // Image ingestion
        registry.register(Arc::new(SeeImageTool));

        registry
    }

    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        let schema = tool.schema();
        debug!(name = schema.name, "Registering tool");
        self.tools.insert(schema.name.to_string(), tool);
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.get(name)
    }

    /// Schemas in OpenAI function-call format.
    pub fn get_tool_schemas(&self) -> Vec<Value> {
        self.tools
            .values()
            .map(|tool| {
                let schema = tool.schema();
                json!({
                    "type": "function",
                    "function": {
                        "name": schema.name,
                        "description": schema.description,
                        "parameters": schema.parameters
                    }
                })
            })
            .collect()
    }

    pub fn tool_names(&self) -> Vec<String> {
        self.tools.keys().cloned().collect()
    }

    pub async fn execute(&self, name: &str, ctx: ToolContext, params: Value) -> Result<Value> {
        let tool = self
            .get(name)
            .ok_or_else(|| Error::Tool(format!("Unknown tool: {}", name)))?;

        if let Err(e) = tool.validate(&params) {
            warn!(tool = name, error = %e, "Tool validation failed");
            return Err(e);
        }

        debug!(tool = name, "Executing tool");
        tool.execute(ctx, params).await
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_new_empty() {
        let reg = ToolRegistry::new();
        assert!(reg.tool_names().is_empty());
        assert!(reg.get("shell").is_none());
    }

    #[test]
    fn test_registry_with_defaults() {
        let reg = ToolRegistry::with_defaults();
        let names = reg.tool_names();
        assert_eq!(names.len(), 5);
        for name in ["shell", "computer", "browser", "files", "see_image"] {
            assert!(names.contains(&name.to_string()), "missing {}", name);
        }
    }

    #[test]
    fn test_registry_get_tool_schemas() {
        let reg = ToolRegistry::with_defaults();
        let schemas = reg.get_tool_schemas();
        assert_eq!(schemas.len(), 5);
        for schema in &schemas {
            assert_eq!(schema["type"], "function");
            assert!(schema["function"]["name"].is_string());
            assert!(schema["function"]["description"].is_string());
            assert_eq!(schema["function"]["parameters"]["type"], "object");
        }
    }

    #[tokio::test]
    async fn test_registry_execute_unknown_tool() {
        let reg = ToolRegistry::with_defaults();
        let ctx = ToolContext {
            workspace: std::path::PathBuf::from("/tmp"),
            config: deskhand_core::Config::default(),
        };
        let err = reg.execute("nonexistent", ctx, json!({})).await;
        assert!(err.is_err());
    }

    #[tokio::test]
    async fn test_registry_execute_validates_first() {
        let reg = ToolRegistry::with_defaults();
        let ctx = ToolContext {
            workspace: std::path::PathBuf::from("/tmp"),
            config: deskhand_core::Config::default(),
        };
        // Invalid shell request fails validation before reaching the engine
        let err = reg.execute("shell", ctx, json!({"action": "bad"})).await;
        assert!(matches!(err, Err(Error::Validation(_))));
    }
}
