use std::sync::Arc;

use async_trait::async_trait;
use indexmap::IndexMap;
use log::warn;
use serde_json::{Map, Value};

use super::client::ToolSpec;

/// A capability the model may invoke during an agentic analysis.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// JSON schema of the argument object.
    fn parameters(&self) -> Value;

    /// Runs the tool. Errors are reported back to the model, not to the
    /// caller of the loop.
    async fn invoke(&self, args: Map<String, Value>) -> anyhow::Result<Value>;

    fn spec(&self) -> ToolSpec {
        ToolSpec::function(self.name(), self.description(), self.parameters())
    }
}

/// Adapts a synchronous closure to [`Tool`].
#[cfg(test)]
pub struct FnTool<F> {
    name: String,
    description: String,
    parameters: Value,
    func: F,
}

#[cfg(test)]
impl<F> FnTool<F>
where
    F: Fn(Map<String, Value>) -> anyhow::Result<Value> + Send + Sync,
{
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: Value,
        func: F,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
            func,
        }
    }
}

#[cfg(test)]
#[async_trait]
impl<F> Tool for FnTool<F>
where
    F: Fn(Map<String, Value>) -> anyhow::Result<Value> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn parameters(&self) -> Value {
        self.parameters.clone()
    }

    async fn invoke(&self, args: Map<String, Value>) -> anyhow::Result<Value> {
        (self.func)(args)
    }
}

/// Tools available to one loop invocation, keyed by name in registration
/// order.
#[derive(Default, Clone)]
pub struct ToolRegistry {
    tools: IndexMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a tool, replacing any earlier tool of the same name.
    pub fn register(&mut self, tool: impl Tool + 'static) {
        let name = tool.name().to_string();
        if self.tools.insert(name.clone(), Arc::new(tool)).is_some() {
            warn!("Tool {name} registered twice, keeping the latest");
        }
    }

    #[cfg(test)]
    pub fn register_fn<F>(&mut self, name: &str, description: &str, parameters: Value, func: F)
    where
        F: Fn(Map<String, Value>) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        self.register(FnTool::new(name, description, parameters, func));
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.get(name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(String::as_str).collect()
    }

    pub fn specs(&self) -> Vec<ToolSpec> {
        self.tools.values().map(|tool| tool.spec()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

/// Schema for tools taking a single free-text `query` argument.
pub fn single_string_schema(description: &str) -> Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "query": {"type": "string", "description": description}
        },
        "required": ["query"]
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn echo_registry() -> ToolRegistry {
        let mut registry = ToolRegistry::new();
        registry.register_fn(
            "echo",
            "Echo the query",
            single_string_schema("text to echo"),
            |args| Ok(args.get("query").cloned().unwrap_or(Value::Null)),
        );
        registry
    }

    #[tokio::test]
    async fn test_fn_tool_invokes_closure() {
        let registry = echo_registry();
        let tool = registry.get("echo").unwrap();

        let mut args = Map::new();
        args.insert("query".into(), json!("hello"));

        assert_eq!(tool.invoke(args).await.unwrap(), json!("hello"));
    }

    #[test]
    fn test_specs_follow_registration_order() {
        let mut registry = echo_registry();
        registry.register_fn("count", "Count", json!({"type": "object"}), |_| Ok(json!(1)));

        let specs = registry.specs();
        assert_eq!(registry.names(), vec!["echo", "count"]);
        assert_eq!(specs[0].kind, "function");
        assert_eq!(specs[0].function.name, "echo");
        assert_eq!(specs[0].function.parameters["required"], json!(["query"]));
    }

    #[test]
    fn test_reregistering_replaces() {
        let mut registry = echo_registry();
        registry.register_fn("echo", "Second", json!({}), |_| Ok(Value::Null));

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("echo").unwrap().description(), "Second");
    }

    #[test]
    fn test_missing_tool() {
        assert!(ToolRegistry::new().get("nope").is_none());
        assert!(ToolRegistry::new().is_empty());
    }
}
