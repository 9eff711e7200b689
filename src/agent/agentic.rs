use log::{debug, info, warn};
use serde_json::{Map, Value};

use super::client::{ChatClient, ChatMessage, ToolCall};
use super::tools::ToolRegistry;
use crate::error::Result;
use crate::triage::truncate_chars;

/// How an agentic run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgentOutcome {
    /// The model produced a final answer.
    Complete(String),
    /// Every allowed model turn asked for more tool calls.
    Incomplete { iterations: u32 },
}

/// Drives a tool-calling conversation until the model answers without
/// requesting tools, or `max_iterations` model turns have been spent.
///
/// Tool calls of one turn run sequentially in the order received. Tool
/// failures are reported back to the model as `Error: ...` tool messages;
/// only client errors abort the run. With an empty registry the model is
/// asked once without tool specs.
pub async fn run_agent(
    client: &dyn ChatClient,
    mut conversation: Vec<ChatMessage>,
    tools: &ToolRegistry,
    max_iterations: u32,
) -> Result<AgentOutcome> {
    if tools.is_empty() {
        debug!("No tools provided, doing simple chat completion");
        let reply = client.chat(&conversation, &[]).await?;
        return Ok(AgentOutcome::Complete(reply.content.unwrap_or_default()));
    }

    let specs = tools.specs();
    info!(
        "Starting agentic analysis with {} tools: {}",
        specs.len(),
        tools.names().join(", ")
    );

    for iteration in 1..=max_iterations {
        debug!("Agentic iteration {iteration}/{max_iterations}");
        let reply = client.chat(&conversation, &specs).await?;

        if reply.tool_calls.is_empty() {
            let content = reply.content.unwrap_or_else(|| {
                warn!("Model returned no content, using empty answer");
                String::new()
            });
            info!("Analysis complete after {iteration} iteration(s)");
            debug!("Response: {}", truncate_chars(&content, 200));
            return Ok(AgentOutcome::Complete(content));
        }

        let names: Vec<&str> = reply
            .tool_calls
            .iter()
            .map(|call| call.function.name.as_str())
            .collect();
        info!("Calling {} tool(s): {}", names.len(), names.join(", "));

        let calls = reply.tool_calls;
        conversation.push(ChatMessage::assistant_tool_calls(reply.content, calls.clone()));

        for call in &calls {
            let result = execute_tool_call(call, tools).await;
            conversation.push(ChatMessage::tool_result(call, result));
        }
    }

    warn!("Reached maximum iterations ({max_iterations}) without final answer");
    Ok(AgentOutcome::Incomplete {
        iterations: max_iterations,
    })
}

fn parse_arguments(raw: &str) -> std::result::Result<Map<String, Value>, String> {
    if raw.trim().is_empty() {
        return Ok(Map::new());
    }
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(args)) => Ok(args),
        Ok(other) => Err(format!("Tool arguments must be a JSON object, got {other}")),
        Err(e) => Err(format!("Invalid JSON arguments - {e}")),
    }
}

/// Runs one requested call and renders its result as tool-message text.
async fn execute_tool_call(call: &ToolCall, tools: &ToolRegistry) -> String {
    let name = &call.function.name;

    let args = match parse_arguments(&call.function.arguments) {
        Ok(args) => args,
        Err(message) => {
            warn!("Failed to parse arguments for tool {name}: {message}");
            return format!("Error: {message}");
        }
    };

    let Some(tool) = tools.get(name) else {
        warn!("Tool {name} not found");
        return format!("Error: Tool '{name}' not found in available tools");
    };

    info!("Executing tool: {name}");
    debug!("Tool arguments: {}", Value::Object(args.clone()));

    match tool.invoke(args).await {
        Ok(Value::String(text)) => {
            info!("Tool {name} completed ({} chars)", text.chars().count());
            text
        }
        Ok(other) => {
            let text = other.to_string();
            info!("Tool {name} completed ({} chars)", text.chars().count());
            text
        }
        Err(e) => {
            warn!("Error executing tool {name}: {e}");
            format!("Error: Error executing tool '{name}': {e}")
        }
    }
}
