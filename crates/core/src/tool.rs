//! Tool trait and registry — the closed catalogue of remote operations.
//!
//! Tools are what let the agent act against the extraction service: list
//! documents and datasets, trigger extractions, fetch content, manage
//! configs. The registry's `dispatch` never fails — every problem comes back
//! as result text so the round loop can feed it to the model and continue.

use crate::backend::ToolDefinition;
use crate::error::ToolError;
use async_trait::async_trait;
use std::collections::HashMap;

/// Character budget for a single tool result. Outputs beyond this are cut
/// with a truncation notice to bound token usage downstream.
pub const MAX_TOOL_RESULT_CHARS: usize = 30_000;

/// One invocable operation.
#[async_trait]
pub trait Tool: Send + Sync {
    /// The unique name of this tool (e.g. "list_datasets").
    fn name(&self) -> &str;

    /// A description of what this tool does (sent to the LLM).
    fn description(&self) -> &str;

    /// JSON Schema describing this tool's parameters.
    fn parameters_schema(&self) -> serde_json::Value;

    /// Execute the tool with decoded arguments.
    async fn execute(&self, arguments: serde_json::Value) -> Result<String, ToolError>;

    /// Convert this tool into a ToolDefinition for sending to the LLM.
    fn to_definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters_schema(),
        }
    }
}

/// A registry of available tools.
///
/// The orchestrator uses this to:
/// 1. Get tool definitions to send to the LLM
/// 2. Dispatch tool calls when the LLM requests them
pub struct ToolRegistry {
    tools: HashMap<String, Box<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Register a tool. Replaces any existing tool with the same name.
    pub fn register(&mut self, tool: Box<dyn Tool>) {
        let name = tool.name().to_string();
        self.tools.insert(name, tool);
    }

    /// Get a tool by name.
    pub fn get(&self, name: &str) -> Option<&dyn Tool> {
        self.tools.get(name).map(|t| t.as_ref())
    }

    /// Get all tool definitions (for sending to the LLM).
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.values().map(|t| t.to_definition()).collect()
    }

    /// List all registered tool names.
    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(|s| s.as_str()).collect()
    }

    /// Dispatch a tool call, normalizing the outcome to text.
    ///
    /// Unknown names, bad arguments, and execution failures all become
    /// textual payloads — callers can always append the result to the
    /// conversation and keep the loop going. Successful outputs over
    /// [`MAX_TOOL_RESULT_CHARS`] are truncated with a notice.
    pub async fn dispatch(&self, name: &str, arguments: serde_json::Value) -> String {
        let Some(tool) = self.tools.get(name) else {
            return ToolError::NotFound(name.to_string()).to_string();
        };

        match tool.execute(arguments).await {
            Ok(output) => truncate_result(output),
            Err(e) => format!("Error: {e}"),
        }
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Truncate a tool result to the character budget, on a char boundary.
fn truncate_result(output: String) -> String {
    if output.chars().count() <= MAX_TOOL_RESULT_CHARS {
        return output;
    }
    let cut: String = output.chars().take(MAX_TOOL_RESULT_CHARS).collect();
    format!("{cut}\n… [result truncated at {MAX_TOOL_RESULT_CHARS} characters]")
}
