//! Tool trait — the abstraction over agent capabilities.
//!
//! Tools are the external work the scheduler dispatches: arithmetic,
//! sequence generation, report delivery, and whatever else gets registered.
//! The registry is the execution dispatcher: exact-name lookup, unknown
//! names reported as errors (never fatal to the request).

use crate::error::ToolError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// A tool's name, description, and parameter schema — sent to the oracle so
/// it can plan tool calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// What a tool produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolOutput {
    pub success: bool,

    /// The result payload — scalar, JSON structure, or text
    pub output: Value,

    /// New facts worth folding into the fact store
    #[serde(default)]
    pub facts_to_remember: Vec<String>,
}

impl ToolOutput {
    pub fn ok(output: Value) -> Self {
        Self {
            success: true,
            output,
            facts_to_remember: Vec::new(),
        }
    }

    pub fn with_facts(mut self, facts: Vec<String>) -> Self {
        self.facts_to_remember = facts;
        self
    }
}

/// The core Tool trait.
#[async_trait]
pub trait Tool: Send + Sync {
    /// The unique name of this tool (e.g. "arithmetic", "fibonacci").
    fn name(&self) -> &str;

    /// A description of what this tool does (sent to the oracle).
    fn description(&self) -> &str;

    /// JSON Schema describing this tool's parameters.
    fn parameters_schema(&self) -> Value;

    /// Execute the tool with the given (already resolved) parameters.
    async fn execute(&self, parameters: Value) -> Result<ToolOutput, ToolError>;

    /// Convert this tool into a ToolDefinition for the oracle prompt.
    fn to_definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters_schema(),
        }
    }
}

/// A registry of available tools — the execution dispatcher.
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

    /// Get all tool definitions (for the decision prompt).
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.values().map(|t| t.to_definition()).collect()
    }

    /// Dispatch a tool call by exact name match.
    pub async fn dispatch(&self, name: &str, parameters: Value) -> Result<ToolOutput, ToolError> {
        let tool = self
            .tools
            .get(name)
            .ok_or_else(|| ToolError::NotFound(name.to_string()))?;
        tool.execute(parameters).await
    }

    /// List all registered tool names.
    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(|s| s.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}
