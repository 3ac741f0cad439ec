//! Tool trait and the registry that dispatches to it.
//!
//! Tools are the closed set of operations the model may call. The registry
//! turns every tool-level failure into text the model can read, so the
//! cycle's control flow never branches on a tool error.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use crate::error::{Error, ToolError};
use crate::provider::ToolDefinition;

/// Context injected by the dispatcher, never supplied by the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolContext {
    pub run_id: String,
    pub cycle_number: u32,
}

impl ToolContext {
    pub fn new(run_id: impl Into<String>, cycle_number: u32) -> Self {
        Self {
            run_id: run_id.into(),
            cycle_number,
        }
    }
}

/// JSON-schema type of a tool parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamKind {
    String,
    Integer,
    Number,
    Boolean,
}

impl ParamKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Number => "number",
            Self::Boolean => "boolean",
        }
    }
}

/// A typed, described parameter of a tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolParameter {
    pub name: &'static str,
    pub kind: ParamKind,
    pub description: &'static str,
    pub required: bool,
}

impl ToolParameter {
    pub const fn required(name: &'static str, kind: ParamKind, description: &'static str) -> Self {
        Self { name, kind, description, required: true }
    }

    pub const fn optional(name: &'static str, kind: ParamKind, description: &'static str) -> Self {
        Self { name, kind, description, required: false }
    }
}

/// The core Tool trait.
#[async_trait]
pub trait Tool: Send + Sync {
    /// The unique name of this tool (e.g., "write", "pattern_search").
    fn name(&self) -> &str;

    /// A description of what this tool does (sent to the LLM).
    fn description(&self) -> &str;

    /// The parameters this tool accepts.
    fn parameters(&self) -> Vec<ToolParameter>;

    /// Execute the tool with the model-supplied arguments.
    ///
    /// Return [`ToolError::InvalidArguments`] when `arguments` do not bind.
    async fn execute(
        &self,
        arguments: serde_json::Value,
        ctx: &ToolContext,
    ) -> std::result::Result<String, ToolError>;

    /// JSON Schema describing this tool's parameters.
    fn parameters_schema(&self) -> serde_json::Value {
        let params = self.parameters();
        let mut properties = serde_json::Map::new();
        for p in &params {
            properties.insert(
                p.name.to_string(),
                serde_json::json!({ "type": p.kind.as_str(), "description": p.description }),
            );
        }
        let required: Vec<&str> = params.iter().filter(|p| p.required).map(|p| p.name).collect();
        serde_json::json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }

    /// Convert this tool into a ToolDefinition for sending to the LLM.
    fn to_definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters_schema(),
        }
    }
}

/// Bind a named-argument bag to a typed argument struct.
///
/// A JSON `null` is treated as an empty bag so argument-less tools accept
/// a model that omits arguments entirely.
pub fn bind_arguments<T: DeserializeOwned>(arguments: serde_json::Value) -> std::result::Result<T, ToolError> {
    let arguments = if arguments.is_null() {
        serde_json::Value::Object(serde_json::Map::new())
    } else {
        arguments
    };
    serde_json::from_value(arguments).map_err(|e| ToolError::InvalidArguments(e.to_string()))
}

/// A registry of available tools, in registration order.
pub struct ToolRegistry {
    tools: Vec<Box<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self { tools: Vec::new() }
    }

    /// Register a tool. Replaces, in place, any existing tool with the same name.
    pub fn register(&mut self, tool: Box<dyn Tool>) {
        match self.tools.iter().position(|t| t.name() == tool.name()) {
            Some(idx) => self.tools[idx] = tool,
            None => self.tools.push(tool),
        }
    }

    /// Builder-style [`register`](Self::register).
    pub fn with_tool(mut self, tool: Box<dyn Tool>) -> Self {
        self.register(tool);
        self
    }

    /// Get a tool by name.
    pub fn get(&self, name: &str) -> Option<&dyn Tool> {
        self.tools.iter().find(|t| t.name() == name).map(|t| t.as_ref())
    }

    /// All registered tools in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &dyn Tool> {
        self.tools.iter().map(|t| t.as_ref())
    }

    /// Get all tool definitions (for sending to the LLM).
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.iter().map(|t| t.to_definition()).collect()
    }

    /// List all registered tool names.
    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Invoke `name` and render the outcome as text for the model.
    ///
    /// Unknown tools, unbindable arguments and tool failures all come back as
    /// `Ok` with an error sentence. Only a failing memory store is returned
    /// as `Err`, since the run cannot continue without it.
    pub async fn dispatch(
        &self,
        name: &str,
        arguments: serde_json::Value,
        ctx: &ToolContext,
    ) -> crate::Result<String> {
        let Some(tool) = self.get(name) else {
            warn!(tool = %name, "Model requested unknown tool");
            return Ok(format!("Error: Tool '{name}' not found"));
        };

        debug!(tool = %name, cycle = ctx.cycle_number, "Dispatching tool");
        match tool.execute(arguments, ctx).await {
            Ok(output) => Ok(output),
            Err(ToolError::InvalidArguments(detail)) => {
                warn!(tool = %name, error = %detail, "Invalid tool arguments");
                Ok(format!("Error: Invalid arguments for tool '{name}': {detail}"))
            }
            Err(ToolError::Memory(e)) => Err(Error::Memory(e)),
            Err(e) => {
                warn!(tool = %name, error = %e, "Tool execution failed");
                Ok(format!("Error executing tool '{name}': {e}"))
            }
        }
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}
