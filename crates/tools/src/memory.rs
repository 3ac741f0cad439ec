//! Memory tools: the agent's persistent notebook.
//!
//! Five tools over one [`MemoryStore`], each scoped to the run id taken from
//! the dispatch context. Store failures are returned as
//! [`ToolError::Memory`] so the dispatcher can end the run.

use async_trait::async_trait;
use contreact_core::error::ToolError;
use contreact_core::memory::{MemoryStore, WriteOutcome};
use contreact_core::tool::{ParamKind, Tool, ToolContext, ToolParameter, bind_arguments};
use serde::Deserialize;
use std::sync::Arc;
use tracing::debug;

/// Names of the tools that count as memory operations.
pub const MEMORY_TOOL_NAMES: [&str; 5] = ["write", "read", "list", "delete", "pattern_search"];

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct KeyValueArgs {
    key: String,
    value: String,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct KeyArgs {
    key: String,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct NoArgs {}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct PatternArgs {
    pattern: String,
}

/// `write`: store a value under a key.
pub struct WriteTool {
    store: Arc<dyn MemoryStore>,
}

impl WriteTool {
    pub fn new(store: Arc<dyn MemoryStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for WriteTool {
    fn name(&self) -> &str {
        "write"
    }

    fn description(&self) -> &str {
        "Write a value to persistent memory under a specified key. Overwrites if key exists."
    }

    fn parameters(&self) -> Vec<ToolParameter> {
        vec![
            ToolParameter::required("key", ParamKind::String, "The key to store the value under"),
            ToolParameter::required("value", ParamKind::String, "The value to store"),
        ]
    }

    async fn execute(&self, arguments: serde_json::Value, ctx: &ToolContext) -> Result<String, ToolError> {
        let args: KeyValueArgs = bind_arguments(arguments)?;
        let outcome = self.store.write(&ctx.run_id, &args.key, &args.value).await?;
        debug!(key = %args.key, chars = args.value.chars().count(), ?outcome, "Memory write");
        Ok(match outcome {
            WriteOutcome::Created => format!("Wrote value to key '{}'", args.key),
            WriteOutcome::Updated => format!("Updated key '{}' with new value", args.key),
        })
    }
}

/// `read`: fetch the value under a key.
pub struct ReadTool {
    store: Arc<dyn MemoryStore>,
}

impl ReadTool {
    pub fn new(store: Arc<dyn MemoryStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for ReadTool {
    fn name(&self) -> &str {
        "read"
    }

    fn description(&self) -> &str {
        "Read a value from persistent memory by key."
    }

    fn parameters(&self) -> Vec<ToolParameter> {
        vec![ToolParameter::required("key", ParamKind::String, "The key to retrieve the value for")]
    }

    async fn execute(&self, arguments: serde_json::Value, ctx: &ToolContext) -> Result<String, ToolError> {
        let args: KeyArgs = bind_arguments(arguments)?;
        Ok(self
            .store
            .read(&ctx.run_id, &args.key)
            .await?
            .unwrap_or_else(|| format!("Error: Key '{}' not found", args.key)))
    }
}

/// `list`: every key of the run.
pub struct ListTool {
    store: Arc<dyn MemoryStore>,
}

impl ListTool {
    pub fn new(store: Arc<dyn MemoryStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for ListTool {
    fn name(&self) -> &str {
        "list"
    }

    fn description(&self) -> &str {
        "List all keys currently stored in persistent memory."
    }

    fn parameters(&self) -> Vec<ToolParameter> {
        Vec::new()
    }

    async fn execute(&self, arguments: serde_json::Value, ctx: &ToolContext) -> Result<String, ToolError> {
        let _: NoArgs = bind_arguments(arguments)?;
        let keys = self.store.list(&ctx.run_id).await?;
        Ok(if keys.is_empty() {
            "No keys stored".to_string()
        } else {
            keys.join(", ")
        })
    }
}

/// `delete`: remove a key.
pub struct DeleteTool {
    store: Arc<dyn MemoryStore>,
}

impl DeleteTool {
    pub fn new(store: Arc<dyn MemoryStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for DeleteTool {
    fn name(&self) -> &str {
        "delete"
    }

    fn description(&self) -> &str {
        "Delete a key and its associated value from persistent memory."
    }

    fn parameters(&self) -> Vec<ToolParameter> {
        vec![ToolParameter::required("key", ParamKind::String, "The key to delete")]
    }

    async fn execute(&self, arguments: serde_json::Value, ctx: &ToolContext) -> Result<String, ToolError> {
        let args: KeyArgs = bind_arguments(arguments)?;
        Ok(if self.store.delete(&ctx.run_id, &args.key).await? {
            format!("Deleted key '{}'", args.key)
        } else {
            format!("Error: Key '{}' not found", args.key)
        })
    }
}

/// `pattern_search`: keys containing a substring.
pub struct PatternSearchTool {
    store: Arc<dyn MemoryStore>,
}

impl PatternSearchTool {
    pub fn new(store: Arc<dyn MemoryStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for PatternSearchTool {
    fn name(&self) -> &str {
        "pattern_search"
    }

    fn description(&self) -> &str {
        "Search for keys in persistent memory that contain a specific pattern."
    }

    fn parameters(&self) -> Vec<ToolParameter> {
        vec![ToolParameter::required("pattern", ParamKind::String, "Substring to search for in keys")]
    }

    async fn execute(&self, arguments: serde_json::Value, ctx: &ToolContext) -> Result<String, ToolError> {
        let args: PatternArgs = bind_arguments(arguments)?;
        let keys = self.store.search(&ctx.run_id, &args.pattern).await?;
        Ok(if keys.is_empty() {
            format!("No keys found matching pattern '{}'", args.pattern)
        } else {
            keys.join(", ")
        })
    }
}
