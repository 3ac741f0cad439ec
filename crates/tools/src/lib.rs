//! Built-in tool implementations for ContReAct.
//!
//! The agent has a small closed toolset: a key-value notebook persisted
//! across cycles, and a way to message the operator.

pub mod memory;
pub mod operator;

use contreact_core::channel::OperatorChannel;
use contreact_core::memory::MemoryStore;
use contreact_core::tool::ToolRegistry;
use std::sync::Arc;

pub use memory::{DeleteTool, ListTool, MEMORY_TOOL_NAMES, PatternSearchTool, ReadTool, WriteTool};
pub use operator::{SEND_MESSAGE_TOOL_NAME, SendMessageTool};

/// Registry with every built-in tool, in catalog order.
pub fn default_registry(store: Arc<dyn MemoryStore>, operator: Arc<dyn OperatorChannel>) -> ToolRegistry {
    ToolRegistry::new()
        .with_tool(Box::new(WriteTool::new(store.clone())))
        .with_tool(Box::new(ReadTool::new(store.clone())))
        .with_tool(Box::new(ListTool::new(store.clone())))
        .with_tool(Box::new(DeleteTool::new(store.clone())))
        .with_tool(Box::new(PatternSearchTool::new(store)))
        .with_tool(Box::new(SendMessageTool::new(operator)))
}
