//! # ContReAct Core
//!
//! Domain types, traits, and error definitions for the ContReAct cycle runner.
//! This crate does **no I/O**; it defines the model every other crate
//! implements against.
//!
//! ## Design Philosophy
//!
//! Every external collaborator (language model backend, embedding model,
//! memory store, event sink, operator channel) is a trait here. Concrete
//! adapters live in their own crates, so the cycle logic can be exercised
//! with hand-written fakes.

pub mod error;
pub mod message;
pub mod provider;
pub mod embedding;
pub mod channel;
pub mod tool;
pub mod memory;
pub mod agent;
pub mod event;

// Re-export key types at crate root for ergonomics
pub use error::{Error, Result};
pub use message::{Message, MessageToolCall, Role};
pub use provider::{Provider, ProviderRequest, ProviderResponse, ToolDefinition};
pub use embedding::EmbeddingProvider;
pub use channel::OperatorChannel;
pub use tool::{ParamKind, Tool, ToolContext, ToolParameter, ToolRegistry};
pub use memory::{MemoryStore, WriteOutcome};
pub use agent::{AgentState, CycleMetrics};
pub use event::{EventRecord, EventSink, EventType};
