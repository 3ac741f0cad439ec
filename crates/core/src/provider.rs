//! Provider trait: the abstraction over LLM backends.
//!
//! A Provider knows how to send a cycle's messages, together with the tool
//! catalog and generation options, to a language model and get one message
//! back.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use crate::error::ProviderError;
use crate::message::Message;

/// Configuration for a provider request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderRequest {
    /// The model to use (e.g., "llama3:latest")
    pub model: String,

    /// The assembled prompt messages
    pub messages: Vec<Message>,

    /// Available tools the model can call
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ToolDefinition>,

    /// Generation options passed through verbatim (temperature, seed, ...)
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub options: serde_json::Map<String, serde_json::Value>,
}

/// A tool definition sent to the LLM so it knows what tools it can call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// The tool name
    pub name: String,

    /// Description of what the tool does
    pub description: String,

    /// JSON Schema describing the tool's parameters
    pub parameters: serde_json::Value,
}

/// A complete response from a provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderResponse {
    /// The generated message
    pub message: Message,

    /// Which model actually responded
    pub model: String,

    /// Set when the raw output was malformed and had to be repaired.
    #[serde(default)]
    pub recovered: bool,
}

/// The core Provider trait.
///
/// The orchestrator calls `complete()` without knowing which backend is
/// being used.
#[async_trait]
pub trait Provider: Send + Sync {
    /// A human-readable name for this provider (e.g., "ollama").
    fn name(&self) -> &str;

    /// Send a request and get a complete response.
    ///
    /// Implementations must not fail on malformed tool-call output; they
    /// degrade it to a text response instead.
    async fn complete(&self, request: ProviderRequest) -> std::result::Result<ProviderResponse, ProviderError>;

    /// List models available on the backend.
    async fn list_models(&self) -> std::result::Result<Vec<String>, ProviderError> {
        Ok(Vec::new())
    }

    /// Fail with `ModelNotFound` unless `model` is available.
    async fn verify_model(&self, model: &str) -> std::result::Result<(), ProviderError> {
        let models = self.list_models().await?;
        if models.iter().any(|m| m == model) {
            Ok(())
        } else {
            Err(ProviderError::ModelNotFound(model.to_string()))
        }
    }
}
