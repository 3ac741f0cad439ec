//! Ollama provider implementation, speaking the native API.
//!
//! - `POST /api/chat` for non-streaming chat with tool calling
//! - `GET /api/tags` for model listing and availability checks
//! - `POST /api/embed` for reflection embeddings ([`OllamaEmbedder`])

use async_trait::async_trait;
use contreact_core::embedding::EmbeddingProvider;
use contreact_core::error::{EmbeddingError, ProviderError};
use contreact_core::message::{Message, MessageToolCall, Role};
use contreact_core::provider::*;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};
use crate::recovery;

/// Default address of a local Ollama server.
pub const DEFAULT_HOST: &str = "http://localhost:11434";

fn build_client(timeout: Duration) -> Result<reqwest::Client, ProviderError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| ProviderError::NotConfigured(format!("Failed to create HTTP client: {e}")))
}

fn network_error(e: reqwest::Error) -> ProviderError {
    if e.is_timeout() {
        ProviderError::Timeout(e.to_string())
    } else {
        ProviderError::Network(e.to_string())
    }
}

/// Extract the `error` field Ollama puts in failure bodies.
fn error_message(body: &str) -> String {
    serde_json::from_str::<ApiError>(body)
        .map(|e| e.error)
        .unwrap_or_else(|_| body.to_string())
}

/// An LLM provider backed by an Ollama server.
pub struct OllamaProvider {
    base_url: String,
    client: reqwest::Client,
}

impl OllamaProvider {
    /// Create a provider for `host` with the given request timeout.
    pub fn new(host: impl Into<String>, timeout: Duration) -> Result<Self, ProviderError> {
        Ok(Self {
            base_url: host.into().trim_end_matches('/').to_string(),
            client: build_client(timeout)?,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Convert our Message types to Ollama API format.
    fn to_api_messages(messages: &[Message]) -> Vec<ApiMessage> {
        messages
            .iter()
            .map(|m| ApiMessage {
                role: match m.role {
                    Role::User => "user".into(),
                    Role::Assistant => "assistant".into(),
                    Role::System => "system".into(),
                    Role::Tool => "tool".into(),
                },
                content: m.content.clone(),
                tool_calls: m
                    .tool_calls
                    .iter()
                    .map(|tc| ApiToolCall {
                        id: Some(tc.id.clone()),
                        function: ApiFunction {
                            name: tc.name.clone(),
                            arguments: tc.arguments.clone(),
                        },
                    })
                    .collect(),
                tool_call_id: m.tool_call_id.clone(),
            })
            .collect()
    }

    /// Convert tool definitions to Ollama API format.
    fn to_api_tools(tools: &[ToolDefinition]) -> Vec<ApiToolDefinition> {
        tools
            .iter()
            .map(|t| ApiToolDefinition {
                r#type: "function".into(),
                function: ApiToolFunction {
                    name: t.name.clone(),
                    description: t.description.clone(),
                    parameters: t.parameters.clone(),
                },
            })
            .collect()
    }

    /// Turn an API reply into our message, synthesizing missing call ids and
    /// repairing malformed arguments.
    fn from_api_message(api: ApiMessage) -> (Message, bool) {
        let tool_calls = api
            .tool_calls
            .into_iter()
            .map(|tc| MessageToolCall {
                id: tc
                    .id
                    .filter(|id| !id.is_empty())
                    .unwrap_or_else(|| format!("call_{}", uuid::Uuid::new_v4().simple())),
                name: tc.function.name,
                arguments: tc.function.arguments,
            })
            .collect();

        let mut message = Message::assistant_with_tools(api.content, tool_calls);
        let recovered = recovery::repair_tool_calls(&mut message);
        (message, recovered)
    }
}

#[async_trait]
impl Provider for OllamaProvider {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn complete(
        &self,
        request: ProviderRequest,
    ) -> std::result::Result<ProviderResponse, ProviderError> {
        let url = format!("{}/api/chat", self.base_url);

        let mut body = serde_json::json!({
            "model": request.model,
            "messages": Self::to_api_messages(&request.messages),
            "stream": false,
        });
        if !request.tools.is_empty() {
            body["tools"] = serde_json::json!(Self::to_api_tools(&request.tools));
        }
        if !request.options.is_empty() {
            body["options"] = serde_json::Value::Object(request.options.clone());
        }

        debug!(model = %request.model, messages = request.messages.len(), "Sending chat request");

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(network_error)?;

        let status = response.status().as_u16();

        if status == 404 {
            return Err(ProviderError::ModelNotFound(request.model));
        }

        if status != 200 {
            let error_body = response.text().await.unwrap_or_default();
            let message = error_message(&error_body);
            if let Some(message) = recovery::recover_from_parse_error(&message) {
                return Ok(ProviderResponse {
                    message,
                    model: request.model,
                    recovered: true,
                });
            }
            warn!(status, body = %error_body, "Ollama returned error");
            return Err(ProviderError::ApiError {
                status_code: status,
                message,
            });
        }

        let api_response: ApiChatResponse =
            response.json().await.map_err(|e| ProviderError::InvalidResponse(format!(
                "Failed to parse chat response: {e}"
            )))?;

        let (message, recovered) = Self::from_api_message(api_response.message);
        Ok(ProviderResponse {
            message,
            model: api_response.model.unwrap_or(request.model),
            recovered,
        })
    }

    async fn list_models(&self) -> std::result::Result<Vec<String>, ProviderError> {
        let url = format!("{}/api/tags", self.base_url);
        let response = self.client.get(&url).send().await.map_err(network_error)?;

        let status = response.status().as_u16();
        if status != 200 {
            let error_body = response.text().await.unwrap_or_default();
            return Err(ProviderError::ApiError {
                status_code: status,
                message: error_message(&error_body),
            });
        }

        let tags: ApiTagsResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(format!("Failed to parse model list: {e}")))?;

        Ok(tags.model_names())
    }

    async fn verify_model(&self, model: &str) -> std::result::Result<(), ProviderError> {
        let models = self.list_models().await?;
        if model_is_listed(&models, model) {
            Ok(())
        } else {
            Err(ProviderError::ModelNotFound(model.to_string()))
        }
    }
}

/// Whether `name` is among `models`, with an implicit `:latest` tag.
pub fn model_is_listed(models: &[String], name: &str) -> bool {
    models
        .iter()
        .any(|m| m == name || m.strip_suffix(":latest") == Some(name))
}

/// Embeddings from an Ollama-served model (e.g. `all-minilm`).
pub struct OllamaEmbedder {
    base_url: String,
    model: String,
    client: reqwest::Client,
}

impl OllamaEmbedder {
    pub fn new(host: impl Into<String>, model: impl Into<String>, timeout: Duration) -> Result<Self, ProviderError> {
        Ok(Self {
            base_url: host.into().trim_end_matches('/').to_string(),
            model: model.into(),
            client: build_client(timeout)?,
        })
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaEmbedder {
    fn model(&self) -> &str {
        &self.model
    }

    async fn embed(&self, text: &str) -> std::result::Result<Vec<f32>, EmbeddingError> {
        let url = format!("{}/api/embed", self.base_url);
        let body = serde_json::json!({ "model": self.model, "input": text });

        debug!(model = %self.model, chars = text.len(), "Sending embedding request");

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| EmbeddingError::Request(e.to_string()))?;

        let status = response.status().as_u16();
        if status != 200 {
            let error_body = response.text().await.unwrap_or_default();
            return Err(EmbeddingError::Request(format!(
                "status {status}: {}",
                error_message(&error_body)
            )));
        }

        let api: ApiEmbedResponse = response
            .json()
            .await
            .map_err(|e| EmbeddingError::Request(format!("Failed to parse embedding response: {e}")))?;

        api.embeddings
            .into_iter()
            .next()
            .filter(|v| !v.is_empty())
            .ok_or(EmbeddingError::Empty)
    }
}

// --- Ollama API types ---

#[derive(Debug, Serialize, Deserialize)]
struct ApiMessage {
    role: String,
    #[serde(default)]
    content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    tool_calls: Vec<ApiToolCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiToolCall {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    function: ApiFunction,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiFunction {
    #[serde(default)]
    name: String,
    #[serde(default)]
    arguments: serde_json::Value,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiToolDefinition {
    r#type: String,
    function: ApiToolFunction,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiToolFunction {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct ApiChatResponse {
    #[serde(default)]
    model: Option<String>,
    message: ApiMessage,
}

#[derive(Debug, Deserialize)]
struct ApiTagsResponse {
    #[serde(default)]
    models: Vec<ApiModelTag>,
}

impl ApiTagsResponse {
    fn model_names(self) -> Vec<String> {
        self.models
            .into_iter()
            .filter_map(|m| m.model.or(m.name))
            .collect()
    }
}

#[derive(Debug, Deserialize)]
struct ApiModelTag {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    model: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiEmbedResponse {
    #[serde(default)]
    embeddings: Vec<Vec<f32>>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    error: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn constructor_trims_trailing_slash() {
        let provider = OllamaProvider::new("http://localhost:11434/", Duration::from_secs(5)).unwrap();
        assert_eq!(provider.name(), "ollama");
        assert_eq!(provider.base_url(), "http://localhost:11434");
    }

    #[test]
    fn message_conversion() {
        let messages = vec![
            Message::system("You are autonomous"),
            Message::assistant_with_tools("", vec![MessageToolCall::new("call_1", "list", json!({}))]),
            Message::tool_result("call_1", "No keys stored"),
        ];
        let api = OllamaProvider::to_api_messages(&messages);
        assert_eq!(api.len(), 3);
        assert_eq!(api[0].role, "system");
        assert_eq!(api[1].tool_calls[0].function.name, "list");
        assert_eq!(api[2].role, "tool");
        assert_eq!(api[2].tool_call_id.as_deref(), Some("call_1"));

        let wire = serde_json::to_value(&api[0]).unwrap();
        assert!(wire.get("tool_calls").is_none());
    }

    #[test]
    fn tool_definition_conversion() {
        let tools = vec![ToolDefinition {
            name: "read".into(),
            description: "Read a value".into(),
            parameters: json!({"type": "object"}),
        }];
        let api_tools = OllamaProvider::to_api_tools(&tools);
        assert_eq!(api_tools[0].r#type, "function");
        assert_eq!(api_tools[0].function.name, "read");
    }

    #[test]
    fn parse_chat_response_with_tool_call() {
        let data = r#"{"model":"llama3:latest","message":{"role":"assistant","content":"","tool_calls":[{"function":{"name":"write","arguments":{"key":"k","value":"v"}}}]},"done":true}"#;
        let parsed: ApiChatResponse = serde_json::from_str(data).unwrap();
        let (message, recovered) = OllamaProvider::from_api_message(parsed.message);
        assert!(!recovered);
        assert_eq!(message.role, Role::Assistant);
        assert_eq!(message.tool_calls.len(), 1);
        assert!(message.tool_calls[0].id.starts_with("call_"));
        assert_eq!(message.tool_calls[0].arguments, json!({"key": "k", "value": "v"}));
    }

    #[test]
    fn synthesized_ids_are_unique() {
        let data = r#"{"role":"assistant","content":"","tool_calls":[{"function":{"name":"list","arguments":{}}},{"function":{"name":"list","arguments":{}}}]}"#;
        let api: ApiMessage = serde_json::from_str(data).unwrap();
        let (message, _) = OllamaProvider::from_api_message(api);
        assert_ne!(message.tool_calls[0].id, message.tool_calls[1].id);
    }

    #[test]
    fn string_arguments_are_repaired_on_parse() {
        let data = r#"{"role":"assistant","content":"","tool_calls":[{"function":{"name":"read","arguments":"{\"key\":\"k\"}"}}]}"#;
        let api: ApiMessage = serde_json::from_str(data).unwrap();
        let (message, recovered) = OllamaProvider::from_api_message(api);
        assert!(!recovered);
        assert_eq!(message.tool_calls[0].arguments, json!({"key": "k"}));
    }

    #[test]
    fn parse_tags_response() {
        let data = r#"{"models":[{"name":"llama3:latest","model":"llama3:latest"},{"name":"all-minilm:latest"}]}"#;
        let parsed: ApiTagsResponse = serde_json::from_str(data).unwrap();
        assert_eq!(parsed.model_names(), vec!["llama3:latest", "all-minilm:latest"]);
    }

    #[test]
    fn latest_tag_is_implied() {
        let models = vec!["all-minilm:latest".to_string(), "llama3:8b".to_string()];
        assert!(model_is_listed(&models, "all-minilm"));
        assert!(model_is_listed(&models, "all-minilm:latest"));
        assert!(model_is_listed(&models, "llama3:8b"));
        assert!(!model_is_listed(&models, "llama3"));
    }

    #[test]
    fn parse_embed_response() {
        let data = r#"{"model":"all-minilm","embeddings":[[0.1,0.2,0.3]]}"#;
        let parsed: ApiEmbedResponse = serde_json::from_str(data).unwrap();
        assert_eq!(parsed.embeddings[0].len(), 3);
    }

    #[test]
    fn error_bodies_unwrap_error_field() {
        assert_eq!(error_message(r#"{"error":"model 'x' not found"}"#), "model 'x' not found");
        assert_eq!(error_message("plain failure"), "plain failure");
    }
}
