pub mod assess;
pub mod check;
pub mod init;
pub mod run;
pub mod summarize;

use contreact_config::RunConfig;
use contreact_core::error::ProviderError;
use contreact_core::provider::Provider;
use contreact_providers::OllamaProvider;
use std::time::Duration;

/// Build the chat backend from the run configuration.
pub fn build_provider(config: &RunConfig) -> Result<OllamaProvider, ProviderError> {
    OllamaProvider::new(
        &config.backend.host,
        Duration::from_secs(config.backend.request_timeout_secs),
    )
}

/// Turn a missing-model error into something the operator can act on.
pub fn explain_provider_error(e: &ProviderError, model: &str) -> String {
    match e {
        ProviderError::ModelNotFound(_) => {
            format!("Model '{model}' is not available on the backend. Pull it with: ollama pull {model}")
        }
        ProviderError::Network(detail) => {
            format!("Cannot reach the backend ({detail}). Is Ollama running?")
        }
        other => other.to_string(),
    }
}

/// Confirm the chat model, and the embedding model when diversity monitoring
/// is on, are pulled before any cycle runs.
pub async fn verify_models(provider: &dyn Provider, config: &RunConfig) -> Result<(), String> {
    provider
        .verify_model(&config.model_name)
        .await
        .map_err(|e| explain_provider_error(&e, &config.model_name))?;

    if config.diversity.enabled {
        let embedding = &config.diversity.embedding_model;
        provider
            .verify_model(embedding)
            .await
            .map_err(|e| explain_provider_error(&e, embedding))?;
    }
    Ok(())
}
