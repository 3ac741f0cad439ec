//! LLM backend implementations for ContReAct.
//!
//! [`OllamaProvider`] implements `contreact_core::Provider` and
//! [`OllamaEmbedder`] implements `contreact_core::EmbeddingProvider`, both
//! against an Ollama server. Malformed tool-call output is repaired or
//! degraded to text in [`recovery`].

pub mod ollama;
pub mod recovery;

pub use ollama::{DEFAULT_HOST, OllamaEmbedder, OllamaProvider, model_is_listed};
pub use recovery::MALFORMED_OUTPUT_MESSAGE;
