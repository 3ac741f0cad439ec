//! Embedding trait: text in, fixed-length vector out.

use async_trait::async_trait;
use crate::error::EmbeddingError;

#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Name of the embedding model.
    fn model(&self) -> &str;

    /// Embed a single text.
    async fn embed(&self, text: &str) -> std::result::Result<Vec<f32>, EmbeddingError>;
}
