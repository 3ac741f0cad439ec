//! Diversity monitoring across cycles.
//!
//! Each completed reflection is embedded and compared with the embeddings
//! of every earlier reflection in the run. A close match yields an advisory
//! that is shown to the agent in the next cycle only.

use contreact_core::embedding::EmbeddingProvider;
use contreact_core::error::EmbeddingError;
use std::sync::Arc;
use tracing::{debug, info};

/// Similarity strictly above this is "high".
pub const HIGH_SIMILARITY_THRESHOLD: f64 = 0.8;
/// Similarity strictly above this (and not high) is "moderate".
pub const MODERATE_SIMILARITY_THRESHOLD: f64 = 0.7;

pub const HIGH_SIMILARITY_ADVISORY: &str = "Advisory: Your current line of reflection shows high similarity to a previous cycle. Consider exploring a distinctly different topic, problem space, or mode of inquiry to diversify your exploration.";
pub const MODERATE_SIMILARITY_ADVISORY: &str = "Advisory: Your current line of reflection shows moderate similarity to a previous cycle. You might consider branching into a related but distinct area to expand the breadth of your exploration.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advisory {
    High,
    Moderate,
}

impl Advisory {
    pub fn text(self) -> &'static str {
        match self {
            Self::High => HIGH_SIMILARITY_ADVISORY,
            Self::Moderate => MODERATE_SIMILARITY_ADVISORY,
        }
    }

    /// Advisory level for a maximum similarity score.
    pub fn for_score(score: f64) -> Option<Self> {
        if score > HIGH_SIMILARITY_THRESHOLD {
            Some(Self::High)
        } else if score > MODERATE_SIMILARITY_THRESHOLD {
            Some(Self::Moderate)
        } else {
            None
        }
    }
}

/// Cosine similarity, accumulated in f64. Zero vectors score 0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    let (mut dot, mut norm_a, mut norm_b) = (0.0_f64, 0.0_f64, 0.0_f64);
    for (&x, &y) in a.iter().zip(b) {
        let (x, y) = (f64::from(x), f64::from(y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

/// Compare `new` against every vector in `history`.
pub fn check(new: &[f32], history: &[Vec<f32>]) -> Option<Advisory> {
    let max = history
        .iter()
        .map(|prev| cosine_similarity(new, prev))
        .fold(None, |acc: Option<f64>, s| Some(acc.map_or(s, |m| m.max(s))))?;
    debug!(max_similarity = max, compared = history.len(), "Diversity check");
    Advisory::for_score(max)
}

/// Embeds reflections and keeps the run's embedding history.
pub struct DiversityMonitor {
    embedder: Arc<dyn EmbeddingProvider>,
    history: Vec<Vec<f32>>,
}

impl DiversityMonitor {
    pub fn new(embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            embedder,
            history: Vec::new(),
        }
    }

    /// Embed `reflection`, compare it with all earlier ones, then remember it.
    pub async fn observe(&mut self, reflection: &str) -> Result<Option<Advisory>, EmbeddingError> {
        let vector = self.embedder.embed(reflection).await?;
        if vector.is_empty() {
            return Err(EmbeddingError::Empty);
        }
        if let Some(first) = self.history.first()
            && first.len() != vector.len()
        {
            return Err(EmbeddingError::DimensionMismatch {
                expected: first.len(),
                actual: vector.len(),
            });
        }

        let advisory = check(&vector, &self.history);
        self.history.push(vector);
        if let Some(level) = advisory {
            info!(?level, model = self.embedder.model(), "Reflection resembles an earlier cycle");
        }
        Ok(advisory)
    }

    /// Number of embeddings held.
    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }
}
