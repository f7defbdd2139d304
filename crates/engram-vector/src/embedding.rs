//! Embedding types and the provider contract.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Error type for embedding generation.
///
/// Callers never see raw transport errors; anything that prevents an
/// embedding from being produced collapses into these variants and is
/// handled as "no embedding available".
#[derive(Debug, thiserror::Error)]
pub enum EmbeddingError {
    #[error("Embedding generator unavailable: {0}")]
    Unavailable(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// A fixed-length embedding vector.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Embedding {
    pub vector: Vec<f32>,
    pub dimension: usize,
}

impl Embedding {
    pub fn new(vector: Vec<f32>) -> Self {
        let dimension = vector.len();
        Self { vector, dimension }
    }
}

/// Cosine similarity between two vectors. Returns 0.0 for mismatched
/// dimensions or zero-norm inputs, so callers can rank without special
/// cases.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a.sqrt() * norm_b.sqrt())
}

/// Contract for the external embedding generator.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generate an embedding for one text.
    async fn embed(&self, text: &str) -> Result<Embedding, EmbeddingError>;

    /// Generate embeddings for multiple texts.
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Embedding>, EmbeddingError>;

    /// Dimension of vectors this provider produces.
    fn dimension(&self) -> usize;

    /// Identifier of the underlying model, recorded alongside stored
    /// vectors to detect stale embeddings after a model change.
    fn model_id(&self) -> &str;
}
