//! In-memory nearest-neighbor index over embedding vectors.

use std::collections::HashMap;

use parking_lot::RwLock;

use crate::embedding::cosine_similarity;

/// Error from vector index mutations.
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    /// The index holds vectors of one fixed dimension; mixing dimensions
    /// (or metrics) is undefined behavior and rejected at insertion time.
    #[error("Vector dimension {actual} does not match index dimension {expected}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Cannot index an empty vector")]
    EmptyVector,
}

struct IndexInner {
    /// Fixed by the first inserted vector.
    dimension: Option<usize>,
    vectors: HashMap<String, Vec<f32>>,
}

/// Brute-force cosine-similarity index.
///
/// Pure derived state: every entry corresponds to exactly one live record
/// in the primary store, which drives all mutations.
pub struct VectorIndex {
    inner: RwLock<IndexInner>,
}

impl VectorIndex {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(IndexInner {
                dimension: None,
                vectors: HashMap::new(),
            }),
        }
    }

    /// Insert or overwrite a vector. The first insertion fixes the index
    /// dimension; later insertions with a different dimension are rejected.
    pub fn insert(&self, id: String, vector: Vec<f32>) -> Result<(), IndexError> {
        if vector.is_empty() {
            return Err(IndexError::EmptyVector);
        }

        let mut inner = self.inner.write();
        match inner.dimension {
            Some(expected) if expected != vector.len() => {
                return Err(IndexError::DimensionMismatch {
                    expected,
                    actual: vector.len(),
                });
            }
            Some(_) => {}
            None => inner.dimension = Some(vector.len()),
        }
        inner.vectors.insert(id, vector);
        Ok(())
    }

    /// Remove a vector. Returns true if it was present.
    pub fn remove(&self, id: &str) -> bool {
        self.inner.write().vectors.remove(id).is_some()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.inner.read().vectors.contains_key(id)
    }

    /// Dimension established by the first insert, if any.
    pub fn dimension(&self) -> Option<usize> {
        self.inner.read().dimension
    }

    /// Top-k most similar vectors, ordered by similarity descending.
    /// Equal scores are ordered by id for deterministic output.
    pub fn nearest(&self, query: &[f32], k: usize) -> Vec<(String, f32)> {
        let inner = self.inner.read();
        let mut results: Vec<(String, f32)> = inner
            .vectors
            .iter()
            .map(|(id, vec)| (id.clone(), cosine_similarity(query, vec)))
            .collect();

        results.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        });
        results.truncate(k);
        results
    }

    pub fn len(&self) -> usize {
        self.inner.read().vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().vectors.is_empty()
    }
}

impl Default for VectorIndex {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "index_tests.rs"]
mod tests;
