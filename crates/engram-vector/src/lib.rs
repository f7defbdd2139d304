//! Vector layer for the Engram memory engine.
//!
//! Provides embedding generation (remote, OpenAI-compatible), a
//! nearest-neighbor index over embedding vectors, and a bounded LRU cache
//! that removes redundant embedding calls.

mod cache;
mod embedding;
mod index;
mod remote;

pub use cache::{CacheStats, EmbeddingCache};
pub use embedding::{cosine_similarity, Embedding, EmbeddingError, EmbeddingProvider};
pub use index::{IndexError, VectorIndex};
pub use remote::{RemoteEmbedder, RemoteEmbedderConfig};
