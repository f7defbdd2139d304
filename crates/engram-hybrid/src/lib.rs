//! Hybrid search engine for the Engram memory store.
//!
//! Combines vector similarity and keyword (FTS5) search over one durable
//! record store using Reciprocal Rank Fusion, with an embedding cache and
//! per-resource rate limiting in front of the external embedding generator.
//!
//! ## How a search works
//!
//! 1. The query embedding comes from the cache, or from the generator
//!    behind the embedding rate limiter on a miss.
//! 2. The vector index and the keyword index each return their top-k.
//! 3. The two rankings are fused with weighted RRF.
//! 4. Fused ids are hydrated into full records, usage statistics are
//!    bumped, and records return in fused order with their scores.
//!
//! If the embedding generator is down, search silently degrades to
//! keyword-only ranking instead of failing the query.

mod engine;
mod fusion;
mod limiter;

pub use engine::{EngineConfig, HybridSearchEngine};
pub use fusion::{rrf_fuse, FusedHit, FusionConfig};
pub use limiter::{RateLimiter, RateLimiterConfig, RateLimiterStats};
