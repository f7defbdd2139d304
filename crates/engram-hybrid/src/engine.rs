//! The hybrid search engine composition root.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use engram_protocols::{MemoryError, MemoryRecord, ScoredRecord, SearchOptions};
use engram_store::MemoryStore;
use engram_vector::{CacheStats, EmbeddingCache, EmbeddingProvider, VectorIndex};

use crate::fusion::{rrf_fuse, FusionConfig};
use crate::limiter::{RateLimiter, RateLimiterConfig, RateLimiterStats};

/// Engine configuration. All fields have workable defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Embedding cache capacity (entries).
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,

    /// Disable to make every cache lookup miss; no other behavior changes.
    #[serde(default = "default_cache_enabled")]
    pub cache_enabled: bool,

    /// Bound on store reads/writes, guarding against lock contention under
    /// bursty activity.
    #[serde(default = "default_store_limit")]
    pub store_limit: RateLimiterConfig,

    /// Bound on calls to the external embedding generator, guarding
    /// against upstream throttling.
    #[serde(default = "default_embedding_limit")]
    pub embedding_limit: RateLimiterConfig,

    #[serde(default)]
    pub fusion: FusionConfig,
}

fn default_cache_capacity() -> usize {
    256
}

fn default_cache_enabled() -> bool {
    true
}

fn default_store_limit() -> RateLimiterConfig {
    RateLimiterConfig::per_second(10)
}

fn default_embedding_limit() -> RateLimiterConfig {
    RateLimiterConfig::per_second(5)
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cache_capacity: default_cache_capacity(),
            cache_enabled: default_cache_enabled(),
            store_limit: default_store_limit(),
            embedding_limit: default_embedding_limit(),
            fusion: FusionConfig::default(),
        }
    }
}

/// Orchestrates the record store, both indexes, the embedding cache, and
/// the per-resource rate limiters behind one CRUD-plus-search surface.
///
/// Owns the process-wide limiter and cache instances; collaborators
/// receive references from here rather than reaching for globals.
pub struct HybridSearchEngine {
    store: Arc<MemoryStore>,
    vectors: Arc<VectorIndex>,
    embedder: Arc<dyn EmbeddingProvider>,
    cache: Arc<EmbeddingCache>,
    store_limiter: Arc<RateLimiter>,
    embedding_limiter: Arc<RateLimiter>,
    fusion: FusionConfig,
}

impl HybridSearchEngine {
    /// Open a file-backed engine.
    pub async fn open(
        path: impl AsRef<Path>,
        embedder: Arc<dyn EmbeddingProvider>,
        config: EngineConfig,
    ) -> Result<Self, MemoryError> {
        let vectors = Arc::new(VectorIndex::new());
        let store = Arc::new(MemoryStore::open(path, Arc::clone(&vectors)).await?);
        Ok(Self::assemble(store, vectors, embedder, config))
    }

    /// Open an in-memory engine (tests, throwaway sessions).
    pub async fn in_memory(
        embedder: Arc<dyn EmbeddingProvider>,
        config: EngineConfig,
    ) -> Result<Self, MemoryError> {
        let vectors = Arc::new(VectorIndex::new());
        let store = Arc::new(MemoryStore::in_memory(Arc::clone(&vectors)).await?);
        Ok(Self::assemble(store, vectors, embedder, config))
    }

    fn assemble(
        store: Arc<MemoryStore>,
        vectors: Arc<VectorIndex>,
        embedder: Arc<dyn EmbeddingProvider>,
        config: EngineConfig,
    ) -> Self {
        Self {
            store,
            vectors,
            embedder,
            cache: Arc::new(EmbeddingCache::new(config.cache_capacity, config.cache_enabled)),
            store_limiter: Arc::new(RateLimiter::new("store", config.store_limit)),
            embedding_limiter: Arc::new(RateLimiter::new("embedding", config.embedding_limit)),
            fusion: config.fusion,
        }
    }

    /// Persist a record, generating its content embedding first when the
    /// caller did not supply one. An unreachable embedding generator is
    /// not an error: the record is stored without a vector and simply
    /// stays absent from the vector index.
    pub async fn remember(&self, mut record: MemoryRecord) -> Result<String, MemoryError> {
        self.store_limiter.acquire().await;

        if record.embedding.is_none() {
            match self.embed_text(&record.content).await {
                Ok(vector) => {
                    record = record.with_embedding(vector, self.embedder.model_id());
                }
                Err(e) => {
                    warn!(error = %e, "embedding unavailable; storing record without vector");
                }
            }
        }

        self.store.store(record).await
    }

    /// Fetch a record by id; a missing id is `NotFound`.
    pub async fn get(&self, id: &str) -> Result<MemoryRecord, MemoryError> {
        self.store_limiter.acquire().await;
        self.store
            .get(id)
            .await?
            .ok_or_else(|| MemoryError::NotFound(id.to_string()))
    }

    pub async fn update(&self, record: MemoryRecord) -> Result<bool, MemoryError> {
        self.store_limiter.acquire().await;
        self.store.update(record).await
    }

    pub async fn delete(&self, id: &str) -> Result<bool, MemoryError> {
        self.store_limiter.acquire().await;
        self.store.delete(id).await
    }

    pub async fn archive(&self, id: &str) -> Result<bool, MemoryError> {
        self.store_limiter.acquire().await;
        self.store.archive(id).await
    }

    /// Hybrid search with default options.
    pub async fn search(&self, query: &str, limit: usize) -> Result<Vec<ScoredRecord>, MemoryError> {
        self.search_opts(query, SearchOptions::with_limit(limit)).await
    }

    /// Hybrid search: fuse vector and keyword rankings, hydrate records,
    /// and bump their usage statistics. Returns an empty list (not an
    /// error) when neither index matches anything.
    pub async fn search_opts(
        &self,
        query: &str,
        opts: SearchOptions,
    ) -> Result<Vec<ScoredRecord>, MemoryError> {
        self.store_limiter.acquire().await;

        let k = opts.limit;
        if k == 0 {
            return Ok(vec![]);
        }

        let query_vector = match self.embed_text(query).await {
            Ok(vector) => Some(vector),
            Err(e) => {
                // Degrade rather than fail: keyword-only ranking.
                warn!(error = %e, "embedding generator unavailable; falling back to keyword-only search");
                None
            }
        };

        let vector_hits = query_vector
            .map(|vector| self.vectors.nearest(&vector, k))
            .unwrap_or_default();
        let keyword_hits = self
            .store
            .keyword_search(query, k, opts.include_archived)
            .await?;

        if vector_hits.is_empty() && keyword_hits.is_empty() {
            return Ok(vec![]);
        }

        // Hydrate the candidate union once; the fused order decides which
        // records make the final cut.
        let mut candidate_ids: Vec<String> = Vec::new();
        for (id, _) in vector_hits.iter().chain(keyword_hits.iter()) {
            if !candidate_ids.contains(id) {
                candidate_ids.push(id.clone());
            }
        }
        let records = self.store.get_many(candidate_ids).await?;

        let created_at: HashMap<String, DateTime<Utc>> = records
            .iter()
            .map(|r| (r.id.clone(), r.created_at))
            .collect();
        let mut by_id: HashMap<String, MemoryRecord> =
            records.into_iter().map(|r| (r.id.clone(), r)).collect();

        let fused = rrf_fuse(&vector_hits, &keyword_hits, &created_at, &self.fusion);

        let mut results: Vec<ScoredRecord> = Vec::with_capacity(k);
        for hit in fused {
            let Some(record) = by_id.remove(&hit.id) else {
                continue;
            };
            if record.is_archived && !opts.include_archived {
                continue;
            }
            results.push(ScoredRecord {
                record,
                score: hit.score,
            });
            if results.len() == k {
                break;
            }
        }

        let returned: Vec<String> = results.iter().map(|r| r.record.id.clone()).collect();
        self.store.touch_accessed(returned).await?;

        debug!(query = %query, results = results.len(), "hybrid search completed");
        Ok(results)
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn store_limiter_stats(&self) -> RateLimiterStats {
        self.store_limiter.stats()
    }

    pub fn embedding_limiter_stats(&self) -> RateLimiterStats {
        self.embedding_limiter.stats()
    }

    /// The underlying store, for callers needing direct access.
    pub fn store(&self) -> Arc<MemoryStore> {
        Arc::clone(&self.store)
    }

    /// Cache-then-generate path shared by the write and query sides.
    async fn embed_text(&self, text: &str) -> Result<Vec<f32>, MemoryError> {
        if let Some(vector) = self.cache.get(text) {
            return Ok(vector);
        }

        self.embedding_limiter.acquire().await;
        let embedding = self
            .embedder
            .embed(text)
            .await
            .map_err(|e| MemoryError::UpstreamUnavailable(e.to_string()))?;

        self.cache.put(text, embedding.vector.clone());
        Ok(embedding.vector)
    }
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;
