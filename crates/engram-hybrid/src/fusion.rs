//! Reciprocal Rank Fusion over the two index rankings.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Configuration for result fusion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FusionConfig {
    /// Weight applied to vector-index ranks.
    #[serde(default = "default_vector_weight")]
    pub vector_weight: f32,

    /// Weight applied to keyword-index ranks.
    #[serde(default = "default_keyword_weight")]
    pub keyword_weight: f32,

    /// RRF constant: larger values flatten the advantage of early ranks.
    #[serde(default = "default_rrf_k")]
    pub rrf_k: f32,
}

fn default_vector_weight() -> f32 {
    0.7
}

fn default_keyword_weight() -> f32 {
    0.3
}

fn default_rrf_k() -> f32 {
    60.0
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            vector_weight: default_vector_weight(),
            keyword_weight: default_keyword_weight(),
            rrf_k: default_rrf_k(),
        }
    }
}

/// One fused result.
#[derive(Debug, Clone, PartialEq)]
pub struct FusedHit {
    pub id: String,
    pub score: f32,
    /// Whether the id appeared in both input rankings.
    pub in_both: bool,
}

/// Merge two ranked lists with weighted Reciprocal Rank Fusion.
///
/// An id at 1-based rank `r` in a list contributes `weight / (rrf_k + r)`;
/// contributions are summed across lists. Output is ordered by summed score
/// descending; ties go to ids present in both lists, then to the more
/// recent `created_at`, then to id order. Pure function of its inputs, so
/// identical inputs always produce identical output.
pub fn rrf_fuse(
    vector_hits: &[(String, f32)],
    keyword_hits: &[(String, f32)],
    created_at: &HashMap<String, DateTime<Utc>>,
    config: &FusionConfig,
) -> Vec<FusedHit> {
    struct Acc {
        score: f32,
        lists: u8,
    }

    let mut scores: HashMap<String, Acc> = HashMap::new();

    for (rank, (id, _)) in vector_hits.iter().enumerate() {
        let contribution = config.vector_weight / (config.rrf_k + rank as f32 + 1.0);
        let acc = scores.entry(id.clone()).or_insert(Acc { score: 0.0, lists: 0 });
        acc.score += contribution;
        acc.lists |= 1;
    }

    for (rank, (id, _)) in keyword_hits.iter().enumerate() {
        let contribution = config.keyword_weight / (config.rrf_k + rank as f32 + 1.0);
        let acc = scores.entry(id.clone()).or_insert(Acc { score: 0.0, lists: 0 });
        acc.score += contribution;
        acc.lists |= 2;
    }

    let mut results: Vec<FusedHit> = scores
        .into_iter()
        .map(|(id, acc)| FusedHit {
            id,
            score: acc.score,
            in_both: acc.lists == 3,
        })
        .collect();

    results.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| b.in_both.cmp(&a.in_both))
            .then_with(|| {
                let a_created = created_at.get(&a.id).copied().unwrap_or(DateTime::<Utc>::MIN_UTC);
                let b_created = created_at.get(&b.id).copied().unwrap_or(DateTime::<Utc>::MIN_UTC);
                b_created.cmp(&a_created)
            })
            .then_with(|| a.id.cmp(&b.id))
    });

    results
}

#[cfg(test)]
#[path = "fusion_tests.rs"]
mod tests;
