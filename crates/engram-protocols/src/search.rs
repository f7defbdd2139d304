//! Search request and result types.

use serde::{Deserialize, Serialize};

use crate::record::MemoryRecord;

/// Options for a hybrid search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchOptions {
    /// Maximum number of results to return.
    pub limit: usize,

    /// Include archived records. Off by default: archived records are
    /// retained for audit but hidden from normal search.
    #[serde(default)]
    pub include_archived: bool,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            limit: 10,
            include_archived: false,
        }
    }
}

impl SearchOptions {
    pub fn with_limit(limit: usize) -> Self {
        Self {
            limit,
            ..Self::default()
        }
    }

    pub fn include_archived(mut self) -> Self {
        self.include_archived = true;
        self
    }
}

/// A record returned from search with its fusion score attached.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredRecord {
    pub record: MemoryRecord,
    pub score: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_default() {
        let opts = SearchOptions::default();
        assert_eq!(opts.limit, 10);
        assert!(!opts.include_archived);
    }

    #[test]
    fn test_options_builder() {
        let opts = SearchOptions::with_limit(5).include_archived();
        assert_eq!(opts.limit, 5);
        assert!(opts.include_archived);
    }
}
