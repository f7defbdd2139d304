//! The persisted memory record model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::MemoryError;

/// Closed enumeration of record content kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    Code,
    Documentation,
    Context,
    Output,
    Error,
    Decision,
    Learning,
}

impl ContentType {
    /// Stable string form used for the database column.
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Code => "code",
            ContentType::Documentation => "documentation",
            ContentType::Context => "context",
            ContentType::Output => "output",
            ContentType::Error => "error",
            ContentType::Decision => "decision",
            ContentType::Learning => "learning",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "code" => Some(ContentType::Code),
            "documentation" => Some(ContentType::Documentation),
            "context" => Some(ContentType::Context),
            "output" => Some(ContentType::Output),
            "error" => Some(ContentType::Error),
            "decision" => Some(ContentType::Decision),
            "learning" => Some(ContentType::Learning),
            _ => None,
        }
    }
}

/// A named entity extracted from record content by the external text
/// processor. Stored as opaque metadata; never interpreted by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    pub text: String,
    pub label: String,
}

impl Entity {
    pub fn new(text: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            label: label.into(),
        }
    }
}

/// A memory record: the unit persisted by the store and returned by search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryRecord {
    /// Unique id, immutable once assigned.
    pub id: String,

    /// Raw text body. Immutable once written; updates replace derived
    /// fields but never the content itself.
    pub content: String,

    pub content_type: ContentType,

    /// Display hint (e.g. "markdown"). No effect on indexing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_format: Option<String>,

    /// Keywords supplied by the external text processor.
    #[serde(default)]
    pub keywords: Vec<String>,

    #[serde(default)]
    pub entities: Vec<Entity>,

    /// Embedding vector. Absent records simply do not appear in the
    /// vector index.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedding_model: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedding_dimension: Option<usize>,

    /// Advisory sentiment in [-1, 1]; not used by ranking.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sentiment: Option<f32>,

    /// Advisory complexity in [1, 10]; not used by ranking.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub complexity_score: Option<u8>,

    /// Usage statistics, updated on read.
    #[serde(default)]
    pub access_count: u64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_accessed_at: Option<DateTime<Utc>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub relevance_score: Option<f32>,

    /// Archived records are excluded from default search but retained.
    #[serde(default)]
    pub is_archived: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    /// Optional owning task/plan/phase. Opaque identifiers.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub phase_id: Option<String>,
}

impl MemoryRecord {
    /// Create a record with a fresh id and current timestamps.
    pub fn new(content: impl Into<String>, content_type: ContentType) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            content: content.into(),
            content_type,
            content_format: None,
            keywords: Vec::new(),
            entities: Vec::new(),
            embedding: None,
            embedding_model: None,
            embedding_dimension: None,
            sentiment: None,
            complexity_score: None,
            access_count: 0,
            last_accessed_at: None,
            relevance_score: None,
            is_archived: false,
            created_at: now,
            updated_at: now,
            task_id: None,
            plan_id: None,
            phase_id: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_keywords(mut self, keywords: Vec<String>) -> Self {
        self.keywords = keywords;
        self
    }

    pub fn with_entities(mut self, entities: Vec<Entity>) -> Self {
        self.entities = entities;
        self
    }

    /// Attach an embedding. The dimension is derived from the vector and
    /// fixed for the life of the record.
    pub fn with_embedding(mut self, vector: Vec<f32>, model: impl Into<String>) -> Self {
        self.embedding_dimension = Some(vector.len());
        self.embedding = Some(vector);
        self.embedding_model = Some(model.into());
        self
    }

    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.content_format = Some(format.into());
        self
    }

    pub fn with_task(mut self, task_id: impl Into<String>) -> Self {
        self.task_id = Some(task_id.into());
        self
    }

    /// Check the record invariants that must hold before it is persisted.
    pub fn validate(&self) -> Result<(), MemoryError> {
        if self.id.trim().is_empty() {
            return Err(MemoryError::Validation("id must not be empty".to_string()));
        }
        if self.content.trim().is_empty() {
            return Err(MemoryError::Validation(
                "content must not be empty".to_string(),
            ));
        }
        if let Some(embedding) = &self.embedding {
            if embedding.is_empty() {
                return Err(MemoryError::Validation(
                    "embedding must not be empty when present".to_string(),
                ));
            }
            match self.embedding_dimension {
                Some(dim) if dim == embedding.len() => {}
                Some(dim) => {
                    return Err(MemoryError::Validation(format!(
                        "embedding_dimension {} does not match vector length {}",
                        dim,
                        embedding.len()
                    )));
                }
                None => {
                    return Err(MemoryError::Validation(
                        "embedding_dimension missing for embedded record".to_string(),
                    ));
                }
            }
            if self.embedding_model.is_none() {
                return Err(MemoryError::Validation(
                    "embedding_model missing for embedded record".to_string(),
                ));
            }
        }
        if let Some(sentiment) = self.sentiment {
            if !(-1.0..=1.0).contains(&sentiment) {
                return Err(MemoryError::Validation(format!(
                    "sentiment {} outside [-1, 1]",
                    sentiment
                )));
            }
        }
        if let Some(complexity) = self.complexity_score {
            if !(1..=10).contains(&complexity) {
                return Err(MemoryError::Validation(format!(
                    "complexity_score {} outside [1, 10]",
                    complexity
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "record_tests.rs"]
mod tests;
