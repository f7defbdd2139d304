//! The durable memory record store.

use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};
use tokio_rusqlite::Connection;
use tracing::{debug, info, warn};

use engram_protocols::{ContentType, Entity, MemoryError, MemoryRecord};
use engram_vector::VectorIndex;

use crate::keyword;
use crate::schema::init_schema;

/// SQLite-backed record store with synchronized keyword and vector indexes.
///
/// All SQL runs through one connection actor, which also serializes
/// concurrent writes to the same record id: the final state is always
/// exactly one caller's full payload, never a field-level merge.
pub struct MemoryStore {
    conn: Connection,
    vectors: Arc<VectorIndex>,
}

impl MemoryStore {
    /// Open a file-backed store and rebuild the vector index from the
    /// persisted embeddings.
    pub async fn open(
        path: impl AsRef<Path>,
        vectors: Arc<VectorIndex>,
    ) -> Result<Self, MemoryError> {
        let path = path.as_ref().to_path_buf();
        let conn = Connection::open(path)
            .await
            .map_err(|e| MemoryError::Storage(e.to_string()))?;
        Self::init(conn, vectors).await
    }

    /// Open an in-memory store (tests, throwaway sessions).
    pub async fn in_memory(vectors: Arc<VectorIndex>) -> Result<Self, MemoryError> {
        let conn = Connection::open_in_memory()
            .await
            .map_err(|e| MemoryError::Storage(e.to_string()))?;
        Self::init(conn, vectors).await
    }

    async fn init(conn: Connection, vectors: Arc<VectorIndex>) -> Result<Self, MemoryError> {
        conn.call(|conn| Ok(init_schema(conn)?))
            .await
            .map_err(storage_err)?;

        let store = Self { conn, vectors };
        store.restore_vectors().await?;
        Ok(store)
    }

    /// The vector index this store keeps in sync.
    pub fn vector_index(&self) -> Arc<VectorIndex> {
        Arc::clone(&self.vectors)
    }

    /// Persist a new record. The primary row, the FTS row, and the
    /// embedding row commit in one transaction; the vector index is updated
    /// before the call returns, so a subsequent search observes the record.
    pub async fn store(&self, record: MemoryRecord) -> Result<String, MemoryError> {
        record.validate()?;

        if let (Some(vector), Some(expected)) = (&record.embedding, self.vectors.dimension()) {
            if vector.len() != expected {
                return Err(MemoryError::Validation(format!(
                    "embedding dimension {} does not match index dimension {}",
                    vector.len(),
                    expected
                )));
            }
        }

        let id = record.id.clone();
        let embedding = record.embedding.clone();

        self.conn
            .call(move |conn| Ok(insert_record(conn, &record)))
            .await
            .map_err(storage_err)??;

        if let Some(vector) = embedding {
            if let Err(e) = self.vectors.insert(id.clone(), vector) {
                // The primary write must not survive a failed index step.
                let rollback_id = id.clone();
                let _ = self
                    .conn
                    .call(move |conn| Ok(delete_record(conn, &rollback_id)))
                    .await;
                return Err(MemoryError::IndexSync(e.to_string()));
            }
        }

        debug!(id = %id, "stored memory record");
        Ok(id)
    }

    /// Fetch a record by id. Archived records remain retrievable here.
    pub async fn get(&self, id: &str) -> Result<Option<MemoryRecord>, MemoryError> {
        let id = id.to_string();
        self.conn
            .call(move |conn| Ok(fetch_record(conn, &id)))
            .await
            .map_err(storage_err)?
    }

    /// Fetch several records, preserving the order of `ids`. Missing ids
    /// are silently skipped.
    pub async fn get_many(&self, ids: Vec<String>) -> Result<Vec<MemoryRecord>, MemoryError> {
        self.conn
            .call(move |conn| {
                let mut records = Vec::with_capacity(ids.len());
                for id in &ids {
                    match fetch_record(conn, id) {
                        Ok(Some(record)) => records.push(record),
                        Ok(None) => {}
                        Err(e) => return Ok(Err(e)),
                    }
                }
                Ok(Ok(records))
            })
            .await
            .map_err(storage_err)?
    }

    /// Replace all mutable fields of an existing record and refresh
    /// `updated_at`. Returns false if the id does not exist. Content is
    /// immutable; an embedding, while present, keeps its model and
    /// dimension. The payload is the complete desired state: a payload
    /// without an embedding removes the stored embedding and its vector
    /// index entry.
    pub async fn update(&self, record: MemoryRecord) -> Result<bool, MemoryError> {
        record.validate()?;

        let id = record.id.clone();
        let vectors = Arc::clone(&self.vectors);
        let applied = self
            .conn
            .call(move |conn| Ok(update_record(conn, &record, &vectors)))
            .await
            .map_err(storage_err)??;

        if applied {
            debug!(id = %id, "updated memory record");
        }
        Ok(applied)
    }

    /// Remove a record and its index entries. Both the FTS row and the
    /// embedding row go in the same transaction as the primary delete; the
    /// vector entry is removed before this returns.
    pub async fn delete(&self, id: &str) -> Result<bool, MemoryError> {
        let id_owned = id.to_string();
        let deleted = self
            .conn
            .call(move |conn| Ok(delete_record(conn, &id_owned)))
            .await
            .map_err(storage_err)??;

        if deleted {
            self.vectors.remove(id);
            debug!(id = %id, "deleted memory record");
        }
        Ok(deleted)
    }

    /// Mark a record archived without touching its index entries. Archived
    /// records are excluded from default search but stay retrievable.
    pub async fn archive(&self, id: &str) -> Result<bool, MemoryError> {
        let id = id.to_string();
        let now = Utc::now().to_rfc3339();
        let archived = self
            .conn
            .call(move |conn| {
                let n = conn.execute(
                    "UPDATE memories SET is_archived = 1, updated_at = ?2 WHERE id = ?1",
                    params![id, now],
                )?;
                Ok(n > 0)
            })
            .await
            .map_err(storage_err)?;
        Ok(archived)
    }

    /// Bump usage statistics for records returned from a search.
    pub async fn touch_accessed(&self, ids: Vec<String>) -> Result<(), MemoryError> {
        if ids.is_empty() {
            return Ok(());
        }
        let now = Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| {
                let tx = conn.transaction()?;
                for id in &ids {
                    tx.execute(
                        "UPDATE memories
                         SET access_count = access_count + 1, last_accessed_at = ?2
                         WHERE id = ?1",
                        params![id, now],
                    )?;
                }
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(storage_err)
    }

    /// Top-k keyword matches for a free-text query.
    pub async fn keyword_search(
        &self,
        query: &str,
        k: usize,
        include_archived: bool,
    ) -> Result<Vec<(String, f32)>, MemoryError> {
        let query = query.to_string();
        self.conn
            .call(move |conn| Ok(keyword::search(conn, &query, k, include_archived)))
            .await
            .map_err(storage_err)?
    }

    /// Rebuild the in-memory vector index from the embeddings table.
    async fn restore_vectors(&self) -> Result<(), MemoryError> {
        let rows: Vec<(String, String)> = self
            .conn
            .call(|conn| {
                let mut stmt = conn.prepare("SELECT memory_id, vector FROM memory_embeddings")?;
                let rows = stmt
                    .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
                    .filter_map(|r| r.ok())
                    .collect();
                Ok(rows)
            })
            .await
            .map_err(storage_err)?;

        if rows.is_empty() {
            return Ok(());
        }

        let mut restored = 0usize;
        for (memory_id, vector_json) in rows {
            let vector: Vec<f32> = match serde_json::from_str(&vector_json) {
                Ok(v) => v,
                Err(e) => {
                    warn!(id = %memory_id, error = %e, "skipping unreadable stored embedding");
                    continue;
                }
            };
            match self.vectors.insert(memory_id.clone(), vector) {
                Ok(()) => restored += 1,
                Err(e) => {
                    // Stale vector from an earlier embedding model.
                    warn!(id = %memory_id, error = %e, "skipping stale stored embedding");
                }
            }
        }

        info!(count = restored, "restored embeddings into vector index");
        Ok(())
    }
}

fn storage_err(e: tokio_rusqlite::Error) -> MemoryError {
    MemoryError::Storage(e.to_string())
}

fn sql_err(e: rusqlite::Error) -> MemoryError {
    MemoryError::Storage(e.to_string())
}

fn json_err(e: serde_json::Error) -> MemoryError {
    MemoryError::Storage(e.to_string())
}

fn parse_ts(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

fn insert_record(
    conn: &mut rusqlite::Connection,
    record: &MemoryRecord,
) -> Result<(), MemoryError> {
    let tx = conn.transaction().map_err(sql_err)?;

    let exists: Option<i64> = tx
        .query_row(
            "SELECT 1 FROM memories WHERE id = ?1",
            params![record.id],
            |row| row.get(0),
        )
        .optional()
        .map_err(sql_err)?;
    if exists.is_some() {
        return Err(MemoryError::Duplicate(record.id.clone()));
    }

    let keywords = serde_json::to_string(&record.keywords).map_err(json_err)?;
    let entities = serde_json::to_string(&record.entities).map_err(json_err)?;

    tx.execute(
        "INSERT INTO memories (
            id, content, content_type, content_format, keywords, entities,
            sentiment, complexity_score, access_count, last_accessed_at,
            relevance_score, is_archived, created_at, updated_at,
            task_id, plan_id, phase_id
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)",
        params![
            record.id,
            record.content,
            record.content_type.as_str(),
            record.content_format,
            keywords,
            entities,
            record.sentiment,
            record.complexity_score,
            record.access_count as i64,
            record.last_accessed_at.map(|t| t.to_rfc3339()),
            record.relevance_score,
            record.is_archived,
            record.created_at.to_rfc3339(),
            record.updated_at.to_rfc3339(),
            record.task_id,
            record.plan_id,
            record.phase_id,
        ],
    )
    .map_err(sql_err)?;

    keyword::index_record(&tx, record).map_err(sql_err)?;
    write_embedding(&tx, record)?;

    tx.commit().map_err(sql_err)
}

fn update_record(
    conn: &mut rusqlite::Connection,
    record: &MemoryRecord,
    vectors: &VectorIndex,
) -> Result<bool, MemoryError> {
    let tx = conn.transaction().map_err(sql_err)?;

    let existing: Option<(String, Option<String>, Option<i64>, Option<String>)> = tx
        .query_row(
            "SELECT m.content, e.model, e.dimension, e.vector
             FROM memories m
             LEFT JOIN memory_embeddings e ON e.memory_id = m.id
             WHERE m.id = ?1",
            params![record.id],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
        )
        .optional()
        .map_err(sql_err)?;

    let Some((content, model, dimension, prior_vector_json)) = existing else {
        return Ok(false);
    };

    if content != record.content {
        return Err(MemoryError::Validation(
            "content is immutable; store a new record instead".to_string(),
        ));
    }
    if let (Some(stored), Some(new)) = (&model, &record.embedding_model) {
        if stored != new {
            return Err(MemoryError::Validation(format!(
                "embedding_model is fixed once set ({} != {})",
                stored, new
            )));
        }
    }
    if let (Some(stored), Some(new)) = (dimension, record.embedding_dimension) {
        if stored as usize != new {
            return Err(MemoryError::Validation(format!(
                "embedding dimension is fixed once set ({} != {})",
                stored, new
            )));
        }
    }

    let keywords = serde_json::to_string(&record.keywords).map_err(json_err)?;
    let entities = serde_json::to_string(&record.entities).map_err(json_err)?;
    let now = Utc::now().to_rfc3339();

    tx.execute(
        "UPDATE memories SET
            content_format = ?2, keywords = ?3, entities = ?4, sentiment = ?5,
            complexity_score = ?6, access_count = ?7, last_accessed_at = ?8,
            relevance_score = ?9, is_archived = ?10, updated_at = ?11,
            task_id = ?12, plan_id = ?13, phase_id = ?14
         WHERE id = ?1",
        params![
            record.id,
            record.content_format,
            keywords,
            entities,
            record.sentiment,
            record.complexity_score,
            record.access_count as i64,
            record.last_accessed_at.map(|t| t.to_rfc3339()),
            record.relevance_score,
            record.is_archived,
            now,
            record.task_id,
            record.plan_id,
            record.phase_id,
        ],
    )
    .map_err(sql_err)?;

    keyword::index_record(&tx, record).map_err(sql_err)?;

    match &record.embedding {
        Some(vector) => {
            write_embedding(&tx, record)?;
            // The index step precedes the commit: a rejected vector rolls
            // the whole update back instead of committing a row the index
            // will never reflect.
            vectors
                .insert(record.id.clone(), vector.clone())
                .map_err(|e| MemoryError::IndexSync(e.to_string()))?;
            if let Err(e) = tx.commit() {
                let prior: Option<Vec<f32>> = prior_vector_json
                    .as_deref()
                    .and_then(|json| serde_json::from_str(json).ok());
                match prior {
                    Some(v) => {
                        let _ = vectors.insert(record.id.clone(), v);
                    }
                    None => {
                        vectors.remove(&record.id);
                    }
                }
                return Err(sql_err(e));
            }
        }
        None => {
            tx.execute(
                "DELETE FROM memory_embeddings WHERE memory_id = ?1",
                params![record.id],
            )
            .map_err(sql_err)?;
            tx.commit().map_err(sql_err)?;
            vectors.remove(&record.id);
        }
    }

    Ok(true)
}

fn write_embedding(
    tx: &rusqlite::Transaction<'_>,
    record: &MemoryRecord,
) -> Result<(), MemoryError> {
    let Some(vector) = &record.embedding else {
        return Ok(());
    };
    let vector_json = serde_json::to_string(vector).map_err(json_err)?;
    tx.execute(
        "INSERT OR REPLACE INTO memory_embeddings (memory_id, model, dimension, vector)
         VALUES (?1, ?2, ?3, ?4)",
        params![
            record.id,
            record.embedding_model,
            record.embedding_dimension.unwrap_or(vector.len()) as i64,
            vector_json,
        ],
    )
    .map_err(sql_err)?;
    Ok(())
}

fn delete_record(conn: &mut rusqlite::Connection, id: &str) -> Result<bool, MemoryError> {
    let tx = conn.transaction().map_err(sql_err)?;
    let n = tx
        .execute("DELETE FROM memories WHERE id = ?1", params![id])
        .map_err(sql_err)?;
    keyword::remove_record(&tx, id).map_err(sql_err)?;
    tx.execute(
        "DELETE FROM memory_embeddings WHERE memory_id = ?1",
        params![id],
    )
    .map_err(sql_err)?;
    tx.commit().map_err(sql_err)?;
    Ok(n > 0)
}

fn fetch_record(
    conn: &mut rusqlite::Connection,
    id: &str,
) -> Result<Option<MemoryRecord>, MemoryError> {
    let mut stmt = conn
        .prepare(
            "SELECT m.id, m.content, m.content_type, m.content_format, m.keywords,
                    m.entities, m.sentiment, m.complexity_score, m.access_count,
                    m.last_accessed_at, m.relevance_score, m.is_archived,
                    m.created_at, m.updated_at, m.task_id, m.plan_id, m.phase_id,
                    e.model, e.dimension, e.vector
             FROM memories m
             LEFT JOIN memory_embeddings e ON e.memory_id = m.id
             WHERE m.id = ?1",
        )
        .map_err(sql_err)?;

    stmt.query_row(params![id], row_to_record)
        .optional()
        .map_err(sql_err)
}

fn row_to_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<MemoryRecord> {
    let id: String = row.get(0)?;
    let content: String = row.get(1)?;
    let content_type_str: String = row.get(2)?;
    let content_type = ContentType::parse(&content_type_str).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            2,
            rusqlite::types::Type::Text,
            format!("unknown content_type {}", content_type_str).into(),
        )
    })?;

    let keywords_json: String = row.get(4)?;
    let entities_json: String = row.get(5)?;
    let keywords: Vec<String> = serde_json::from_str(&keywords_json).unwrap_or_default();
    let entities: Vec<Entity> = serde_json::from_str(&entities_json).unwrap_or_default();

    let last_accessed: Option<String> = row.get(9)?;
    let created: String = row.get(12)?;
    let updated: String = row.get(13)?;

    let model: Option<String> = row.get(17)?;
    let dimension: Option<i64> = row.get(18)?;
    let vector_json: Option<String> = row.get(19)?;
    let embedding: Option<Vec<f32>> =
        vector_json.and_then(|json| serde_json::from_str(&json).ok());

    Ok(MemoryRecord {
        id,
        content,
        content_type,
        content_format: row.get(3)?,
        keywords,
        entities,
        embedding,
        embedding_model: model,
        embedding_dimension: dimension.map(|d| d as usize),
        sentiment: row.get(6)?,
        complexity_score: row.get(7)?,
        access_count: row.get::<_, i64>(8)? as u64,
        last_accessed_at: last_accessed.as_deref().and_then(parse_ts),
        relevance_score: row.get(10)?,
        is_archived: row.get(11)?,
        created_at: parse_ts(&created).unwrap_or_else(Utc::now),
        updated_at: parse_ts(&updated).unwrap_or_else(Utc::now),
        task_id: row.get(14)?,
        plan_id: row.get(15)?,
        phase_id: row.get(16)?,
    })
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
