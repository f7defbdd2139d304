//! FTS5 keyword index, maintained inside the store's write transactions.

use engram_protocols::{MemoryError, MemoryRecord};
use rusqlite::{params, Connection, Transaction};

/// Replace the FTS row for a record. Called inside the same transaction as
/// the primary-table write.
pub(crate) fn index_record(tx: &Transaction<'_>, record: &MemoryRecord) -> rusqlite::Result<()> {
    tx.execute(
        "DELETE FROM memories_fts WHERE id = ?1",
        params![record.id],
    )?;
    tx.execute(
        "INSERT INTO memories_fts (id, content, keywords) VALUES (?1, ?2, ?3)",
        params![record.id, record.content, record.keywords.join(" ")],
    )?;
    Ok(())
}

/// Remove a record's FTS row.
pub(crate) fn remove_record(tx: &Transaction<'_>, id: &str) -> rusqlite::Result<()> {
    tx.execute("DELETE FROM memories_fts WHERE id = ?1", params![id])?;
    Ok(())
}

/// Top-k keyword matches by bm25 rank. Archived records are filtered out
/// unless opted in; equal ranks are broken by most recent `created_at`.
pub(crate) fn search(
    conn: &Connection,
    query: &str,
    k: usize,
    include_archived: bool,
) -> Result<Vec<(String, f32)>, MemoryError> {
    let match_expr = build_match_query(query);
    if match_expr.is_empty() {
        return Ok(vec![]);
    }

    let mut stmt = conn
        .prepare(
            r#"
            SELECT f.id, bm25(memories_fts) AS rank
            FROM memories_fts f
            JOIN memories m ON m.id = f.id
            WHERE memories_fts MATCH ?1
              AND (?2 OR m.is_archived = 0)
            ORDER BY rank ASC, m.created_at DESC
            LIMIT ?3
            "#,
        )
        .map_err(|e| MemoryError::Storage(e.to_string()))?;

    let results = stmt
        .query_map(
            params![match_expr, include_archived, k as i64],
            |row| Ok((row.get::<_, String>(0)?, row.get::<_, f64>(1)? as f32)),
        )
        .map_err(|e| MemoryError::Storage(e.to_string()))?
        .filter_map(|r| r.ok())
        .collect();

    Ok(results)
}

/// Build an FTS5 MATCH expression from free text: each word quoted (which
/// neutralizes FTS5 operator characters) and OR-joined for broad recall.
/// Words with no alphanumeric content would tokenize to empty phrases and
/// are dropped.
fn build_match_query(query: &str) -> String {
    query
        .split_whitespace()
        .filter(|word| word.chars().any(|c| c.is_alphanumeric()))
        .map(|word| format!("\"{}\"", word.replace('"', "")))
        .collect::<Vec<_>>()
        .join(" OR ")
}

#[cfg(test)]
#[path = "keyword_tests.rs"]
mod tests;
