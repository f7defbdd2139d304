//! Database schema management.

use rusqlite::Connection;

/// Initialize the database schema.
///
/// The FTS table and the embeddings table carry no triggers: both are
/// maintained by explicit statements inside each write transaction, so the
/// index-consistency invariant stays auditable in the write path itself.
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA)
}

const SCHEMA: &str = r#"
-- Primary record table. The single source of truth; both indexes are
-- derived from it.
CREATE TABLE IF NOT EXISTS memories (
    id TEXT PRIMARY KEY,
    content TEXT NOT NULL,
    content_type TEXT NOT NULL,
    content_format TEXT,
    keywords TEXT NOT NULL DEFAULT '[]',
    entities TEXT NOT NULL DEFAULT '[]',
    sentiment REAL,
    complexity_score INTEGER,
    access_count INTEGER NOT NULL DEFAULT 0,
    last_accessed_at TEXT,
    relevance_score REAL,
    is_archived INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    task_id TEXT,
    plan_id TEXT,
    phase_id TEXT
);

CREATE INDEX IF NOT EXISTS idx_memories_type ON memories(content_type);
CREATE INDEX IF NOT EXISTS idx_memories_created ON memories(created_at);
CREATE INDEX IF NOT EXISTS idx_memories_archived ON memories(is_archived);
CREATE INDEX IF NOT EXISTS idx_memories_task ON memories(task_id);

-- Keyword index over content and extracted keywords.
CREATE VIRTUAL TABLE IF NOT EXISTS memories_fts USING fts5(
    id,
    content,
    keywords,
    tokenize='porter unicode61'
);

-- Persisted embedding vectors; the in-memory vector index is rebuilt from
-- this table on open. Model and dimension are recorded to detect vectors
-- left stale by an embedding-model change.
CREATE TABLE IF NOT EXISTS memory_embeddings (
    memory_id TEXT PRIMARY KEY,
    model TEXT NOT NULL,
    dimension INTEGER NOT NULL,
    vector TEXT NOT NULL
);
"#;
