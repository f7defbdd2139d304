//! Durable record store for the Engram memory engine.
//!
//! `MemoryStore` owns the primary SQLite record table and keeps two derived
//! indexes consistent with it: the FTS5 keyword index (same transaction as
//! every primary write) and the in-memory vector index (synchronous step in
//! the same logical operation). Immediately after a successful write, a
//! search observes the new state; a delete leaves no dangling index entry.

mod keyword;
mod schema;
mod store;

pub use store::MemoryStore;
