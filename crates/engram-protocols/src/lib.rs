//! Shared types for the Engram memory engine.
//!
//! This crate defines the persisted record model, search result types, and
//! the error taxonomy used by every other Engram crate. It performs no I/O.

mod error;
mod record;
mod search;

pub use error::MemoryError;
pub use record::{ContentType, Entity, MemoryRecord};
pub use search::{ScoredRecord, SearchOptions};
