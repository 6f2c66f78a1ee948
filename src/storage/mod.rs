//! Storage module for persisting crawled documents
//!
//! This module handles all relational persistence for the indexer:
//! - SQLite database initialization and schema management
//! - Document upserts keyed by content hash
//! - Transactional replacement of a document's chunks

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStorage;
pub use traits::{Storage, StorageError, StorageResult};

use chrono::{DateTime, Utc};
use std::path::Path;

/// Free-form chunk metadata, stored as JSON
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// Opens (or creates) the SQLite database at `path`
pub fn open_storage(path: &Path) -> StorageResult<SqliteStorage> {
    SqliteStorage::new(path)
}

/// A crawled page as persisted
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    /// Content hash of the page text
    pub id: String,
    pub url: String,
    pub title: String,
    pub content: String,
    pub meta_description: String,
    pub content_hash: String,
    pub depth: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A slice of a document's text, the unit that gets embedded and indexed
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    /// Stable id shared by the relational store and both search indexes
    pub id: String,
    pub document_id: String,
    pub chunk_index: usize,
    pub text: String,
    pub metadata: Metadata,
}
