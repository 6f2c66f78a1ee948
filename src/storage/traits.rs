//! Storage traits and error types

use crate::storage::{Chunk, Document};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Document not found: {0}")]
    DocumentNotFound(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Relational persistence for documents and their chunks
pub trait Storage {
    /// Inserts a document or updates the existing row with the same id
    ///
    /// The original `created_at` is kept on update.
    fn save_document(&mut self, document: &Document) -> StorageResult<()>;

    /// Replaces all chunks of `document_id` in one transaction
    fn save_chunks(&mut self, document_id: &str, chunks: &[Chunk]) -> StorageResult<()>;

    /// Gets a document by id
    fn get_document(&self, id: &str) -> StorageResult<Document>;

    /// Gets a document's chunks ordered by position
    fn get_chunks(&self, document_id: &str) -> StorageResult<Vec<Chunk>>;

    fn count_documents(&self) -> StorageResult<u64>;

    fn count_chunks(&self) -> StorageResult<u64>;
}
