//! SQLite storage implementation

use crate::storage::schema::initialize_schema;
use crate::storage::traits::{Storage, StorageError, StorageResult};
use crate::storage::{Chunk, Document, Metadata};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Opens or creates the database file and applies the schema
    pub fn new(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }
}

fn parse_timestamp(value: String) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(&value)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

fn document_from_row(row: &Row<'_>) -> rusqlite::Result<Document> {
    Ok(Document {
        id: row.get(0)?,
        url: row.get(1)?,
        title: row.get(2)?,
        content: row.get(3)?,
        meta_description: row.get(4)?,
        content_hash: row.get(5)?,
        depth: row.get(6)?,
        created_at: parse_timestamp(row.get(7)?),
        updated_at: parse_timestamp(row.get(8)?),
    })
}

impl Storage for SqliteStorage {
    fn save_document(&mut self, document: &Document) -> StorageResult<()> {
        self.conn.execute(
            "INSERT INTO documents
                (id, url, title, content, meta_description, content_hash, depth, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
             ON CONFLICT(id) DO UPDATE SET
                url = excluded.url,
                title = excluded.title,
                content = excluded.content,
                meta_description = excluded.meta_description,
                content_hash = excluded.content_hash,
                depth = excluded.depth,
                updated_at = excluded.updated_at",
            params![
                document.id,
                document.url,
                document.title,
                document.content,
                document.meta_description,
                document.content_hash,
                document.depth,
                document.created_at.to_rfc3339(),
                document.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    fn save_chunks(&mut self, document_id: &str, chunks: &[Chunk]) -> StorageResult<()> {
        let tx = self.conn.transaction()?;

        tx.execute(
            "DELETE FROM chunks WHERE document_id = ?1",
            params![document_id],
        )?;

        {
            let mut stmt = tx.prepare(
                "INSERT OR REPLACE INTO chunks (id, document_id, chunk_index, text, metadata)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;

            for chunk in chunks {
                let metadata = serde_json::to_string(&chunk.metadata)?;
                stmt.execute(params![
                    chunk.id,
                    document_id,
                    chunk.chunk_index as i64,
                    chunk.text,
                    metadata,
                ])?;
            }
        }

        tx.commit()?;
        Ok(())
    }

    fn get_document(&self, id: &str) -> StorageResult<Document> {
        self.conn
            .query_row(
                "SELECT id, url, title, content, meta_description, content_hash, depth,
                        created_at, updated_at
                 FROM documents WHERE id = ?1",
                params![id],
                document_from_row,
            )
            .optional()?
            .ok_or_else(|| StorageError::DocumentNotFound(id.to_string()))
    }

    fn get_chunks(&self, document_id: &str) -> StorageResult<Vec<Chunk>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, document_id, chunk_index, text, metadata
             FROM chunks WHERE document_id = ?1 ORDER BY chunk_index",
        )?;

        let rows = stmt.query_map(params![document_id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, i64>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
            ))
        })?;

        let mut chunks = Vec::new();
        for row in rows {
            let (id, document_id, chunk_index, text, metadata) = row?;
            let metadata: Metadata = serde_json::from_str(&metadata)?;
            chunks.push(Chunk {
                id,
                document_id,
                chunk_index: chunk_index.max(0) as usize,
                text,
                metadata,
            });
        }

        Ok(chunks)
    }

    fn count_documents(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM documents", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn count_chunks(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM chunks", [], |row| row.get(0))?;
        Ok(count as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn document(id: &str, title: &str) -> Document {
        let now = Utc::now();
        Document {
            id: id.to_string(),
            url: format!("https://example.com/{}", id),
            title: title.to_string(),
            content: "Some content".to_string(),
            meta_description: String::new(),
            content_hash: id.to_string(),
            depth: 1,
            created_at: now,
            updated_at: now,
        }
    }

    fn chunk(id: &str, document_id: &str, index: usize) -> Chunk {
        let mut metadata = Metadata::new();
        metadata.insert("title".to_string(), json!("Title"));
        Chunk {
            id: id.to_string(),
            document_id: document_id.to_string(),
            chunk_index: index,
            text: format!("chunk {}", index),
            metadata,
        }
    }

    #[test]
    fn test_create_in_memory() {
        let storage = SqliteStorage::new_in_memory();
        assert!(storage.is_ok());
    }

    #[test]
    fn test_create_on_disk() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("test.db");
        let mut storage = SqliteStorage::new(&path).unwrap();
        storage.save_document(&document("doc1", "One")).unwrap();
        drop(storage);

        let storage = SqliteStorage::new(&path).unwrap();
        assert_eq!(storage.count_documents().unwrap(), 1);
    }

    #[test]
    fn test_save_and_get_document() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let doc = document("abc", "Hello");
        storage.save_document(&doc).unwrap();

        let loaded = storage.get_document("abc").unwrap();
        assert_eq!(loaded.title, "Hello");
        assert_eq!(loaded.url, doc.url);
        assert_eq!(loaded.depth, 1);
    }

    #[test]
    fn test_save_document_upserts() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let original = document("abc", "First");
        storage.save_document(&original).unwrap();

        let mut updated = document("abc", "Second");
        updated.created_at = original.created_at + chrono::Duration::days(1);
        storage.save_document(&updated).unwrap();

        let loaded = storage.get_document("abc").unwrap();
        assert_eq!(loaded.title, "Second");
        assert_eq!(loaded.created_at.timestamp(), original.created_at.timestamp());
        assert_eq!(storage.count_documents().unwrap(), 1);
    }

    #[test]
    fn test_missing_document() {
        let storage = SqliteStorage::new_in_memory().unwrap();
        assert!(matches!(
            storage.get_document("nope"),
            Err(StorageError::DocumentNotFound(_))
        ));
    }

    #[test]
    fn test_save_chunks_replaces_previous() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        storage.save_document(&document("doc", "Doc")).unwrap();

        storage
            .save_chunks("doc", &[chunk("a", "doc", 0), chunk("b", "doc", 1), chunk("c", "doc", 2)])
            .unwrap();
        assert_eq!(storage.count_chunks().unwrap(), 3);

        storage.save_chunks("doc", &[chunk("d", "doc", 0)]).unwrap();
        let chunks = storage.get_chunks("doc").unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].id, "d");
        assert_eq!(chunks[0].metadata.get("title"), Some(&json!("Title")));
    }

    #[test]
    fn test_chunks_ordered_by_index() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        storage.save_document(&document("doc", "Doc")).unwrap();
        storage
            .save_chunks("doc", &[chunk("z", "doc", 1), chunk("y", "doc", 0)])
            .unwrap();

        let ids: Vec<String> = storage
            .get_chunks("doc")
            .unwrap()
            .into_iter()
            .map(|c| c.id)
            .collect();
        assert_eq!(ids, vec!["y".to_string(), "z".to_string()]);
    }

    #[test]
    fn test_chunks_require_document() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let result = storage.save_chunks("missing", &[chunk("a", "missing", 0)]);
        assert!(result.is_err());
        assert_eq!(storage.count_chunks().unwrap(), 0);
    }
}
