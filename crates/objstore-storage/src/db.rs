//! Database operations

use async_trait::async_trait;
use objstore_core::record::to_unix_millis;
use objstore_core::{ObjectId, ObjectRecord};
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous,
};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

use crate::models::{SELECT_COLUMNS, record_from_row};
use crate::{Result, StorageError};

/// Durable index from object id (primary) and object path (unique) to record.
#[async_trait]
pub trait IndexBackend: Send + Sync {
    /// Insert a record. Fails with `RecordExists` on an id or path collision.
    async fn create(&self, record: &ObjectRecord) -> Result<()>;

    async fn get_by_id(&self, id: &ObjectId) -> Result<ObjectRecord>;

    async fn get_by_path(&self, path: &str) -> Result<ObjectRecord>;

    /// Rewrite the mutable columns of the row with `record.object_id`.
    /// Fails with `RecordNotFound` when no row matched.
    async fn update(&self, record: &ObjectRecord) -> Result<()>;

    /// Fails with `RecordNotFound` when no row matched.
    async fn delete(&self, id: &ObjectId) -> Result<()>;

    /// All records, ordered by path.
    async fn list(&self) -> Result<Vec<ObjectRecord>>;

    /// Release the underlying database handle.
    async fn close(&self);
}

/// SQLite-backed object index
#[derive(Clone)]
pub struct MetadataIndex {
    pool: SqlitePool,
}

impl MetadataIndex {
    /// Open (creating if needed) the database at `db_path` and run migrations.
    pub async fn connect(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await?;

        let index = Self { pool };
        index.migrate().await?;

        info!(path = %db_path.display(), "metadata index opened");
        Ok(index)
    }

    async fn migrate(&self) -> Result<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS metadata (
                object_id    TEXT PRIMARY KEY,
                object_path  TEXT NOT NULL UNIQUE,
                local_path   TEXT NOT NULL,
                size_bytes   INTEGER NOT NULL DEFAULT 0,
                content_hash TEXT NOT NULL DEFAULT '',
                created_at   INTEGER NOT NULL,
                updated_at   INTEGER NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl IndexBackend for MetadataIndex {
    async fn create(&self, record: &ObjectRecord) -> Result<()> {
        sqlx::query(
            "INSERT INTO metadata
                (object_id, object_path, local_path, size_bytes, content_hash, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(record.object_id.as_str())
        .bind(&record.object_path)
        .bind(&record.local_path)
        .bind(record.size_bytes as i64)
        .bind(&record.content_hash)
        .bind(to_unix_millis(record.created_at))
        .bind(to_unix_millis(record.updated_at))
        .execute(&self.pool)
        .await
        .map_err(|e| insert_error(e, record))?;

        debug!(object_id = %record.object_id, path = %record.object_path, "index record created");
        Ok(())
    }

    async fn get_by_id(&self, id: &ObjectId) -> Result<ObjectRecord> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM metadata WHERE object_id = ?",
            SELECT_COLUMNS
        ))
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => record_from_row(&row),
            None => Err(StorageError::RecordNotFound(format!("object_id {}", id))),
        }
    }

    async fn get_by_path(&self, path: &str) -> Result<ObjectRecord> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM metadata WHERE object_path = ?",
            SELECT_COLUMNS
        ))
        .bind(path)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => record_from_row(&row),
            None => Err(StorageError::RecordNotFound(format!("object_path '{}'", path))),
        }
    }

    async fn update(&self, record: &ObjectRecord) -> Result<()> {
        let result = sqlx::query(
            "UPDATE metadata
             SET object_path = ?, local_path = ?, size_bytes = ?, content_hash = ?, updated_at = ?
             WHERE object_id = ?",
        )
        .bind(&record.object_path)
        .bind(&record.local_path)
        .bind(record.size_bytes as i64)
        .bind(&record.content_hash)
        .bind(to_unix_millis(record.updated_at))
        .bind(record.object_id.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| insert_error(e, record))?;

        if result.rows_affected() == 0 {
            return Err(StorageError::RecordNotFound(format!(
                "object_id {}",
                record.object_id
            )));
        }

        debug!(object_id = %record.object_id, "index record updated");
        Ok(())
    }

    async fn delete(&self, id: &ObjectId) -> Result<()> {
        let result = sqlx::query("DELETE FROM metadata WHERE object_id = ?")
            .bind(id.as_str())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::RecordNotFound(format!("object_id {}", id)));
        }

        debug!(object_id = %id, "index record deleted");
        Ok(())
    }

    async fn list(&self) -> Result<Vec<ObjectRecord>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM metadata ORDER BY object_path",
            SELECT_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(record_from_row).collect()
    }

    async fn close(&self) {
        self.pool.close().await;
        info!("metadata index closed");
    }
}

/// Map a constraint violation to `RecordExists`, naming the colliding column.
fn insert_error(err: sqlx::Error, record: &ObjectRecord) -> StorageError {
    if let sqlx::Error::Database(db_err) = &err {
        let message = db_err.message();
        if db_err.is_unique_violation() || message.contains("UNIQUE constraint failed") {
            let which = if message.contains("object_path") {
                format!("object_path '{}'", record.object_path)
            } else {
                format!("object_id {}", record.object_id)
            };
            return StorageError::RecordExists(which);
        }
    }
    StorageError::Database(err)
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn create_test_index() -> (tempfile::TempDir, MetadataIndex) {
        let dir = tempfile::tempdir().unwrap();
        let index = MetadataIndex::connect(&dir.path().join("metadata.db"))
            .await
            .unwrap();
        (dir, index)
    }

    fn record(path: &str, data: &[u8]) -> ObjectRecord {
        let id = ObjectId::from_content(data);
        ObjectRecord::new(id.clone(), path, format!("/objects/{}", id), data)
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let (_dir, index) = create_test_index().await;
        let record = record("test/object.txt", b"Hello, world!");

        index.create(&record).await.unwrap();

        let by_id = index.get_by_id(&record.object_id).await.unwrap();
        assert_eq!(by_id, record);

        let by_path = index.get_by_path("test/object.txt").await.unwrap();
        assert_eq!(by_path, record);
    }

    #[tokio::test]
    async fn test_missing_lookups() {
        let (_dir, index) = create_test_index().await;

        let err = index
            .get_by_id(&ObjectId::from_content(b"nothing"))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::RecordNotFound(_)));

        let err = index.get_by_path("non-existent.txt").await.unwrap_err();
        assert!(matches!(err, StorageError::RecordNotFound(_)));
    }

    #[tokio::test]
    async fn test_duplicate_id_rejected() {
        let (_dir, index) = create_test_index().await;
        let first = record("a.txt", b"same");
        index.create(&first).await.unwrap();

        let second = record("b.txt", b"same");
        let err = index.create(&second).await.unwrap_err();

        match err {
            StorageError::RecordExists(which) => assert!(which.starts_with("object_id")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_duplicate_path_rejected() {
        let (_dir, index) = create_test_index().await;
        index.create(&record("a.txt", b"one")).await.unwrap();

        let err = index.create(&record("a.txt", b"two")).await.unwrap_err();
        match err {
            StorageError::RecordExists(which) => assert!(which.starts_with("object_path")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_update_rewrites_mutable_columns() {
        let (_dir, index) = create_test_index().await;
        let mut record = record("test1", b"original");
        index.create(&record).await.unwrap();

        record.local_path = "updated/path/to/test1".to_string();
        record.touch(b"changed");
        index.update(&record).await.unwrap();

        let stored = index.get_by_id(&record.object_id).await.unwrap();
        assert_eq!(stored.local_path, "updated/path/to/test1");
        assert_eq!(stored.size_bytes, 7);
        assert_eq!(stored.content_hash, record.content_hash);
        assert_eq!(stored.created_at, record.created_at);
        assert_eq!(stored.updated_at, record.updated_at);
    }

    #[tokio::test]
    async fn test_update_and_delete_missing_row() {
        let (_dir, index) = create_test_index().await;
        let ghost = record("ghost", b"ghost");

        let err = index.update(&ghost).await.unwrap_err();
        assert!(matches!(err, StorageError::RecordNotFound(_)));

        let err = index.delete(&ghost.object_id).await.unwrap_err();
        assert!(matches!(err, StorageError::RecordNotFound(_)));
    }

    #[tokio::test]
    async fn test_delete_then_get() {
        let (_dir, index) = create_test_index().await;
        let record = record("test1", b"bytes");
        index.create(&record).await.unwrap();

        index.delete(&record.object_id).await.unwrap();

        assert!(index.get_by_id(&record.object_id).await.is_err());
        assert!(index.get_by_path("test1").await.is_err());
    }

    #[tokio::test]
    async fn test_list_ordered_by_path() {
        let (_dir, index) = create_test_index().await;
        index.create(&record("b/second", b"2")).await.unwrap();
        index.create(&record("a/first", b"1")).await.unwrap();
        index.create(&record("c/third", b"3")).await.unwrap();

        let paths: Vec<String> = index
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.object_path)
            .collect();
        assert_eq!(paths, vec!["a/first", "b/second", "c/third"]);
    }

    #[tokio::test]
    async fn test_reopen_keeps_rows() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("metadata.db");
        let record = record("persist.txt", b"persist");

        let index = MetadataIndex::connect(&db_path).await.unwrap();
        index.create(&record).await.unwrap();
        index.close().await;

        let index = MetadataIndex::connect(&db_path).await.unwrap();
        assert_eq!(index.get_by_path("persist.txt").await.unwrap(), record);
    }
}
