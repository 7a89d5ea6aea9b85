use objstore_core::record::from_unix_millis;
use objstore_core::{ObjectId, ObjectRecord};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use crate::{Result, StorageError};

pub(crate) const SELECT_COLUMNS: &str =
    "object_id, object_path, local_path, size_bytes, content_hash, created_at, updated_at";

pub(crate) fn record_from_row(row: &SqliteRow) -> Result<ObjectRecord> {
    let object_id: String = row.try_get("object_id")?;
    let object_id = ObjectId::parse(&object_id)
        .map_err(|_| StorageError::CorruptRow(format!("invalid object_id '{}'", object_id)))?;

    let size_bytes: i64 = row.try_get("size_bytes")?;
    let created_at: i64 = row.try_get("created_at")?;
    let updated_at: i64 = row.try_get("updated_at")?;

    Ok(ObjectRecord {
        object_path: row.try_get("object_path")?,
        local_path: row.try_get("local_path")?,
        size_bytes: u64::try_from(size_bytes).map_err(|_| {
            StorageError::CorruptRow(format!("negative size for {}", object_id))
        })?,
        content_hash: row.try_get("content_hash")?,
        created_at: timestamp(created_at, &object_id)?,
        updated_at: timestamp(updated_at, &object_id)?,
        object_id,
    })
}

fn timestamp(millis: i64, id: &ObjectId) -> Result<time::OffsetDateTime> {
    from_unix_millis(millis)
        .map_err(|e| StorageError::CorruptRow(format!("{} for {}", e, id)))
}
