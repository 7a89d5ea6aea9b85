use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::error::{Error, Result};
use crate::id::{ObjectId, content_digest};

/// One row of the object index: where a live object is and what it holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectRecord {
    pub object_id: ObjectId,
    pub object_path: String,
    pub local_path: String,
    pub size_bytes: u64,
    /// SHA-256 of the current bytes; equals `object_id` until the first update.
    pub content_hash: String,
    #[serde(with = "time::serde::timestamp::milliseconds")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::timestamp::milliseconds")]
    pub updated_at: OffsetDateTime,
}

impl ObjectRecord {
    pub fn new(object_id: ObjectId, object_path: &str, local_path: String, data: &[u8]) -> Self {
        let now = now_millis();
        Self {
            content_hash: content_digest(data),
            object_id,
            object_path: object_path.to_string(),
            local_path,
            size_bytes: data.len() as u64,
            created_at: now,
            updated_at: now,
        }
    }

    /// Refresh size, hash and `updated_at` after the blob was overwritten.
    /// The id and local path are left as they are.
    pub fn touch(&mut self, data: &[u8]) {
        self.size_bytes = data.len() as u64;
        self.content_hash = content_digest(data);
        self.updated_at = now_millis();
    }

    /// Whether the stored bytes still hash to the object's id.
    pub fn is_pristine(&self) -> bool {
        self.content_hash == self.object_id.as_str()
    }
}

/// Current UTC time truncated to the millisecond precision the index keeps.
pub fn now_millis() -> OffsetDateTime {
    let now = OffsetDateTime::now_utc();
    from_unix_millis(to_unix_millis(now)).unwrap_or(now)
}

pub fn to_unix_millis(at: OffsetDateTime) -> i64 {
    (at.unix_timestamp_nanos() / 1_000_000) as i64
}

pub fn from_unix_millis(millis: i64) -> Result<OffsetDateTime> {
    OffsetDateTime::from_unix_timestamp_nanos(i128::from(millis) * 1_000_000)
        .map_err(|e| Error::Internal(format!("timestamp {} out of range: {}", millis, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_record_is_pristine() {
        let data = b"Hello, world!";
        let id = ObjectId::from_content(data);
        let record = ObjectRecord::new(id.clone(), "test/object.txt", "/data/x".to_string(), data);

        assert_eq!(record.object_id, id);
        assert_eq!(record.size_bytes, 13);
        assert_eq!(record.created_at, record.updated_at);
        assert!(record.is_pristine());
    }

    #[test]
    fn test_touch_keeps_id() {
        let id = ObjectId::from_content(b"Hello, world!");
        let mut record =
            ObjectRecord::new(id.clone(), "test/object.txt", "/data/x".to_string(), b"Hello, world!");
        let created = record.created_at;

        record.touch(b"Updated");

        assert_eq!(record.object_id, id);
        assert_eq!(record.local_path, "/data/x");
        assert_eq!(record.size_bytes, 7);
        assert_eq!(record.content_hash, content_digest(b"Updated"));
        assert_eq!(record.created_at, created);
        assert!(record.updated_at >= created);
        assert!(!record.is_pristine());
    }

    #[test]
    fn test_millis_round_trip() {
        let now = now_millis();
        let back = from_unix_millis(to_unix_millis(now)).unwrap();
        assert_eq!(back, now);
    }

    #[test]
    fn test_json_keeps_millisecond_timestamps() {
        let data = b"Hello, world!";
        let mut record =
            ObjectRecord::new(ObjectId::from_content(data), "test/object.txt", "/data/x".to_string(), data);
        record.created_at = from_unix_millis(1_700_000_000_123).unwrap();
        record.updated_at = from_unix_millis(1_700_000_000_456).unwrap();

        let json = serde_json::to_string(&record).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["created_at"], 1_700_000_000_123i64);
        assert_eq!(value["updated_at"], 1_700_000_000_456i64);

        let back: ObjectRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
    }
}
