//! Error types for objstore-storage

use thiserror::Error;

pub type Result<T> = std::result::Result<T, StorageError>;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Blob not found: {0}")]
    BlobNotFound(String),

    #[error("Blob already exists: {0}")]
    BlobExists(String),

    #[error("Record not found: {0}")]
    RecordNotFound(String),

    #[error("Record already exists: {0}")]
    RecordExists(String),

    #[error("Corrupt index row: {0}")]
    CorruptRow(String),
}

impl StorageError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::BlobNotFound(_) | Self::RecordNotFound(_))
    }
}

impl From<StorageError> for objstore_core::Error {
    fn from(err: StorageError) -> Self {
        use objstore_core::Error;

        match err {
            StorageError::BlobNotFound(_) | StorageError::RecordNotFound(_) => {
                Error::NotFound(err.to_string())
            }
            StorageError::BlobExists(_) | StorageError::RecordExists(_) => {
                Error::AlreadyExists(err.to_string())
            }
            StorageError::Io(io) => Error::Io(io),
            StorageError::Database(db) => Error::Internal(format!("database error: {}", db)),
            StorageError::CorruptRow(_) => Error::Internal(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use objstore_core::ErrorKind;

    #[test]
    fn test_kinds_survive_conversion() {
        let cases = [
            (StorageError::BlobNotFound("a".into()), ErrorKind::NotFound),
            (StorageError::RecordNotFound("a".into()), ErrorKind::NotFound),
            (StorageError::BlobExists("a".into()), ErrorKind::AlreadyExists),
            (StorageError::RecordExists("a".into()), ErrorKind::AlreadyExists),
            (StorageError::CorruptRow("a".into()), ErrorKind::Internal),
            (
                StorageError::Io(std::io::Error::other("disk")),
                ErrorKind::Io,
            ),
        ];

        for (err, kind) in cases {
            let core: objstore_core::Error = err.into();
            assert_eq!(core.kind(), kind);
        }
    }
}
