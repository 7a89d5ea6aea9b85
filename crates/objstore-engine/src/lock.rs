use std::fs::{File, OpenOptions};
use std::io;
use std::path::Path;

use fs4::FileExt;
use objstore_core::{Error, Result};
use tracing::debug;

/// Lock file kept in the storage root; never mistaken for a blob.
const LOCK_FILE: &str = ".lock";

/// Advisory lock on a storage root, released on drop.
///
/// Every open store holds it shared. Recovery takes it exclusively, so it
/// only runs while no other store, in this process or another, has the
/// storage root open.
#[derive(Debug)]
pub struct StoreLock {
    _file: File,
}

impl StoreLock {
    /// Take the lock shared, waiting for a running recovery to finish.
    pub async fn shared(root: &Path) -> Result<Self> {
        let path = root.join(LOCK_FILE);
        tokio::task::spawn_blocking(move || {
            let file = open_lock_file(&path)?;
            file.lock_shared().map_err(|e| lock_error(&path, e))?;
            debug!(lock = %path.display(), "store lock held shared");
            Ok(Self { _file: file })
        })
        .await
        .map_err(|e| Error::Internal(format!("store lock task failed: {}", e)))?
    }

    /// Take the lock exclusively, or `None` if anyone else holds it.
    pub fn try_exclusive(root: &Path) -> Result<Option<Self>> {
        let path = root.join(LOCK_FILE);
        let file = open_lock_file(&path)?;

        match file.try_lock_exclusive() {
            Ok(()) => {
                debug!(lock = %path.display(), "store lock held exclusively");
                Ok(Some(Self { _file: file }))
            }
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => Ok(None),
            Err(e) => Err(lock_error(&path, e)),
        }
    }
}

fn open_lock_file(path: &Path) -> Result<File> {
    OpenOptions::new()
        .create(true)
        .read(true)
        .write(true)
        .truncate(false)
        .open(path)
        .map_err(|e| Error::from(e).context(format!("failed to open store lock {}", path.display())))
}

fn lock_error(path: &Path, err: io::Error) -> Error {
    Error::from(err).context(format!("failed to lock {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_shared_holders_block_exclusive() {
        let dir = tempfile::tempdir().unwrap();

        let first = StoreLock::shared(dir.path()).await.unwrap();
        let second = StoreLock::shared(dir.path()).await.unwrap();
        assert!(StoreLock::try_exclusive(dir.path()).unwrap().is_none());

        drop(first);
        assert!(StoreLock::try_exclusive(dir.path()).unwrap().is_none());

        drop(second);
        let exclusive = StoreLock::try_exclusive(dir.path()).unwrap();
        assert!(exclusive.is_some());
        assert!(StoreLock::try_exclusive(dir.path()).unwrap().is_none());
    }
}
