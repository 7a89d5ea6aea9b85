use std::collections::HashSet;

use objstore_core::{Error, ObjectId, Result};
use serde::Serialize;
use tracing::{info, warn};

use crate::ObjectStore;

/// What [`ObjectStore::recover`] repaired.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RecoveryReport {
    /// Staged blobs whose index row was committed, now published.
    pub published: usize,
    /// Staged blobs with no committed row, or already published, removed.
    pub discarded: usize,
    /// Published blobs without an index row, removed.
    pub orphans_removed: usize,
    /// Index rows without a blob, removed.
    pub dangling_removed: usize,
}

impl RecoveryReport {
    pub fn is_clean(&self) -> bool {
        *self == Self::default()
    }
}

impl ObjectStore {
    /// Bring the blob store and the index back in line after a crash.
    ///
    /// Must not run concurrently with writers: an in-flight create looks
    /// exactly like an interrupted one. [`ObjectStore::open_with_recovery`]
    /// guarantees that with the store lock; callers of [`ObjectStore::new`]
    /// have to guarantee it themselves.
    pub async fn recover(&self) -> Result<RecoveryReport> {
        let mut report = RecoveryReport::default();

        let staged = self
            .blobs
            .list_staged()
            .await
            .map_err(|e| Error::from(e).context("failed to list staged blobs"))?;

        for blob in staged {
            let id = blob.id().clone();
            let committed = match self.index.get_by_id(&id).await {
                Ok(_) => true,
                Err(e) if e.is_not_found() => false,
                Err(e) => return Err(Error::from(e).context("failed to check staged blob")),
            };

            if committed && !self.blobs.exists(&id).await? {
                self.blobs.commit(blob).await?;
                info!(object_id = %id, "published staged blob");
                report.published += 1;
            } else {
                self.blobs.discard(blob).await?;
                warn!(object_id = %id, "discarded staged blob");
                report.discarded += 1;
            }
        }

        let records = self
            .index
            .list()
            .await
            .map_err(|e| Error::from(e).context("failed to list index records"))?;
        let indexed: HashSet<&ObjectId> = records.iter().map(|r| &r.object_id).collect();

        let stored = self
            .blobs
            .list()
            .await
            .map_err(|e| Error::from(e).context("failed to list blobs"))?;
        let on_disk: HashSet<&ObjectId> = stored.iter().collect();

        for id in stored.iter().filter(|id| !indexed.contains(id)) {
            self.blobs.delete(id).await?;
            warn!(object_id = %id, "removed orphan blob");
            report.orphans_removed += 1;
        }

        for record in records.iter().filter(|r| !on_disk.contains(&r.object_id)) {
            self.index.delete(&record.object_id).await?;
            warn!(object_id = %record.object_id, path = %record.object_path, "removed dangling record");
            report.dangling_removed += 1;
        }

        Ok(report)
    }
}
