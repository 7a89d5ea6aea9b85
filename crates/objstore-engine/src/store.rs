use std::path::Path;
use std::sync::Arc;

use objstore_core::{Error, ObjectId, ObjectRecord, ObjectRef, Result};
use objstore_storage::{BlobBackend, BlobStore, IndexBackend, MetadataIndex};
use tracing::{debug, error, info, warn};

use crate::RecoveryReport;
use crate::lock::StoreLock;

/// Object store reconciling a blob backend and an index backend.
///
/// Objects are created under a path and addressed afterwards by
/// [`ObjectRef`]. Creates are staged: the blob is written to a private
/// staging file, the index row is inserted, and only then is the blob
/// published under its id. [`ObjectStore::recover`] finishes or discards
/// whatever an interrupted create left behind.
pub struct ObjectStore {
    pub(crate) blobs: Arc<dyn BlobBackend>,
    pub(crate) index: Arc<dyn IndexBackend>,
    lock: Option<StoreLock>,
}

impl ObjectStore {
    pub fn new(blobs: Arc<dyn BlobBackend>, index: Arc<dyn IndexBackend>) -> Self {
        Self {
            blobs,
            index,
            lock: None,
        }
    }

    /// Open the on-disk backends without touching leftovers from other runs.
    ///
    /// The store lock is held shared until the store is dropped, which keeps
    /// recovery in other processes away from this store's in-flight creates.
    pub async fn open(storage_directory: &Path, database_path: &Path) -> Result<Self> {
        let mut store = Self::open_backends(storage_directory, database_path).await?;
        store.lock = Some(StoreLock::shared(storage_directory).await?);

        info!(storage = %storage_directory.display(), "object store opened");
        Ok(store)
    }

    /// Open the store and recover it, provided nothing else has it open.
    ///
    /// The report is `None` when another store holds the lock and recovery
    /// was skipped. Either way the returned store holds the lock shared.
    pub async fn open_with_recovery(
        storage_directory: &Path,
        database_path: &Path,
    ) -> Result<(Self, Option<RecoveryReport>)> {
        let mut store = Self::open_backends(storage_directory, database_path).await?;

        let report = match StoreLock::try_exclusive(storage_directory)? {
            Some(exclusive) => {
                let report = store.recover().await?;
                drop(exclusive);
                if report.is_clean() {
                    info!(storage = %storage_directory.display(), "object store is consistent");
                } else {
                    warn!(?report, "object store recovered from an interrupted run");
                }
                Some(report)
            }
            None => {
                warn!(
                    storage = %storage_directory.display(),
                    "object store is open elsewhere, skipping recovery"
                );
                None
            }
        };

        store.lock = Some(StoreLock::shared(storage_directory).await?);
        info!(storage = %storage_directory.display(), "object store opened");
        Ok((store, report))
    }

    async fn open_backends(storage_directory: &Path, database_path: &Path) -> Result<Self> {
        let blobs = BlobStore::new(storage_directory)
            .map_err(|e| Error::from(e).context("failed to open blob store"))?;
        let index = MetadataIndex::connect(database_path)
            .await
            .map_err(|e| Error::from(e).context("failed to open metadata index"))?;

        Ok(Self::new(Arc::new(blobs), Arc::new(index)))
    }

    /// Store `data` under `path`, returning the id minted from its bytes.
    ///
    /// Fails with `AlreadyExists` if identical content is already stored
    /// (under any path) or if `path` is taken.
    pub async fn create_object(&self, path: &str, data: &[u8]) -> Result<ObjectId> {
        let id = ObjectId::from_content(data);

        match self.index.get_by_id(&id).await {
            Ok(existing) => {
                return Err(Error::AlreadyExists(format!(
                    "object {} is already stored at '{}'",
                    id, existing.object_path
                )));
            }
            Err(e) if e.is_not_found() => {}
            Err(e) => return Err(Error::from(e).context("failed to check for existing object")),
        }

        let staged = self
            .blobs
            .stage(&id, data)
            .await
            .map_err(|e| Error::from(e).context("failed to stage blob"))?;

        let location = self.blobs.location(&id);
        let record = ObjectRecord::new(id.clone(), path, location.display().to_string(), data);

        if let Err(e) = self.index.create(&record).await {
            warn!(object_id = %id, path, error = %e, "index insert failed, discarding staged blob");
            if let Err(discard_err) = self.blobs.discard(staged).await {
                error!(object_id = %id, error = %discard_err, "failed to discard staged blob");
            }
            return Err(Error::from(e).context("failed to create metadata"));
        }

        if let Err(e) = self.blobs.commit(staged).await {
            warn!(object_id = %id, error = %e, "blob publish failed, removing index record");
            if let Err(rollback_err) = self.index.delete(&id).await {
                error!(object_id = %id, error = %rollback_err, "failed to roll back index record");
            }
            return Err(Error::from(e).context("failed to publish blob"));
        }

        info!(object_id = %id, path, size = data.len(), "object created");
        Ok(id)
    }

    pub async fn read_object(&self, object: &ObjectRef) -> Result<Vec<u8>> {
        let record = self.resolve(object).await?;
        let data = self
            .blobs
            .read(&record.object_id)
            .await
            .map_err(|e| Error::from(e).context("failed to read blob"))?;

        debug!(object_id = %record.object_id, size = data.len(), "object read");
        Ok(data)
    }

    /// Overwrite the bytes of an existing object.
    ///
    /// The id is a stable handle and is not recomputed; the record's
    /// `content_hash` tracks the new bytes instead.
    pub async fn update_object(&self, object: &ObjectRef, data: &[u8]) -> Result<()> {
        let mut record = self.resolve(object).await?;

        self.blobs
            .update(&record.object_id, data)
            .await
            .map_err(|e| Error::from(e).context("failed to update blob"))?;

        record.touch(data);
        self.index
            .update(&record)
            .await
            .map_err(|e| Error::from(e).context("failed to update metadata"))?;

        info!(object_id = %record.object_id, size = data.len(), "object updated");
        Ok(())
    }

    /// Delete the blob, then the index record.
    ///
    /// A failure between the two steps leaves a dangling record, which
    /// [`ObjectStore::recover`] removes.
    pub async fn delete_object(&self, object: &ObjectRef) -> Result<()> {
        let record = self.resolve(object).await?;

        self.blobs
            .delete(&record.object_id)
            .await
            .map_err(|e| Error::from(e).context("failed to delete blob"))?;

        self.index
            .delete(&record.object_id)
            .await
            .map_err(|e| Error::from(e).context("failed to delete metadata"))?;

        info!(object_id = %record.object_id, path = %record.object_path, "object deleted");
        Ok(())
    }

    /// Index record for `object`.
    pub async fn stat_object(&self, object: &ObjectRef) -> Result<ObjectRecord> {
        self.resolve(object).await
    }

    pub async fn list_objects(&self) -> Result<Vec<ObjectRecord>> {
        self.index
            .list()
            .await
            .map_err(|e| Error::from(e).context("failed to list objects"))
    }

    /// Look up the record for an explicit id or path.
    pub async fn resolve(&self, object: &ObjectRef) -> Result<ObjectRecord> {
        let found = match object {
            ObjectRef::Id(id) => self.index.get_by_id(id).await,
            ObjectRef::Path(path) => self.index.get_by_path(path).await,
        };

        found.map_err(|e| {
            if e.is_not_found() {
                Error::NotFound(format!("no object with {}", object))
            } else {
                Error::from(e).context(format!("failed to look up {}", object))
            }
        })
    }

    /// Resolve a bare token typed by a human: first as an id, then as a path.
    ///
    /// A path that is itself a valid id of another object resolves to that
    /// other object. Prefer [`ObjectStore::resolve`] wherever the caller
    /// knows which namespace it means.
    pub async fn resolve_token(&self, token: &str) -> Result<ObjectRecord> {
        if let Ok(id) = ObjectId::parse(token) {
            match self.index.get_by_id(&id).await {
                Ok(record) => return Ok(record),
                Err(e) if e.is_not_found() => {}
                Err(e) => return Err(Error::from(e).context("failed to look up object id")),
            }
        }

        match self.index.get_by_path(token).await {
            Ok(record) => Ok(record),
            Err(e) if e.is_not_found() => Err(Error::NotFound(format!("object not found: {}", token))),
            Err(e) => Err(Error::from(e).context("failed to look up object path")),
        }
    }

    /// Release the index handle. Call once, after the last request; the
    /// store lock goes when the store is dropped.
    pub async fn close(&self) {
        self.index.close().await;
    }
}
