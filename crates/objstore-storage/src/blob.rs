//! Content-addressable blob storage

use async_trait::async_trait;
use objstore_core::ObjectId;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use crate::{Result, StorageError};

/// Directory under the blob root holding staged, not yet published, blobs.
pub const STAGING_DIR: &str = ".staging";

/// Durable id -> bytes store.
#[async_trait]
pub trait BlobBackend: Send + Sync {
    /// Write a new blob. Fails with `BlobExists` if `id` is already stored.
    async fn create(&self, id: &ObjectId, data: &[u8]) -> Result<()>;

    async fn read(&self, id: &ObjectId) -> Result<Vec<u8>>;

    /// Replace the bytes of an existing blob. Fails with `BlobNotFound` if absent.
    async fn update(&self, id: &ObjectId, data: &[u8]) -> Result<()>;

    async fn delete(&self, id: &ObjectId) -> Result<()>;

    /// Ids of all published blobs.
    async fn list(&self) -> Result<Vec<ObjectId>>;

    async fn exists(&self, id: &ObjectId) -> Result<bool>;

    /// Where the blob for `id` lives once published.
    fn location(&self, id: &ObjectId) -> PathBuf;

    /// Write `data` to a private staging file without publishing it.
    async fn stage(&self, id: &ObjectId, data: &[u8]) -> Result<StagedBlob>;

    /// Publish a staged blob under its id. Fails with `BlobExists` if a blob
    /// is already published there; the staging file is removed either way.
    async fn commit(&self, staged: StagedBlob) -> Result<()>;

    /// Drop a staged blob.
    async fn discard(&self, staged: StagedBlob) -> Result<()>;

    /// Staged blobs left over from interrupted writes.
    async fn list_staged(&self) -> Result<Vec<StagedBlob>>;
}

/// A blob written to the staging area, waiting to be committed or discarded.
#[derive(Debug)]
pub struct StagedBlob {
    id: ObjectId,
    path: PathBuf,
}

impl StagedBlob {
    pub fn id(&self) -> &ObjectId {
        &self.id
    }
}

/// Blob store keeping one file per object, named by id, under `root`.
pub struct BlobStore {
    root: PathBuf,
    staging: PathBuf,
}

impl BlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        let staging = root.join(STAGING_DIR);
        std::fs::create_dir_all(&staging)?;
        Ok(Self { root, staging })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, id: &ObjectId) -> PathBuf {
        self.root.join(id.as_str())
    }

    fn staging_path(&self, id: &ObjectId) -> PathBuf {
        self.staging
            .join(format!("{}.{}", id, uuid::Uuid::new_v4().simple()))
    }

    async fn write_staged(&self, id: &ObjectId, data: &[u8]) -> Result<StagedBlob> {
        let path = self.staging_path(id);
        if let Err(e) = write_new(&path, data).await {
            remove_quietly(&path).await;
            return Err(e.into());
        }
        Ok(StagedBlob {
            id: id.clone(),
            path,
        })
    }
}

#[async_trait]
impl BlobBackend for BlobStore {
    async fn create(&self, id: &ObjectId, data: &[u8]) -> Result<()> {
        let path = self.path_for(id);
        match write_new(&path, data).await {
            Ok(()) => {
                debug!(object_id = %id, size = data.len(), "blob created");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                Err(StorageError::BlobExists(id.to_string()))
            }
            Err(e) => {
                remove_quietly(&path).await;
                Err(e.into())
            }
        }
    }

    async fn read(&self, id: &ObjectId) -> Result<Vec<u8>> {
        match fs::read(self.path_for(id)).await {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(StorageError::BlobNotFound(id.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn update(&self, id: &ObjectId, data: &[u8]) -> Result<()> {
        let path = self.path_for(id);
        if !fs::try_exists(&path).await? {
            return Err(StorageError::BlobNotFound(id.to_string()));
        }

        // Replace via rename so readers never see a half-written blob.
        let staged = self.write_staged(id, data).await?;
        if let Err(e) = fs::rename(&staged.path, &path).await {
            remove_quietly(&staged.path).await;
            return Err(e.into());
        }
        debug!(object_id = %id, size = data.len(), "blob updated");
        Ok(())
    }

    async fn delete(&self, id: &ObjectId) -> Result<()> {
        match fs::remove_file(self.path_for(id)).await {
            Ok(()) => {
                debug!(object_id = %id, "blob deleted");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(StorageError::BlobNotFound(id.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn list(&self) -> Result<Vec<ObjectId>> {
        let mut ids = Vec::new();
        let mut entries = fs::read_dir(&self.root).await?;

        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            let name = entry.file_name();
            match name.to_str().map(ObjectId::parse) {
                Some(Ok(id)) => ids.push(id),
                _ => debug!(name = ?name, "skipping non-blob file"),
            }
        }

        ids.sort();
        Ok(ids)
    }

    async fn exists(&self, id: &ObjectId) -> Result<bool> {
        Ok(fs::try_exists(self.path_for(id)).await?)
    }

    fn location(&self, id: &ObjectId) -> PathBuf {
        self.path_for(id)
    }

    async fn stage(&self, id: &ObjectId, data: &[u8]) -> Result<StagedBlob> {
        let staged = self.write_staged(id, data).await?;
        debug!(object_id = %id, staged = %staged.path.display(), "blob staged");
        Ok(staged)
    }

    async fn commit(&self, staged: StagedBlob) -> Result<()> {
        let target = self.path_for(&staged.id);

        // hard_link refuses to replace an existing file, unlike rename.
        let linked = fs::hard_link(&staged.path, &target).await;
        if let Err(e) = fs::remove_file(&staged.path).await {
            warn!(staged = %staged.path.display(), error = %e, "failed to remove staging file");
        }

        match linked {
            Ok(()) => {
                debug!(object_id = %staged.id, "blob published");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                Err(StorageError::BlobExists(staged.id.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn discard(&self, staged: StagedBlob) -> Result<()> {
        match fs::remove_file(&staged.path).await {
            Ok(()) => {
                debug!(object_id = %staged.id, "staged blob discarded");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn list_staged(&self) -> Result<Vec<StagedBlob>> {
        let mut staged = Vec::new();
        let mut entries = fs::read_dir(&self.staging).await?;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let id = entry
                .file_name()
                .to_str()
                .and_then(|name| name.split_once('.'))
                .and_then(|(id, _)| ObjectId::parse(id).ok());

            match id {
                Some(id) => staged.push(StagedBlob { id, path }),
                None => warn!(path = %path.display(), "unrecognised file in staging area"),
            }
        }

        Ok(staged)
    }
}

async fn write_new(path: &Path, data: &[u8]) -> std::io::Result<()> {
    let mut file = fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .await?;
    file.write_all(data).await?;
    file.sync_all().await?;
    Ok(())
}

async fn remove_quietly(path: &Path) {
    if let Err(e) = fs::remove_file(path).await {
        if e.kind() != ErrorKind::NotFound {
            warn!(path = %path.display(), error = %e, "failed to clean up partial blob");
        }
    }
}
