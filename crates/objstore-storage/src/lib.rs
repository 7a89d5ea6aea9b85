//! Storage layer for objstore
//!
//! This crate provides the two backends the engine reconciles:
//! - Blob storage on local disk, keyed by object id
//! - The SQLite index mapping object paths to ids

pub mod blob;
pub mod db;
pub mod error;
mod models;

pub use blob::{BlobBackend, BlobStore, STAGING_DIR, StagedBlob};
pub use db::{IndexBackend, MetadataIndex};
pub use error::{Result, StorageError};
