//! Core domain models for objstore
//!
//! This crate contains:
//! - Object identifiers and references (by id or by path)
//! - The index record shared by the storage and engine layers
//! - The error kinds surfaced to callers

pub mod error;
pub mod id;
pub mod record;

pub use error::{Error, ErrorKind, Result};
pub use id::{ObjectId, ObjectRef, content_digest};
pub use record::ObjectRecord;
