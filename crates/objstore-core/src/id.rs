//! Object identifiers and references

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Lowercase hex SHA-256 digest naming a stored object.
///
/// An id is minted from the bytes an object is created with and stays the
/// object's handle for its whole life, including after updates.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ObjectId(String);

impl ObjectId {
    /// Length of the hex encoding of a SHA-256 digest.
    pub const LEN: usize = 64;

    pub fn from_content(data: &[u8]) -> Self {
        Self(content_digest(data))
    }

    pub fn parse(s: &str) -> Result<Self> {
        if Self::is_valid(s) {
            Ok(Self(s.to_string()))
        } else {
            Err(invalid_id(s))
        }
    }

    pub fn is_valid(s: &str) -> bool {
        s.len() == Self::LEN && s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn invalid_id(s: &str) -> Error {
    Error::Validation(format!(
        "invalid object id '{}': expected {} lowercase hex characters",
        s,
        ObjectId::LEN
    ))
}

/// Hex SHA-256 of `data`.
pub fn content_digest(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ObjectId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ObjectId {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        if Self::is_valid(&value) {
            Ok(Self(value))
        } else {
            Err(invalid_id(&value))
        }
    }
}

impl From<ObjectId> for String {
    fn from(id: ObjectId) -> Self {
        id.0
    }
}

impl AsRef<str> for ObjectId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// How a caller addresses an object: by its id or by its path.
///
/// The namespace is always explicit, so a path that happens to look like an
/// id never resolves to a different object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObjectRef {
    Id(ObjectId),
    Path(String),
}

impl ObjectRef {
    pub fn path(path: impl Into<String>) -> Self {
        Self::Path(path.into())
    }
}

impl From<ObjectId> for ObjectRef {
    fn from(id: ObjectId) -> Self {
        Self::Id(id)
    }
}

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => write!(f, "id {}", id),
            Self::Path(path) => write!(f, "path '{}'", path),
        }
    }
}
