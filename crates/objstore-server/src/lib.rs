//! HTTP surface for objstore.
//!
//! Objects are created with `POST /objects?path=...` and then addressed
//! either by path under `/objects/...` or by id under `/ids/...`.

pub mod error;
pub mod router;
pub mod server;

pub use error::ApiError;
pub use router::build_router;
pub use server::ObjectServer;
