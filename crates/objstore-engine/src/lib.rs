//! Object store orchestration: keeps the blob store and the metadata index
//! consistent behind one create/read/update/delete API.

mod lock;
mod recovery;
mod store;

pub use recovery::RecoveryReport;
pub use store::ObjectStore;
