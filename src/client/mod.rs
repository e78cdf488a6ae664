//! Offline-first client: local storage, the progress write path and the
//! background reconciliation with the server.

pub mod api;
pub mod config;
pub mod error;
pub mod local_db;
pub mod offline;
pub mod sync;

#[cfg(test)]
pub(crate) mod testing;

pub use error::ClientError;
pub use offline::OfflineManager;
