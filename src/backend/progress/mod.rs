//! Progress Module
//!
//! The server side of progress tracking: the in-memory store, its
//! PostgreSQL mirror and the HTTP handlers.

/// HTTP handlers for `/api/progress`
pub mod handlers;

/// In-memory progress store
pub mod state;

/// PostgreSQL persistence
pub mod db;

pub use handlers::{get_all_progress, get_playlist_progress, sync_progress, update_progress};
pub use state::{ProgressStore, SyncApplied};
