//! # Local Database Module
//!
//! Local SQLite storage for offline-first operation. Holds the queue of
//! progress ticks that have not reached the server yet, plus cached
//! playlists, videos, downloads and the user session so the client can
//! keep working while disconnected.
//!
//! ## Key Components
//!
//! - `LocalDatabase`: Connection pool and schema management
//! - `schema.rs`: Schema versioning
//! - `progress.rs`: Offline progress queue (append, list, mark, prune)
//! - `catalog.rs`: Cached playlists, videos and downloaded videos
//! - `session.rs`: Cached user session
//!
//! ## Usage
//!
//! ```rust,no_run
//! use eduflex::client::local_db::LocalDatabase;
//! use eduflex::client::offline::queue::{NewOfflineProgress, OfflineProgressStore};
//!
//! # async fn demo() -> Result<(), eduflex::client::local_db::StorageError> {
//! let db = LocalDatabase::new().await?;
//!
//! db.append_offline_progress(NewOfflineProgress {
//!     video_id: "v1".to_string(),
//!     playlist_id: "p1".to_string(),
//!     watched_seconds: 30,
//!     total_seconds: 600,
//! })
//! .await?;
//!
//! let pending = db.list_unsynced().await?;
//! # Ok(())
//! # }
//! ```

pub mod catalog;
pub mod progress;
pub mod schema;
pub mod session;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

/// Errors raised by the local store
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("local database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("local storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("corrupt local data: {0}")]
    Corrupt(String),
}

/// Result type for local database operations
pub type Result<T> = std::result::Result<T, StorageError>;

/// Local database connection manager
///
/// Cheap to clone; clones share the same pool.
#[derive(Debug, Clone)]
pub struct LocalDatabase {
    pool: SqlitePool,
}

impl LocalDatabase {
    /// Open or create the local database in the platform data directory
    pub async fn new() -> Result<Self> {
        Self::open(Self::default_db_path()).await
    }

    /// Open or create the local database at `path`
    ///
    /// Creates the file and parent directories if needed and runs the schema.
    /// Uses WAL mode so readers don't block the writer.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await?;

        info!("Opened local database at {}", path.display());

        let db = Self { pool };
        db.init_schema().await?;
        Ok(db)
    }

    /// Open a private in-memory database
    ///
    /// Every connection to `:memory:` gets its own database, so the pool is
    /// pinned to a single connection that is never recycled.
    pub async fn in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .in_memory(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        let db = Self { pool };
        db.init_schema().await?;
        Ok(db)
    }

    /// Platform-specific path for the local database file
    pub fn default_db_path() -> PathBuf {
        let mut path = dirs::data_dir().unwrap_or_else(std::env::temp_dir);
        path.push("eduflex");
        path.push("offline.db");
        path
    }

    /// Create all tables and apply pending migrations
    async fn init_schema(&self) -> Result<()> {
        sqlx::raw_sql(include_str!("schema.sql"))
            .execute(&self.pool)
            .await?;

        self.run_migrations().await
    }

    async fn run_migrations(&self) -> Result<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;

        let (current_version,): (i32,) =
            sqlx::query_as("SELECT COALESCE(MAX(version), 0) FROM schema_migrations")
                .fetch_one(&self.pool)
                .await?;

        if !schema::needs_migration(current_version) {
            return Ok(());
        }

        for version in schema::pending_migrations(current_version) {
            debug!("Applying local schema migration {}", version);
            sqlx::query("INSERT INTO schema_migrations (version, applied_at) VALUES (?, ?)")
                .bind(version)
                .bind(chrono::Utc::now().to_rfc3339())
                .execute(&self.pool)
                .await?;
        }

        Ok(())
    }

    /// Current schema version recorded in `schema_migrations`
    pub async fn schema_version(&self) -> Result<i32> {
        let (version,): (i32,) =
            sqlx::query_as("SELECT COALESCE(MAX(version), 0) FROM schema_migrations")
                .fetch_one(&self.pool)
                .await?;
        Ok(version)
    }

    /// Get connection pool reference
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Row counts for diagnostics
    pub async fn stats(&self) -> Result<DatabaseStats> {
        let (pending_progress,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM offline_progress WHERE synced_at IS NULL")
                .fetch_one(&self.pool)
                .await?;

        let (confirmed_progress,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM offline_progress WHERE synced_at IS NOT NULL")
                .fetch_one(&self.pool)
                .await?;

        let (playlist_count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM playlists")
            .fetch_one(&self.pool)
            .await?;

        let (video_count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM videos")
            .fetch_one(&self.pool)
            .await?;

        let (downloaded_count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM downloaded_videos")
                .fetch_one(&self.pool)
                .await?;

        Ok(DatabaseStats {
            pending_progress: pending_progress as u64,
            confirmed_progress: confirmed_progress as u64,
            playlist_count: playlist_count as u64,
            video_count: video_count as u64,
            downloaded_count: downloaded_count as u64,
        })
    }
}

/// Database statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DatabaseStats {
    /// Progress entries waiting for a sync pass
    pub pending_progress: u64,
    /// Progress entries confirmed by the server but not yet pruned
    pub confirmed_progress: u64,
    pub playlist_count: u64,
    pub video_count: u64,
    pub downloaded_count: u64,
}

/// Parse an RFC 3339 timestamp stored by this module
pub(crate) fn parse_timestamp(
    column: &str,
    value: &str,
) -> Result<chrono::DateTime<chrono::Utc>> {
    chrono::DateTime::parse_from_rfc3339(value)
        .map(|ts| ts.with_timezone(&chrono::Utc))
        .map_err(|e| StorageError::Corrupt(format!("{} {:?}: {}", column, value, e)))
}
