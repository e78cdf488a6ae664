//! Database Schema Definitions
//!
//! Schema version bookkeeping for the local database.

/// Current database schema version
pub const CURRENT_SCHEMA_VERSION: i32 = 1;

/// Schema migration versions
pub const MIGRATION_VERSIONS: &[i32] = &[1];

/// Local tables, in creation order
pub const TABLES: &[&str] = &[
    "offline_progress",
    "playlists",
    "videos",
    "downloaded_videos",
    "user_session",
    "schema_migrations",
];

/// Check if database needs migration
pub fn needs_migration(current_version: i32) -> bool {
    current_version < CURRENT_SCHEMA_VERSION
}

/// Migrations newer than `current_version`, oldest first
pub fn pending_migrations(current_version: i32) -> Vec<i32> {
    MIGRATION_VERSIONS
        .iter()
        .copied()
        .filter(|&v| v > current_version)
        .collect()
}
