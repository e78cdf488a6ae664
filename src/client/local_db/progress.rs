//! # Offline Progress Storage
//!
//! SQLite implementation of the offline progress queue.
//!
//! Entries live in `offline_progress`; `id` is an autoincrement key so the
//! append order is also the id order. `mark_synced` runs inside a
//! transaction and only touches rows whose `synced_at` is still null.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use tracing::debug;

use crate::client::local_db::{parse_timestamp, LocalDatabase, Result, StorageError};
use crate::client::offline::queue::{NewOfflineProgress, OfflineProgressEntry, OfflineProgressStore};

impl LocalDatabase {
    fn entry_from_row(row: &SqliteRow) -> Result<OfflineProgressEntry> {
        let created_at: String = row.try_get("created_at")?;
        let synced_at: Option<String> = row.try_get("synced_at")?;
        let watched_seconds: i64 = row.try_get("watched_seconds")?;
        let total_seconds: i64 = row.try_get("total_seconds")?;

        Ok(OfflineProgressEntry {
            id: row.try_get("id")?,
            video_id: row.try_get("video_id")?,
            playlist_id: row.try_get("playlist_id")?,
            watched_seconds: to_seconds("watched_seconds", watched_seconds)?,
            total_seconds: to_seconds("total_seconds", total_seconds)?,
            created_at: parse_timestamp("created_at", &created_at)?,
            synced_at: synced_at
                .map(|value| parse_timestamp("synced_at", &value))
                .transpose()?,
        })
    }

    /// Pending entries for one playlist, oldest first
    pub async fn unsynced_for_playlist(&self, playlist_id: &str) -> Result<Vec<OfflineProgressEntry>> {
        let rows = sqlx::query(
            "SELECT id, video_id, playlist_id, watched_seconds, total_seconds, created_at, synced_at
             FROM offline_progress
             WHERE synced_at IS NULL AND playlist_id = ?
             ORDER BY id ASC",
        )
        .bind(playlist_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::entry_from_row).collect()
    }
}

fn to_seconds(column: &str, value: i64) -> Result<u32> {
    u32::try_from(value).map_err(|_| StorageError::Corrupt(format!("{} out of range: {}", column, value)))
}

#[async_trait]
impl OfflineProgressStore for LocalDatabase {
    async fn append_offline_progress(
        &self,
        entry: NewOfflineProgress,
    ) -> Result<OfflineProgressEntry> {
        let created_at = Utc::now();

        let result = sqlx::query(
            "INSERT INTO offline_progress (video_id, playlist_id, watched_seconds, total_seconds, created_at)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&entry.video_id)
        .bind(&entry.playlist_id)
        .bind(i64::from(entry.watched_seconds))
        .bind(i64::from(entry.total_seconds))
        .bind(created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        let id = result.last_insert_rowid();
        debug!("Queued offline progress {} for video {}", id, entry.video_id);

        Ok(OfflineProgressEntry {
            id,
            video_id: entry.video_id,
            playlist_id: entry.playlist_id,
            watched_seconds: entry.watched_seconds,
            total_seconds: entry.total_seconds,
            created_at,
            synced_at: None,
        })
    }

    async fn list_unsynced(&self) -> Result<Vec<OfflineProgressEntry>> {
        let rows = sqlx::query(
            "SELECT id, video_id, playlist_id, watched_seconds, total_seconds, created_at, synced_at
             FROM offline_progress
             WHERE synced_at IS NULL
             ORDER BY id ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::entry_from_row).collect()
    }

    async fn count_unsynced(&self) -> Result<u64> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM offline_progress WHERE synced_at IS NULL")
                .fetch_one(&self.pool)
                .await?;
        Ok(count as u64)
    }

    async fn mark_synced(&self, ids: &[i64]) -> Result<u64> {
        if ids.is_empty() {
            return Ok(0);
        }

        let synced_at = Utc::now().to_rfc3339();
        let mut tx = self.pool.begin().await?;
        let mut marked = 0;

        for id in ids {
            let result = sqlx::query(
                "UPDATE offline_progress SET synced_at = ? WHERE id = ? AND synced_at IS NULL",
            )
            .bind(&synced_at)
            .bind(id)
            .execute(&mut *tx)
            .await?;
            marked += result.rows_affected();
        }

        tx.commit().await?;
        debug!("Marked {} offline progress entries as synced", marked);
        Ok(marked)
    }

    async fn prune_synced(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM offline_progress WHERE synced_at IS NOT NULL")
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
