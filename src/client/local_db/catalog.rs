//! # Catalog Cache
//!
//! Read-only copies of playlists and videos fetched while online, plus the
//! list of videos the user downloaded for offline playback.
//!
//! Caching a list replaces what was cached before for the same scope:
//! `cache_playlists` replaces every playlist, `cache_videos` replaces the
//! videos of one playlist.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use crate::client::local_db::{parse_timestamp, LocalDatabase, Result, StorageError};

/// Playlist as cached for offline browsing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedPlaylist {
    pub id: String,
    pub title: String,
    pub teacher: Option<String>,
    pub category: Option<String>,
    pub difficulty: Option<String>,
    /// Full server representation, kept so the UI can render fields this
    /// cache does not index
    pub payload: serde_json::Value,
    pub updated_at: DateTime<Utc>,
}

/// Video entry of a cached playlist
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedVideo {
    pub id: String,
    pub playlist_id: String,
    pub title: String,
    pub order: u32,
    pub video_url: String,
    pub thumbnail: Option<String>,
}

/// Video saved for offline playback
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadedVideo {
    pub video_id: String,
    pub playlist_id: String,
    pub title: String,
    pub thumbnail: Option<String>,
    pub video_url: String,
    pub downloaded_at: DateTime<Utc>,
}

impl LocalDatabase {
    /// Replace the cached playlists
    pub async fn cache_playlists(&self, playlists: &[CachedPlaylist]) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM playlists").execute(&mut *tx).await?;

        for playlist in playlists {
            let payload = serde_json::to_string(&playlist.payload)
                .map_err(|e| StorageError::Corrupt(format!("playlist payload: {}", e)))?;

            sqlx::query(
                "INSERT INTO playlists (id, title, teacher, category, difficulty, payload, updated_at)
                 VALUES (?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(&playlist.id)
            .bind(&playlist.title)
            .bind(&playlist.teacher)
            .bind(&playlist.category)
            .bind(&playlist.difficulty)
            .bind(payload)
            .bind(playlist.updated_at.to_rfc3339())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Cached playlists, most recently updated first
    pub async fn cached_playlists(&self) -> Result<Vec<CachedPlaylist>> {
        let rows = sqlx::query(
            "SELECT id, title, teacher, category, difficulty, payload, updated_at
             FROM playlists
             ORDER BY updated_at DESC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(playlist_from_row).collect()
    }

    /// Replace the cached videos of `playlist_id`
    pub async fn cache_videos(&self, playlist_id: &str, videos: &[CachedVideo]) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM videos WHERE playlist_id = ?")
            .bind(playlist_id)
            .execute(&mut *tx)
            .await?;

        for video in videos {
            sqlx::query(
                "INSERT OR REPLACE INTO videos (id, playlist_id, title, position, video_url, thumbnail)
                 VALUES (?, ?, ?, ?, ?, ?)",
            )
            .bind(&video.id)
            .bind(playlist_id)
            .bind(&video.title)
            .bind(i64::from(video.order))
            .bind(&video.video_url)
            .bind(&video.thumbnail)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Cached videos of `playlist_id` in playlist order
    pub async fn cached_videos(&self, playlist_id: &str) -> Result<Vec<CachedVideo>> {
        let rows = sqlx::query(
            "SELECT id, playlist_id, title, position, video_url, thumbnail
             FROM videos
             WHERE playlist_id = ?
             ORDER BY position ASC",
        )
        .bind(playlist_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| -> Result<CachedVideo> {
                let position: i64 = row.try_get("position")?;
                Ok(CachedVideo {
                    id: row.try_get("id")?,
                    playlist_id: row.try_get("playlist_id")?,
                    title: row.try_get("title")?,
                    order: u32::try_from(position).map_err(|_| {
                        StorageError::Corrupt(format!("video position out of range: {}", position))
                    })?,
                    video_url: row.try_get("video_url")?,
                    thumbnail: row.try_get("thumbnail")?,
                })
            })
            .collect()
    }

    /// Record a downloaded video, replacing an earlier record for the same video
    pub async fn save_downloaded_video(&self, video: &DownloadedVideo) -> Result<()> {
        sqlx::query(
            "INSERT OR REPLACE INTO downloaded_videos
                (video_id, playlist_id, title, thumbnail, video_url, downloaded_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&video.video_id)
        .bind(&video.playlist_id)
        .bind(&video.title)
        .bind(&video.thumbnail)
        .bind(&video.video_url)
        .bind(video.downloaded_at.to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Downloaded videos, newest first
    pub async fn downloaded_videos(&self) -> Result<Vec<DownloadedVideo>> {
        let rows = sqlx::query(
            "SELECT video_id, playlist_id, title, thumbnail, video_url, downloaded_at
             FROM downloaded_videos
             ORDER BY downloaded_at DESC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| -> Result<DownloadedVideo> {
                let downloaded_at: String = row.try_get("downloaded_at")?;
                Ok(DownloadedVideo {
                    video_id: row.try_get("video_id")?,
                    playlist_id: row.try_get("playlist_id")?,
                    title: row.try_get("title")?,
                    thumbnail: row.try_get("thumbnail")?,
                    video_url: row.try_get("video_url")?,
                    downloaded_at: parse_timestamp("downloaded_at", &downloaded_at)?,
                })
            })
            .collect()
    }

    pub async fn is_video_downloaded(&self, video_id: &str) -> Result<bool> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM downloaded_videos WHERE video_id = ?")
                .bind(video_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(count > 0)
    }

    /// Returns whether a record was removed
    pub async fn remove_downloaded_video(&self, video_id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM downloaded_videos WHERE video_id = ?")
            .bind(video_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

fn playlist_from_row(row: &SqliteRow) -> Result<CachedPlaylist> {
    let payload: String = row.try_get("payload")?;
    let updated_at: String = row.try_get("updated_at")?;

    Ok(CachedPlaylist {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        teacher: row.try_get("teacher")?,
        category: row.try_get("category")?,
        difficulty: row.try_get("difficulty")?,
        payload: serde_json::from_str(&payload)
            .map_err(|e| StorageError::Corrupt(format!("playlist payload: {}", e)))?,
        updated_at: parse_timestamp("updated_at", &updated_at)?,
    })
}
