/**
 * Database Operations for Progress Records
 *
 * Mirrors the in-memory progress store into PostgreSQL and loads it back
 * at startup.
 */

use chrono::{DateTime, Utc};
use sqlx::postgres::PgArguments;
use sqlx::query::Query;
use sqlx::{PgPool, Postgres, Row};
use uuid::Uuid;

use crate::shared::progress::ProgressRecord;

const UPSERT_PROGRESS: &str = r#"
    INSERT INTO progress (
        id, user_id, video_id, playlist_id, watched_seconds, total_seconds,
        percent_complete, is_completed, last_watched_at, synced_from_offline,
        created_at, updated_at
    )
    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
    ON CONFLICT (user_id, video_id) DO UPDATE SET
        playlist_id = EXCLUDED.playlist_id,
        watched_seconds = EXCLUDED.watched_seconds,
        total_seconds = EXCLUDED.total_seconds,
        percent_complete = EXCLUDED.percent_complete,
        is_completed = EXCLUDED.is_completed,
        last_watched_at = EXCLUDED.last_watched_at,
        synced_from_offline = EXCLUDED.synced_from_offline,
        updated_at = EXCLUDED.updated_at
    WHERE progress.updated_at <= EXCLUDED.updated_at
"#;

fn upsert_query(record: &ProgressRecord) -> Query<'_, Postgres, PgArguments> {
    sqlx::query(UPSERT_PROGRESS)
        .bind(record.id)
        .bind(record.user_id)
        .bind(&record.video_id)
        .bind(&record.playlist_id)
        .bind(i64::from(record.watched_seconds))
        .bind(i64::from(record.total_seconds))
        .bind(i16::from(record.percent_complete))
        .bind(record.is_completed)
        .bind(record.last_watched_at)
        .bind(record.synced_from_offline)
        .bind(record.created_at)
        .bind(record.updated_at)
}

pub async fn save_progress(pool: &PgPool, record: &ProgressRecord) -> Result<(), sqlx::Error> {
    upsert_query(record).execute(pool).await?;
    Ok(())
}

/// Save a sync batch in one transaction
pub async fn save_progress_batch(pool: &PgPool, records: &[ProgressRecord]) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;
    for record in records {
        upsert_query(record).execute(&mut *tx).await?;
    }
    tx.commit().await?;
    Ok(())
}

pub async fn load_progress(pool: &PgPool) -> Result<Vec<ProgressRecord>, sqlx::Error> {
    let rows = sqlx::query(
        r#"
        SELECT id, user_id, video_id, playlist_id, watched_seconds, total_seconds,
               percent_complete, is_completed, last_watched_at, synced_from_offline,
               created_at, updated_at
        FROM progress
        "#,
    )
    .fetch_all(pool)
    .await?;

    rows.iter()
        .map(|row| {
            Ok(ProgressRecord {
                id: row.try_get::<Uuid, _>("id")?,
                user_id: row.try_get::<Uuid, _>("user_id")?,
                video_id: row.try_get("video_id")?,
                playlist_id: row.try_get("playlist_id")?,
                watched_seconds: seconds(row.try_get("watched_seconds")?)?,
                total_seconds: seconds(row.try_get("total_seconds")?)?,
                percent_complete: percent(row.try_get("percent_complete")?)?,
                is_completed: row.try_get("is_completed")?,
                last_watched_at: row.try_get::<DateTime<Utc>, _>("last_watched_at")?,
                synced_from_offline: row.try_get("synced_from_offline")?,
                created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
                updated_at: row.try_get::<DateTime<Utc>, _>("updated_at")?,
            })
        })
        .collect()
}

fn seconds(value: i64) -> Result<u32, sqlx::Error> {
    u32::try_from(value).map_err(|e| sqlx::Error::Decode(format!("Invalid seconds value {}: {}", value, e).into()))
}

fn percent(value: i16) -> Result<u8, sqlx::Error> {
    u8::try_from(value).map_err(|e| sqlx::Error::Decode(format!("Invalid percent value {}: {}", value, e).into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upsert_never_replaces_newer_row() {
        let (_, conflict) = UPSERT_PROGRESS.split_once("ON CONFLICT").unwrap();
        let guard = conflict.trim_end().lines().last().unwrap().trim();
        assert_eq!(guard, "WHERE progress.updated_at <= EXCLUDED.updated_at");
    }
}
