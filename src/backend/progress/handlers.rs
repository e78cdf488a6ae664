/**
 * Progress Handlers
 *
 * HTTP handlers for `/api/progress`. All of them run behind the auth
 * middleware and only ever see the caller's own records.
 *
 * # Routes
 *
 * - `POST /api/progress` - upsert one record
 * - `GET /api/progress` - all records, most recently watched first
 * - `GET /api/progress/playlist/{playlist_id}` - records of one playlist
 * - `POST /api/progress/sync` - replay a batch of offline progress
 *
 * Records are written to memory first, then mirrored to PostgreSQL while
 * the store lock is still held. A failed database write is logged and
 * does not fail the request.
 */

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};
use chrono::Utc;
use sqlx::PgPool;
use tracing::{debug, info, warn};

use crate::backend::error::BackendError;
use crate::backend::middleware::AuthUser;
use crate::backend::progress::db::{save_progress, save_progress_batch};
use crate::backend::server::state::SharedProgressStore;
use crate::shared::progress::{ApiResponse, ProgressRecord, ProgressUpdate, SyncRequest};

type ProgressResult<T> = Result<Json<ApiResponse<T>>, BackendError>;

pub async fn update_progress(
    State(store): State<SharedProgressStore>,
    State(db_pool): State<Option<PgPool>>,
    AuthUser(user): AuthUser,
    payload: Result<Json<ProgressUpdate>, JsonRejection>,
) -> ProgressResult<ProgressRecord> {
    let Json(update) = payload?;
    update.validate()?;

    // The guard is held across the database write so rows land in memory order
    let mut store = store.write().await;
    let record = store.upsert(user.user_id, &update, Utc::now());
    debug!(
        "Progress for user {} video {}: {}%",
        user.user_id, record.video_id, record.percent_complete
    );

    if let Some(pool) = &db_pool {
        if let Err(e) = save_progress(pool, &record).await {
            warn!("Failed to persist progress for video {}: {:?}", record.video_id, e);
        }
    }
    drop(store);

    Ok(Json(ApiResponse::ok(record)))
}

pub async fn get_all_progress(
    State(store): State<SharedProgressStore>,
    AuthUser(user): AuthUser,
) -> ProgressResult<Vec<ProgressRecord>> {
    let records = store.read().await.for_user(user.user_id);
    Ok(Json(ApiResponse::ok(records)))
}

pub async fn get_playlist_progress(
    State(store): State<SharedProgressStore>,
    AuthUser(user): AuthUser,
    Path(playlist_id): Path<String>,
) -> ProgressResult<Vec<ProgressRecord>> {
    let records = store.read().await.for_playlist(user.user_id, &playlist_id);
    Ok(Json(ApiResponse::ok(records)))
}

/// Apply a batch in order. The whole batch is validated before any item
/// is written.
pub async fn sync_progress(
    State(store): State<SharedProgressStore>,
    State(db_pool): State<Option<PgPool>>,
    AuthUser(user): AuthUser,
    payload: Result<Json<SyncRequest>, JsonRejection>,
) -> ProgressResult<Vec<ProgressRecord>> {
    let Json(request) = payload?;
    for item in &request.progress_data {
        item.validate()?;
    }

    let now = Utc::now();
    let mut store = store.write().await;
    let records: Vec<ProgressRecord> = request
        .progress_data
        .iter()
        .map(|item| store.apply_sync_item(user.user_id, item, now).into_record())
        .collect();
    info!("Synced {} offline progress records for user {}", records.len(), user.user_id);

    if let Some(pool) = &db_pool {
        if let Err(e) = save_progress_batch(pool, &records).await {
            warn!("Failed to persist synced progress: {:?}", e);
        }
    }
    drop(store);

    let message = format!("Synced {} progress records", records.len());
    Ok(Json(ApiResponse::with_message(records, message)))
}
