//! Test doubles for the client components.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, Notify};
use uuid::Uuid;

use crate::client::api::{ApiError, RemoteAuthority};
use crate::client::local_db::{Result, StorageError};
use crate::client::offline::queue::{NewOfflineProgress, OfflineProgressEntry, OfflineProgressStore};
use crate::shared::progress::{percent_complete, ProgressRecord, ProgressUpdate, SyncItem};

/// In-process server stand-in keeping one record per video
#[derive(Default)]
pub(crate) struct FakeRemote {
    records: Mutex<HashMap<String, ProgressRecord>>,
    upserts: Mutex<Vec<ProgressUpdate>>,
    batches: Mutex<Vec<Vec<SyncItem>>>,
    failure: Mutex<Option<ApiError>>,
    sync_gate: Mutex<Option<Arc<Notify>>>,
    sync_started: Notify,
}

impl FakeRemote {
    pub(crate) async fn fail_with(&self, error: ApiError) {
        *self.failure.lock().await = Some(error);
    }

    pub(crate) async fn recover(&self) {
        *self.failure.lock().await = None;
    }

    /// Block the next sync request until `release` is notified
    pub(crate) async fn hold_sync(&self, release: Arc<Notify>) {
        *self.sync_gate.lock().await = Some(release);
    }

    pub(crate) async fn wait_for_sync_started(&self) {
        self.sync_started.notified().await;
    }

    pub(crate) async fn upsert_count(&self) -> usize {
        self.upserts.lock().await.len()
    }

    pub(crate) async fn batches(&self) -> Vec<Vec<SyncItem>> {
        self.batches.lock().await.clone()
    }

    pub(crate) async fn record(&self, video_id: &str) -> Option<ProgressRecord> {
        self.records.lock().await.get(video_id).cloned()
    }

    pub(crate) async fn insert_record(&self, record: ProgressRecord) {
        self.records.lock().await.insert(record.video_id.clone(), record);
    }

    async fn check_failure(&self) -> std::result::Result<(), ApiError> {
        match self.failure.lock().await.clone() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    async fn apply(
        &self,
        video_id: &str,
        playlist_id: &str,
        watched_seconds: u32,
        total_seconds: u32,
        is_completed: bool,
        last_watched_at: DateTime<Utc>,
        synced_from_offline: bool,
    ) -> ProgressRecord {
        let now = Utc::now();
        let mut records = self.records.lock().await;
        let percent = percent_complete(watched_seconds, total_seconds);
        let record = records
            .entry(video_id.to_string())
            .or_insert_with(|| ProgressRecord {
                id: Uuid::new_v4(),
                user_id: Uuid::nil(),
                video_id: video_id.to_string(),
                playlist_id: playlist_id.to_string(),
                watched_seconds: 0,
                total_seconds: 0,
                percent_complete: 0,
                is_completed: false,
                last_watched_at: now,
                synced_from_offline: false,
                created_at: now,
                updated_at: now,
            });
        record.playlist_id = playlist_id.to_string();
        record.watched_seconds = watched_seconds;
        record.total_seconds = total_seconds;
        record.percent_complete = percent;
        record.is_completed = is_completed || percent >= 95;
        record.last_watched_at = last_watched_at;
        record.synced_from_offline = synced_from_offline;
        record.updated_at = now;
        record.clone()
    }
}

#[async_trait]
impl RemoteAuthority for FakeRemote {
    async fn upsert_progress(&self, update: &ProgressUpdate) -> std::result::Result<ProgressRecord, ApiError> {
        self.upserts.lock().await.push(update.clone());
        self.check_failure().await?;
        Ok(self
            .apply(
                &update.video_id,
                &update.playlist_id,
                update.watched_seconds,
                update.total_seconds,
                update.is_completed,
                Utc::now(),
                false,
            )
            .await)
    }

    async fn sync_progress(&self, items: &[SyncItem]) -> std::result::Result<Vec<ProgressRecord>, ApiError> {
        self.batches.lock().await.push(items.to_vec());
        self.sync_started.notify_one();

        let gate = self.sync_gate.lock().await.take();
        if let Some(release) = gate {
            release.notified().await;
        }

        self.check_failure().await?;
        let mut records = Vec::with_capacity(items.len());
        for item in items {
            records.push(
                self.apply(
                    &item.video_id,
                    &item.playlist_id,
                    item.watched_seconds,
                    item.total_seconds,
                    false,
                    item.last_watched_at,
                    true,
                )
                .await,
            );
        }
        Ok(records)
    }

    async fn playlist_progress(&self, playlist_id: &str) -> std::result::Result<Vec<ProgressRecord>, ApiError> {
        self.check_failure().await?;
        let records = self.records.lock().await;
        Ok(records
            .values()
            .filter(|r| r.playlist_id == playlist_id)
            .cloned()
            .collect())
    }

    async fn all_progress(&self) -> std::result::Result<Vec<ProgressRecord>, ApiError> {
        self.check_failure().await?;
        Ok(self.records.lock().await.values().cloned().collect())
    }
}

/// Store whose every operation fails
pub(crate) struct FailingStore;

fn disk_full() -> StorageError {
    StorageError::Io(std::io::Error::new(std::io::ErrorKind::Other, "disk full"))
}

#[async_trait]
impl OfflineProgressStore for FailingStore {
    async fn append_offline_progress(&self, _entry: NewOfflineProgress) -> Result<OfflineProgressEntry> {
        Err(disk_full())
    }

    async fn list_unsynced(&self) -> Result<Vec<OfflineProgressEntry>> {
        Err(disk_full())
    }

    async fn mark_synced(&self, _ids: &[i64]) -> Result<u64> {
        Err(disk_full())
    }

    async fn prune_synced(&self) -> Result<u64> {
        Err(disk_full())
    }
}
