/**
 * Progress State Management
 *
 * In-memory progress store, one record per (user, video). This is the
 * runtime authority; PostgreSQL only mirrors it.
 *
 * # Write Rules
 *
 * - Direct updates stamp `lastWatchedAt` with the server clock and complete
 *   the video on the explicit flag or at 95%.
 * - Sync items keep their capture time. An item captured before the stored
 *   record's `lastWatchedAt` is ignored and the stored record is returned.
 */

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use uuid::Uuid;

use crate::shared::progress::{percent_complete, record_is_completed, ProgressRecord, ProgressUpdate, SyncItem};

/// Result of applying one sync item
#[derive(Debug, Clone, PartialEq)]
pub enum SyncApplied {
    Written(ProgressRecord),
    /// The stored record is newer than the item
    Stale(ProgressRecord),
}

impl SyncApplied {
    pub fn into_record(self) -> ProgressRecord {
        match self {
            Self::Written(record) | Self::Stale(record) => record,
        }
    }
}

#[derive(Debug, Default)]
pub struct ProgressStore {
    records: HashMap<(Uuid, String), ProgressRecord>,
}

struct Write<'a> {
    playlist_id: &'a str,
    watched_seconds: u32,
    total_seconds: u32,
    is_completed: bool,
    last_watched_at: DateTime<Utc>,
    synced_from_offline: bool,
}

impl ProgressStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild the store from persisted records
    pub fn from_records(records: impl IntoIterator<Item = ProgressRecord>) -> Self {
        let records = records
            .into_iter()
            .map(|record| ((record.user_id, record.video_id.clone()), record))
            .collect();
        Self { records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, user_id: Uuid, video_id: &str) -> Option<&ProgressRecord> {
        self.records.get(&(user_id, video_id.to_string()))
    }

    pub fn upsert(&mut self, user_id: Uuid, update: &ProgressUpdate, now: DateTime<Utc>) -> ProgressRecord {
        let percent = percent_complete(update.watched_seconds, update.total_seconds);
        self.write(
            user_id,
            &update.video_id,
            Write {
                playlist_id: &update.playlist_id,
                watched_seconds: update.watched_seconds,
                total_seconds: update.total_seconds,
                is_completed: record_is_completed(percent, update.is_completed),
                last_watched_at: now,
                synced_from_offline: update.synced_from_offline,
            },
            now,
        )
    }

    pub fn apply_sync_item(&mut self, user_id: Uuid, item: &SyncItem, now: DateTime<Utc>) -> SyncApplied {
        // Capture times are device clocks, so only order them against each other
        if let Some(existing) = self.get(user_id, &item.video_id) {
            if existing.synced_from_offline && item.last_watched_at < existing.last_watched_at {
                return SyncApplied::Stale(existing.clone());
            }
        }

        let percent = percent_complete(item.watched_seconds, item.total_seconds);
        SyncApplied::Written(self.write(
            user_id,
            &item.video_id,
            Write {
                playlist_id: &item.playlist_id,
                watched_seconds: item.watched_seconds,
                total_seconds: item.total_seconds,
                is_completed: record_is_completed(percent, false),
                last_watched_at: item.last_watched_at,
                synced_from_offline: true,
            },
            now,
        ))
    }

    /// All records of a user, most recently watched first
    pub fn for_user(&self, user_id: Uuid) -> Vec<ProgressRecord> {
        self.collect(|record| record.user_id == user_id)
    }

    pub fn for_playlist(&self, user_id: Uuid, playlist_id: &str) -> Vec<ProgressRecord> {
        self.collect(|record| record.user_id == user_id && record.playlist_id == playlist_id)
    }

    fn collect(&self, predicate: impl Fn(&ProgressRecord) -> bool) -> Vec<ProgressRecord> {
        let mut records: Vec<ProgressRecord> = self
            .records
            .values()
            .filter(|record| predicate(*record))
            .cloned()
            .collect();
        records.sort_by(|a, b| b.last_watched_at.cmp(&a.last_watched_at));
        records
    }

    fn write(&mut self, user_id: Uuid, video_id: &str, write: Write<'_>, now: DateTime<Utc>) -> ProgressRecord {
        let record = self
            .records
            .entry((user_id, video_id.to_string()))
            .or_insert_with(|| ProgressRecord {
                id: Uuid::new_v4(),
                user_id,
                video_id: video_id.to_string(),
                playlist_id: write.playlist_id.to_string(),
                watched_seconds: 0,
                total_seconds: 0,
                percent_complete: 0,
                is_completed: false,
                last_watched_at: write.last_watched_at,
                synced_from_offline: false,
                created_at: now,
                updated_at: now,
            });

        record.playlist_id = write.playlist_id.to_string();
        record.watched_seconds = write.watched_seconds;
        record.total_seconds = write.total_seconds;
        record.percent_complete = percent_complete(write.watched_seconds, write.total_seconds);
        record.is_completed = write.is_completed;
        record.last_watched_at = write.last_watched_at;
        record.synced_from_offline = write.synced_from_offline;
        record.updated_at = now;
        record.clone()
    }
}
