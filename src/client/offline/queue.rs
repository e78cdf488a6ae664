//! # Offline Progress Queue
//!
//! The append-only queue of progress ticks that could not be delivered to
//! the server. Entries move through two states:
//!
//! - **Pending**: appended by the recorder, waiting for a sync pass
//! - **Confirmed**: accepted by the server, waiting to be pruned
//!
//! The queue is abstracted behind [`OfflineProgressStore`] so the recorder
//! and reconciler can run against SQLite ([`LocalDatabase`]) or the
//! in-memory [`MemoryProgressStore`].
//!
//! ## Usage
//!
//! ```rust,no_run
//! use eduflex::client::offline::queue::{MemoryProgressStore, NewOfflineProgress, OfflineProgressStore};
//!
//! # async fn demo() -> Result<(), eduflex::client::local_db::StorageError> {
//! let store = MemoryProgressStore::new();
//! let entry = store
//!     .append_offline_progress(NewOfflineProgress {
//!         video_id: "v1".to_string(),
//!         playlist_id: "p1".to_string(),
//!         watched_seconds: 10,
//!         total_seconds: 100,
//!     })
//!     .await?;
//!
//! store.mark_synced(&[entry.id]).await?;
//! store.prune_synced().await?;
//! # Ok(())
//! # }
//! ```
//!
//! [`LocalDatabase`]: crate::client::local_db::LocalDatabase

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tokio::sync::RwLock;

use crate::client::local_db::Result;
use crate::shared::progress::SyncItem;

/// A progress tick about to be queued
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOfflineProgress {
    pub video_id: String,
    pub playlist_id: String,
    pub watched_seconds: u32,
    pub total_seconds: u32,
}

/// A queued progress tick
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfflineProgressEntry {
    /// Local sequence number, increasing in append order
    pub id: i64,
    pub video_id: String,
    pub playlist_id: String,
    pub watched_seconds: u32,
    pub total_seconds: u32,
    /// When the tick was captured; sent to the server as `lastWatchedAt`
    pub created_at: DateTime<Utc>,
    /// Set once the server accepted the entry
    pub synced_at: Option<DateTime<Utc>>,
}

/// Where an entry is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntryState {
    /// Not yet accepted by the server
    Pending,
    /// Accepted by the server, eligible for pruning
    Confirmed,
}

impl OfflineProgressEntry {
    pub fn state(&self) -> EntryState {
        match self.synced_at {
            Some(_) => EntryState::Confirmed,
            None => EntryState::Pending,
        }
    }

    /// Wire form used in a batch sync request
    pub fn to_sync_item(&self) -> SyncItem {
        SyncItem {
            video_id: self.video_id.clone(),
            playlist_id: self.playlist_id.clone(),
            watched_seconds: self.watched_seconds,
            total_seconds: self.total_seconds,
            last_watched_at: self.created_at,
            synced_from_offline: true,
        }
    }
}

/// Durable queue of unsynced progress
///
/// Operations are atomic with respect to each other. `mark_synced` only
/// stamps entries that are still pending, so repeating it is harmless.
#[async_trait]
pub trait OfflineProgressStore: Send + Sync {
    /// Append an entry with `created_at = now` and no `synced_at`
    async fn append_offline_progress(&self, entry: NewOfflineProgress)
        -> Result<OfflineProgressEntry>;

    /// All pending entries, oldest first
    async fn list_unsynced(&self) -> Result<Vec<OfflineProgressEntry>>;

    /// Number of pending entries
    async fn count_unsynced(&self) -> Result<u64> {
        Ok(self.list_unsynced().await?.len() as u64)
    }

    /// Stamp `synced_at = now` on the given entries that are still pending.
    /// Returns how many entries changed state.
    async fn mark_synced(&self, ids: &[i64]) -> Result<u64>;

    /// Delete every confirmed entry. Returns how many were removed.
    async fn prune_synced(&self) -> Result<u64>;
}

/// In-memory progress queue
///
/// Loses its contents on restart; used for tests and for sessions that run
/// without a writable data directory.
#[derive(Debug, Default)]
pub struct MemoryProgressStore {
    inner: RwLock<MemoryQueue>,
}

#[derive(Debug, Default)]
struct MemoryQueue {
    next_id: i64,
    entries: VecDeque<OfflineProgressEntry>,
}

impl MemoryProgressStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every entry, pending or confirmed, in append order
    pub async fn all_entries(&self) -> Vec<OfflineProgressEntry> {
        self.inner.read().await.entries.iter().cloned().collect()
    }
}

#[async_trait]
impl OfflineProgressStore for MemoryProgressStore {
    async fn append_offline_progress(
        &self,
        entry: NewOfflineProgress,
    ) -> Result<OfflineProgressEntry> {
        let mut queue = self.inner.write().await;
        queue.next_id += 1;
        let stored = OfflineProgressEntry {
            id: queue.next_id,
            video_id: entry.video_id,
            playlist_id: entry.playlist_id,
            watched_seconds: entry.watched_seconds,
            total_seconds: entry.total_seconds,
            created_at: Utc::now(),
            synced_at: None,
        };
        queue.entries.push_back(stored.clone());
        Ok(stored)
    }

    async fn list_unsynced(&self) -> Result<Vec<OfflineProgressEntry>> {
        let queue = self.inner.read().await;
        Ok(queue
            .entries
            .iter()
            .filter(|e| e.synced_at.is_none())
            .cloned()
            .collect())
    }

    async fn mark_synced(&self, ids: &[i64]) -> Result<u64> {
        let mut queue = self.inner.write().await;
        let now = Utc::now();
        let mut marked = 0;
        for entry in queue.entries.iter_mut() {
            if entry.synced_at.is_none() && ids.contains(&entry.id) {
                entry.synced_at = Some(now);
                marked += 1;
            }
        }
        Ok(marked)
    }

    async fn prune_synced(&self) -> Result<u64> {
        let mut queue = self.inner.write().await;
        let before = queue.entries.len();
        queue.entries.retain(|e| e.synced_at.is_none());
        Ok((before - queue.entries.len()) as u64)
    }
}
