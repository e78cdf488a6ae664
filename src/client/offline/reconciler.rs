//! # Sync Reconciler
//!
//! Drains the offline progress queue into the server in a single batch.
//!
//! A pass snapshots the pending entries, submits them with one
//! `POST /api/progress/sync`, and only after the server accepted the batch
//! marks exactly the snapshotted entries as synced and prunes them. Entries
//! appended while the pass runs are left for the next pass. If anything
//! fails before the mark, nothing local changes and the batch is resent
//! later; the server upserts, so resending is harmless.
//!
//! Entries that would fail server validation (an empty video or playlist
//! id) are discarded with a warning before the batch is built.
//!
//! Only one pass runs at a time. A trigger that arrives while a pass is in
//! flight returns [`SyncOutcome::Coalesced`] without touching the store or
//! the server.

use chrono::Utc;
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{watch, Mutex};
use tracing::{debug, info, warn};

use crate::client::api::{ApiError, RemoteAuthority};
use crate::client::local_db::StorageError;
use crate::client::offline::queue::{OfflineProgressEntry, OfflineProgressStore};
use crate::client::sync::network_monitor::NetworkMonitor;
use crate::client::sync::sync_state::{SyncPhase, SyncState};
use crate::shared::progress::SyncItem;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("sync request failed: {0}")]
    Remote(#[from] ApiError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Not online; nothing attempted
    Offline,
    /// The queue was empty
    NothingToSync,
    /// Another pass was already running
    Coalesced,
    /// `entries` local entries confirmed via a batch of `submitted` items
    Synced { entries: usize, submitted: usize },
}

/// Build the batch for a snapshot of pending entries.
///
/// With `collapse` only the newest entry per video is sent; the server
/// keeps one record per video, so older ones would be overwritten anyway.
pub fn build_batch(entries: &[OfflineProgressEntry], collapse: bool) -> Vec<SyncItem> {
    if !collapse {
        return entries.iter().map(OfflineProgressEntry::to_sync_item).collect();
    }

    let mut seen = HashSet::new();
    let mut batch: Vec<SyncItem> = entries
        .iter()
        .rev()
        .filter(|entry| seen.insert(entry.video_id.as_str()))
        .map(OfflineProgressEntry::to_sync_item)
        .collect();
    batch.reverse();
    batch
}

pub struct SyncReconciler {
    store: Arc<dyn OfflineProgressStore>,
    remote: Arc<dyn RemoteAuthority>,
    monitor: Arc<NetworkMonitor>,
    gate: Mutex<()>,
    state: watch::Sender<SyncState>,
    collapse_batches: bool,
}

impl SyncReconciler {
    pub fn new(
        store: Arc<dyn OfflineProgressStore>,
        remote: Arc<dyn RemoteAuthority>,
        monitor: Arc<NetworkMonitor>,
    ) -> Self {
        let (state, _) = watch::channel(SyncState::default());
        Self {
            store,
            remote,
            monitor,
            gate: Mutex::new(()),
            state,
            collapse_batches: false,
        }
    }

    pub fn with_collapsed_batches(mut self, collapse: bool) -> Self {
        self.collapse_batches = collapse;
        self
    }

    /// Run one reconciliation pass
    pub async fn sync_offline_data(&self) -> Result<SyncOutcome, SyncError> {
        let Ok(_pass) = self.gate.try_lock() else {
            debug!("Sync already in progress, dropping trigger");
            return Ok(SyncOutcome::Coalesced);
        };

        if !self.monitor.is_online() {
            return Ok(SyncOutcome::Offline);
        }

        let episodes_at_start = self.monitor.state().offline_episodes;

        let entries = match self.store.list_unsynced().await {
            Ok(entries) => entries,
            Err(e) => return Err(self.fail(e.into())),
        };

        let (entries, invalid): (Vec<_>, Vec<_>) = entries
            .into_iter()
            .partition(|entry| entry.to_sync_item().validate().is_ok());
        if !invalid.is_empty() {
            if let Err(e) = self.discard(&invalid).await {
                return Err(self.fail(e));
            }
        }

        if entries.is_empty() {
            self.state.send_modify(|state| state.pending_entries = 0);
            return Ok(SyncOutcome::NothingToSync);
        }

        self.state.send_modify(|state| {
            state.phase = SyncPhase::Syncing;
            state.pending_entries = entries.len() as u64;
        });

        let batch = build_batch(&entries, self.collapse_batches);
        debug!("Submitting {} offline progress items ({} entries)", batch.len(), entries.len());

        if let Err(e) = self.remote.sync_progress(&batch).await {
            return Err(self.fail(e.into()));
        }

        let ids: Vec<i64> = entries.iter().map(|entry| entry.id).collect();
        if let Err(e) = self.store.mark_synced(&ids).await {
            return Err(self.fail(e.into()));
        }

        // Confirmed entries are already excluded from the queue; a failed
        // prune only leaves them on disk until the next pass.
        if let Err(e) = self.store.prune_synced().await {
            warn!("Failed to prune synced progress entries: {}", e);
        }

        self.monitor.clear_was_offline(episodes_at_start);

        let pending = match self.store.count_unsynced().await {
            Ok(count) => count,
            Err(e) => {
                warn!("Failed to count pending progress entries: {}", e);
                0
            }
        };

        self.state.send_modify(|state| {
            state.phase = SyncPhase::Synced;
            state.last_sync = Some(Utc::now());
            state.last_synced_count = entries.len();
            state.pending_entries = pending;
            state.last_error = None;
        });

        info!("Synced {} offline progress entries", entries.len());

        Ok(SyncOutcome::Synced {
            entries: entries.len(),
            submitted: batch.len(),
        })
    }

    /// Drop entries the server would reject; one of them in a batch would
    /// fail the whole batch on every pass.
    async fn discard(&self, invalid: &[OfflineProgressEntry]) -> Result<(), SyncError> {
        for entry in invalid {
            warn!(
                "Discarding invalid offline progress entry {} (video '{}', playlist '{}')",
                entry.id, entry.video_id, entry.playlist_id
            );
        }
        let ids: Vec<i64> = invalid.iter().map(|entry| entry.id).collect();
        self.store.mark_synced(&ids).await?;
        if let Err(e) = self.store.prune_synced().await {
            warn!("Failed to prune discarded progress entries: {}", e);
        }
        Ok(())
    }

    pub fn state(&self) -> SyncState {
        self.state.borrow().clone()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<SyncState> {
        self.state.subscribe()
    }

    pub fn monitor(&self) -> &Arc<NetworkMonitor> {
        &self.monitor
    }

    pub fn store(&self) -> &Arc<dyn OfflineProgressStore> {
        &self.store
    }

    fn fail(&self, error: SyncError) -> SyncError {
        warn!("Sync pass failed: {}", error);
        let message = error.to_string();
        self.state.send_modify(|state| {
            state.phase = SyncPhase::Failed;
            state.last_error = Some(message);
        });
        error
    }
}
