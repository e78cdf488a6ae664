//! # Offline Progress System
//!
//! Offline-first progress tracking: ticks are written to the server when
//! possible and queued locally otherwise, and the queue is replayed in one
//! batch when connectivity returns.
//!
//! ## Key Components
//!
//! - `queue.rs`: the durable queue of unsynced progress
//! - `recorder.rs`: the per-tick write path
//! - `reconciler.rs`: the batch replay of the queue
//! - `retry.rs`: backoff between failed sync passes
//!
//! [`OfflineManager`] wires all of them together with the local database,
//! the HTTP client, the network monitor and the background sync service.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use eduflex::client::config::Config;
//! use eduflex::client::offline::{OfflineManager, ProgressTick};
//!
//! # async fn demo() -> Result<(), eduflex::client::ClientError> {
//! let mut manager = OfflineManager::open(Config::from_env()?).await?;
//! manager.start()?;
//!
//! manager.record_tick(ProgressTick::new("v1", "p1", 30, 600)).await;
//!
//! for view in manager.playlist_progress("p1").await? {
//!     println!("{}: {}% (pending: {})", view.video_id, view.percent_complete, view.pending_sync);
//! }
//! # Ok(())
//! # }
//! ```

pub mod queue;
pub mod reconciler;
pub mod recorder;
pub mod retry;

pub use queue::{EntryState, MemoryProgressStore, NewOfflineProgress, OfflineProgressEntry, OfflineProgressStore};
pub use reconciler::{SyncError, SyncOutcome, SyncReconciler};
pub use recorder::{CompletionEvent, Delivery, ProgressRecorder, ProgressTick, TickCadence, TickReport};
pub use retry::{BackoffStrategy, SyncBackoff};

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::client::api::{ProgressApiClient, RemoteAuthority};
use crate::client::config::Config;
use crate::client::error::ClientError;
use crate::client::local_db::LocalDatabase;
use crate::client::sync::{
    ConnectivityEvent, ConnectivityProbe, ConnectivityState, NetworkMonitor, SyncConfig,
    SyncIndicator, SyncService, SyncState, TcpProbe,
};
use crate::shared::config::AppConfig;
use crate::shared::progress::{percent_complete, tick_is_completed, ProgressRecord};

/// Progress of one video as shown to the user
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressView {
    pub video_id: String,
    pub playlist_id: String,
    pub watched_seconds: u32,
    pub total_seconds: u32,
    pub percent_complete: u8,
    pub is_completed: bool,
    pub last_watched_at: DateTime<Utc>,
    /// Local progress the server has not confirmed yet
    pub pending_sync: bool,
}

impl From<&ProgressRecord> for ProgressView {
    fn from(record: &ProgressRecord) -> Self {
        Self {
            video_id: record.video_id.clone(),
            playlist_id: record.playlist_id.clone(),
            watched_seconds: record.watched_seconds,
            total_seconds: record.total_seconds,
            percent_complete: record.percent_complete,
            is_completed: record.is_completed,
            last_watched_at: record.last_watched_at,
            pending_sync: false,
        }
    }
}

impl From<&OfflineProgressEntry> for ProgressView {
    fn from(entry: &OfflineProgressEntry) -> Self {
        Self {
            video_id: entry.video_id.clone(),
            playlist_id: entry.playlist_id.clone(),
            watched_seconds: entry.watched_seconds,
            total_seconds: entry.total_seconds,
            percent_complete: percent_complete(entry.watched_seconds, entry.total_seconds),
            is_completed: tick_is_completed(entry.watched_seconds, entry.total_seconds),
            last_watched_at: entry.created_at,
            pending_sync: true,
        }
    }
}

/// Overlay pending local entries on top of server records.
///
/// A pending entry replaces the server view when it was captured at or
/// after the server's `last_watched_at`. Completion never regresses.
pub fn overlay_pending(records: &[ProgressRecord], pending: &[OfflineProgressEntry]) -> Vec<ProgressView> {
    let mut views: HashMap<String, ProgressView> = records
        .iter()
        .map(|record| (record.video_id.clone(), ProgressView::from(record)))
        .collect();

    for entry in pending {
        let local = ProgressView::from(entry);
        match views.get_mut(&entry.video_id) {
            Some(view) if entry.created_at < view.last_watched_at => {}
            Some(view) => {
                let was_completed = view.is_completed;
                *view = local;
                view.is_completed |= was_completed;
            }
            None => {
                views.insert(entry.video_id.clone(), local);
            }
        }
    }

    let mut views: Vec<ProgressView> = views.into_values().collect();
    views.sort_by(|a, b| b.last_watched_at.cmp(&a.last_watched_at));
    views
}

/// Connectivity and sync state in one snapshot
#[derive(Debug, Clone, PartialEq)]
pub struct OfflineStatus {
    pub connectivity: ConnectivityState,
    pub sync: SyncState,
    pub indicator: SyncIndicator,
}

/// Main offline manager coordinating all offline functionality
pub struct OfflineManager {
    app: AppConfig,
    database: LocalDatabase,
    api: Option<Arc<ProgressApiClient>>,
    remote: Arc<dyn RemoteAuthority>,
    monitor: Arc<NetworkMonitor>,
    recorder: Arc<ProgressRecorder>,
    reconciler: Arc<SyncReconciler>,
    sync: SyncService,
    probe: Option<Arc<dyn ConnectivityProbe>>,
    polling: Option<JoinHandle<()>>,
}

impl OfflineManager {
    /// Build the full client stack from configuration.
    ///
    /// Opens the local database, restores a cached bearer token when the
    /// configuration has none, and reads the initial connectivity from a
    /// TCP probe of the server.
    pub async fn open(config: Config) -> Result<Self, ClientError> {
        let database = LocalDatabase::open(config.database_path()).await?;

        let api = Arc::new(ProgressApiClient::new(config.clone())?);
        if config.get_token().is_none() {
            if let Some(session) = database.cached_user_session().await? {
                debug!("Restored cached session token");
                api.set_token(Some(session.token)).await;
            }
        }

        let probe: Arc<dyn ConnectivityProbe> =
            Arc::new(TcpProbe::for_server(config.server_url(), config.request_timeout())?);
        let monitor = Arc::new(NetworkMonitor::detect(probe.as_ref()).await);

        let remote: Arc<dyn RemoteAuthority> = api.clone();
        let mut manager = Self::assemble(config.app().clone(), database, remote, monitor);
        manager.api = Some(api);
        manager.probe = Some(probe);
        Ok(manager)
    }

    /// Wire the components around an existing database, server client and
    /// monitor. No connectivity polling is set up.
    pub fn assemble(
        app: AppConfig,
        database: LocalDatabase,
        remote: Arc<dyn RemoteAuthority>,
        monitor: Arc<NetworkMonitor>,
    ) -> Self {
        let store: Arc<dyn OfflineProgressStore> = Arc::new(database.clone());

        let recorder = Arc::new(
            ProgressRecorder::new(store.clone(), remote.clone(), monitor.clone())
                .with_direct_write_cooldown(app.direct_write_cooldown()),
        );
        let reconciler = Arc::new(
            SyncReconciler::new(store, remote.clone(), monitor.clone())
                .with_collapsed_batches(app.collapse_sync_batches),
        );
        let sync = SyncService::new(SyncConfig::from_app_config(&app), reconciler.clone());

        Self {
            app,
            database,
            api: None,
            remote,
            monitor,
            recorder,
            reconciler,
            sync,
            probe: None,
            polling: None,
        }
    }

    /// Start background sync and connectivity polling
    pub fn start(&mut self) -> Result<(), ClientError> {
        self.sync.start()?;
        if let Some(probe) = &self.probe {
            if self.polling.is_none() {
                self.polling = Some(
                    self.monitor
                        .spawn_polling(probe.clone(), self.app.probe_interval()),
                );
            }
        }
        Ok(())
    }

    pub fn stop(&mut self) {
        self.sync.stop();
        if let Some(handle) = self.polling.take() {
            handle.abort();
        }
    }

    pub async fn record_tick(&self, tick: ProgressTick) -> TickReport {
        self.recorder.record_tick(tick).await
    }

    /// Run a reconciliation pass now
    pub async fn sync_now(&self) -> Result<SyncOutcome, SyncError> {
        self.sync.force_sync().await
    }

    /// Feed a platform connectivity signal
    pub fn report_connectivity(&self, online: bool) -> Option<ConnectivityEvent> {
        self.monitor.report(online)
    }

    pub fn status(&self) -> OfflineStatus {
        OfflineStatus {
            connectivity: self.monitor.state(),
            sync: self.sync.status(),
            indicator: self.sync.indicator(),
        }
    }

    /// Progress for a playlist, server records overlaid with pending local
    /// entries. Works offline from the local queue alone.
    pub async fn playlist_progress(&self, playlist_id: &str) -> Result<Vec<ProgressView>, ClientError> {
        let records = if self.monitor.is_online() {
            match self.remote.playlist_progress(playlist_id).await {
                Ok(records) => records,
                Err(e) => {
                    warn!("Failed to fetch progress for playlist {}: {}", playlist_id, e);
                    Vec::new()
                }
            }
        } else {
            Vec::new()
        };

        self.recorder
            .seed_completed(
                records
                    .iter()
                    .filter(|record| record.is_completed)
                    .map(|record| record.video_id.clone()),
            )
            .await;

        let pending = self.database.unsynced_for_playlist(playlist_id).await?;
        Ok(overlay_pending(&records, &pending))
    }

    /// Store a signed-in session and use its token for server calls
    pub async fn sign_in(&self, token: &str, user: &serde_json::Value) -> Result<(), ClientError> {
        self.database.cache_user_session(token, user).await?;
        if let Some(api) = &self.api {
            api.set_token(Some(token.to_string())).await;
        }
        info!("Session cached for offline use");
        Ok(())
    }

    pub async fn sign_out(&self) -> Result<(), ClientError> {
        self.database.clear_user_session().await?;
        if let Some(api) = &self.api {
            api.set_token(None).await;
        }
        Ok(())
    }

    pub fn database(&self) -> &LocalDatabase {
        &self.database
    }

    pub fn recorder(&self) -> &Arc<ProgressRecorder> {
        &self.recorder
    }

    pub fn reconciler(&self) -> &Arc<SyncReconciler> {
        &self.reconciler
    }

    pub fn monitor(&self) -> &Arc<NetworkMonitor> {
        &self.monitor
    }

    pub fn sync_service(&self) -> &SyncService {
        &self.sync
    }
}

impl Drop for OfflineManager {
    fn drop(&mut self) {
        if let Some(handle) = self.polling.take() {
            handle.abort();
        }
    }
}
