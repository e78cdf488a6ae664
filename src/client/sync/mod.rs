//! # Background Sync Service
//!
//! Owns the triggers for reconciliation passes and runs them in the
//! background.
//!
//! ## Architecture
//!
//! - **Network Monitor**: connectivity state and edge-triggered events
//! - **Sync Reconciler**: one batch pass over the offline queue
//! - **Backoff**: spaces out automatic passes after failures
//! - **Sync State**: what the UI shows (offline, syncing, synced)
//! - **Metrics**: pass counters for diagnostics
//!
//! ## Triggers
//!
//! - `ConnectionRestored`: reset the backoff and run a pass right away
//! - Every `sync_interval`: level check, run a pass when online and either
//!   an outage happened since the last successful pass or entries are
//!   pending, unless backing off
//! - A lagged event receiver falls back to a level check
//!
//! ## Usage
//!
//! ```rust,no_run
//! use eduflex::client::sync::{SyncConfig, SyncService};
//! # use std::sync::Arc;
//! # use eduflex::client::offline::reconciler::SyncReconciler;
//!
//! # async fn demo(reconciler: Arc<SyncReconciler>) -> Result<(), Box<dyn std::error::Error>> {
//! let mut sync_service = SyncService::new(SyncConfig::default(), reconciler);
//!
//! // Start background sync
//! sync_service.start()?;
//!
//! // Monitor sync status
//! println!("Sync status: {:?}", sync_service.status());
//!
//! // Force immediate sync
//! sync_service.force_sync().await?;
//! # Ok(())
//! # }
//! ```

pub mod metrics;
pub mod network_monitor;
pub mod sync_state;

pub use metrics::SyncMetrics;
pub use network_monitor::{ConnectivityEvent, ConnectivityProbe, ConnectivityState, NetworkMonitor, NetworkStatus, TcpProbe};
pub use sync_state::{SyncIndicator, SyncPhase, SyncState};

use chrono::Utc;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{watch, Mutex};
use tracing::{debug, error, info, warn};

use crate::client::offline::reconciler::{SyncError, SyncOutcome, SyncReconciler};
use crate::client::offline::retry::{BackoffStrategy, SyncBackoff};
use crate::shared::config::AppConfig;

/// Configuration for the sync service
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Run passes from the background loop; `force_sync` works either way
    pub auto_sync: bool,
    /// Interval of the level check
    pub sync_interval: Duration,
    /// Delay policy after failed passes
    pub backoff: BackoffStrategy,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            auto_sync: true,
            sync_interval: Duration::from_secs(30),
            backoff: BackoffStrategy::default(),
        }
    }
}

impl SyncConfig {
    pub fn from_app_config(app: &AppConfig) -> Self {
        Self {
            sync_interval: app.sync_interval(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Error)]
pub enum SyncServiceError {
    #[error("sync service is already running")]
    AlreadyRunning,
}

/// Main sync service coordinator
pub struct SyncService {
    config: SyncConfig,
    reconciler: Arc<SyncReconciler>,
    backoff: Arc<Mutex<SyncBackoff>>,
    metrics: Arc<Mutex<SyncMetrics>>,
    /// Background sync task handle
    background_task: Option<tokio::task::JoinHandle<()>>,
}

impl SyncService {
    pub fn new(config: SyncConfig, reconciler: Arc<SyncReconciler>) -> Self {
        let backoff = Arc::new(Mutex::new(SyncBackoff::new(config.backoff.clone())));
        Self {
            config,
            reconciler,
            backoff,
            metrics: Arc::new(Mutex::new(SyncMetrics::new())),
            background_task: None,
        }
    }

    /// Start the background sync loop
    pub fn start(&mut self) -> Result<(), SyncServiceError> {
        if self.is_running() {
            return Err(SyncServiceError::AlreadyRunning);
        }

        let reconciler = Arc::clone(&self.reconciler);
        let backoff = Arc::clone(&self.backoff);
        let metrics = Arc::clone(&self.metrics);
        let config = self.config.clone();

        // Subscribe before spawning so no transition is missed in between
        let events = reconciler.monitor().subscribe();

        let handle = tokio::spawn(async move {
            Self::background_sync_loop(reconciler, backoff, metrics, config, events).await;
        });

        info!("Sync service started (interval {:?})", self.config.sync_interval);
        self.background_task = Some(handle);
        Ok(())
    }

    /// Stop the background sync loop
    pub fn stop(&mut self) {
        if let Some(handle) = self.background_task.take() {
            handle.abort();
            info!("Sync service stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.background_task
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Run a pass now, ignoring the backoff
    pub async fn force_sync(&self) -> Result<SyncOutcome, SyncError> {
        Self::run_pass(&self.reconciler, &self.backoff, &self.metrics).await
    }

    pub fn status(&self) -> SyncState {
        self.reconciler.state()
    }

    pub fn subscribe(&self) -> watch::Receiver<SyncState> {
        self.reconciler.subscribe_state()
    }

    pub fn indicator(&self) -> SyncIndicator {
        self.reconciler
            .state()
            .indicator(&self.reconciler.monitor().state(), Utc::now())
    }

    pub async fn metrics(&self) -> SyncMetrics {
        self.metrics.lock().await.clone()
    }

    async fn background_sync_loop(
        reconciler: Arc<SyncReconciler>,
        backoff: Arc<Mutex<SyncBackoff>>,
        metrics: Arc<Mutex<SyncMetrics>>,
        config: SyncConfig,
        mut events: tokio::sync::broadcast::Receiver<ConnectivityEvent>,
    ) {
        let mut interval = tokio::time::interval(config.sync_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                event = events.recv() => match event {
                    Ok(ConnectivityEvent::ConnectionRestored) => {
                        if !config.auto_sync {
                            continue;
                        }
                        info!("Connection restored, syncing offline progress");
                        backoff.lock().await.reset();
                        let _ = Self::run_pass(&reconciler, &backoff, &metrics).await;
                    }
                    Ok(ConnectivityEvent::ConnectionLost) => {
                        debug!("Connection lost, progress will be queued locally");
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!("Missed {} connectivity events, running level check", skipped);
                        if Self::should_perform_sync(&reconciler, &backoff, &config).await {
                            let _ = Self::run_pass(&reconciler, &backoff, &metrics).await;
                        }
                    }
                    Err(RecvError::Closed) => {
                        debug!("Connectivity events closed, stopping sync loop");
                        break;
                    }
                },
                _ = interval.tick() => {
                    if Self::should_perform_sync(&reconciler, &backoff, &config).await {
                        let _ = Self::run_pass(&reconciler, &backoff, &metrics).await;
                    }
                }
            }
        }
    }

    /// Level check
    async fn should_perform_sync(
        reconciler: &SyncReconciler,
        backoff: &Mutex<SyncBackoff>,
        config: &SyncConfig,
    ) -> bool {
        if !config.auto_sync {
            return false;
        }

        let connectivity = reconciler.monitor().state();
        if !connectivity.is_online {
            return false;
        }

        if !backoff.lock().await.ready(Instant::now()) {
            return false;
        }

        if connectivity.was_offline {
            return true;
        }

        match reconciler.store().count_unsynced().await {
            Ok(pending) => pending > 0,
            Err(e) => {
                error!("Failed to count pending progress entries: {}", e);
                false
            }
        }
    }

    async fn run_pass(
        reconciler: &SyncReconciler,
        backoff: &Mutex<SyncBackoff>,
        metrics: &Mutex<SyncMetrics>,
    ) -> Result<SyncOutcome, SyncError> {
        metrics.lock().await.record_sync_start();

        let result = reconciler.sync_offline_data().await;

        let mut metrics = metrics.lock().await;
        match &result {
            Ok(SyncOutcome::Synced { entries, .. }) => {
                metrics.record_sync_success(*entries);
                backoff.lock().await.record_success();
            }
            Ok(outcome) => {
                metrics.record_sync_skipped(*outcome == SyncOutcome::Coalesced);
            }
            Err(e) => {
                metrics.record_sync_failure();
                let delay = backoff.lock().await.record_failure(Instant::now());
                warn!("Offline progress sync failed, next attempt in {:?}: {}", delay, e);
            }
        }

        result
    }
}

impl Drop for SyncService {
    fn drop(&mut self) {
        if let Some(handle) = self.background_task.take() {
            handle.abort();
        }
    }
}
