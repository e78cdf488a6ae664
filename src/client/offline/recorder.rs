//! # Progress Recorder
//!
//! The write path for watch progress. Each tick is written straight to the
//! server when online; when offline, or when the server write fails for any
//! reason, the tick is appended to the local queue instead.
//!
//! ## Features
//!
//! - **Never Fails**: callers get a [`TickReport`], not a `Result`
//! - **Validated**: ticks without a video or playlist id are rejected
//!   before any write
//! - **Completion Events**: fired once per video per session when a tick
//!   first crosses 95%
//! - **Cadence**: [`TickCadence`] turns player positions into 5-second ticks
//! - **Cooldown**: optionally skip direct writes for a while after one fails
//!
//! ## Usage
//!
//! ```rust,no_run
//! use eduflex::client::offline::recorder::{ProgressRecorder, ProgressTick, TickCadence};
//!
//! # async fn demo(recorder: ProgressRecorder) {
//! let mut cadence = TickCadence::default();
//! if let Some(watched) = cadence.observe(25.3) {
//!     let report = recorder
//!         .record_tick(ProgressTick::new("v1", "p1", watched, 600))
//!         .await;
//!     println!("{:?}", report.delivery);
//! }
//! # }
//! ```

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, Mutex};
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::client::api::RemoteAuthority;
use crate::client::offline::queue::{NewOfflineProgress, OfflineProgressEntry, OfflineProgressStore};
use crate::client::sync::network_monitor::NetworkMonitor;
use crate::shared::progress::{tick_is_completed, ProgressRecord, ProgressUpdate};

/// Seconds of watched time between two reported ticks
pub const DEFAULT_TICK_INTERVAL_SECS: u32 = 5;

const COMPLETION_CAPACITY: usize = 32;

/// One progress sample from the player
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressTick {
    pub video_id: String,
    pub playlist_id: String,
    pub watched_seconds: u32,
    pub total_seconds: u32,
}

impl ProgressTick {
    /// Watched time is clamped to the duration once the duration is known.
    pub fn new(
        video_id: impl Into<String>,
        playlist_id: impl Into<String>,
        watched_seconds: u32,
        total_seconds: u32,
    ) -> Self {
        let watched_seconds = if total_seconds > 0 {
            watched_seconds.min(total_seconds)
        } else {
            watched_seconds
        };
        Self {
            video_id: video_id.into(),
            playlist_id: playlist_id.into(),
            watched_seconds,
            total_seconds,
        }
    }

    pub fn is_completed(&self) -> bool {
        tick_is_completed(self.watched_seconds, self.total_seconds)
    }

    fn to_update(&self) -> ProgressUpdate {
        ProgressUpdate {
            video_id: self.video_id.clone(),
            playlist_id: self.playlist_id.clone(),
            watched_seconds: self.watched_seconds,
            total_seconds: self.total_seconds,
            is_completed: self.is_completed(),
            synced_from_offline: false,
        }
    }

    fn to_offline(&self) -> NewOfflineProgress {
        NewOfflineProgress {
            video_id: self.video_id.clone(),
            playlist_id: self.playlist_id.clone(),
            watched_seconds: self.watched_seconds,
            total_seconds: self.total_seconds,
        }
    }
}

/// Where a tick ended up
#[derive(Debug, Clone, PartialEq)]
pub enum Delivery {
    /// Accepted by the server
    Remote(ProgressRecord),
    /// Appended to the local queue
    Queued(OfflineProgressEntry),
    /// Neither the server nor the local store took it
    Dropped,
    /// Failed validation and was never written anywhere
    Rejected(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct TickReport {
    pub delivery: Delivery,
    /// True on the first completed tick of this video in this session
    pub completed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionEvent {
    pub video_id: String,
    pub playlist_id: String,
}

/// Converts player positions into ticks every `interval` seconds of
/// watched time.
///
/// Positions that land between multiples (seeks, pauses mid-second) are
/// skipped and the same second is never reported twice in a row.
#[derive(Debug, Clone)]
pub struct TickCadence {
    interval: u32,
    last_reported: Option<u32>,
}

impl Default for TickCadence {
    fn default() -> Self {
        Self::new(DEFAULT_TICK_INTERVAL_SECS)
    }
}

impl TickCadence {
    pub fn new(interval_seconds: u32) -> Self {
        Self {
            interval: interval_seconds.max(1),
            last_reported: None,
        }
    }

    /// Watched seconds to report for this position, if any
    pub fn observe(&mut self, position_seconds: f64) -> Option<u32> {
        if !position_seconds.is_finite() || position_seconds < 1.0 {
            return None;
        }
        let watched = position_seconds.floor() as u32;
        if watched % self.interval != 0 || self.last_reported == Some(watched) {
            return None;
        }
        self.last_reported = Some(watched);
        Some(watched)
    }

    /// Forget the last reported second, e.g. when a new video starts
    pub fn reset(&mut self) {
        self.last_reported = None;
    }
}

/// Progress write path
pub struct ProgressRecorder {
    store: Arc<dyn OfflineProgressStore>,
    remote: Arc<dyn RemoteAuthority>,
    monitor: Arc<NetworkMonitor>,
    /// Videos already announced as completed this session
    completed: Mutex<HashSet<String>>,
    completions: broadcast::Sender<CompletionEvent>,
    direct_write_cooldown: Option<Duration>,
    degraded_until: Mutex<Option<Instant>>,
}

impl ProgressRecorder {
    pub fn new(
        store: Arc<dyn OfflineProgressStore>,
        remote: Arc<dyn RemoteAuthority>,
        monitor: Arc<NetworkMonitor>,
    ) -> Self {
        let (completions, _) = broadcast::channel(COMPLETION_CAPACITY);
        Self {
            store,
            remote,
            monitor,
            completed: Mutex::new(HashSet::new()),
            completions,
            direct_write_cooldown: None,
            degraded_until: Mutex::new(None),
        }
    }

    /// After a failed direct write, go straight to the local queue for
    /// `cooldown`.
    pub fn with_direct_write_cooldown(mut self, cooldown: Option<Duration>) -> Self {
        self.direct_write_cooldown = cooldown;
        self
    }

    /// Record one tick. Never fails; see [`TickReport`].
    pub async fn record_tick(&self, tick: ProgressTick) -> TickReport {
        // The server rejects a whole sync batch over one bad item, so bad
        // ticks must never reach the queue
        if let Err(e) = tick.to_update().validate() {
            warn!("Rejecting progress tick for '{}': {}", tick.video_id, e);
            return TickReport {
                delivery: Delivery::Rejected(e.to_string()),
                completed: false,
            };
        }

        let completed = tick.is_completed() && self.completed.lock().await.insert(tick.video_id.clone());

        let delivery = if self.should_attempt_direct().await {
            match self.remote.upsert_progress(&tick.to_update()).await {
                Ok(record) => Delivery::Remote(record),
                Err(e) => {
                    warn!("Direct progress write for {} failed, queueing locally: {}", tick.video_id, e);
                    self.enter_cooldown().await;
                    self.queue_locally(&tick).await
                }
            }
        } else {
            self.queue_locally(&tick).await
        };

        if completed {
            info!("Video {} completed", tick.video_id);
            // Listeners are optional
            let _ = self.completions.send(CompletionEvent {
                video_id: tick.video_id.clone(),
                playlist_id: tick.playlist_id.clone(),
            });
        }

        TickReport { delivery, completed }
    }

    /// Mark videos the server already reports as completed so they don't
    /// fire a completion event again.
    pub async fn seed_completed<I, S>(&self, video_ids: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut completed = self.completed.lock().await;
        completed.extend(video_ids.into_iter().map(Into::into));
    }

    pub fn subscribe_completions(&self) -> broadcast::Receiver<CompletionEvent> {
        self.completions.subscribe()
    }

    async fn should_attempt_direct(&self) -> bool {
        if !self.monitor.is_online() {
            return false;
        }
        let mut degraded_until = self.degraded_until.lock().await;
        match *degraded_until {
            Some(until) if Instant::now() < until => false,
            Some(_) => {
                *degraded_until = None;
                true
            }
            None => true,
        }
    }

    async fn enter_cooldown(&self) {
        if let Some(cooldown) = self.direct_write_cooldown {
            debug!("Skipping direct writes for {:?}", cooldown);
            *self.degraded_until.lock().await = Some(Instant::now() + cooldown);
        }
    }

    async fn queue_locally(&self, tick: &ProgressTick) -> Delivery {
        match self.store.append_offline_progress(tick.to_offline()).await {
            Ok(entry) => Delivery::Queued(entry),
            Err(e) => {
                error!(
                    "Dropping progress tick for {} at {}s: {}",
                    tick.video_id, tick.watched_seconds, e
                );
                Delivery::Dropped
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::api::ApiError;
    use crate::client::offline::queue::MemoryProgressStore;
    use crate::client::testing::{FailingStore, FakeRemote};
    use assert_matches::assert_matches;

    struct Harness {
        store: Arc<MemoryProgressStore>,
        remote: Arc<FakeRemote>,
        monitor: Arc<NetworkMonitor>,
        recorder: ProgressRecorder,
    }

    fn harness(online: bool) -> Harness {
        let store = Arc::new(MemoryProgressStore::new());
        let remote = Arc::new(FakeRemote::default());
        let monitor = Arc::new(NetworkMonitor::new(online));
        let recorder = ProgressRecorder::new(store.clone(), remote.clone(), monitor.clone());
        Harness {
            store,
            remote,
            monitor,
            recorder,
        }
    }

    #[test]
    fn test_tick_clamps_watched() {
        let tick = ProgressTick::new("v1", "p1", 130, 100);
        assert_eq!(tick.watched_seconds, 100);

        let tick = ProgressTick::new("v1", "p1", 130, 0);
        assert_eq!(tick.watched_seconds, 130);
        assert!(!tick.is_completed());
    }

    #[tokio::test]
    async fn test_online_tick_goes_to_server_only() {
        let h = harness(true);
        let report = h.recorder.record_tick(ProgressTick::new("v1", "p1", 30, 100)).await;

        assert_matches!(report.delivery, Delivery::Remote(ref record) if record.watched_seconds == 30);
        assert_eq!(h.remote.upsert_count().await, 1);
        assert!(h.store.all_entries().await.is_empty());
    }

    #[tokio::test]
    async fn test_offline_tick_skips_server() {
        let h = harness(false);
        let report = h.recorder.record_tick(ProgressTick::new("v1", "p1", 30, 100)).await;

        assert_matches!(report.delivery, Delivery::Queued(_));
        assert_eq!(h.remote.upsert_count().await, 0);
        assert_eq!(h.store.list_unsynced().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_flaky_server_falls_back_to_queue() {
        let h = harness(true);
        h.remote.fail_with(ApiError::Timeout).await;

        let report = h.recorder.record_tick(ProgressTick::new("v1", "p1", 40, 100)).await;

        assert_matches!(report.delivery, Delivery::Queued(ref entry) if entry.watched_seconds == 40);
        let pending = h.store.list_unsynced().await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].video_id, "v1");
    }

    #[tokio::test]
    async fn test_unauthorized_falls_back_to_queue() {
        let h = harness(true);
        h.remote.fail_with(ApiError::Unauthorized).await;

        let report = h.recorder.record_tick(ProgressTick::new("v1", "p1", 40, 100)).await;
        assert_matches!(report.delivery, Delivery::Queued(_));
    }

    #[tokio::test]
    async fn test_storage_failure_drops_tick() {
        let remote = Arc::new(FakeRemote::default());
        let monitor = Arc::new(NetworkMonitor::new(false));
        let recorder = ProgressRecorder::new(Arc::new(FailingStore), remote, monitor);

        let report = recorder.record_tick(ProgressTick::new("v1", "p1", 96, 100)).await;
        assert_eq!(report.delivery, Delivery::Dropped);
        // Completion is still reported for the UI
        assert!(report.completed);
    }

    #[tokio::test]
    async fn test_invalid_tick_is_never_written() {
        for online in [true, false] {
            let h = harness(online);
            let mut completions = h.recorder.subscribe_completions();

            for tick in [ProgressTick::new("", "p1", 96, 100), ProgressTick::new("v1", " ", 96, 100)] {
                let report = h.recorder.record_tick(tick).await;
                assert_matches!(report.delivery, Delivery::Rejected(_));
                assert!(!report.completed);
            }

            assert_eq!(h.remote.upsert_count().await, 0);
            assert!(h.store.all_entries().await.is_empty());
            assert!(completions.try_recv().is_err());
        }
    }

    #[tokio::test]
    async fn test_completion_fires_once() {
        let h = harness(true);
        let mut completions = h.recorder.subscribe_completions();

        let mut fired_at = Vec::new();
        for watched in [50, 70, 96, 98, 100] {
            let report = h.recorder.record_tick(ProgressTick::new("v1", "p1", watched, 100)).await;
            if report.completed {
                fired_at.push(watched);
            }
        }

        assert_eq!(fired_at, vec![96]);
        assert_eq!(
            completions.recv().await.unwrap(),
            CompletionEvent {
                video_id: "v1".to_string(),
                playlist_id: "p1".to_string()
            }
        );
        assert!(completions.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_seeded_completion_does_not_fire() {
        let h = harness(true);
        h.recorder.seed_completed(["v1"]).await;
        let report = h.recorder.record_tick(ProgressTick::new("v1", "p1", 99, 100)).await;
        assert!(!report.completed);
    }

    #[tokio::test]
    async fn test_cooldown_skips_direct_writes() {
        let h = harness(true);
        let recorder = ProgressRecorder::new(h.store.clone(), h.remote.clone(), h.monitor.clone())
            .with_direct_write_cooldown(Some(Duration::from_secs(60)));

        h.remote.fail_with(ApiError::Network("connection reset".to_string())).await;
        recorder.record_tick(ProgressTick::new("v1", "p1", 5, 100)).await;
        assert_eq!(h.remote.upsert_count().await, 1);

        h.remote.recover().await;
        let report = recorder.record_tick(ProgressTick::new("v1", "p1", 10, 100)).await;
        assert_matches!(report.delivery, Delivery::Queued(_));
        assert_eq!(h.remote.upsert_count().await, 1);
        assert_eq!(h.store.list_unsynced().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_without_cooldown_every_tick_tries_server() {
        let h = harness(true);
        h.remote.fail_with(ApiError::Timeout).await;
        h.recorder.record_tick(ProgressTick::new("v1", "p1", 5, 100)).await;
        h.remote.recover().await;

        let report = h.recorder.record_tick(ProgressTick::new("v1", "p1", 10, 100)).await;
        assert_matches!(report.delivery, Delivery::Remote(_));
        assert_eq!(h.remote.upsert_count().await, 2);
    }

    #[test]
    fn test_cadence_every_five_seconds() {
        let mut cadence = TickCadence::default();
        let reported: Vec<u32> = [0.0, 0.4, 4.9, 5.0, 5.2, 5.9, 7.0, 10.1, 10.8, 15.0]
            .iter()
            .filter_map(|&pos| cadence.observe(pos))
            .collect();
        assert_eq!(reported, vec![5, 10, 15]);
    }

    #[test]
    fn test_cadence_after_seek_back() {
        let mut cadence = TickCadence::default();
        assert_eq!(cadence.observe(20.0), Some(20));
        assert_eq!(cadence.observe(5.3), Some(5));
        assert_eq!(cadence.observe(f64::NAN), None);
        cadence.reset();
        assert_eq!(cadence.observe(5.0), Some(5));
    }
}
