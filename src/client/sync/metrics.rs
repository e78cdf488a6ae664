//! # Sync Metrics
//!
//! Counters for reconciliation passes, kept by the sync service for
//! diagnostics.

use std::time::{Duration, Instant};

#[derive(Debug, Clone, Default)]
pub struct SyncMetrics {
    pub total_syncs: u64,
    pub successful_syncs: u64,
    pub failed_syncs: u64,
    pub coalesced_triggers: u64,
    pub entries_synced: u64,
    pub average_sync_duration: Duration,
    pub last_sync_duration: Option<Duration>,
    last_sync_start: Option<Instant>,
}

impl SyncMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_sync_start(&mut self) {
        self.last_sync_start = Some(Instant::now());
        self.total_syncs += 1;
    }

    pub fn record_sync_success(&mut self, entries: usize) {
        self.successful_syncs += 1;
        self.entries_synced += entries as u64;

        if let Some(start) = self.last_sync_start.take() {
            let duration = start.elapsed();
            self.last_sync_duration = Some(duration);

            // Rolling average over successful passes
            let total = self.average_sync_duration * (self.successful_syncs - 1) as u32 + duration;
            self.average_sync_duration = total / self.successful_syncs as u32;
        }
    }

    pub fn record_sync_failure(&mut self) {
        self.last_sync_start = None;
        self.failed_syncs += 1;
    }

    /// A pass that ended without submitting (offline, empty, coalesced)
    pub fn record_sync_skipped(&mut self, coalesced: bool) {
        self.last_sync_start = None;
        self.total_syncs = self.total_syncs.saturating_sub(1);
        if coalesced {
            self.coalesced_triggers += 1;
        }
    }

    pub fn success_rate(&self) -> f64 {
        let attempts = self.successful_syncs + self.failed_syncs;
        if attempts == 0 {
            0.0
        } else {
            self.successful_syncs as f64 / attempts as f64
        }
    }
}
