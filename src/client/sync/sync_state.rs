//! # Sync State
//!
//! What the reconciler is doing and what it last did, plus the indicator a
//! UI derives from it.

use chrono::{DateTime, Duration, Utc};

use crate::client::sync::network_monitor::ConnectivityState;

/// How long a successful sync stays visible
pub const SYNCED_INDICATOR_WINDOW: Duration = Duration::seconds(3);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncPhase {
    #[default]
    Idle,
    Syncing,
    Synced,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SyncState {
    pub phase: SyncPhase,
    /// Completion time of the last successful pass
    pub last_sync: Option<DateTime<Utc>>,
    /// Entries submitted by the last successful pass
    pub last_synced_count: usize,
    /// Pending entries as of the last pass
    pub pending_entries: u64,
    pub last_error: Option<String>,
}

/// User-visible sync feedback
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncIndicator {
    Hidden,
    Offline,
    Syncing,
    Synced { count: usize },
}

impl SyncState {
    pub fn is_syncing(&self) -> bool {
        self.phase == SyncPhase::Syncing
    }

    /// Failures are deliberately not surfaced; the next pass retries them.
    pub fn indicator(&self, connectivity: &ConnectivityState, now: DateTime<Utc>) -> SyncIndicator {
        if !connectivity.is_online {
            return SyncIndicator::Offline;
        }
        match self.phase {
            SyncPhase::Syncing => SyncIndicator::Syncing,
            SyncPhase::Synced => match self.last_sync {
                Some(at) if now - at < SYNCED_INDICATOR_WINDOW && self.last_synced_count > 0 => {
                    SyncIndicator::Synced {
                        count: self.last_synced_count,
                    }
                }
                _ => SyncIndicator::Hidden,
            },
            SyncPhase::Idle | SyncPhase::Failed => SyncIndicator::Hidden,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn online() -> ConnectivityState {
        ConnectivityState {
            is_online: true,
            ..Default::default()
        }
    }

    #[test]
    fn test_offline_wins() {
        let state = SyncState {
            phase: SyncPhase::Syncing,
            ..Default::default()
        };
        assert_eq!(
            state.indicator(&ConnectivityState::default(), Utc::now()),
            SyncIndicator::Offline
        );
    }

    #[test]
    fn test_synced_window() {
        let now = Utc::now();
        let state = SyncState {
            phase: SyncPhase::Synced,
            last_sync: Some(now),
            last_synced_count: 4,
            ..Default::default()
        };

        assert_eq!(state.indicator(&online(), now), SyncIndicator::Synced { count: 4 });
        assert_eq!(
            state.indicator(&online(), now + Duration::seconds(4)),
            SyncIndicator::Hidden
        );
    }

    #[test]
    fn test_failure_is_hidden() {
        let state = SyncState {
            phase: SyncPhase::Failed,
            last_error: Some("timeout".to_string()),
            ..Default::default()
        };
        assert_eq!(state.indicator(&online(), Utc::now()), SyncIndicator::Hidden);
        assert_eq!(SyncState::default().indicator(&online(), Utc::now()), SyncIndicator::Hidden);
    }
}
