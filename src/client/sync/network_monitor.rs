//! # Network Monitor
//!
//! Tracks online/offline state and turns raw connectivity readings into
//! edge-triggered events.
//!
//! ## Features
//!
//! - **Edge Triggering**: `ConnectionRestored` fires once per offline→online
//!   transition, never on repeated identical readings
//! - **Sticky Offline Flag**: `was_offline` survives flaps until a sync pass
//!   clears it
//! - **Episode Counter**: lets a sync pass tell whether a new outage began
//!   while it was running
//! - **Probing**: `TcpProbe` checks the server socket on an interval
//!
//! ## Usage
//!
//! ```rust,no_run
//! use eduflex::client::sync::network_monitor::{ConnectivityEvent, NetworkMonitor};
//!
//! # async fn demo() {
//! let monitor = NetworkMonitor::new(false);
//! let mut events = monitor.subscribe();
//!
//! monitor.report(true);
//! assert_eq!(events.recv().await.ok(), Some(ConnectivityEvent::ConnectionRestored));
//! # }
//! ```

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::shared::config::ConfigError;

const EVENT_CAPACITY: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkStatus {
    Online,
    Offline,
}

/// Latest connectivity reading plus the sticky offline bookkeeping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ConnectivityState {
    pub is_online: bool,
    /// Set on every offline transition; cleared only by a successful sync pass
    pub was_offline: bool,
    /// Number of offline episodes observed since startup
    pub offline_episodes: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectivityEvent {
    ConnectionLost,
    ConnectionRestored,
}

/// Platform connectivity signal
#[async_trait]
pub trait ConnectivityProbe: Send + Sync {
    /// Whether network I/O is worth attempting right now
    async fn check(&self) -> bool;
}

/// Probe that opens a TCP connection to the server
#[derive(Debug, Clone)]
pub struct TcpProbe {
    address: String,
    timeout: Duration,
}

impl TcpProbe {
    pub fn new(address: impl Into<String>, timeout: Duration) -> Self {
        Self {
            address: address.into(),
            timeout,
        }
    }

    /// Probe the host and port of `server_url`
    pub fn for_server(server_url: &str, timeout: Duration) -> Result<Self, ConfigError> {
        let url = reqwest::Url::parse(server_url)
            .map_err(|e| ConfigError::InvalidUrl(format!("{}: {}", server_url, e)))?;
        let host = url
            .host_str()
            .ok_or(ConfigError::MissingValue("server host"))?;
        let port = url
            .port_or_known_default()
            .ok_or(ConfigError::MissingValue("server port"))?;
        Ok(Self::new(format!("{}:{}", host, port), timeout))
    }

    pub fn address(&self) -> &str {
        &self.address
    }
}

#[async_trait]
impl ConnectivityProbe for TcpProbe {
    async fn check(&self) -> bool {
        matches!(
            tokio::time::timeout(self.timeout, TcpStream::connect(&self.address)).await,
            Ok(Ok(_))
        )
    }
}

/// Process-wide connectivity monitor
///
/// Share one instance through `Arc` between the recorder, the reconciler and
/// the sync service.
#[derive(Debug)]
pub struct NetworkMonitor {
    state: watch::Sender<ConnectivityState>,
    events: broadcast::Sender<ConnectivityEvent>,
}

impl NetworkMonitor {
    /// Create a monitor with a known initial reading.
    ///
    /// Starting offline counts as an offline episode, so the first restore
    /// triggers a sync of anything queued in a previous session.
    pub fn new(initially_online: bool) -> Self {
        let initial = ConnectivityState {
            is_online: initially_online,
            was_offline: !initially_online,
            offline_episodes: u64::from(!initially_online),
        };
        let (state, _) = watch::channel(initial);
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self { state, events }
    }

    /// Create a monitor from a probe reading taken now
    pub async fn detect(probe: &dyn ConnectivityProbe) -> Self {
        let online = probe.check().await;
        info!("Initial connectivity: {}", if online { "online" } else { "offline" });
        Self::new(online)
    }

    /// Feed a connectivity reading.
    ///
    /// Returns the event emitted, or `None` when the reading matches the
    /// current state.
    pub fn report(&self, online: bool) -> Option<ConnectivityEvent> {
        let mut event = None;
        self.state.send_if_modified(|state| {
            if state.is_online == online {
                return false;
            }
            state.is_online = online;
            if online {
                event = Some(ConnectivityEvent::ConnectionRestored);
            } else {
                state.was_offline = true;
                state.offline_episodes += 1;
                event = Some(ConnectivityEvent::ConnectionLost);
            }
            true
        });

        if let Some(event) = event {
            debug!("Connectivity transition: {:?}", event);
            // No subscribers is fine: the level check reads the state directly
            let _ = self.events.send(event);
        }
        event
    }

    pub fn state(&self) -> ConnectivityState {
        *self.state.borrow()
    }

    pub fn is_online(&self) -> bool {
        self.state.borrow().is_online
    }

    pub fn status(&self) -> NetworkStatus {
        if self.is_online() {
            NetworkStatus::Online
        } else {
            NetworkStatus::Offline
        }
    }

    /// Transition events from now on
    pub fn subscribe(&self) -> broadcast::Receiver<ConnectivityEvent> {
        self.events.subscribe()
    }

    /// Latest state, updated on every transition
    pub fn watch(&self) -> watch::Receiver<ConnectivityState> {
        self.state.subscribe()
    }

    /// Clear `was_offline` after a successful sync pass.
    ///
    /// `episodes_at_start` is the episode count read when the pass began; if
    /// another outage started since then the flag stays set.
    pub fn clear_was_offline(&self, episodes_at_start: u64) -> bool {
        self.state.send_if_modified(|state| {
            if state.was_offline && state.offline_episodes == episodes_at_start {
                state.was_offline = false;
                true
            } else {
                false
            }
        })
    }

    /// Poll `probe` every `interval` and report the readings
    pub fn spawn_polling(
        self: &Arc<Self>,
        probe: Arc<dyn ConnectivityProbe>,
        interval: Duration,
    ) -> JoinHandle<()> {
        let monitor = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let online = probe.check().await;
                if let Some(ConnectivityEvent::ConnectionLost) = monitor.report(online) {
                    warn!("Lost connection to server");
                }
            }
        })
    }
}
