//! # Sync Backoff
//!
//! Spaces out automatic sync passes after failures so a struggling server
//! is not hammered every interval.
//!
//! ## Features
//!
//! - **Exponential Backoff**: Delay doubles with each consecutive failure
//! - **Jitter**: Random extra delay so clients don't retry in lockstep
//! - **Reset**: A success or a fresh reconnection clears the backoff
//!
//! ## Usage
//!
//! ```rust
//! use eduflex::client::offline::retry::SyncBackoff;
//! use std::time::Instant;
//!
//! let mut backoff = SyncBackoff::default();
//! let now = Instant::now();
//! assert!(backoff.ready(now));
//!
//! backoff.record_failure(now);
//! assert!(!backoff.ready(now));
//!
//! backoff.record_success();
//! assert!(backoff.ready(now));
//! ```

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Backoff strategy configuration
#[derive(Clone)]
pub enum BackoffStrategy {
    /// Fixed interval between retries
    Fixed {
        /// Interval in seconds
        interval_seconds: u64,
    },
    /// Exponential backoff with jitter
    Exponential {
        /// Base interval in seconds
        base_interval: u64,
        /// Maximum interval in seconds
        max_interval: u64,
        /// Jitter factor (0.0 to 1.0)
        jitter: f64,
    },
    /// Delay in seconds for a given attempt number
    Custom(Arc<dyn Fn(u32) -> u64 + Send + Sync>),
}

impl fmt::Debug for BackoffStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fixed { interval_seconds } => f
                .debug_struct("Fixed")
                .field("interval_seconds", interval_seconds)
                .finish(),
            Self::Exponential {
                base_interval,
                max_interval,
                jitter,
            } => f
                .debug_struct("Exponential")
                .field("base_interval", base_interval)
                .field("max_interval", max_interval)
                .field("jitter", jitter)
                .finish(),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

impl Default for BackoffStrategy {
    fn default() -> Self {
        Self::Exponential {
            base_interval: 1,
            max_interval: 300, // 5 minutes
            jitter: 0.1,
        }
    }
}

impl BackoffStrategy {
    /// Delay before the next attempt after `attempt` consecutive failures
    pub fn delay(&self, attempt: u32) -> Duration {
        let seconds = match self {
            Self::Fixed { interval_seconds } => *interval_seconds,
            Self::Exponential {
                base_interval,
                max_interval,
                jitter,
            } => {
                let exponent = attempt.saturating_sub(1).min(32);
                let delay = base_interval
                    .saturating_mul(2u64.saturating_pow(exponent))
                    .min(*max_interval);

                let jitter_amount = (delay as f64 * jitter.clamp(0.0, 1.0)) as u64;
                if jitter_amount == 0 {
                    delay
                } else {
                    delay + rand::random::<u64>() % (jitter_amount + 1)
                }
            }
            Self::Custom(calc) => calc(attempt),
        };
        Duration::from_secs(seconds)
    }
}

/// Failure-driven gate in front of automatic sync passes
#[derive(Debug, Default)]
pub struct SyncBackoff {
    strategy: BackoffStrategy,
    consecutive_failures: u32,
    next_attempt_at: Option<Instant>,
}

impl SyncBackoff {
    pub fn new(strategy: BackoffStrategy) -> Self {
        Self {
            strategy,
            consecutive_failures: 0,
            next_attempt_at: None,
        }
    }

    /// Whether an automatic pass may run at `now`
    pub fn ready(&self, now: Instant) -> bool {
        self.next_attempt_at.map_or(true, |at| now >= at)
    }

    /// Schedule the next attempt; returns the delay applied
    pub fn record_failure(&mut self, now: Instant) -> Duration {
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        let delay = self.strategy.delay(self.consecutive_failures);
        self.next_attempt_at = Some(now + delay);
        delay
    }

    pub fn record_success(&mut self) {
        self.reset();
    }

    pub fn reset(&mut self) {
        self.consecutive_failures = 0;
        self.next_attempt_at = None;
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    /// Set backoff strategy
    pub fn set_strategy(&mut self, strategy: BackoffStrategy) {
        self.strategy = strategy;
    }
}
