use super::Connectivity;
use portal_core::cancel::CancelToken;
use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info};

/// Observations between two summary log lines.
const SUMMARY_EVERY: u64 = 10;

/// Connectivity counters collected by a [`NetworkMonitor`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct NetworkStats {
    /// Observations that found the host online
    pub online: u64,
    /// Observations that found the host offline
    pub offline: u64,
}

impl NetworkStats {
    /// Total observations.
    pub fn observations(&self) -> u64 {
        self.online + self.offline
    }

    /// Share of online observations, in percent. `None` before the first one.
    pub fn uptime_percentage(&self) -> Option<f64> {
        match self.observations() {
            0 => None,
            total => Some(self.online as f64 / total as f64 * 100.0),
        }
    }
}

/// Samples a [`Connectivity`] probe on a fixed interval and keeps uptime
/// counters, logging a summary every ten observations.
///
/// Hosts that receive online/offline events can also feed them in directly
/// through [`record`](Self::record).
#[derive(Clone)]
pub struct NetworkMonitor {
    connectivity: Arc<dyn Connectivity>,
    interval: Duration,
    online: Arc<AtomicU64>,
    offline: Arc<AtomicU64>,
}

impl NetworkMonitor {
    /// Default sampling interval.
    pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(120);

    /// Create a monitor for `connectivity`.
    pub fn new(connectivity: Arc<dyn Connectivity>) -> Self {
        Self {
            connectivity,
            interval: Self::DEFAULT_INTERVAL,
            online: Arc::new(AtomicU64::new(0)),
            offline: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Sample every `interval` instead.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Current counters.
    pub fn stats(&self) -> NetworkStats {
        NetworkStats {
            online: self.online.load(Ordering::SeqCst),
            offline: self.offline.load(Ordering::SeqCst),
        }
    }

    /// Record one observation.
    pub fn record(&self, online: bool) -> NetworkStats {
        if online {
            self.online.fetch_add(1, Ordering::SeqCst);
        } else {
            self.offline.fetch_add(1, Ordering::SeqCst);
        }

        let stats = self.stats();
        debug!(online, observations = stats.observations(), "connectivity observed");
        if stats.observations() % SUMMARY_EVERY == 0 {
            info!(
                is_online = online,
                connection_count = stats.online,
                disconnection_count = stats.offline,
                uptime_percentage = stats.uptime_percentage().unwrap_or_default(),
                "network status"
            );
        }
        stats
    }

    /// Probe connectivity once and record the result.
    pub fn observe(&self) -> NetworkStats {
        self.record(self.connectivity.is_online())
    }

    /// Sample on the interval until `cancel` fires. The first sample is
    /// taken one interval after the call.
    pub async fn run(&self, cancel: CancelToken) {
        let mut ticker = tokio::time::interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    debug!("network monitor stopped");
                    break;
                }
                _ = ticker.tick() => {
                    self.observe();
                }
            }
        }
    }

    /// Run the monitor on its own task.
    pub fn spawn(&self, cancel: CancelToken) -> JoinHandle<()> {
        let monitor = self.clone();
        tokio::spawn(async move { monitor.run(cancel).await })
    }
}

impl std::fmt::Debug for NetworkMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NetworkMonitor")
            .field("interval", &self.interval)
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}
