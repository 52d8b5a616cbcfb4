//! Network awareness: connectivity probes, health checks, a retrying fetch
//! wrapper and a connectivity monitor.
//!
//! # Key Types
//!
//! - [`Connectivity`] - answers "are we online?" for the rest of the crate
//! - [`NetworkAwareFetch`] - HTTP requests that fail fast offline and retry otherwise
//! - [`NetworkMonitor`] - periodic connectivity sampling with uptime stats
//! - [`check_api_health`] - one-shot `HEAD` probe
//! - [`check_backend_health`] - the same probe against the configured endpoint

mod fetch;
mod health;
mod monitor;

pub use fetch::{FetchError, NetworkAwareFetch};
pub use health::{DEFAULT_HEALTH_TIMEOUT, HealthReport, check_api_health, check_backend_health};
pub use monitor::{NetworkMonitor, NetworkStats};

use std::sync::atomic::{AtomicBool, Ordering};

/// Source of truth for whether the host currently has connectivity.
#[cfg_attr(test, mockall::automock)]
pub trait Connectivity: Send + Sync {
    /// Whether the host is online.
    fn is_online(&self) -> bool;
}

/// A probe that always reports online, for hosts without a connectivity signal.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysOnline;

impl Connectivity for AlwaysOnline {
    fn is_online(&self) -> bool {
        true
    }
}

/// A probe whose state is set by the host, e.g. from OS online/offline events.
#[derive(Debug)]
pub struct StaticConnectivity {
    online: AtomicBool,
}

impl StaticConnectivity {
    /// Create a probe starting in the given state.
    pub fn new(online: bool) -> Self {
        Self {
            online: AtomicBool::new(online),
        }
    }

    /// Update the state.
    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }
}

impl Default for StaticConnectivity {
    fn default() -> Self {
        Self::new(true)
    }
}

impl Connectivity for StaticConnectivity {
    fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }
}
