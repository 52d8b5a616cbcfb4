//! Structured logging helpers shared by the account flows.
//!
//! Every identity provider call is logged through [`OperationTimer`] so the
//! field names (`action`, `elapsed_ms`, `attempts`) stay consistent.

use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Install a `tracing` subscriber filtered by `RUST_LOG`, defaulting to `info`.
///
/// Does nothing if a global subscriber is already set.
#[cfg(feature = "trace")]
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}

/// Measures one account operation from start to finish.
#[derive(Debug)]
pub struct OperationTimer {
    action: &'static str,
    start: Instant,
}

impl OperationTimer {
    /// Start timing `action`.
    pub fn start(action: &'static str) -> Self {
        debug!(action, "starting operation");
        Self {
            action,
            start: Instant::now(),
        }
    }

    /// Name of the timed action.
    pub fn action(&self) -> &'static str {
        self.action
    }

    /// Time since the timer started.
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Log a successful completion.
    pub fn log_success(&self) {
        info!(
            action = self.action,
            elapsed_ms = self.elapsed().as_millis(),
            "operation succeeded"
        );
    }

    /// Log a failure.
    pub fn log_failure(&self, code: &str, attempts: Option<u32>, error: &str) {
        warn!(
            action = self.action,
            elapsed_ms = self.elapsed().as_millis(),
            code,
            attempts,
            error,
            "operation failed"
        );
    }
}
