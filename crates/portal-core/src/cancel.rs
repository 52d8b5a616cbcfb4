//! Cancellation signal for in-flight retryable operations.
//!
//! A [`CancelSignal`] owns a `tokio::sync::watch` channel; every
//! [`CancelToken`] handed out subscribes to it. Firing the signal wakes every
//! token, which aborts the attempt or backoff sleep they guard.

use tokio::sync::watch;

/// The sending half: fires cancellation.
#[derive(Debug)]
pub struct CancelSignal {
    tx: watch::Sender<bool>,
}

/// The receiving half: observed by retry loops.
#[derive(Debug, Clone)]
pub struct CancelToken {
    rx: watch::Receiver<bool>,
}

/// Create a new signal together with one token.
pub fn cancel_pair() -> (CancelSignal, CancelToken) {
    let signal = CancelSignal::new();
    let token = signal.token();
    (signal, token)
}

impl CancelSignal {
    /// Create a signal that has not fired.
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx }
    }

    /// Hand out a token observing this signal.
    pub fn token(&self) -> CancelToken {
        CancelToken {
            rx: self.tx.subscribe(),
        }
    }

    /// Fire the signal. Idempotent.
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    /// Whether the signal has fired.
    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }
}

impl Default for CancelSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl CancelToken {
    /// Whether the signal has fired.
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolve once the signal fires.
    ///
    /// If the signal is dropped without firing, this never resolves.
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        if rx.wait_for(|cancelled| *cancelled).await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}
