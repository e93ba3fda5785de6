//! Cancellation for a reconciliation pass.

use std::future::Future;
use std::time::Duration;

use tokio::sync::watch;

use crate::error::{BlbError, BlbResult};

/// Owner side of a cancellation signal.
///
/// Once cancelled it stays cancelled; every `CancelSignal` handed out,
/// before or after, observes it.
#[derive(Debug)]
pub struct Cancellation {
    tx: watch::Sender<bool>,
}

impl Cancellation {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx }
    }

    /// Get a signal to pass into reconciliation calls.
    pub fn signal(&self) -> CancelSignal {
        CancelSignal {
            rx: Some(self.tx.subscribe()),
        }
    }

    /// Trigger cancellation.
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }
}

impl Default for Cancellation {
    fn default() -> Self {
        Self::new()
    }
}

/// Receiver side of a cancellation signal.
#[derive(Debug, Clone)]
pub struct CancelSignal {
    rx: Option<watch::Receiver<bool>>,
}

impl CancelSignal {
    /// A signal that never fires.
    pub fn never() -> Self {
        Self { rx: None }
    }

    pub fn is_cancelled(&self) -> bool {
        self.rx.as_ref().is_some_and(|rx| *rx.borrow())
    }

    /// Resolve once cancellation is triggered.
    pub async fn cancelled(&self) {
        let Some(rx) = &self.rx else {
            return std::future::pending().await;
        };
        let mut rx = rx.clone();
        loop {
            if *rx.borrow_and_update() {
                return;
            }
            if rx.changed().await.is_err() {
                // owner dropped without cancelling
                return std::future::pending().await;
            }
        }
    }

    /// Run `fut` unless cancellation fires first.
    ///
    /// `mutating` marks calls whose effect on the provider is unknown when
    /// they are abandoned halfway.
    pub async fn guard<T, F>(&self, operation: &'static str, mutating: bool, fut: F) -> BlbResult<T>
    where
        F: Future<Output = BlbResult<T>>,
    {
        self.race(operation, false, mutating, fut).await
    }

    /// Like [`guard`](Self::guard), for calls made after the pass has
    /// already changed provider state. Cancellation here always leaves the
    /// outcome unknown, even if `fut` never started.
    pub async fn guard_after_mutation<T, F>(&self, operation: &'static str, fut: F) -> BlbResult<T>
    where
        F: Future<Output = BlbResult<T>>,
    {
        self.race(operation, true, true, fut).await
    }

    async fn race<T, F>(&self, operation: &'static str, mutated_before: bool, mutating: bool, fut: F) -> BlbResult<T>
    where
        F: Future<Output = BlbResult<T>>,
    {
        if self.is_cancelled() {
            return Err(BlbError::Cancelled {
                operation,
                outcome_unknown: mutated_before,
            });
        }

        tokio::select! {
            biased;
            _ = self.cancelled() => Err(BlbError::Cancelled {
                operation,
                outcome_unknown: mutated_before || mutating,
            }),
            result = fut => result,
        }
    }

    /// Sleep for `duration`, or fail early on cancellation.
    pub async fn sleep(&self, operation: &'static str, outcome_unknown: bool, duration: Duration) -> BlbResult<()> {
        tokio::select! {
            biased;
            _ = self.cancelled() => Err(BlbError::Cancelled { operation, outcome_unknown }),
            _ = tokio::time::sleep(duration) => Ok(()),
        }
    }
}

impl Default for CancelSignal {
    fn default() -> Self {
        Self::never()
    }
}
