//! Graceful shutdown controller for the feeder.
//!
//! Listens for SIGINT/SIGTERM and flips a `tokio::sync::watch` flag observed
//! by every subsystem. Unlike a broadcast channel, a watch keeps the value,
//! so a signal subscribed after shutdown was triggered still sees it.

use std::sync::Arc;
use tokio::signal;
use tokio::sync::watch;

/// Coordinates graceful shutdown across the feeder.
///
/// Subsystems call [`subscribe`](Self::subscribe) to get a [`ShutdownSignal`],
/// then `select!` on [`ShutdownSignal::cancelled`] alongside their work.
pub struct ShutdownController {
    tx: watch::Sender<bool>,
}

/// Receiving half of a [`ShutdownController`].
#[derive(Clone)]
pub struct ShutdownSignal {
    rx: watch::Receiver<bool>,
    /// Sender owned by a [`ShutdownSignal::never`] signal.
    _owned: Option<Arc<watch::Sender<bool>>>,
}

impl ShutdownController {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx }
    }

    /// Get a signal that resolves on shutdown.
    pub fn subscribe(&self) -> ShutdownSignal {
        ShutdownSignal {
            rx: self.tx.subscribe(),
            _owned: None,
        }
    }

    /// Trigger shutdown programmatically.
    pub fn shutdown(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_shutdown(&self) -> bool {
        *self.tx.borrow()
    }

    /// Wait for SIGTERM or SIGINT, then trigger shutdown.
    pub async fn wait_for_signal(&self) {
        let ctrl_c = signal::ctrl_c();

        #[cfg(unix)]
        let terminate = async {
            match signal::unix::signal(signal::unix::SignalKind::terminate()) {
                Ok(mut sigterm) => {
                    sigterm.recv().await;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "failed to install SIGTERM handler");
                    std::future::pending::<()>().await;
                }
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => { tracing::info!("received SIGINT, shutting down"); }
            _ = terminate => { tracing::info!("received SIGTERM, shutting down"); }
        }

        self.shutdown();
    }
}

impl Default for ShutdownController {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownSignal {
    /// A signal that never fires. For components run without a controller.
    pub fn never() -> Self {
        let (tx, rx) = watch::channel(false);
        Self {
            rx,
            _owned: Some(Arc::new(tx)),
        }
    }

    pub fn is_shutdown(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolve once shutdown has been triggered.
    ///
    /// If the controller is dropped without triggering, this never resolves.
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        if rx.wait_for(|stopped| *stopped).await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn programmatic_shutdown_notifies_subscribers() {
        let controller = ShutdownController::new();
        let signal = controller.subscribe();
        controller.shutdown();
        signal.cancelled().await;
        assert!(signal.is_shutdown());
    }

    #[tokio::test]
    async fn multiple_subscribers_all_notified() {
        let controller = ShutdownController::new();
        let s1 = controller.subscribe();
        let s2 = controller.subscribe();
        controller.shutdown();
        s1.cancelled().await;
        s2.cancelled().await;
    }

    #[tokio::test]
    async fn late_subscriber_sees_shutdown() {
        let controller = ShutdownController::new();
        controller.shutdown();
        let late = controller.subscribe();
        assert!(late.is_shutdown());
        late.cancelled().await;
    }

    #[tokio::test(start_paused = true)]
    async fn untriggered_signal_stays_pending() {
        let controller = ShutdownController::new();
        let signal = controller.subscribe();
        let waited = tokio::time::timeout(Duration::from_secs(60), signal.cancelled()).await;
        assert!(waited.is_err());
        assert!(!controller.is_shutdown());
    }
}
