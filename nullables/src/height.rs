//! Nullable height feed.

use async_trait::async_trait;
use feeder_gateway::HeightSource;
use tokio::sync::mpsc;

/// A block height feed driven by the test.
///
/// Heights pushed through the paired [`HeightSender`] are yielded in order.
/// Once every sender is dropped and the queue is drained the feed ends.
pub struct NullHeightSource {
    rx: mpsc::UnboundedReceiver<u64>,
}

/// Pushes heights into a [`NullHeightSource`].
#[derive(Clone)]
pub struct HeightSender {
    tx: mpsc::UnboundedSender<u64>,
}

impl NullHeightSource {
    pub fn channel() -> (HeightSender, Self) {
        let (tx, rx) = mpsc::unbounded_channel();
        (HeightSender { tx }, Self { rx })
    }

    /// A feed that yields `heights` and then ends.
    pub fn from_heights(heights: impl IntoIterator<Item = u64>) -> Self {
        let (sender, source) = Self::channel();
        for height in heights {
            sender.push(height);
        }
        source
    }
}

impl HeightSender {
    pub fn push(&self, height: u64) {
        let _ = self.tx.send(height);
    }
}

#[async_trait]
impl HeightSource for NullHeightSource {
    async fn next_height(&mut self) -> Option<u64> {
        self.rx.recv().await
    }
}
