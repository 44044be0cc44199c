//! Feeds of new block heights.
//!
//! The feeder service reacts to heights, not wall-clock time. Two sources:
//! - [`WebsocketHeightSource`] subscribes to `NewBlock` events on the node's
//!   Tendermint RPC websocket and reconnects with exponential backoff.
//! - [`PollingHeightSource`] asks a [`ChainGateway`] for the latest height on
//!   a fixed interval. Used when no websocket endpoint is configured.

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;

use crate::ChainGateway;

const SUBSCRIBE_NEW_BLOCK: &str =
    r#"{"jsonrpc":"2.0","method":"subscribe","id":1,"params":{"query":"tm.event='NewBlock'"}}"#;

const RECONNECT_BASE_DELAY: Duration = Duration::from_millis(500);
const RECONNECT_MAX_DELAY: Duration = Duration::from_secs(30);

/// A stream of block heights.
#[async_trait]
pub trait HeightSource: Send {
    /// Wait for the next new height. `None` means the source is exhausted.
    async fn next_height(&mut self) -> Option<u64>;
}

/// Extract the block height from a Tendermint `NewBlock` event frame.
///
/// Returns `None` for subscription acks and any other frame.
pub fn parse_new_block_height(frame: &str) -> Option<u64> {
    let value: serde_json::Value = serde_json::from_str(frame).ok()?;
    match value.pointer("/result/data/value/block/header/height")? {
        serde_json::Value::String(s) => s.parse().ok(),
        serde_json::Value::Number(n) => n.as_u64(),
        _ => None,
    }
}

// ── Polling ─────────────────────────────────────────────────────────────

/// Polls [`ChainGateway::current_height`] and yields each height that is
/// higher than the last one yielded.
pub struct PollingHeightSource<G: ?Sized> {
    gateway: Arc<G>,
    interval: tokio::time::Interval,
    last: Option<u64>,
}

impl<G: ChainGateway + ?Sized> PollingHeightSource<G> {
    pub fn new(gateway: Arc<G>, poll_interval: Duration) -> Self {
        let mut interval = tokio::time::interval(poll_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        Self {
            gateway,
            interval,
            last: None,
        }
    }
}

#[async_trait]
impl<G: ChainGateway + ?Sized + 'static> HeightSource for PollingHeightSource<G> {
    async fn next_height(&mut self) -> Option<u64> {
        loop {
            self.interval.tick().await;
            match self.gateway.current_height().await {
                Ok(height) if self.last.map_or(true, |last| height > last) => {
                    self.last = Some(height);
                    return Some(height);
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(error = %e, "height poll failed");
                }
            }
        }
    }
}

// ── Websocket ───────────────────────────────────────────────────────────

/// Subscribes to `NewBlock` events on a Tendermint RPC websocket.
///
/// The connection lives in a background task that forwards heights over a
/// channel. Dropping the source aborts that task.
pub struct WebsocketHeightSource {
    rx: mpsc::Receiver<u64>,
    task: JoinHandle<()>,
}

impl WebsocketHeightSource {
    /// Start the subscription task against `url` (e.g. `ws://localhost:26657/websocket`).
    pub fn connect(url: impl Into<String>) -> Self {
        let url = url.into();
        let (tx, rx) = mpsc::channel(64);
        let task = tokio::spawn(run_subscription(url, tx));
        Self { rx, task }
    }
}

#[async_trait]
impl HeightSource for WebsocketHeightSource {
    async fn next_height(&mut self) -> Option<u64> {
        self.rx.recv().await
    }
}

impl Drop for WebsocketHeightSource {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Reconnect delay: doubles per failed session up to a cap, and starts
/// over once a session subscribes.
#[derive(Debug)]
struct ReconnectBackoff {
    next: Duration,
}

impl ReconnectBackoff {
    fn new() -> Self {
        Self {
            next: RECONNECT_BASE_DELAY,
        }
    }

    fn next_delay(&mut self) -> Duration {
        let delay = self.next;
        self.next = (self.next * 2).min(RECONNECT_MAX_DELAY);
        delay
    }

    fn reset(&mut self) {
        self.next = RECONNECT_BASE_DELAY;
    }
}

async fn run_subscription(url: String, tx: mpsc::Sender<u64>) {
    let mut backoff = ReconnectBackoff::new();
    loop {
        let delay = match stream_heights(&url, &tx, &mut backoff).await {
            Ok(()) => return,
            Err(e) => {
                let delay = backoff.next_delay();
                tracing::warn!(url = %url, error = %e, retry_in_ms = delay.as_millis() as u64, "block subscription lost");
                delay
            }
        };
        tokio::time::sleep(delay).await;
        if tx.is_closed() {
            return;
        }
    }
}

/// Run one websocket session. `Ok(())` means the receiver went away and the
/// task should stop; any error triggers a reconnect.
async fn stream_heights(
    url: &str,
    tx: &mpsc::Sender<u64>,
    backoff: &mut ReconnectBackoff,
) -> Result<(), String> {
    let (mut socket, _) = tokio_tungstenite::connect_async(url)
        .await
        .map_err(|e| format!("connect failed: {e}"))?;
    socket
        .send(Message::Text(SUBSCRIBE_NEW_BLOCK.to_string()))
        .await
        .map_err(|e| format!("subscribe failed: {e}"))?;
    tracing::info!(url = %url, "subscribed to new blocks");
    backoff.reset();

    while let Some(frame) = socket.next().await {
        match frame.map_err(|e| e.to_string())? {
            Message::Text(text) => {
                if let Some(height) = parse_new_block_height(&text) {
                    tracing::trace!(height, "new block");
                    if tx.send(height).await.is_err() {
                        return Ok(());
                    }
                }
            }
            Message::Ping(payload) => {
                socket
                    .send(Message::Pong(payload))
                    .await
                    .map_err(|e| e.to_string())?;
            }
            Message::Close(_) => return Err("closed by server".into()),
            _ => {}
        }
    }
    Err("stream ended".into())
}
