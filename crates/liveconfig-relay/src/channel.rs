//! WebSocket relay channel.

use crate::{encode_frame, relay_address, ChannelRole, RelayError, RelayResult};
use futures_util::{SinkExt, StreamExt};
use liveconfig_core::{Identity, DEFAULT_RELAY_URL};
use settings_cache::FieldUpdate;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{timeout, Duration};
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, info, warn};
use url::Url;

/// Relay channel configuration.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Relay base URL (e.g., wss://liveconfig.fletchto99.com).
    pub url: String,
    /// Connection establishment timeout in seconds.
    pub connect_timeout_secs: u64,
    /// Inbound frames buffered ahead of the subscriber.
    pub inbound_buffer: usize,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_RELAY_URL.to_string(),
            connect_timeout_secs: 10,
            inbound_buffer: 100,
        }
    }
}

impl RelayConfig {
    pub fn with_url(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }
}

/// Inbound events delivered to a channel's subscriber, in receipt order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelEvent {
    /// One text frame from the relay.
    Frame(String),
    /// The connection ended. Always the last event.
    Closed(Option<String>),
}

/// The single consumer of a channel's inbound events.
///
/// Cancelling (or dropping) the subscription detaches the consumer; frames
/// that arrive afterwards are discarded.
#[derive(Debug)]
pub struct Subscription {
    events: mpsc::Receiver<ChannelEvent>,
}

impl Subscription {
    /// Wrap an event queue. Lets components be driven without a socket.
    pub fn new(events: mpsc::Receiver<ChannelEvent>) -> Self {
        Self { events }
    }

    /// Wait for the next event. `None` once the channel is gone.
    pub async fn next(&mut self) -> Option<ChannelEvent> {
        self.events.recv().await
    }

    /// Stop receiving events.
    pub fn cancel(mut self) {
        self.events.close();
    }
}

/// One persistent connection to the relay, in one role, for one identity.
///
/// Channels are opened per session and never reused. Sends are
/// best-effort: no acknowledgement, no retry, no backpressure. A dropped
/// connection surfaces as `ChannelEvent::Closed`; the channel does not
/// reconnect.
pub struct RelayChannel {
    role: ChannelRole,
    address: Url,
    outbound: mpsc::UnboundedSender<Message>,
    subscription: Option<Subscription>,
    closed: Arc<AtomicBool>,
    reader: JoinHandle<()>,
    writer: JoinHandle<()>,
}

impl RelayChannel {
    /// Connect to `<relay>/<role>/<accountToken>/<deviceToken>`.
    ///
    /// Returns once the relay has accepted the connection.
    pub async fn open(config: &RelayConfig, role: ChannelRole, identity: &Identity) -> RelayResult<Self> {
        let base = Url::parse(&config.url).map_err(|e| RelayError::InvalidAddress(e.to_string()))?;
        let address = relay_address(&base, role, identity)?;

        info!(role = %role, host = ?address.host_str(), "Opening relay channel");

        let connect = connect_async(address.as_str());
        let (ws_stream, _) = timeout(Duration::from_secs(config.connect_timeout_secs), connect)
            .await
            .map_err(|_| RelayError::Timeout)??;
        let (mut write, mut read) = ws_stream.split();

        let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<Message>();
        let (event_tx, event_rx) = mpsc::channel::<ChannelEvent>(config.inbound_buffer.max(1));
        let closed = Arc::new(AtomicBool::new(false));

        // Writer: drains the outbound queue in FIFO order
        let writer = tokio::spawn(async move {
            while let Some(msg) = outbound_rx.recv().await {
                let is_close = matches!(msg, Message::Close(_));
                if let Err(e) = write.send(msg).await {
                    debug!(error = %e, "Relay write failed");
                    break;
                }
                if is_close {
                    break;
                }
            }
        });

        // Reader: forwards text frames to the subscriber
        let pong_tx = outbound_tx.clone();
        let reader_closed = closed.clone();
        let reader = tokio::spawn(async move {
            let reason = loop {
                match read.next().await {
                    Some(Ok(Message::Text(text))) => {
                        // A missing subscriber just means nobody is listening
                        let _ = event_tx.send(ChannelEvent::Frame(text.to_string())).await;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        let _ = pong_tx.send(Message::Pong(data));
                    }
                    Some(Ok(Message::Close(frame))) => {
                        break frame.map(|f| f.reason.to_string()).filter(|r| !r.is_empty());
                    }
                    Some(Ok(Message::Binary(data))) => {
                        warn!(len = data.len(), "Ignoring binary relay frame");
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => break Some(e.to_string()),
                    None => break None,
                }
            };

            reader_closed.store(true, Ordering::SeqCst);
            info!(reason = ?reason, "Relay channel closed");
            let _ = event_tx.send(ChannelEvent::Closed(reason)).await;
        });

        info!(role = %role, "Relay channel open");

        Ok(Self {
            role,
            address,
            outbound: outbound_tx,
            subscription: Some(Subscription::new(event_rx)),
            closed,
            reader,
            writer,
        })
    }

    pub fn role(&self) -> ChannelRole {
        self.role
    }

    pub fn address(&self) -> &Url {
        &self.address
    }

    /// Whether the relay side has gone away.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst) || self.outbound.is_closed()
    }

    /// Take the channel's inbound events. Only one subscriber is allowed.
    pub fn subscribe(&mut self) -> RelayResult<Subscription> {
        self.subscription.take().ok_or(RelayError::AlreadySubscribed)
    }

    /// Queue one field update for transmission.
    ///
    /// Frames leave in call order. Delivery is not confirmed.
    pub fn send(&self, update: &FieldUpdate) -> RelayResult<()> {
        let frame = encode_frame(update)?;
        self.send_text(frame)
    }

    /// Queue one raw text frame.
    pub fn send_text(&self, frame: String) -> RelayResult<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(RelayError::ChannelClosed);
        }
        self.outbound
            .send(Message::Text(frame.into()))
            .map_err(|_| RelayError::ChannelClosed)
    }

    /// Send a close frame and tear the connection down.
    pub async fn close(mut self) {
        debug!(role = %self.role, "Closing relay channel");
        let _ = self.outbound.send(Message::Close(None));
        let _ = timeout(Duration::from_secs(2), &mut self.writer).await;
    }
}

impl Drop for RelayChannel {
    fn drop(&mut self) {
        self.reader.abort();
        self.writer.abort();
    }
}
