//! Device-side receiver: relay frames into the cache and onto the device.

use crate::transport::DeviceTransport;
use crate::{write_cache, SessionResult, SharedCache};
use liveconfig_core::Identity;
use liveconfig_relay::{
    decode_frame, ChannelEvent, ChannelRole, RelayChannel, RelayConfig, Subscription,
};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

/// Receiver lifecycle. Moves forward only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiverState {
    Idle,
    AwaitingOpen,
    Streaming,
    Closed,
}

/// Per-session frame counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReceiverStats {
    /// Frames merged into the cache.
    pub applied: u64,
    /// Malformed frames dropped.
    pub dropped: u64,
    /// One-field pushes the device accepted.
    pub delivered: u64,
    /// One-field pushes the device rejected.
    pub delivery_failed: u64,
}

/// Receives field updates on the `receive` role of the relay.
///
/// Every well-formed frame is merged into the cache (last write wins) and
/// then pushed to the device as a one-field delta. Pushes are awaited one at
/// a time so the device observes updates in relay order. Nothing here is
/// retried; failures are logged and the next frame is processed.
pub struct FieldUpdateReceiver {
    cache: SharedCache,
    transport: Arc<dyn DeviceTransport>,
    state: watch::Sender<ReceiverState>,
    stats: Arc<Mutex<ReceiverStats>>,
}

impl FieldUpdateReceiver {
    pub fn new(cache: SharedCache, transport: Arc<dyn DeviceTransport>) -> Self {
        let (state, _) = watch::channel(ReceiverState::Idle);
        Self {
            cache,
            transport,
            state,
            stats: Arc::new(Mutex::new(ReceiverStats::default())),
        }
    }

    pub fn state(&self) -> ReceiverState {
        *self.state.borrow()
    }

    /// Observe state transitions, including after the receiver is moved
    /// into a task.
    pub fn watch_state(&self) -> watch::Receiver<ReceiverState> {
        self.state.subscribe()
    }

    pub fn stats(&self) -> ReceiverStats {
        *self.stats.lock()
    }

    /// Open the receive channel and stream until it closes.
    ///
    /// A channel that cannot be opened ends the receiver in `Closed`.
    pub async fn run(&mut self, config: &RelayConfig, identity: &Identity) -> SessionResult<()> {
        self.set_state(ReceiverState::AwaitingOpen);

        let mut channel = match RelayChannel::open(config, ChannelRole::Receive, identity).await {
            Ok(channel) => channel,
            Err(e) => {
                self.set_state(ReceiverState::Closed);
                return Err(e.into());
            }
        };

        let subscription = match channel.subscribe() {
            Ok(subscription) => subscription,
            Err(e) => {
                self.set_state(ReceiverState::Closed);
                return Err(e.into());
            }
        };

        self.stream(subscription).await;

        // The channel must outlive the stream; dropping it stops its reader.
        drop(channel);
        Ok(())
    }

    /// Process inbound events until the channel closes.
    pub async fn stream(&mut self, mut subscription: Subscription) {
        self.set_state(ReceiverState::Streaming);

        while let Some(event) = subscription.next().await {
            match event {
                ChannelEvent::Frame(text) => self.handle_frame(&text).await,
                ChannelEvent::Closed(reason) => {
                    info!(reason = ?reason, "Receive channel closed");
                    break;
                }
            }
        }

        self.set_state(ReceiverState::Closed);
        let stats = self.stats();
        debug!(
            applied = stats.applied,
            dropped = stats.dropped,
            delivered = stats.delivered,
            delivery_failed = stats.delivery_failed,
            "Receiver finished"
        );
    }

    /// Decode one frame, merge it and push it to the device.
    pub async fn handle_frame(&mut self, text: &str) {
        let update = match decode_frame(text) {
            Ok(update) => update,
            Err(e) => {
                warn!(error = %e, len = text.len(), "Dropping malformed relay frame");
                self.stats.lock().dropped += 1;
                return;
            }
        };

        debug!(field_id = %update.id, "Applying field update");

        let applied = update.clone();
        let written = write_cache(&self.cache, move |cache| cache.apply(&applied)).await;
        if let Err(e) = written {
            warn!(field_id = %update.id, error = %e, "Settings cache write failed, keeping in-memory value");
        }
        self.stats.lock().applied += 1;

        match self.transport.push(update.to_delta()).await {
            Ok(()) => {
                debug!(field_id = %update.id, "Field update delivered to device");
                self.stats.lock().delivered += 1;
            }
            Err(e) => {
                error!(field_id = %update.id, error = %e, "Device delivery failed");
                self.stats.lock().delivery_failed += 1;
            }
        }
    }

    pub(crate) fn set_state(&self, state: ReceiverState) {
        debug!(state = ?state, "Receiver state");
        self.state.send_replace(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::RecordingTransport;
    use serde_json::json;
    use settings_cache::{MemorySettingsStore, SettingsCache};
    use tokio::sync::mpsc;

    fn receiver(store: Arc<MemorySettingsStore>, transport: Arc<RecordingTransport>) -> FieldUpdateReceiver {
        let cache = Arc::new(Mutex::new(SettingsCache::open(Box::new(store))));
        FieldUpdateReceiver::new(cache, transport)
    }

    #[tokio::test]
    async fn test_frame_reaches_cache_and_device() {
        let store = Arc::new(MemorySettingsStore::new());
        let transport = Arc::new(RecordingTransport::new());
        let mut receiver = receiver(store.clone(), transport.clone());

        receiver
            .handle_frame(r#"{"id":"backgroundColor","value":16711680}"#)
            .await;

        assert_eq!(receiver.cache.lock().get("backgroundColor"), Some(&json!(16711680)));
        assert_eq!(store.document().as_deref(), Some(r#"{"backgroundColor":16711680}"#));
        assert_eq!(
            transport.pushes(),
            vec![[("backgroundColor".to_string(), json!(16711680))]
                .into_iter()
                .collect()]
        );
        assert_eq!(receiver.stats().applied, 1);
        assert_eq!(receiver.stats().delivered, 1);
    }

    #[tokio::test]
    async fn test_malformed_frame_is_dropped() {
        let store = Arc::new(MemorySettingsStore::new());
        let transport = Arc::new(RecordingTransport::new());
        let mut receiver = receiver(store.clone(), transport.clone());

        receiver.handle_frame("not json").await;
        receiver.handle_frame(r#"{"value":1}"#).await;

        assert!(receiver.cache.lock().snapshot().is_empty());
        assert!(transport.is_empty());
        assert_eq!(store.write_count(), 0);
        assert_eq!(receiver.stats().dropped, 2);
    }

    #[tokio::test]
    async fn test_cache_write_failure_still_pushes() {
        let store = Arc::new(MemorySettingsStore::new());
        store.set_fail_writes(true);
        let transport = Arc::new(RecordingTransport::new());
        let mut receiver = receiver(store, transport.clone());

        receiver.handle_frame(r#"{"id":"x","value":1}"#).await;

        assert_eq!(receiver.cache.lock().get("x"), Some(&json!(1)));
        assert_eq!(transport.len(), 1);
    }

    #[tokio::test]
    async fn test_delivery_failure_is_counted() {
        let transport = Arc::new(RecordingTransport::new());
        transport.set_failing(true);
        let mut receiver = receiver(Arc::new(MemorySettingsStore::new()), transport);

        receiver.handle_frame(r#"{"id":"x","value":1}"#).await;

        let stats = receiver.stats();
        assert_eq!(stats.applied, 1);
        assert_eq!(stats.delivered, 0);
        assert_eq!(stats.delivery_failed, 1);
    }

    #[tokio::test]
    async fn test_stream_state_transitions() {
        let transport = Arc::new(RecordingTransport::new());
        let mut receiver = receiver(Arc::new(MemorySettingsStore::new()), transport);
        let states = receiver.watch_state();
        assert_eq!(*states.borrow(), ReceiverState::Idle);

        let (tx, rx) = mpsc::channel(8);
        tx.send(ChannelEvent::Frame(r#"{"id":"x","value":1}"#.into())).await.unwrap();
        tx.send(ChannelEvent::Frame("garbage".into())).await.unwrap();
        tx.send(ChannelEvent::Frame(r#"{"id":"x","value":2}"#.into())).await.unwrap();
        tx.send(ChannelEvent::Closed(None)).await.unwrap();
        tx.send(ChannelEvent::Frame(r#"{"id":"x","value":3}"#.into())).await.unwrap();

        receiver.stream(Subscription::new(rx)).await;

        assert_eq!(receiver.state(), ReceiverState::Closed);
        assert_eq!(receiver.cache.lock().get("x"), Some(&json!(2)));
        assert_eq!(receiver.stats().applied, 2);
        assert_eq!(receiver.stats().dropped, 1);
    }

    #[tokio::test]
    async fn test_run_unreachable_relay_closes() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let transport = Arc::new(RecordingTransport::new());
        let mut receiver = receiver(Arc::new(MemorySettingsStore::new()), transport);
        let config = RelayConfig::with_url(format!("ws://127.0.0.1:{}", port));
        let identity = Identity::new("acct", "watch").unwrap();

        let result = receiver.run(&config, &identity).await;

        assert!(result.is_err());
        assert_eq!(receiver.state(), ReceiverState::Closed);
    }
}
