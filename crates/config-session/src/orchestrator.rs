//! Session lifecycle: launch, live phase, close.

use crate::editor::EditorBuilder;
use crate::receiver::{FieldUpdateReceiver, ReceiverState};
use crate::transport::DeviceTransport;
use crate::{write_cache, SessionError, SessionResult, SharedCache};
use liveconfig_core::Identity;
use liveconfig_relay::RelayConfig;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use url::Url;

/// What a launch hands back to the host.
#[derive(Debug)]
pub struct LaunchedSession {
    /// Where to open the editor.
    pub editor_url: Url,
    /// Lifecycle of this session's receiver.
    pub receiver_state: watch::Receiver<ReceiverState>,
}

/// Terminal result of the close phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionOutcome {
    /// The editor closed without a result.
    Cancelled,
    /// The bulk push was accepted by the device.
    Delivered { fields: usize },
    /// The bulk push was rejected. Not retried.
    DeliveryFailed(String),
    /// The editor's result could not be read.
    InvalidResponse(String),
}

/// Drives one configuration session at a time.
///
/// The live phase and the close-phase bulk push are not serialized against
/// each other: whichever device push completes last wins.
pub struct SessionOrchestrator {
    identity: Identity,
    relay: RelayConfig,
    cache: SharedCache,
    transport: Arc<dyn DeviceTransport>,
    editor: Arc<dyn EditorBuilder>,
    receiver_task: Option<JoinHandle<()>>,
    receiver_state: Option<watch::Receiver<ReceiverState>>,
}

impl SessionOrchestrator {
    pub fn new(
        identity: Identity,
        relay: RelayConfig,
        cache: SharedCache,
        transport: Arc<dyn DeviceTransport>,
        editor: Arc<dyn EditorBuilder>,
    ) -> Self {
        Self {
            identity,
            relay,
            cache,
            transport,
            editor,
            receiver_task: None,
            receiver_state: None,
        }
    }

    pub fn cache(&self) -> &SharedCache {
        &self.cache
    }

    /// Launch phase.
    ///
    /// Starts the receiver first so live updates can arrive while the editor
    /// loads, then returns the editor address. A receiver left over from a
    /// previous session is stopped.
    pub fn configure_requested(&mut self) -> SessionResult<LaunchedSession> {
        if let Some(previous) = self.receiver_task.take() {
            debug!("Stopping previous session's receiver");
            previous.abort();
        }

        let mut receiver = FieldUpdateReceiver::new(self.cache.clone(), self.transport.clone());
        let receiver_state = receiver.watch_state();
        receiver.set_state(ReceiverState::AwaitingOpen);
        let relay = self.relay.clone();
        let identity = self.identity.clone();

        self.receiver_task = Some(tokio::spawn(async move {
            if let Err(e) = receiver.run(&relay, &identity).await {
                info!(error = %e, "Receive channel closed before streaming");
            }
        }));
        self.receiver_state = Some(receiver_state.clone());

        let current = self.cache.lock().snapshot().clone();
        let editor_url = match self.editor.launch_url(&current) {
            Ok(url) => url,
            Err(e) => {
                warn!(error = %e, "Could not build editor address, stopping receiver");
                self.shutdown();
                self.receiver_state = None;
                return Err(e);
            }
        };
        info!(host = ?editor_url.host_str(), "Configuration session launched");

        Ok(LaunchedSession {
            editor_url,
            receiver_state,
        })
    }

    /// Close phase.
    ///
    /// No payload (or an empty one) cancels the session. Otherwise the
    /// editor's snapshot is merged into the cache and pushed to the device
    /// exactly once. Never fails: every outcome is logged and returned.
    pub async fn editor_closed(&mut self, response: Option<&str>) -> SessionOutcome {
        let Some(raw) = response.map(str::trim).filter(|r| !r.is_empty()) else {
            info!("Editor closed without a result, session cancelled");
            return SessionOutcome::Cancelled;
        };

        let snapshot = match self.editor.snapshot_from_response(raw) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(error = %e, "Discarding editor result");
                return SessionOutcome::InvalidResponse(e.to_string());
            }
        };

        let merged = snapshot.clone();
        let written = write_cache(&self.cache, move |cache| cache.merge(&merged)).await;
        if let Err(e) = written {
            warn!(error = %e, "Settings cache write failed, keeping in-memory values");
        }

        let fields = snapshot.len();
        match self.transport.push(snapshot).await {
            Ok(()) => {
                info!(fields, "Settings delivered to device");
                SessionOutcome::Delivered { fields }
            }
            Err(e) => {
                let err = SessionError::DeviceDeliveryFailed(e.to_string());
                error!(error = %err, "Settings push failed");
                SessionOutcome::DeliveryFailed(e.to_string())
            }
        }
    }

    /// Current receiver state, `Idle` before the first launch.
    pub fn receiver_state(&self) -> ReceiverState {
        self.receiver_state
            .as_ref()
            .map(|state| *state.borrow())
            .unwrap_or(ReceiverState::Idle)
    }

    /// Stop the current receiver, if any.
    pub fn shutdown(&mut self) {
        if let Some(task) = self.receiver_task.take() {
            task.abort();
        }
    }
}

impl Drop for SessionOrchestrator {
    fn drop(&mut self) {
        self.shutdown();
    }
}
