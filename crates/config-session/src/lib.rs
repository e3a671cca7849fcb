//! Live configuration sessions.
//!
//! One session runs in three phases:
//!
//! 1. **Launch**: the device side opens its receive channel, then the
//!    editor is opened out of process.
//! 2. **Live**: the editor side forwards each field change over the relay;
//!    the device side merges each one into the settings cache and pushes it
//!    to the device.
//! 3. **Close**: the editor's final result is merged and pushed to the
//!    device once. An empty result means the user cancelled.
//!
//! Delivery is at most once everywhere. Failures are logged at the
//! component that sees them and never end the process.

mod error;
pub mod editor;
pub mod forwarder;
pub mod orchestrator;
pub mod palette;
pub mod receiver;
pub mod schema;
pub mod transport;

use parking_lot::Mutex;
use settings_cache::{CacheError, CacheResult, SettingsCache};
use std::sync::Arc;

pub use editor::{change_feed, ChangeNotifier, ChangeSubscription, ClayEditor, EditorBuilder};
pub use error::{SessionError, SessionResult};
pub use forwarder::FieldUpdateForwarder;
pub use orchestrator::{LaunchedSession, SessionOrchestrator, SessionOutcome};
pub use palette::{quantize_channel, quantize_color, quantize_value};
pub use receiver::{FieldUpdateReceiver, ReceiverState, ReceiverStats};
pub use schema::{FieldKind, FieldSchema};
pub use transport::{
    DeliveryError, DeviceTransport, HttpDeviceTransport, LineDeviceTransport, RecordingTransport,
    StdoutDeviceTransport,
};

/// The settings cache as shared between the receiver and the orchestrator.
///
/// Never hold the guard across an `.await`. Writes persist synchronously, so
/// async code goes through `write_cache`.
pub type SharedCache = Arc<Mutex<SettingsCache>>;

/// Run one cache write on the blocking pool and wait for it.
pub(crate) async fn write_cache<F>(cache: &SharedCache, write: F) -> CacheResult<()>
where
    F: FnOnce(&mut SettingsCache) -> CacheResult<()> + Send + 'static,
{
    let cache = cache.clone();
    tokio::task::spawn_blocking(move || write(&mut cache.lock()))
        .await
        .map_err(|e| CacheError::WriteFailed(e.to_string()))?
}
