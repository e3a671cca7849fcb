//! Editor UI builder seam.
//!
//! The editor itself runs out of process. This side only needs to build its
//! launch address, turn its close payload into a snapshot, and observe its
//! per-field change events.

use crate::schema::FieldSchema;
use crate::{SessionError, SessionResult};
use serde_json::{Map, Value};
use settings_cache::{FieldUpdate, SettingsSnapshot};
use tokio::sync::mpsc;
use url::Url;

/// What the orchestrator needs from an editor UI builder.
pub trait EditorBuilder: Send + Sync {
    /// Address to open the editor at, pre-filled with `current`.
    fn launch_url(&self, current: &SettingsSnapshot) -> SessionResult<Url>;

    /// Full snapshot computed from the editor's raw result payload.
    fn snapshot_from_response(&self, raw: &str) -> SessionResult<SettingsSnapshot>;
}

/// Builder for Clay-style configuration pages.
#[derive(Debug, Clone)]
pub struct ClayEditor {
    page_url: Url,
    return_to: String,
    schema: FieldSchema,
}

impl ClayEditor {
    pub fn new(page_url: Url, return_to: impl Into<String>, schema: FieldSchema) -> Self {
        Self {
            page_url,
            return_to: return_to.into(),
            schema,
        }
    }

    pub fn schema(&self) -> &FieldSchema {
        &self.schema
    }

    /// Snap color fields of the initial settings before the page is shown.
    pub fn prepare(&self, initial: &SettingsSnapshot) -> SettingsSnapshot {
        let mut prepared = initial.clone();
        self.schema.normalize(&mut prepared);
        prepared
    }
}

impl EditorBuilder for ClayEditor {
    fn launch_url(&self, current: &SettingsSnapshot) -> SessionResult<Url> {
        let settings = serde_json::to_string(&self.prepare(current))?;

        let mut url = self.page_url.clone();
        url.query_pairs_mut()
            .append_pair("return_to", &self.return_to)
            .append_pair("settings", &settings);
        Ok(url)
    }

    fn snapshot_from_response(&self, raw: &str) -> SessionResult<SettingsSnapshot> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(SessionError::InvalidResponse("empty payload".to_string()));
        }

        let decoded = if raw.starts_with('{') {
            raw.to_string()
        } else {
            urlencoding::decode(raw)
                .map_err(|e| SessionError::InvalidResponse(e.to_string()))?
                .into_owned()
        };

        let fields: Map<String, Value> = match serde_json::from_str(&decoded) {
            Ok(Value::Object(fields)) => fields,
            Ok(_) => {
                return Err(SessionError::InvalidResponse(
                    "payload is not an object".to_string(),
                ))
            }
            Err(e) => return Err(SessionError::InvalidResponse(e.to_string())),
        };

        let mut snapshot: SettingsSnapshot = fields
            .into_iter()
            .map(|(id, entry)| (id, unwrap_entry(entry)))
            .collect();
        self.schema.normalize(&mut snapshot);

        Ok(snapshot)
    }
}

// Clay reports either bare values or `{"value": .., "precision": ..}` objects.
fn unwrap_entry(entry: Value) -> Value {
    match entry {
        Value::Object(mut fields) if fields.contains_key("value") => {
            fields.remove("value").unwrap_or(Value::Null)
        }
        other => other,
    }
}

/// Create a change feed: the editor side notifies, the forwarder consumes.
pub fn change_feed() -> (ChangeNotifier, ChangeSubscription) {
    let (tx, rx) = mpsc::unbounded_channel();
    (ChangeNotifier { tx }, ChangeSubscription { rx })
}

/// Emits one event per field change, in edit order.
#[derive(Debug, Clone)]
pub struct ChangeNotifier {
    tx: mpsc::UnboundedSender<FieldUpdate>,
}

impl ChangeNotifier {
    /// Report a field's current value. Returns false once nobody listens.
    pub fn notify(&self, id: impl Into<String>, value: impl Into<Value>) -> bool {
        self.tx.send(FieldUpdate::new(id, value)).is_ok()
    }
}

/// Receiving end of a change feed.
#[derive(Debug)]
pub struct ChangeSubscription {
    rx: mpsc::UnboundedReceiver<FieldUpdate>,
}

impl ChangeSubscription {
    /// Next change. `None` once every notifier is gone.
    pub async fn next(&mut self) -> Option<FieldUpdate> {
        self.rx.recv().await
    }

    /// Stop observing changes.
    pub fn cancel(mut self) {
        self.rx.close();
    }
}
