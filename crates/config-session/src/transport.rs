//! Device transport seam and implementations.
//!
//! The transport accepts a mapping of field id → value and reports whether
//! the device took it. Callers treat it as fire-and-forget: one attempt,
//! never retried.

use async_trait::async_trait;
use parking_lot::Mutex;
use settings_cache::SettingsSnapshot;
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::debug;
use url::Url;

/// Why a push did not reach the device.
#[derive(Error, Debug)]
pub enum DeliveryError {
    /// The device side answered but refused the settings.
    #[error("Rejected: {0}")]
    Rejected(String),

    /// HTTP request error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Pushes settings to the device.
///
/// `Ok(())` corresponds to the device's delivered callback, `Err` to its
/// failed callback.
#[async_trait]
pub trait DeviceTransport: Send + Sync {
    async fn push(&self, settings: SettingsSnapshot) -> Result<(), DeliveryError>;
}

/// POSTs each push as a JSON object to a device bridge endpoint.
pub struct HttpDeviceTransport {
    client: reqwest::Client,
    endpoint: Url,
}

impl HttpDeviceTransport {
    pub fn new(endpoint: Url, timeout: Duration) -> Result<Self, DeliveryError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, endpoint })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl DeviceTransport for HttpDeviceTransport {
    async fn push(&self, settings: SettingsSnapshot) -> Result<(), DeliveryError> {
        debug!(endpoint = %self.endpoint, fields = settings.len(), "Pushing settings to device");

        let response = self
            .client
            .post(self.endpoint.clone())
            .json(&settings)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DeliveryError::Rejected(format!("HTTP {}: {}", status, body)));
        }

        Ok(())
    }
}

/// Writes each push as one JSON line, for piping into a device bridge.
pub struct LineDeviceTransport<W> {
    writer: tokio::sync::Mutex<W>,
}

impl<W> LineDeviceTransport<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: tokio::sync::Mutex::new(writer),
        }
    }

    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }
}

/// Line transport bound to the process's stdout.
pub type StdoutDeviceTransport = LineDeviceTransport<tokio::io::Stdout>;

impl StdoutDeviceTransport {
    pub fn stdout() -> Self {
        Self::new(tokio::io::stdout())
    }
}

#[async_trait]
impl<W> DeviceTransport for LineDeviceTransport<W>
where
    W: AsyncWrite + Unpin + Send,
{
    async fn push(&self, settings: SettingsSnapshot) -> Result<(), DeliveryError> {
        let mut line = serde_json::to_string(&settings)?;
        line.push('\n');

        let mut writer = self.writer.lock().await;
        writer.write_all(line.as_bytes()).await?;
        writer.flush().await?;
        Ok(())
    }
}

/// A transport that records every push, for tests.
#[derive(Debug, Default)]
pub struct RecordingTransport {
    pushes: Mutex<Vec<SettingsSnapshot>>,
    failing: Mutex<bool>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent pushes fail (they are still recorded).
    pub fn set_failing(&self, failing: bool) {
        *self.failing.lock() = failing;
    }

    /// Every push received, in order.
    pub fn pushes(&self) -> Vec<SettingsSnapshot> {
        self.pushes.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.pushes.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.pushes.lock().is_empty()
    }

    /// Wait until at least `count` pushes were recorded. Returns false on
    /// timeout.
    pub async fn wait_for(&self, count: usize, timeout: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        while self.len() < count {
            if tokio::time::Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        true
    }
}

#[async_trait]
impl DeviceTransport for RecordingTransport {
    async fn push(&self, settings: SettingsSnapshot) -> Result<(), DeliveryError> {
        self.pushes.lock().push(settings);
        if *self.failing.lock() {
            return Err(DeliveryError::Rejected("device unreachable".to_string()));
        }
        Ok(())
    }
}
