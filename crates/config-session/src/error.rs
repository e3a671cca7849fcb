//! Session error types.

use thiserror::Error;

/// Session error type.
#[derive(Error, Debug)]
pub enum SessionError {
    /// The device transport rejected a push.
    #[error("Device delivery failed: {0}")]
    DeviceDeliveryFailed(String),

    /// The editor's close payload could not be turned into settings.
    #[error("Invalid editor response: {0}")]
    InvalidResponse(String),

    /// Relay error
    #[error("Relay error: {0}")]
    Relay(#[from] liveconfig_relay::RelayError),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias using SessionError.
pub type SessionResult<T> = Result<T, SessionError>;
