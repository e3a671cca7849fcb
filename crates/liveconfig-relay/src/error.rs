//! Relay error types.

use thiserror::Error;

/// Relay error type.
#[derive(Error, Debug)]
pub enum RelayError {
    /// WebSocket error
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// The relay address could not be built.
    #[error("Invalid relay address: {0}")]
    InvalidAddress(String),

    /// Connection timed out before the relay accepted it.
    #[error("Timed out connecting to relay")]
    Timeout,

    /// The connection has ended; nothing more can be sent or received.
    #[error("Relay channel closed")]
    ChannelClosed,

    /// An inbound payload is not a single `{id, value}` field update.
    #[error("Malformed relay message: {0}")]
    MalformedMessage(String),

    /// The channel's inbound stream was already handed out.
    #[error("Relay channel already has a subscriber")]
    AlreadySubscribed,

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias using RelayError.
pub type RelayResult<T> = Result<T, RelayError>;
