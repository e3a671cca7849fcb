//! WebSocket relay channels for live configuration.
//!
//! This crate provides:
//! - Relay addressing: `<relay>/<role>/<accountToken>/<deviceToken>`
//! - The `{"id": .., "value": ..}` frame codec
//! - `RelayChannel`: one persistent connection in one role, with
//!   best-effort sends and a single inbound `Subscription`
//!
//! Channels never reconnect on their own and never acknowledge or retry.

mod address;
mod channel;
mod error;
mod frame;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use address::{relay_address, ChannelRole};
pub use channel::{ChannelEvent, RelayChannel, RelayConfig, Subscription};
pub use error::{RelayError, RelayResult};
pub use frame::{decode_frame, encode_frame};
