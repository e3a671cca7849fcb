//! Relay channel addressing.

use crate::{RelayError, RelayResult};
use liveconfig_core::Identity;
use std::fmt;
use url::Url;

/// Which side of the relay a channel speaks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelRole {
    /// Device side: receives updates forwarded by the editor.
    Receive,
    /// Editor side: forwards field changes to the relay.
    Forward,
}

impl ChannelRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChannelRole::Receive => "receive",
            ChannelRole::Forward => "forward",
        }
    }
}

impl fmt::Display for ChannelRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Build `<base>/<role>/<accountToken>/<deviceToken>`.
///
/// Any path already on `base` is kept as a prefix. Tokens are
/// percent-encoded as path segments.
pub fn relay_address(base: &Url, role: ChannelRole, identity: &Identity) -> RelayResult<Url> {
    match base.scheme() {
        "ws" | "wss" => {}
        other => {
            return Err(RelayError::InvalidAddress(format!(
                "unsupported scheme '{}', expected ws or wss",
                other
            )))
        }
    }

    let mut address = base.clone();
    address.set_query(None);
    address.set_fragment(None);
    {
        let mut segments = address
            .path_segments_mut()
            .map_err(|_| RelayError::InvalidAddress(base.to_string()))?;
        segments
            .pop_if_empty()
            .push(role.as_str())
            .push(identity.account_token())
            .push(identity.device_token());
    }

    Ok(address)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity() -> Identity {
        Identity::new("acct123", "watch456").unwrap()
    }

    #[test]
    fn test_receive_address() {
        let base = Url::parse("wss://liveconfig.fletchto99.com").unwrap();
        let address = relay_address(&base, ChannelRole::Receive, &identity()).unwrap();

        assert_eq!(
            address.as_str(),
            "wss://liveconfig.fletchto99.com/receive/acct123/watch456"
        );
    }

    #[test]
    fn test_forward_address() {
        let base = Url::parse("wss://liveconfig.fletchto99.com/").unwrap();
        let address = relay_address(&base, ChannelRole::Forward, &identity()).unwrap();

        assert_eq!(
            address.as_str(),
            "wss://liveconfig.fletchto99.com/forward/acct123/watch456"
        );
    }

    #[test]
    fn test_base_path_is_kept() {
        let base = Url::parse("ws://127.0.0.1:8080/relay/").unwrap();
        let address = relay_address(&base, ChannelRole::Receive, &identity()).unwrap();

        assert_eq!(address.path(), "/relay/receive/acct123/watch456");
    }

    #[test]
    fn test_tokens_are_encoded() {
        let base = Url::parse("ws://127.0.0.1:8080").unwrap();
        let identity = Identity::new("a/b", "c d").unwrap();
        let address = relay_address(&base, ChannelRole::Forward, &identity).unwrap();

        assert_eq!(address.path(), "/forward/a%2Fb/c%20d");
    }

    #[test]
    fn test_rejects_non_websocket_scheme() {
        let base = Url::parse("https://liveconfig.fletchto99.com").unwrap();
        let result = relay_address(&base, ChannelRole::Receive, &identity());

        assert!(matches!(result, Err(RelayError::InvalidAddress(_))));
    }

    #[test]
    fn test_role_display() {
        assert_eq!(ChannelRole::Receive.to_string(), "receive");
        assert_eq!(ChannelRole::Forward.to_string(), "forward");
    }
}
