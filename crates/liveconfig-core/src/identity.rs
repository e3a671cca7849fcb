//! Account/device identity used to address relay channels.

use crate::{CoreError, CoreResult};
use std::fmt;

/// The (account, device) token pair a relay channel is bound to.
///
/// Obtained once from the host environment at startup and passed explicitly
/// to every channel constructor. Never persisted.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Identity {
    account_token: String,
    device_token: String,
}

impl Identity {
    /// Create an identity. Both tokens must be non-empty.
    pub fn new(account_token: impl Into<String>, device_token: impl Into<String>) -> CoreResult<Self> {
        let account_token = account_token.into();
        let device_token = device_token.into();

        if account_token.trim().is_empty() {
            return Err(CoreError::Config("account token is empty".to_string()));
        }
        if device_token.trim().is_empty() {
            return Err(CoreError::Config("device token is empty".to_string()));
        }

        Ok(Self {
            account_token,
            device_token,
        })
    }

    pub fn account_token(&self) -> &str {
        &self.account_token
    }

    pub fn device_token(&self) -> &str {
        &self.device_token
    }
}

// Tokens end up in logs through Debug; only a prefix is shown.
impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Identity")
            .field("account_token", &redact(&self.account_token))
            .field("device_token", &redact(&self.device_token))
            .finish()
    }
}

fn redact(token: &str) -> String {
    let prefix: String = token.chars().take(4).collect();
    format!("{}…", prefix)
}
