//! Configuration management.

use crate::{CoreError, CoreResult, Paths};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, warn};
use url::Url;

/// Default relay service.
pub const DEFAULT_RELAY_URL: &str = "wss://liveconfig.fletchto99.com";

/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Default address the editor page navigates to when it closes.
pub const DEFAULT_RETURN_TO: &str = "pebblejs://close#";

/// Default device push timeout in seconds.
pub const DEFAULT_DEVICE_TIMEOUT_SECS: u64 = 10;

/// Main liveconfig configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Relay base URL; role and tokens are appended per channel.
    #[serde(default = "default_relay_url")]
    pub relay_url: String,
    /// Editor page the user is sent to when configuring.
    #[serde(default)]
    pub editor_url: Option<String>,
    /// Address the editor returns to on close.
    #[serde(default = "default_return_to")]
    pub return_to: String,
    /// Field ids rendered as color pickers (palette-snapped before sending).
    #[serde(default)]
    pub color_fields: Vec<String>,
    /// HTTP endpoint of the device bridge. Settings go to stdout when unset.
    #[serde(default)]
    pub device_endpoint: Option<String>,
    /// Timeout for a single device push.
    #[serde(default = "default_device_timeout_secs")]
    pub device_timeout_secs: u64,
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_relay_url() -> String {
    DEFAULT_RELAY_URL.to_string()
}

fn default_return_to() -> String {
    DEFAULT_RETURN_TO.to_string()
}

fn default_device_timeout_secs() -> u64 {
    DEFAULT_DEVICE_TIMEOUT_SECS
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            relay_url: default_relay_url(),
            editor_url: None,
            return_to: default_return_to(),
            color_fields: Vec::new(),
            device_endpoint: None,
            device_timeout_secs: DEFAULT_DEVICE_TIMEOUT_SECS,
        }
    }
}

impl Config {
    /// Load configuration from the config file, falling back to defaults,
    /// then apply environment overrides.
    ///
    /// Without a config directory (no home directory) only the defaults and
    /// the environment apply.
    pub fn load(paths: Option<&Paths>) -> CoreResult<Self> {
        Self::load_with(paths, |key| std::env::var(key).ok())
    }

    fn load_with<F>(paths: Option<&Paths>, lookup: F) -> CoreResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match paths.map(Paths::config_file) {
            Some(path) if path.exists() => {
                debug!(path = %path.display(), "Loading config file");
                Self::load_from_file(&path)?
            }
            Some(path) => {
                debug!(path = %path.display(), "No config file, using defaults");
                Self::default()
            }
            None => {
                warn!("No config directory, using defaults");
                Self::default()
            }
        };

        config.apply_overrides(lookup);
        Ok(config)
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: &Path) -> CoreResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Override fields from `LIVECONFIG_*` variables resolved by `lookup`.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(log_level) = lookup("LIVECONFIG_LOG_LEVEL") {
            self.log_level = log_level;
        }
        if let Some(relay_url) = lookup("LIVECONFIG_RELAY_URL") {
            self.relay_url = relay_url;
        }
        if let Some(endpoint) = lookup("LIVECONFIG_DEVICE_ENDPOINT") {
            self.device_endpoint = Some(endpoint).filter(|e| !e.is_empty());
        }
    }

    /// Get the relay URL, parsed.
    pub fn relay_url(&self) -> CoreResult<Url> {
        Url::parse(&self.relay_url).map_err(CoreError::from)
    }

    /// Get the editor page URL, parsed. Configuring without one is an error.
    pub fn editor_url(&self) -> CoreResult<Url> {
        let raw = self
            .editor_url
            .as_deref()
            .ok_or_else(|| CoreError::Config("editor_url is not configured".to_string()))?;
        Url::parse(raw).map_err(CoreError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.log_level, DEFAULT_LOG_LEVEL);
        assert_eq!(config.relay_url, DEFAULT_RELAY_URL);
        assert_eq!(config.return_to, DEFAULT_RETURN_TO);
        assert!(config.editor_url.is_none());
        assert!(config.color_fields.is_empty());
        assert!(config.device_endpoint.is_none());
    }

    #[test]
    fn test_config_load_from_file_fills_defaults() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.json");

        let config_json = r#"{
            "log_level": "debug",
            "color_fields": ["backgroundColor", "hourHandColor"]
        }"#;
        std::fs::write(&config_path, config_json).unwrap();

        let config = Config::load_from_file(&config_path).unwrap();
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.color_fields, vec!["backgroundColor", "hourHandColor"]);
        assert_eq!(config.relay_url, DEFAULT_RELAY_URL);
        assert_eq!(config.device_timeout_secs, DEFAULT_DEVICE_TIMEOUT_SECS);
    }

    #[test]
    fn test_config_load_reads_config_file() {
        let dir = tempdir().unwrap();
        let paths = Paths::with_base_dir(dir.path().to_path_buf());
        std::fs::write(
            paths.config_file(),
            r#"{"editor_url": "https://example.com/config", "log_level": "debug"}"#,
        )
        .unwrap();

        let config = Config::load_with(Some(&paths), |_| None).unwrap();
        assert_eq!(config.editor_url.as_deref(), Some("https://example.com/config"));
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    fn test_config_load_without_config_dir() {
        let config = Config::load_with(None, |key| {
            (key == "LIVECONFIG_RELAY_URL").then(|| "ws://127.0.0.1:9000".to_string())
        })
        .unwrap();

        assert_eq!(config.relay_url, "ws://127.0.0.1:9000");
        assert_eq!(config.log_level, DEFAULT_LOG_LEVEL);
        assert!(config.editor_url.is_none());
    }

    #[test]
    fn test_config_load_nonexistent_uses_defaults() {
        let dir = tempdir().unwrap();
        let paths = Paths::with_base_dir(dir.path().to_path_buf());

        let config = Config::load_with(Some(&paths), |_| None).unwrap();
        assert!(config.editor_url.is_none());
        assert!(config.color_fields.is_empty());
    }

    #[test]
    fn test_apply_overrides() {
        let env: HashMap<&str, &str> = [
            ("LIVECONFIG_LOG_LEVEL", "trace"),
            ("LIVECONFIG_RELAY_URL", "ws://127.0.0.1:4000"),
            ("LIVECONFIG_DEVICE_ENDPOINT", "http://device.local/push"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.apply_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.log_level, "trace");
        assert_eq!(config.relay_url, "ws://127.0.0.1:4000");
        assert_eq!(
            config.device_endpoint.as_deref(),
            Some("http://device.local/push")
        );
    }

    #[test]
    fn test_empty_device_endpoint_override_clears() {
        let mut config = Config {
            device_endpoint: Some("http://device.local/push".to_string()),
            ..Default::default()
        };
        config.apply_overrides(|key| {
            (key == "LIVECONFIG_DEVICE_ENDPOINT").then(String::new)
        });
        assert!(config.device_endpoint.is_none());
    }

    #[test]
    fn test_relay_url_parse() {
        let config = Config::default();
        let url = config.relay_url().unwrap();
        assert_eq!(url.scheme(), "wss");
        assert_eq!(url.host_str(), Some("liveconfig.fletchto99.com"));
    }

    #[test]
    fn test_editor_url_required() {
        let config = Config::default();
        assert!(matches!(config.editor_url(), Err(CoreError::Config(_))));

        let config = Config {
            editor_url: Some("not a valid url".to_string()),
            ..Default::default()
        };
        assert!(matches!(config.editor_url(), Err(CoreError::InvalidUrl(_))));
    }
}
