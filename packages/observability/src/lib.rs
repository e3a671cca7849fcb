//! # Observability
//!
//! Centralized logging setup for the liveconfig binaries.
//!
//! Binaries call `observability::init_with_config()` once at startup and
//! use standard `tracing` macros everywhere else. They never decide where log lines go.
//!
//! Two sinks are available:
//!
//! - compact human-readable output on stderr
//! - structured JSONL appended to `LogConfig::log_path`, one object per
//!   event
//!
//! ```rust,ignore
//! fn main() {
//!     observability::init_with_config(observability::LogConfig {
//!         service_name: "liveconfig".into(),
//!         default_level: "debug".into(),
//!         also_stderr: true,
//!         ..Default::default()
//!     });
//!
//!     tracing::info!("service started");
//! }
//! ```

mod file_sink;
mod json_layer;

use std::path::PathBuf;

pub use file_sink::FileLogWriter;
pub use json_layer::{JsonLayer, LogEntry};

/// Configuration for the logging system.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Name of the service (e.g., "liveconfig-configure").
    /// Included in every JSONL line for filtering.
    pub service_name: String,

    /// Default log level filter (e.g., "debug", "info", "warn").
    /// Can be overridden by `RUST_LOG` environment variable.
    pub default_level: String,

    /// Optional JSONL file path. `None` disables the file sink.
    pub log_path: Option<PathBuf>,

    /// Also emit logs to stderr for immediate feedback.
    pub also_stderr: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            service_name: "unknown".into(),
            default_level: "info".into(),
            log_path: None,
            also_stderr: true,
        }
    }
}

/// Initialize the observability layer with custom configuration.
///
/// Calling this more than once is harmless: the second global subscriber
/// install is rejected and ignored.
pub fn init_with_config(config: LogConfig) {
    file_sink::install_subscriber(&config);
}

/// Re-export tracing macros for convenience.
pub use tracing::{debug, error, info, instrument, trace, warn};

/// Re-export Level for advanced filtering.
pub use tracing::Level;
