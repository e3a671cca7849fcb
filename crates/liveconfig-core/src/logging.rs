//! Logging initialization.
//!
//! Thin wrappers over the observability crate so binaries configure logging
//! the same way.

use crate::Paths;

/// Initialize logging for the default `liveconfig` service.
///
/// Logs go to stderr and, when a home directory is available, to
/// `~/.liveconfig/logs/liveconfig.jsonl`. `RUST_LOG` overrides `level`.
pub fn init_logging(level: &str) {
    init_logging_for_service("liveconfig", level);
}

/// Initialize logging with a custom service name.
pub fn init_logging_for_service(service_name: &str, level: &str) {
    let log_path = Paths::new().ok().map(|paths| paths.log_file());

    observability::init_with_config(observability::LogConfig {
        service_name: service_name.into(),
        default_level: level.into(),
        log_path,
        also_stderr: true,
    });
}
