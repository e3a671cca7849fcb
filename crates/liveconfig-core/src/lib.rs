//! Core types, configuration, and utilities shared by the liveconfig crates.

mod config;
mod error;
mod identity;
mod logging;
mod paths;

pub use config::{Config, DEFAULT_LOG_LEVEL, DEFAULT_RELAY_URL, DEFAULT_RETURN_TO};
pub use error::{CoreError, CoreResult};
pub use identity::Identity;
pub use logging::{init_logging, init_logging_for_service};
pub use paths::Paths;
