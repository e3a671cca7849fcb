//! Settings cache for the device side of a live configuration session.
//!
//! This crate provides:
//! - `FieldUpdate` / `SettingsSnapshot`: the data model shared by every
//!   liveconfig component
//! - `SettingsStore`: the persistence seam (`load` / `save`)
//! - `FileSettingsStore` and `MemorySettingsStore` backends
//! - `SettingsCache`: last-write-wins merge with write-through persistence

mod cache;
mod model;
mod store;

pub use cache::SettingsCache;
pub use model::{FieldUpdate, SettingsSnapshot};
pub use store::{FileSettingsStore, MemorySettingsStore, SettingsStore};

use thiserror::Error;

/// Error type for cache operations.
#[derive(Error, Debug)]
pub enum CacheError {
    /// The persisted snapshot could not be read.
    #[error("Failed to read settings: {0}")]
    ReadFailed(String),

    /// The persisted snapshot is not valid JSON.
    #[error("Corrupt settings file: {0}")]
    Corrupt(String),

    /// The persistence layer rejected a write. In-memory state stays valid.
    #[error("Failed to persist settings: {0}")]
    WriteFailed(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;
