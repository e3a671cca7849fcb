//! Last-write-wins settings cache with write-through persistence.

use crate::{CacheError, CacheResult, FieldUpdate, SettingsSnapshot, SettingsStore};
use serde_json::Value;
use tracing::{debug, warn};

/// Durable "last known good" configuration.
///
/// The in-memory snapshot is authoritative for the life of the process.
/// Every merge is written through to the store; when the store fails the
/// merge still takes effect in memory and `CacheError::WriteFailed` is
/// returned so the caller can log it.
///
/// Not internally synchronized; share it behind a mutex.
pub struct SettingsCache {
    snapshot: SettingsSnapshot,
    store: Box<dyn SettingsStore>,
}

impl SettingsCache {
    /// Open the cache, reading the persisted snapshot.
    ///
    /// A store that cannot be read starts the cache empty.
    pub fn open(store: Box<dyn SettingsStore>) -> Self {
        let snapshot = match store.load() {
            Ok(snapshot) => {
                debug!(fields = snapshot.len(), "Loaded persisted settings");
                snapshot
            }
            Err(e) => {
                warn!(error = %e, "Could not load persisted settings, starting empty");
                SettingsSnapshot::new()
            }
        };

        Self { snapshot, store }
    }

    /// Merge one field update (overwrite) and persist the result.
    ///
    /// Applying the same update twice leaves the cache unchanged.
    pub fn apply(&mut self, update: &FieldUpdate) -> CacheResult<()> {
        self.snapshot.apply(update);
        self.persist()
    }

    /// Merge every field of `snapshot` and persist the result.
    pub fn merge(&mut self, snapshot: &SettingsSnapshot) -> CacheResult<()> {
        self.snapshot.merge(snapshot);
        self.persist()
    }

    pub fn get(&self, id: &str) -> Option<&Value> {
        self.snapshot.get(id)
    }

    pub fn snapshot(&self) -> &SettingsSnapshot {
        &self.snapshot
    }

    fn persist(&self) -> CacheResult<()> {
        self.store.save(&self.snapshot).map_err(|e| match e {
            CacheError::WriteFailed(reason) => CacheError::WriteFailed(reason),
            other => CacheError::WriteFailed(other.to_string()),
        })
    }
}
