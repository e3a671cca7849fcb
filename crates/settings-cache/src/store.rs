//! Persistence backends for the settings cache.

use crate::{CacheError, CacheResult, SettingsSnapshot};
use parking_lot::Mutex;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Persistence seam for the settings cache.
///
/// The whole snapshot is stored as one JSON object under one well-known key.
pub trait SettingsStore: Send + Sync {
    /// Read the persisted snapshot. A missing entry is an empty snapshot.
    fn load(&self) -> CacheResult<SettingsSnapshot>;

    /// Replace the persisted snapshot.
    fn save(&self, snapshot: &SettingsSnapshot) -> CacheResult<()>;
}

impl<T: SettingsStore + ?Sized> SettingsStore for std::sync::Arc<T> {
    fn load(&self) -> CacheResult<SettingsSnapshot> {
        (**self).load()
    }

    fn save(&self, snapshot: &SettingsSnapshot) -> CacheResult<()> {
        (**self).save(snapshot)
    }
}

/// Parse a persisted document. Anything that is not an object reads as
/// empty, matching a store that was never written.
fn parse_document(content: &str) -> CacheResult<SettingsSnapshot> {
    if content.trim().is_empty() {
        return Ok(SettingsSnapshot::new());
    }

    match serde_json::from_str::<Value>(content).map_err(|e| CacheError::Corrupt(e.to_string()))? {
        Value::Object(map) => Ok(map.into_iter().collect()),
        _ => Ok(SettingsSnapshot::new()),
    }
}

/// Snapshot stored as a JSON file.
///
/// Writes go to a sibling temp file which is then renamed over the target,
/// so a crash mid-write leaves the previous snapshot intact.
#[derive(Debug, Clone)]
pub struct FileSettingsStore {
    path: PathBuf,
}

impl FileSettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl SettingsStore for FileSettingsStore {
    fn load(&self) -> CacheResult<SettingsSnapshot> {
        match std::fs::read_to_string(&self.path) {
            Ok(content) => parse_document(&content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No persisted settings");
                Ok(SettingsSnapshot::new())
            }
            Err(e) => Err(CacheError::ReadFailed(e.to_string())),
        }
    }

    fn save(&self, snapshot: &SettingsSnapshot) -> CacheResult<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string(snapshot)?;
        let temp = self.temp_path();
        std::fs::write(&temp, content)?;
        std::fs::rename(&temp, &self.path)?;
        Ok(())
    }
}

/// In-memory store holding the serialized document, for tests and
/// ephemeral runs.
#[derive(Debug, Default)]
pub struct MemorySettingsStore {
    document: Mutex<Option<String>>,
    fail_writes: Mutex<bool>,
    writes: Mutex<usize>,
}

impl MemorySettingsStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing serialized document.
    pub fn with_document(document: impl Into<String>) -> Self {
        let store = Self::default();
        *store.document.lock() = Some(document.into());
        store
    }

    /// Make subsequent writes fail (or succeed again).
    pub fn set_fail_writes(&self, fail: bool) {
        *self.fail_writes.lock() = fail;
    }

    /// The last document written, if any.
    pub fn document(&self) -> Option<String> {
        self.document.lock().clone()
    }

    /// Number of successful writes.
    pub fn write_count(&self) -> usize {
        *self.writes.lock()
    }
}

impl SettingsStore for MemorySettingsStore {
    fn load(&self) -> CacheResult<SettingsSnapshot> {
        match self.document.lock().as_deref() {
            Some(content) => parse_document(content),
            None => Ok(SettingsSnapshot::new()),
        }
    }

    fn save(&self, snapshot: &SettingsSnapshot) -> CacheResult<()> {
        if *self.fail_writes.lock() {
            return Err(CacheError::WriteFailed("storage unavailable".to_string()));
        }

        *self.document.lock() = Some(serde_json::to_string(snapshot)?);
        *self.writes.lock() += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    fn sample() -> SettingsSnapshot {
        [
            ("backgroundColor".to_string(), json!(0xFF0000)),
            ("secondsHandEnabled".to_string(), json!(false)),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_file_store_missing_file_is_empty() {
        let dir = tempdir().unwrap();
        let store = FileSettingsStore::new(dir.path().join("clay-settings.json"));

        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn test_file_store_save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("clay-settings.json");
        let store = FileSettingsStore::new(&path);

        store.save(&sample()).unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        assert_eq!(raw, r#"{"backgroundColor":16711680,"secondsHandEnabled":false}"#);
        assert_eq!(store.load().unwrap(), sample());
        assert!(!store.temp_path().exists());
    }

    #[test]
    fn test_file_store_corrupt_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("clay-settings.json");
        std::fs::write(&path, "{not json").unwrap();

        let store = FileSettingsStore::new(&path);
        assert!(matches!(store.load(), Err(CacheError::Corrupt(_))));
    }

    #[test]
    fn test_non_object_document_reads_empty() {
        assert!(parse_document("null").unwrap().is_empty());
        assert!(parse_document("[1,2]").unwrap().is_empty());
        assert!(parse_document("").unwrap().is_empty());
    }

    #[test]
    fn test_memory_store_fail_writes() {
        let store = MemorySettingsStore::new();
        store.save(&sample()).unwrap();
        assert_eq!(store.write_count(), 1);

        store.set_fail_writes(true);
        assert!(matches!(store.save(&SettingsSnapshot::new()), Err(CacheError::WriteFailed(_))));

        // The earlier document survives the failed write
        assert_eq!(store.load().unwrap(), sample());
        assert_eq!(store.write_count(), 1);
    }

    #[test]
    fn test_memory_store_with_document() {
        let store = MemorySettingsStore::with_document(r#"{"x":1}"#);
        assert_eq!(store.load().unwrap().get("x"), Some(&json!(1)));
    }
}
