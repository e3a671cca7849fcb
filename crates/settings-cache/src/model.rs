//! Field updates and settings snapshots.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// One configurable field's new value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldUpdate {
    /// Field identifier (the editor's app key).
    pub id: String,
    /// New scalar value.
    pub value: Value,
}

impl FieldUpdate {
    pub fn new(id: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            id: id.into(),
            value: value.into(),
        }
    }

    /// The single-field delta pushed to the device for this update.
    pub fn to_delta(&self) -> SettingsSnapshot {
        let mut delta = SettingsSnapshot::new();
        delta.insert(self.id.clone(), self.value.clone());
        delta
    }
}

/// Mapping from field id to value. Serialized as a plain JSON object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SettingsSnapshot(BTreeMap<String, Value>);

impl SettingsSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &str) -> Option<&Value> {
        self.0.get(id)
    }

    /// Overwrite the value for `id`. Returns the previous value, if any.
    pub fn insert(&mut self, id: impl Into<String>, value: Value) -> Option<Value> {
        self.0.insert(id.into(), value)
    }

    /// Apply one update with last-write-wins semantics.
    pub fn apply(&mut self, update: &FieldUpdate) {
        self.0.insert(update.id.clone(), update.value.clone());
    }

    /// Overwrite every field present in `other`.
    pub fn merge(&mut self, other: &SettingsSnapshot) {
        for (id, value) in other.iter() {
            self.0.insert(id.clone(), value.clone());
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Value> {
        self.0.get_mut(id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, Value)> for SettingsSnapshot {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl From<BTreeMap<String, Value>> for SettingsSnapshot {
    fn from(map: BTreeMap<String, Value>) -> Self {
        Self(map)
    }
}
