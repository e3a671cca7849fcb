//! Field categories and the value transforms applied per category.

use crate::palette::quantize_value;
use settings_cache::{FieldUpdate, SettingsSnapshot};
use std::collections::HashMap;

/// Editor control category of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Snapped to the device palette before sending or display.
    Color,
    /// Passed through unchanged.
    Other,
}

/// Field id → category. Unlisted fields are `FieldKind::Other`.
#[derive(Debug, Clone, Default)]
pub struct FieldSchema {
    kinds: HashMap<String, FieldKind>,
}

impl FieldSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schema in which every listed id is a color field.
    pub fn with_color_fields<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut schema = Self::new();
        for id in ids {
            schema.set_kind(id, FieldKind::Color);
        }
        schema
    }

    pub fn set_kind(&mut self, id: impl Into<String>, kind: FieldKind) {
        self.kinds.insert(id.into(), kind);
    }

    pub fn kind(&self, id: &str) -> FieldKind {
        self.kinds.get(id).copied().unwrap_or(FieldKind::Other)
    }

    /// Apply the presentation transform for the update's field.
    ///
    /// Pure and idempotent: transforming an already transformed update
    /// yields the same update.
    pub fn transform(&self, update: FieldUpdate) -> FieldUpdate {
        match self.kind(&update.id) {
            FieldKind::Color => FieldUpdate {
                value: quantize_value(&update.value),
                id: update.id,
            },
            _ => update,
        }
    }

    /// Apply `transform` to every field of a snapshot in place.
    pub fn normalize(&self, snapshot: &mut SettingsSnapshot) {
        for (id, kind) in &self.kinds {
            if *kind != FieldKind::Color {
                continue;
            }
            if let Some(value) = snapshot.get_mut(id) {
                *value = quantize_value(value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_unlisted_fields_are_other() {
        let schema = FieldSchema::with_color_fields(["backgroundColor"]);
        assert_eq!(schema.kind("backgroundColor"), FieldKind::Color);
        assert_eq!(schema.kind("secondsHandEnabled"), FieldKind::Other);
    }

    #[test]
    fn test_transform_only_touches_colors() {
        let mut schema = FieldSchema::with_color_fields(["backgroundColor"]);
        schema.set_kind("count", FieldKind::Other);

        let color = schema.transform(FieldUpdate::new("backgroundColor", 0x123456));
        assert_eq!(color.value, json!(0x005555));

        let other = schema.transform(FieldUpdate::new("count", 0x123456));
        assert_eq!(other.value, json!(0x123456));
    }

    #[test]
    fn test_normalize_snapshot() {
        let schema = FieldSchema::with_color_fields(["hourHandColor", "missing"]);
        let mut snapshot: SettingsSnapshot = [
            ("hourHandColor".to_string(), json!(0xFE8001)),
            ("label".to_string(), json!("0xFE8001")),
        ]
        .into_iter()
        .collect();

        schema.normalize(&mut snapshot);

        assert_eq!(snapshot.get("hourHandColor"), Some(&json!(0xFFAA00)));
        assert_eq!(snapshot.get("label"), Some(&json!("0xFE8001")));
        assert!(snapshot.get("missing").is_none());
    }
}
