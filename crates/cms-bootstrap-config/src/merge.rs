//! Recursive map merging with override markers.

use crate::ConfigMap;
use serde_json::Value;

/// Default key prefix that turns a merge into a wholesale replacement.
pub const DEFAULT_OVERRIDE_MARKER: char = '!';

/// Folds config maps together; later sources win.
///
/// Nested maps merge recursively, scalars overwrite, `null` never replaces
/// anything, and a key prefixed with the marker replaces its un-prefixed
/// counterpart in the base without looking inside it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Merger {
    marker: char,
}

impl Default for Merger {
    fn default() -> Self {
        Self::new(DEFAULT_OVERRIDE_MARKER)
    }
}

impl Merger {
    /// Create a merger using a custom override marker.
    pub fn new(marker: char) -> Self {
        Self { marker }
    }

    /// The override marker in use.
    pub fn marker(&self) -> char {
        self.marker
    }

    /// Return the replaced key name when `key` carries the override marker.
    ///
    /// A key made of the marker alone has nothing to replace and is treated
    /// as an ordinary key.
    pub fn override_target<'k>(&self, key: &'k str) -> Option<&'k str> {
        key.strip_prefix(self.marker)
            .filter(|stripped| !stripped.is_empty())
    }

    /// Key name with any override marker removed.
    pub fn target_key<'k>(&self, key: &'k str) -> &'k str {
        self.override_target(key).unwrap_or(key)
    }

    /// Merge `incoming` onto `base` and return the result.
    pub fn merge(&self, mut base: ConfigMap, incoming: ConfigMap) -> ConfigMap {
        self.merge_into(&mut base, &incoming);
        base
    }

    /// Fold every source onto `base`, left to right.
    pub fn merge_all<I>(&self, base: ConfigMap, sources: I) -> ConfigMap
    where
        I: IntoIterator<Item = ConfigMap>,
    {
        sources
            .into_iter()
            .fold(base, |merged, source| self.merge(merged, source))
    }

    /// Merge `incoming` onto `base` in place.
    pub fn merge_into(&self, base: &mut ConfigMap, incoming: &ConfigMap) {
        for (key, value) in incoming {
            if value.is_null() {
                continue;
            }
            if let Some(target) = self.override_target(key) {
                base.insert(target.to_string(), self.normalize(value));
                continue;
            }
            if let (Some(Value::Object(existing)), Value::Object(overlay)) =
                (base.get_mut(key), value)
            {
                self.merge_into(existing, overlay);
                continue;
            }
            base.insert(key.clone(), self.normalize(value));
        }
    }

    /// Copy a value, dropping nulls and resolving markers inside nested maps.
    pub fn normalize(&self, value: &Value) -> Value {
        match value {
            Value::Object(map) => {
                let mut normalized = ConfigMap::new();
                self.merge_into(&mut normalized, map);
                Value::Object(normalized)
            }
            other => other.clone(),
        }
    }
}
