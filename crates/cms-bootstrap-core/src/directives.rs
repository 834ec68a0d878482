//! The directive map handed to the host framework.

use cms_bootstrap_config::ConfigMap;
use serde::Serialize;
use serde_json::{Value, json};

/// Read-only directive map with typed accessors for common keys.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Directives(ConfigMap);

impl Directives {
    /// Wrap a resolved directive map.
    pub fn new(map: ConfigMap) -> Self {
        Self(map)
    }

    /// Borrow the underlying map.
    pub fn as_map(&self) -> &ConfigMap {
        &self.0
    }

    /// Take the underlying map.
    pub fn into_map(self) -> ConfigMap {
        self.0
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    /// Integer value, accepting numeric strings.
    pub fn get_i64(&self, key: &str) -> Option<i64> {
        match self.0.get(key)? {
            Value::Number(number) => number.as_i64(),
            Value::String(text) => text.trim().parse().ok(),
            _ => None,
        }
    }

    /// Boolean value from `y`/`n` style flags, booleans, or 0/1.
    pub fn flag(&self, key: &str) -> Option<bool> {
        match self.0.get(key)? {
            Value::Bool(flag) => Some(*flag),
            Value::Number(number) => number.as_i64().map(|n| n != 0),
            Value::String(text) => match text.trim().to_ascii_lowercase().as_str() {
                "y" | "yes" | "true" | "on" | "1" => Some(true),
                "n" | "no" | "false" | "off" | "0" | "" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }

    pub fn base_url(&self) -> Option<&str> {
        self.get_str("base_url")
    }

    pub fn site_url(&self) -> Option<&str> {
        self.get_str("site_url")
    }

    pub fn cp_url(&self) -> Option<&str> {
        self.get_str("cp_url")
    }

    pub fn cookie_domain(&self) -> Option<&str> {
        self.get_str("cookie_domain")
    }

    pub fn encryption_key(&self) -> Option<&str> {
        self.get_str("encryption_key")
    }

    /// Whether the site is switched on; absent means on.
    pub fn is_system_on(&self) -> bool {
        self.flag("is_system_on").unwrap_or(true)
    }

    /// Upload destinations keyed by id.
    pub fn upload_preferences(&self) -> Option<&ConfigMap> {
        self.0.get("upload_preferences").and_then(Value::as_object)
    }
}

impl From<Directives> for ConfigMap {
    fn from(directives: Directives) -> Self {
        directives.0
    }
}

/// Expand string upload destinations into `{server_path, url}` maps.
///
/// `public/uploads/images` becomes a server path under `root` and the URL
/// `/uploads/images/`. Entries that are already maps are left alone.
pub(crate) fn normalize_upload_preferences(map: &mut ConfigMap, root: &str, public_dir: &str) {
    let Some(preferences) = map.get_mut("upload_preferences") else {
        return;
    };
    match preferences {
        Value::Object(entries) => {
            for entry in entries.values_mut() {
                expand_upload_entry(entry, root, public_dir);
            }
        }
        Value::Array(entries) => {
            for entry in entries.iter_mut() {
                expand_upload_entry(entry, root, public_dir);
            }
        }
        _ => {}
    }
}

fn expand_upload_entry(entry: &mut Value, root: &str, public_dir: &str) {
    let Value::String(dir) = entry else {
        return;
    };
    let dir = dir.trim_matches('/');
    let url_path = dir
        .split('/')
        .filter(|segment| !segment.is_empty() && *segment != public_dir)
        .collect::<Vec<_>>()
        .join("/");
    let url = if url_path.is_empty() {
        "/".to_string()
    } else {
        format!("/{url_path}/")
    };
    *entry = json!({
        "server_path": format!("{root}{dir}/"),
        "url": url,
    });
}
