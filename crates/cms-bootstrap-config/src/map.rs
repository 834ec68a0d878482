//! Nested configuration maps.

use serde_json::{Map, Value};

/// A single configuration value: scalar, string, bool, null, array, or nested map.
pub type ConfigValue = Value;

/// Ordered mapping from string keys to config values.
pub type ConfigMap = Map<String, Value>;

/// Borrow a value as a nested map when it is one.
pub fn value_as_map(value: &Value) -> Option<&ConfigMap> {
    match value {
        Value::Object(map) => Some(map),
        _ => None,
    }
}

/// Look up a dotted path (`a.b.c`) inside a nested map.
pub fn get_path<'a>(map: &'a ConfigMap, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let first = segments.next()?;
    let mut current = map.get(first)?;
    for segment in segments {
        current = value_as_map(current)?.get(segment)?;
    }
    Some(current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn get_path_walks_nested_maps() {
        let value = json!({ "db": { "primary": { "host": "localhost" } }, "flag": true });
        let map = value_as_map(&value).expect("map");
        assert_eq!(get_path(map, "db.primary.host"), Some(&json!("localhost")));
        assert_eq!(get_path(map, "flag"), Some(&json!(true)));
        assert_eq!(get_path(map, "flag.nested"), None);
        assert_eq!(get_path(map, "db.missing"), None);
    }
}
