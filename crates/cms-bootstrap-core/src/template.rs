//! Template variables for the page-rendering layer.

use cms_bootstrap_config::ConfigMap;
use serde::Serialize;
use serde_json::Value;

/// Prefix every template variable carries.
pub const DEFAULT_TEMPLATE_PREFIX: &str = "gv_";

/// How the template variable bundle is exported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateVarOptions {
    /// Prefix added to keys that lack it.
    pub prefix: String,
    /// Serialise maps and lists to JSON strings.
    pub serialize_nested: bool,
    /// Convert snake_case keys inside serialised values to camelCase.
    pub camel_case_nested_keys: bool,
}

impl Default for TemplateVarOptions {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_TEMPLATE_PREFIX.to_string(),
            serialize_nested: true,
            camel_case_nested_keys: true,
        }
    }
}

/// Flat, prefixed template variables.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct TemplateVars(ConfigMap);

impl TemplateVars {
    /// Prefix keys and flatten nested values according to `options`.
    pub fn from_map(map: ConfigMap, options: &TemplateVarOptions) -> Self {
        let mut vars = ConfigMap::new();
        for (key, value) in map {
            let key = if key.starts_with(&options.prefix) {
                key
            } else {
                format!("{}{key}", options.prefix)
            };
            let value = match value {
                nested @ (Value::Object(_) | Value::Array(_)) if options.serialize_nested => {
                    let nested = if options.camel_case_nested_keys {
                        camelize_keys(nested)
                    } else {
                        nested
                    };
                    Value::String(nested.to_string())
                }
                other => other,
            };
            vars.insert(key, value);
        }
        Self(vars)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn as_map(&self) -> &ConfigMap {
        &self.0
    }

    pub fn into_map(self) -> ConfigMap {
        self.0
    }
}

/// `cookie_settings` -> `cookieSettings`; leading underscores are kept.
pub fn camel_case(key: &str) -> String {
    let body = key.trim_start_matches('_');
    let mut out = String::with_capacity(key.len());
    out.push_str(&key[..key.len() - body.len()]);
    let mut seen_word = false;
    let mut upper_next = false;
    for ch in body.chars() {
        if ch == '_' || ch == '-' {
            upper_next = seen_word;
            continue;
        }
        if upper_next {
            out.extend(ch.to_uppercase());
            upper_next = false;
        } else {
            out.push(ch);
        }
        seen_word = true;
    }
    out
}

/// Recursively camel-case every map key.
pub fn camelize_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(key, value)| (camel_case(&key), camelize_keys(value)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.into_iter().map(camelize_keys).collect()),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn camel_case_variants() {
        assert_eq!(camel_case("cookie_settings"), "cookieSettings");
        assert_eq!(camel_case("googleAnalyticsId"), "googleAnalyticsId");
        assert_eq!(camel_case("site-name"), "siteName");
        assert_eq!(camel_case("_private_key"), "_privateKey");
        assert_eq!(camel_case("a__b"), "aB");
        assert_eq!(camel_case("-lead"), "lead");
        assert_eq!(camel_case("html"), "html");
    }

    #[test]
    fn prefixes_and_serializes_nested_values() {
        let Value::Object(map) = json!({
            "gv_env": "production",
            "site_name": "Acme",
            "settings": { "cookie_settings": { "max_age": 30 } },
            "tags": [{ "tag_name": "a" }]
        }) else {
            unreachable!()
        };
        let vars = TemplateVars::from_map(map, &TemplateVarOptions::default());
        assert_eq!(vars.get_str("gv_env"), Some("production"));
        assert_eq!(vars.get_str("gv_site_name"), Some("Acme"));
        assert_eq!(
            vars.get_str("gv_settings"),
            Some(r#"{"cookieSettings":{"maxAge":30}}"#)
        );
        assert_eq!(vars.get_str("gv_tags"), Some(r#"[{"tagName":"a"}]"#));
        assert_eq!(vars.len(), 4);
    }

    #[test]
    fn nested_values_can_stay_structured() {
        let Value::Object(map) = json!({ "settings": { "cookie_settings": 1 } }) else {
            unreachable!()
        };
        let options = TemplateVarOptions {
            prefix: "tv_".to_string(),
            serialize_nested: false,
            camel_case_nested_keys: true,
        };
        let vars = TemplateVars::from_map(map, &options);
        assert_eq!(
            vars.get("tv_settings"),
            Some(&json!({ "cookie_settings": 1 }))
        );
    }
}
