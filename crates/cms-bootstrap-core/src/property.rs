//! The fixed set of top-level properties a config source may set.

use crate::BootstrapError;
use cms_bootstrap_config::{ConfigMap, Merger};
use log::{debug, warn};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Recognised top-level property names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Property {
    /// Active environment name.
    Environment,
    /// Debug level (0 = off).
    Debug,
    /// Framework system directory.
    SystemPath,
    /// Directive map handed to the host framework.
    ConfigVars,
    /// Template variables.
    GlobalVars,
    /// Database connection settings.
    DbConfig,
}

impl Property {
    /// Every property, in canonical order.
    pub const ALL: [Property; 6] = [
        Property::Environment,
        Property::Debug,
        Property::SystemPath,
        Property::ConfigVars,
        Property::GlobalVars,
        Property::DbConfig,
    ];

    /// Key used in config files.
    pub fn as_str(self) -> &'static str {
        match self {
            Property::Environment => "environment",
            Property::Debug => "debug",
            Property::SystemPath => "system_path",
            Property::ConfigVars => "config_vars",
            Property::GlobalVars => "global_vars",
            Property::DbConfig => "db_config",
        }
    }

    /// Whether the property holds a nested map.
    pub fn is_map(self) -> bool {
        matches!(
            self,
            Property::ConfigVars | Property::GlobalVars | Property::DbConfig
        )
    }

    /// Reject values of the wrong shape.
    pub fn validate(self, value: &Value) -> Result<(), BootstrapError> {
        let ok = match self {
            Property::Environment | Property::SystemPath => value.is_string(),
            Property::Debug => debug_level(value).is_some(),
            Property::ConfigVars | Property::GlobalVars | Property::DbConfig => value.is_object(),
        };
        if ok {
            Ok(())
        } else {
            Err(BootstrapError::InvalidProperty {
                property: self.as_str(),
                expected: self.expected(),
            })
        }
    }

    fn expected(self) -> &'static str {
        match self {
            Property::Environment | Property::SystemPath => "a string",
            Property::Debug => "an integer level or boolean",
            Property::ConfigVars | Property::GlobalVars | Property::DbConfig => "a map",
        }
    }
}

impl FromStr for Property {
    type Err = BootstrapError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        Property::ALL
            .into_iter()
            .find(|property| property.as_str() == name)
            .ok_or_else(|| BootstrapError::UnknownProperty(name.to_string()))
    }
}

impl fmt::Display for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Read a debug level from a number, bool, or numeric string.
pub(crate) fn debug_level(value: &Value) -> Option<u8> {
    match value {
        Value::Number(number) => number
            .as_u64()
            .map(|level| u8::try_from(level).unwrap_or(u8::MAX)),
        Value::Bool(flag) => Some(u8::from(*flag)),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

/// Keep only the recognised, well-shaped properties of `incoming`.
///
/// Unknown keys (often environment sections) and wrongly-shaped values are
/// dropped; override markers on property names are kept for the merger.
pub(crate) fn select(merger: &Merger, incoming: &ConfigMap) -> ConfigMap {
    let mut accepted = ConfigMap::new();
    for (key, value) in incoming {
        let Ok(property) = merger.target_key(key).parse::<Property>() else {
            debug!("ignoring unrecognised top-level key: {key}");
            continue;
        };
        if value.is_null() {
            continue;
        }
        if let Err(err) = property.validate(value) {
            warn!("ignoring config value: {err}");
            continue;
        }
        accepted.insert(key.clone(), value.clone());
    }
    accepted
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn parses_known_names_and_rejects_others() {
        for property in Property::ALL {
            assert_eq!(property.as_str().parse::<Property>().expect("known"), property);
        }
        let err = "site_url".parse::<Property>().unwrap_err();
        assert!(matches!(err, BootstrapError::UnknownProperty(name) if name == "site_url"));
    }

    #[test]
    fn debug_levels_accept_several_spellings() {
        assert_eq!(debug_level(&json!(2)), Some(2));
        assert_eq!(debug_level(&json!(true)), Some(1));
        assert_eq!(debug_level(&json!(" 1 ")), Some(1));
        assert_eq!(debug_level(&json!(1000)), Some(u8::MAX));
        assert_eq!(debug_level(&json!("loud")), None);
        assert_eq!(debug_level(&json!(-1)), None);
    }

    #[test]
    fn select_filters_keys_and_shapes() {
        let merger = Merger::default();
        let incoming = json!({
            "db_config": { "hostname": "b" },
            "config_vars": "not a map",
            "production": { "debug": 1 },
            "environment": "staging",
            "!global_vars": { "gv_x": 1 }
        });
        let Value::Object(incoming) = incoming else { unreachable!() };
        let selected = select(&merger, &incoming);

        assert_eq!(
            Value::Object(selected),
            json!({
                "db_config": { "hostname": "b" },
                "environment": "staging",
                "!global_vars": { "gv_x": 1 }
            })
        );
    }
}
