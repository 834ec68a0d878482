//! Typed view of the database bundle.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Connection settings consumed by the database driver.
///
/// Unknown keys in the bundle are ignored; missing keys fall back to the
/// driver defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    #[serde(deserialize_with = "string_like")]
    pub hostname: String,
    #[serde(deserialize_with = "string_like")]
    pub username: String,
    #[serde(deserialize_with = "string_like")]
    pub password: String,
    #[serde(deserialize_with = "string_like")]
    pub database: String,
    pub dbdriver: String,
    pub pconnect: bool,
    pub dbprefix: String,
    pub swap_pre: String,
    pub db_debug: bool,
    pub cache_on: bool,
    pub autoinit: bool,
    pub char_set: String,
    pub dbcollat: String,
    pub cachedir: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            hostname: "localhost".to_string(),
            username: String::new(),
            password: String::new(),
            database: String::new(),
            dbdriver: "mysql".to_string(),
            pconnect: false,
            dbprefix: "exp_".to_string(),
            swap_pre: "exp_".to_string(),
            db_debug: true,
            cache_on: false,
            autoinit: false,
            char_set: "utf8".to_string(),
            dbcollat: "utf8_general_ci".to_string(),
            cachedir: String::new(),
        }
    }
}

/// Accept numbers and booleans where a string is expected; INI files
/// coerce `password = 1234` to a number.
fn string_like<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(text) => text,
        Value::Null => String::new(),
        Value::Number(number) => number.to_string(),
        Value::Bool(flag) => flag.to_string(),
        other => {
            return Err(serde::de::Error::custom(format!(
                "expected a string, found {other}"
            )));
        }
    })
}
