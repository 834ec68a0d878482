//! Per-format parsers producing generic JSON values.

use crate::{ConfigError, ConfigMap};
use ini::Ini;
use json5::ErrorCode;
use log::debug;
use serde_json::error::Category;
use serde_json::{Number, Value};
use serde_yaml::Value as YamlValue;
use std::path::Path;

/// Parse JSON; failures carry the error class and position.
pub(super) fn parse_json(contents: &str, path: &Path) -> Result<Value, ConfigError> {
    if contents.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(contents).map_err(|err| ConfigError::JsonParse {
        path: path.to_path_buf(),
        category: match err.classify() {
            Category::Io => "io",
            Category::Syntax => "syntax",
            Category::Data => "data",
            Category::Eof => "eof",
        },
        line: err.line(),
        column: err.column(),
        message: err.to_string(),
    })
}

/// Parse JSON5 with the same strictness and error shape as JSON.
pub(super) fn parse_json5(contents: &str, path: &Path) -> Result<Value, ConfigError> {
    if contents.trim().is_empty() {
        return Ok(Value::Null);
    }
    json5::from_str(contents).map_err(|err| {
        // json5 positions are zero-based; serde_json's are one-based
        let (line, column) = err
            .position()
            .map(|position| (position.line + 1, position.column + 1))
            .unwrap_or((0, 0));
        ConfigError::JsonParse {
            path: path.to_path_buf(),
            category: json5_category(err.code()),
            line,
            column,
            message: err.to_string(),
        }
    })
}

fn json5_category(code: Option<ErrorCode>) -> &'static str {
    match code {
        None => "data",
        Some(
            ErrorCode::EofParsingArray
            | ErrorCode::EofParsingBool
            | ErrorCode::EofParsingComment
            | ErrorCode::EofParsingEscapeSequence
            | ErrorCode::EofParsingIdentifier
            | ErrorCode::EofParsingNull
            | ErrorCode::EofParsingNumber
            | ErrorCode::EofParsingObject
            | ErrorCode::EofParsingString
            | ErrorCode::EofParsingValue,
        ) => "eof",
        Some(_) => "syntax",
    }
}

/// Parse YAML into JSON values, stringifying scalar keys.
pub(super) fn parse_yaml(contents: &str) -> Result<Value, serde_yaml::Error> {
    if contents.trim().is_empty() {
        return Ok(Value::Null);
    }
    let raw: YamlValue = serde_yaml::from_str(contents)?;
    Ok(yaml_to_json(raw))
}

fn yaml_to_json(value: YamlValue) -> Value {
    match value {
        YamlValue::Null => Value::Null,
        YamlValue::Bool(flag) => Value::Bool(flag),
        YamlValue::Number(number) => {
            if let Some(int) = number.as_i64() {
                Value::from(int)
            } else if let Some(uint) = number.as_u64() {
                Value::from(uint)
            } else {
                number
                    .as_f64()
                    .and_then(Number::from_f64)
                    .map(Value::Number)
                    .unwrap_or(Value::Null)
            }
        }
        YamlValue::String(text) => Value::String(text),
        YamlValue::Sequence(items) => Value::Array(items.into_iter().map(yaml_to_json).collect()),
        YamlValue::Mapping(mapping) => {
            let mut map = ConfigMap::new();
            for (key, value) in mapping {
                match yaml_key(&key) {
                    Some(key) => {
                        map.insert(key, yaml_to_json(value));
                    }
                    None => debug!("skipping YAML entry with non-scalar key"),
                }
            }
            Value::Object(map)
        }
        YamlValue::Tagged(tagged) => yaml_to_json(tagged.value),
    }
}

fn yaml_key(key: &YamlValue) -> Option<String> {
    match key {
        YamlValue::String(text) => Some(text.clone()),
        YamlValue::Number(number) => Some(number.to_string()),
        YamlValue::Bool(flag) => Some(flag.to_string()),
        YamlValue::Tagged(tagged) => yaml_key(&tagged.value),
        _ => None,
    }
}

/// Parse INI: sections become nested maps, dotted section names nest further.
///
/// `key[] = v` appends to a list and `key[name] = v` writes into a map.
pub(super) fn parse_ini(contents: &str) -> Result<Value, ini::ParseError> {
    let ini = Ini::load_from_str(contents)?;
    let mut root = ConfigMap::new();
    for (section, properties) in ini.iter() {
        let mut entries = ConfigMap::new();
        for (key, raw) in properties.iter() {
            insert_ini_entry(&mut entries, key, coerce_ini_scalar(raw));
        }
        let segments: Vec<&str> = section
            .map(|name| {
                name.split('.')
                    .map(str::trim)
                    .filter(|segment| !segment.is_empty())
                    .collect()
            })
            .unwrap_or_default();
        merge_section(&mut root, &segments, entries);
    }
    Ok(Value::Object(root))
}

/// Write `entries` into the map reached by `segments`, creating (or
/// replacing scalars with) maps on the way.
fn merge_section(target: &mut ConfigMap, segments: &[&str], entries: ConfigMap) {
    let Some((first, rest)) = segments.split_first() else {
        target.extend(entries);
        return;
    };
    let slot = target
        .entry(first.to_string())
        .or_insert_with(|| Value::Object(ConfigMap::new()));
    if let Value::Object(map) = slot {
        merge_section(map, rest, entries);
        return;
    }
    let mut map = ConfigMap::new();
    merge_section(&mut map, rest, entries);
    *slot = Value::Object(map);
}

fn insert_ini_entry(target: &mut ConfigMap, key: &str, value: Value) {
    let Some((name, rest)) = key.split_once('[') else {
        target.insert(key.to_string(), value);
        return;
    };
    let Some(index) = rest.strip_suffix(']') else {
        target.insert(key.to_string(), value);
        return;
    };
    let slot = target.entry(name.to_string()).or_insert(Value::Null);
    if index.is_empty() {
        if !slot.is_array() {
            *slot = Value::Array(Vec::new());
        }
        if let Value::Array(items) = slot {
            items.push(value);
        }
    } else {
        if !slot.is_object() {
            *slot = Value::Object(ConfigMap::new());
        }
        if let Value::Object(map) = slot {
            map.insert(index.to_string(), value);
        }
    }
}

/// Interpret INI literals.
///
/// `true/on/yes` and `false/off/no` are booleans and `null` is null, the
/// usual INI spellings. Numbers are only produced when printing them back
/// gives the same text, so `0123`, `1e3` or `1.50` stay strings.
pub(super) fn coerce_ini_scalar(raw: &str) -> Value {
    let trimmed = raw.trim();
    match trimmed.to_ascii_lowercase().as_str() {
        "true" | "on" | "yes" => return Value::Bool(true),
        "false" | "off" | "no" => return Value::Bool(false),
        "null" => return Value::Null,
        _ => {}
    }
    if let Ok(int) = trimmed.parse::<i64>() {
        if int.to_string() == trimmed {
            return Value::from(int);
        }
    }
    if let Some(number) = trimmed.parse::<f64>().ok().and_then(Number::from_f64) {
        if number.to_string() == trimmed {
            return Value::Number(number);
        }
    }
    Value::String(trimmed.to_string())
}
