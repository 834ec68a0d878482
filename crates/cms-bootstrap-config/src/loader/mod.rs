//! Config file loading with format dispatch and environment scoping.
//!
//! Files are read into a generic [`ConfigMap`]. JSON-family files are strict:
//! a parse failure is reported to the caller. Every other format degrades to
//! an empty contribution so a broken optional file never stops a request.

mod parse;


use crate::{ConfigError, ConfigMap, value_as_map};
use log::{debug, warn};
use serde_json::Value;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Environment selected when nothing else picks one.
pub const DEFAULT_ENVIRONMENT: &str = "development";

/// Formats recognised by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// `.yml` / `.yaml`
    Yaml,
    /// `.ini`
    Ini,
    /// `.json`
    Json,
    /// `.json5`
    Json5,
    /// `.php`; recognised but never evaluated.
    Script,
}

impl ConfigFormat {
    /// Pick a format from the file extension (case-insensitive).
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "yml" | "yaml" => Some(Self::Yaml),
            "ini" => Some(Self::Ini),
            "json" => Some(Self::Json),
            "json5" => Some(Self::Json5),
            "php" => Some(Self::Script),
            _ => None,
        }
    }

    /// Whether parse failures for this format are fatal.
    pub fn is_strict(self) -> bool {
        matches!(self, Self::Json | Self::Json5)
    }
}

/// A parsed config file: the whole top-level map plus where it came from.
#[derive(Debug, Clone, Default)]
pub struct ConfigDocument {
    path: Option<PathBuf>,
    format: Option<ConfigFormat>,
    root: ConfigMap,
}

impl ConfigDocument {
    /// Wrap an in-memory map as a document.
    pub fn from_map(root: ConfigMap) -> Self {
        Self {
            path: None,
            format: None,
            root,
        }
    }

    /// Source path, if the document was read from disk.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Detected format, if any.
    pub fn format(&self) -> Option<ConfigFormat> {
        self.format
    }

    /// Whole top-level map.
    pub fn root(&self) -> &ConfigMap {
        &self.root
    }

    /// Consume the document and return its top-level map.
    pub fn into_root(self) -> ConfigMap {
        self.root
    }

    /// True when nothing was loaded.
    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }

    /// Sub-map nested under `environment`, or an empty map.
    pub fn environment_section(&self, environment: &str) -> ConfigMap {
        self.root
            .get(environment)
            .and_then(value_as_map)
            .cloned()
            .unwrap_or_default()
    }
}

/// Reads config files for one active environment.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    environment: String,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new(DEFAULT_ENVIRONMENT)
    }
}

impl ConfigLoader {
    /// Create a loader scoped to `environment`.
    pub fn new(environment: impl Into<String>) -> Self {
        Self {
            environment: environment.into(),
        }
    }

    /// Active environment name.
    pub fn environment(&self) -> &str {
        &self.environment
    }

    /// Switch the active environment.
    pub fn set_environment(&mut self, environment: impl Into<String>) {
        self.environment = environment.into();
    }

    /// Load the section of `path` nested under the active environment.
    ///
    /// Missing files, missing sections and non-map sections all yield an
    /// empty map.
    pub fn load(&self, path: impl AsRef<Path>) -> Result<ConfigMap, ConfigError> {
        let document = self.load_document(path)?;
        Ok(document.environment_section(&self.environment))
    }

    /// Load the whole document at `path`.
    pub fn load_document(&self, path: impl AsRef<Path>) -> Result<ConfigDocument, ConfigError> {
        let path = path.as_ref();
        let format = ConfigFormat::from_path(path);
        let empty = ConfigDocument {
            path: Some(path.to_path_buf()),
            format,
            root: ConfigMap::new(),
        };

        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!("config file missing, skipping (path={})", path.display());
                return Ok(empty);
            }
            Err(source) => {
                return Err(ConfigError::ReadFailed {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };

        let Some(format) = format else {
            warn!(
                "unsupported config extension, skipping (path={})",
                path.display()
            );
            return Ok(empty);
        };

        let value = match format {
            ConfigFormat::Json => parse::parse_json(&contents, path)?,
            ConfigFormat::Json5 => parse::parse_json5(&contents, path)?,
            ConfigFormat::Yaml => match parse::parse_yaml(&contents) {
                Ok(value) => value,
                Err(err) => {
                    warn!("invalid YAML config ignored (path={}): {err}", path.display());
                    return Ok(empty);
                }
            },
            ConfigFormat::Ini => match parse::parse_ini(&contents) {
                Ok(value) => value,
                Err(err) => {
                    warn!("invalid INI config ignored (path={}): {err}", path.display());
                    return Ok(empty);
                }
            },
            ConfigFormat::Script => {
                warn!(
                    "script config files cannot be evaluated, skipping (path={})",
                    path.display()
                );
                return Ok(empty);
            }
        };

        let root = match value {
            Value::Object(map) => map,
            Value::Null => ConfigMap::new(),
            other => {
                if format.is_strict() {
                    return Err(ConfigError::Invalid(format!(
                        "{} must contain a top-level map, found {}",
                        path.display(),
                        value_kind(&other)
                    )));
                }
                warn!(
                    "config root is not a map, skipping (path={}, kind={})",
                    path.display(),
                    value_kind(&other)
                );
                ConfigMap::new()
            }
        };

        debug!(
            "loaded config document (path={}, format={:?}, keys={})",
            path.display(),
            format,
            root.len()
        );
        Ok(ConfigDocument {
            path: Some(path.to_path_buf()),
            format: Some(format),
            root,
        })
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "map",
    }
}
