//! Error types for config loading.

use std::path::PathBuf;
use thiserror::Error;

/// Errors returned while loading config files.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Reading an existing config file failed.
    #[error("failed to read config {path}: {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// A JSON or JSON5 file could not be parsed.
    #[error("failed to parse {path} ({category} error at line {line}, column {column}): {message}")]
    JsonParse {
        path: PathBuf,
        category: &'static str,
        line: usize,
        column: usize,
        message: String,
    },
    /// Generic validation failure.
    #[error("invalid config: {0}")]
    Invalid(String),
}
