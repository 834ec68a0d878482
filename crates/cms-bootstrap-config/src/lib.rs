//! Config maps, the override-aware merger, and format-dispatching file loading.
//!
//! This crate owns the generic half of the bootstrap: turning config files
//! into nested maps and folding those maps together with marker semantics.

mod error;
mod loader;
mod map;
mod merge;

/// Public error type returned by config loading APIs.
pub use error::ConfigError;
/// File loading and format dispatch.
pub use loader::{ConfigDocument, ConfigFormat, ConfigLoader, DEFAULT_ENVIRONMENT};
/// Nested map type and helpers.
pub use map::{ConfigMap, ConfigValue, get_path, value_as_map};
/// Override-aware recursive merge.
pub use merge::{DEFAULT_OVERRIDE_MARKER, Merger};
