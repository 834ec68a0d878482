//! Error types for the bootstrap orchestrator.

use cms_bootstrap_config::ConfigError;
use thiserror::Error;

/// Errors returned by bootstrap construction and property access.
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// Loading a config file failed.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// The requested property name is not recognised.
    #[error("unknown property: {0}")]
    UnknownProperty(String),
    /// A property was given a value of the wrong shape.
    #[error("invalid value for property {property}: expected {expected}")]
    InvalidProperty {
        property: &'static str,
        expected: &'static str,
    },
    /// A runtime requirement is not met.
    #[error("requirement not met: {0}")]
    Requirement(String),
    /// Converting a bundle into a typed struct failed.
    #[error("failed to decode {bundle}: {source}")]
    Decode {
        bundle: &'static str,
        #[source]
        source: serde_json::Error,
    },
}
