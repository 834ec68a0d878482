//! Public SDK surface for cms-bootstrap.
//!
//! This crate re-exports the config and orchestration crates and carries the
//! command-line front end used to inspect a site's resolved configuration.

/// Re-export for convenience.
pub use cms_bootstrap_config as config;
/// Re-export for convenience.
pub use cms_bootstrap_core as core;

pub use cms_bootstrap_core::{Bootstrap, BootstrapError, Bundles, Property, RequestContext};

pub mod cli;

#[inline]
/// Initialize logging using env_logger if the "logging" feature is enabled.
///
/// This is a no-op if the feature is not enabled. Hosts embedding the
/// bootstrap are still expected to call this early so log output is wired up.
pub fn init_logging() {
    #[cfg(feature = "logging")]
    {
        let _ = env_logger::builder()
            .format_timestamp_millis()
            .parse_default_env()
            .try_init();
    }
}
