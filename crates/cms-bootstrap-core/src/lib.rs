//! Bootstrap orchestration for a CMS front controller.
//!
//! Resolves environment, debug level, and paths for a request, layers config
//! files over built-in defaults, and exposes the database, directive, and
//! template-variable bundles the host framework consumes.

mod bootstrap;
mod database;
mod defaults;
mod directives;
mod error;
mod layout;
mod property;
mod request;
mod template;

pub use bootstrap::{Bootstrap, BootstrapBuilder, Bundles, ENV_DEBUG, ENV_ENVIRONMENT};
pub use database::DatabaseConfig;
pub use defaults::{DEFAULT_ENCRYPTION_KEY, PRODUCTION};
pub use directives::Directives;
pub use error::BootstrapError;
pub use layout::{Layout, Paths};
pub use property::Property;
pub use request::{RequestContext, remove_www};
pub use template::{
    DEFAULT_TEMPLATE_PREFIX, TemplateVarOptions, TemplateVars, camel_case, camelize_keys,
};
