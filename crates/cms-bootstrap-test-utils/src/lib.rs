//! Test helpers shared across cms-bootstrap crates.

pub mod fixtures;

pub use fixtures::{SiteDir, TEST_HOST, config_map, fixed_now, request_for};
