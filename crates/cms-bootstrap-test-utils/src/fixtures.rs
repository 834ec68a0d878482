use chrono::{DateTime, Local, TimeZone};
use cms_bootstrap_config::ConfigMap;
use cms_bootstrap_core::RequestContext;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Host every fixture request uses.
pub const TEST_HOST: &str = "www.example.com";

/// Temporary site root with a `config/` directory.
pub struct SiteDir {
    temp: TempDir,
}

impl SiteDir {
    pub fn new() -> Self {
        let temp = tempfile::tempdir().expect("tempdir");
        fs::create_dir_all(temp.path().join("config")).expect("config dir");
        Self { temp }
    }

    pub fn root(&self) -> &Path {
        self.temp.path()
    }

    /// Root as a string with exactly one trailing slash.
    pub fn root_str(&self) -> String {
        format!("{}/", self.root().display().to_string().trim_end_matches('/'))
    }

    /// Write `contents` to `config/<name>` and return the path.
    pub fn write_config(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.root().join("config").join(name);
        fs::write(&path, contents).expect("write config");
        path
    }

    /// Request for `TEST_HOST` rooted at this directory.
    pub fn request(&self) -> RequestContext {
        request_for(self.root())
    }
}

impl Default for SiteDir {
    fn default() -> Self {
        Self::new()
    }
}

/// Plain HTTP request rooted at `root`.
pub fn request_for(root: &Path) -> RequestContext {
    RequestContext::new(TEST_HOST, root.display().to_string())
}

/// Mid-January noon, local time; outside any northern-hemisphere DST.
pub fn fixed_now() -> DateTime<Local> {
    Local
        .with_ymd_and_hms(2024, 1, 15, 12, 0, 0)
        .earliest()
        .expect("valid local time")
}

/// Unwrap a `json!` object literal into a map.
pub fn config_map(value: Value) -> ConfigMap {
    match value {
        Value::Object(map) => map,
        other => panic!("expected a JSON object, got {other}"),
    }
}
