//! Directory layout and the paths/URLs derived from it.
//!
//! Every path and URL carries a trailing slash so defaults can be built by
//! plain concatenation.

use crate::request::RequestContext;
use serde::Serialize;

/// Directory names relative to the bootstrap root or the public dir.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    /// System (framework install) directory under the root.
    pub system_dir: String,
    /// Framework application directory under the system dir.
    pub app_dir: String,
    /// Web-served directory under the root.
    pub public_dir: String,
    /// Third-party packages under the root.
    pub vendor_dir: String,
    /// Config files under the root.
    pub config_dir: String,
    /// Template sources under the root.
    pub templates_dir: String,
    /// Upload directory under the public dir.
    pub uploads_dir: String,
    /// Member image directory under the uploads dir.
    pub members_dir: String,
    /// Public cache directory under the public dir.
    pub cache_dir: String,
}

impl Default for Layout {
    fn default() -> Self {
        Self {
            system_dir: "system".to_string(),
            app_dir: "expressionengine".to_string(),
            public_dir: "public".to_string(),
            vendor_dir: "vendor".to_string(),
            config_dir: "config".to_string(),
            templates_dir: "templates".to_string(),
            uploads_dir: "uploads".to_string(),
            members_dir: "members".to_string(),
            cache_dir: "cache".to_string(),
        }
    }
}

/// Paths and URLs computed once per request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Paths {
    pub bootstrap_root: String,
    pub public_dir_name: String,
    pub system_path: String,
    pub app_path: String,
    pub base_path: String,
    pub vendor_path: String,
    pub config_path: String,
    pub template_path: String,
    pub uploads_path: String,
    pub member_images_path: String,
    pub public_cache_path: String,
    pub db_cache_path: String,
    pub base_url: String,
    pub uploads_url: String,
    pub member_images_url: String,
    pub public_cache_url: String,
}

impl Paths {
    /// Derive every path from the request and layout.
    ///
    /// `system_path` replaces the default `<root><system_dir>/` when a config
    /// source names one explicitly.
    pub fn derive(request: &RequestContext, layout: &Layout, system_path: Option<&str>) -> Self {
        let root = request.root();
        let base_url = request.base_url();
        let system_path = match system_path {
            Some(path) if !path.is_empty() => with_slash(path),
            _ => dir(&root, &layout.system_dir),
        };
        let base_path = dir(&root, &layout.public_dir);
        let uploads_path = dir(&base_path, &layout.uploads_dir);
        let uploads_url = dir(&base_url, &layout.uploads_dir);

        Self {
            public_dir_name: layout.public_dir.clone(),
            app_path: dir(&system_path, &layout.app_dir),
            vendor_path: dir(&root, &layout.vendor_dir),
            config_path: dir(&root, &layout.config_dir),
            template_path: dir(&root, &layout.templates_dir),
            member_images_path: dir(&uploads_path, &layout.members_dir),
            public_cache_path: dir(&base_path, &layout.cache_dir),
            db_cache_path: format!("{system_path}cache/db_cache/"),
            member_images_url: dir(&uploads_url, &layout.members_dir),
            public_cache_url: dir(&base_url, &layout.cache_dir),
            bootstrap_root: root,
            system_path,
            base_path,
            uploads_path,
            base_url,
            uploads_url,
        }
    }
}

fn dir(parent: &str, name: &str) -> String {
    format!("{parent}{}/", name.trim_matches('/'))
}

fn with_slash(path: &str) -> String {
    format!("{}/", path.trim_end_matches('/'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn derives_default_layout() {
        let request = RequestContext::new("www.example.com", "/srv/site");
        let paths = Paths::derive(&request, &Layout::default(), None);
        assert_eq!(paths.bootstrap_root, "/srv/site/");
        assert_eq!(paths.system_path, "/srv/site/system/");
        assert_eq!(paths.app_path, "/srv/site/system/expressionengine/");
        assert_eq!(paths.base_path, "/srv/site/public/");
        assert_eq!(paths.uploads_path, "/srv/site/public/uploads/");
        assert_eq!(paths.member_images_path, "/srv/site/public/uploads/members/");
        assert_eq!(paths.public_cache_path, "/srv/site/public/cache/");
        assert_eq!(paths.db_cache_path, "/srv/site/system/cache/db_cache/");
        assert_eq!(paths.template_path, "/srv/site/templates/");
        assert_eq!(paths.base_url, "http://www.example.com/");
        assert_eq!(paths.member_images_url, "http://www.example.com/uploads/members/");
        assert_eq!(paths.public_cache_url, "http://www.example.com/cache/");
    }

    #[test]
    fn explicit_system_path_feeds_dependent_paths() {
        let request = RequestContext::new("example.com", "/srv/site/");
        let layout = Layout {
            public_dir: "web".to_string(),
            ..Layout::default()
        };
        let paths = Paths::derive(&request, &layout, Some("/opt/cms"));
        assert_eq!(paths.system_path, "/opt/cms/");
        assert_eq!(paths.app_path, "/opt/cms/expressionengine/");
        assert_eq!(paths.db_cache_path, "/opt/cms/cache/db_cache/");
        assert_eq!(paths.base_path, "/srv/site/web/");
        assert_eq!(paths.public_dir_name, "web");
    }
}
