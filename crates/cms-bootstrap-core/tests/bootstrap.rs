//! Tests for property resolution across config files and overrides.

use cms_bootstrap_core::{Bootstrap, BootstrapError, Property};
use cms_bootstrap_test_utils::{SiteDir, config_map, fixed_now};
use pretty_assertions::assert_eq;
use serde_json::json;

const SITE_YAML: &str = r#"
environment: production
db_config:
  hostname: db.local
  database: shared
production:
  db_config:
    database: live
  config_vars:
    server_timezone: UTC
development:
  db_config:
    database: dev
"#;

/// A file naming its environment selects that environment's section.
#[test]
fn file_environment_selects_its_own_section() {
    let site = SiteDir::new();
    let path = site.write_config("config.yml", SITE_YAML);

    let bootstrap = Bootstrap::builder(site.request())
        .config_file(path)
        .now(fixed_now())
        .build()
        .expect("build");

    assert_eq!(bootstrap.environment(), "production");
    assert_eq!(bootstrap.db_config().get("hostname"), Some(&json!("db.local")));
    assert_eq!(bootstrap.db_config().get("database"), Some(&json!("live")));
    assert_eq!(
        bootstrap.config_vars().get("default_site_timezone"),
        Some(&json!("UTC"))
    );
    assert_eq!(
        bootstrap.config_vars().get("google_analytics_id"),
        Some(&json!("UA-XXXXXXX-XX"))
    );
}

/// A pinned environment wins over the file and picks the matching section.
#[test]
fn pinned_environment_overrides_files() {
    let site = SiteDir::new();
    let path = site.write_config("config.yml", SITE_YAML);

    let bootstrap = Bootstrap::builder(site.request())
        .environment("development")
        .config_file(path)
        .build()
        .expect("build");

    assert_eq!(bootstrap.environment(), "development");
    assert_eq!(bootstrap.db_config().get("database"), Some(&json!("dev")));
    assert_eq!(
        bootstrap.config_vars().get("default_site_timezone"),
        Some(&json!("UM5"))
    );
}

/// Later files win, and a marked key replaces rather than merges.
#[test]
fn later_files_and_markers_take_precedence() {
    let site = SiteDir::new();
    let first = site.write_config(
        "base.json",
        r#"{
            "config_vars": {
                "site_label": "Base",
                "upload_preferences": { "2": "public/uploads/files" }
            },
            "global_vars": { "theme": { "color": "red", "font": "serif" } }
        }"#,
    );
    let second = site.write_config(
        "local.yml",
        r#"
config_vars:
  "!upload_preferences":
    "1": public/uploads/images
global_vars:
  theme:
    color: blue
"#,
    );

    let bootstrap = Bootstrap::builder(site.request())
        .config_file(first)
        .config_file(second)
        .build()
        .expect("build");

    assert_eq!(bootstrap.config_vars().get("site_label"), Some(&json!("Base")));
    assert_eq!(
        bootstrap.config_vars().get("upload_preferences"),
        Some(&json!({ "1": "public/uploads/images" }))
    );
    assert_eq!(
        bootstrap.global_vars().get("theme"),
        Some(&json!({ "color": "blue", "font": "serif" }))
    );
}

/// Broken JSON is fatal; broken YAML is skipped.
#[test]
fn strict_formats_fail_the_build() {
    let site = SiteDir::new();
    let yaml = site.write_config("broken.yml", "db_config: [unclosed");
    let json = site.write_config("broken.json", "{ \"db_config\": ");

    let bootstrap = Bootstrap::builder(site.request())
        .config_file(&yaml)
        .build()
        .expect("yaml errors are skipped");
    assert_eq!(bootstrap.db_config().get("database"), None);

    let err = Bootstrap::builder(site.request())
        .config_file(&json)
        .build()
        .unwrap_err();
    assert!(matches!(err, BootstrapError::Config(_)));
}

/// Files under a property only contribute scalars and the active section.
#[test]
fn config_file_under_nests_content() {
    let site = SiteDir::new();
    let path = site.write_config(
        "database.yml",
        r#"
hostname: db.internal
production:
  database: live_db
development:
  database: dev_db
"#,
    );

    let bootstrap = Bootstrap::builder(site.request())
        .config_file_under(path, Property::DbConfig)
        .build()
        .expect("build");

    assert_eq!(bootstrap.db_config().get("hostname"), Some(&json!("db.internal")));
    assert_eq!(bootstrap.db_config().get("database"), Some(&json!("dev_db")));
    assert_eq!(bootstrap.db_config().get("production"), None);
}

/// Discovery reads every `config.*` file in extension order.
#[test]
fn discovers_config_files_in_config_dir() {
    let site = SiteDir::new();
    site.write_config("config.yml", "config_vars:\n  site_label: From YAML\n");
    site.write_config(
        "config.ini",
        "[config_vars]\nsite_label = From INI\nis_system_on = n\n",
    );

    let bootstrap = Bootstrap::builder(site.request())
        .discover_config_files()
        .build()
        .expect("build");

    assert_eq!(bootstrap.config_vars().get("site_label"), Some(&json!("From INI")));
    assert_eq!(bootstrap.config_vars().get("is_system_on"), Some(&json!("n")));
}

/// Overrides beat files; unknown keys in overrides are ignored.
#[test]
fn overrides_apply_last() {
    let site = SiteDir::new();
    let path = site.write_config("config.yml", SITE_YAML);

    let bootstrap = Bootstrap::builder(site.request())
        .config_file(path)
        .overrides(config_map(json!({
            "db_config": { "database": "override" },
            "debug": "2",
            "not_a_property": true
        })))
        .build()
        .expect("build");

    assert_eq!(bootstrap.db_config().get("database"), Some(&json!("override")));
    assert_eq!(bootstrap.debug(), 2);
    assert_eq!(bootstrap.config_vars().get("template_debugging"), Some(&json!("y")));
}

/// An explicit system path feeds the paths derived from it.
#[test]
fn system_path_from_file_moves_dependent_paths() {
    let site = SiteDir::new();
    let path = site.write_config("config.json", r#"{ "system_path": "/opt/cms" }"#);

    let bootstrap = Bootstrap::builder(site.request())
        .config_file(path)
        .build()
        .expect("build");

    assert_eq!(bootstrap.system_path(), "/opt/cms/");
    assert_eq!(bootstrap.paths().app_path, "/opt/cms/expressionengine/");
    assert_eq!(
        bootstrap.db_config().get("cachedir"),
        Some(&json!("/opt/cms/cache/db_cache/"))
    );
}

#[test]
fn unknown_property_is_an_error() {
    let site = SiteDir::new();
    let bootstrap = Bootstrap::builder(site.request()).build().expect("build");

    assert_eq!(bootstrap.property("environment").expect("known"), &json!("development"));
    let err = bootstrap.property("site_url").unwrap_err();
    assert!(matches!(err, BootstrapError::UnknownProperty(name) if name == "site_url"));
}

#[test]
fn requirements_need_environment_and_database() {
    let site = SiteDir::new();
    let mut bootstrap = Bootstrap::builder(site.request()).build().expect("build");

    let err = bootstrap.check_requirements().unwrap_err();
    assert!(matches!(err, BootstrapError::Requirement(_)));

    bootstrap
        .set_property("db_config", json!({ "database": "site" }))
        .expect("set");
    bootstrap.check_requirements().expect("database named");

    bootstrap.set_property("environment", json!("")).expect("set");
    let err = bootstrap.check_requirements().unwrap_err();
    assert_eq!(err.to_string(), "requirement not met: no environment is set");
}

/// Files applied after build merge into the live properties.
#[test]
fn apply_config_file_after_build() {
    let site = SiteDir::new();
    let mut bootstrap = Bootstrap::builder(site.request()).build().expect("build");
    let path = site.write_config(
        "late.ini",
        "[development.config_vars]\nsite_label = Post Build\n\n[production.config_vars]\nsite_label = Wrong\n",
    );

    bootstrap.apply_config_file(&path).expect("apply");
    assert_eq!(bootstrap.config_vars().get("site_label"), Some(&json!("Post Build")));

    let db = site.write_config("db.json", r#"{ "database": "late_db" }"#);
    bootstrap
        .apply_config_file_under(&db, Property::DbConfig)
        .expect("apply");
    assert_eq!(bootstrap.db_config().get("database"), Some(&json!("late_db")));
    assert_eq!(bootstrap.db_config().get("dbprefix"), Some(&json!("exp_")));
}

/// An environment named in overrides picks the sections files contribute.
#[test]
fn override_environment_selects_sections() {
    let site = SiteDir::new();
    let path = site.write_config(
        "config.yml",
        "environment: development\nproduction:\n  db_config:\n    database: live\ndevelopment:\n  db_config:\n    database: dev\n",
    );

    let bootstrap = Bootstrap::builder(site.request())
        .environment("development")
        .config_file(path)
        .overrides(config_map(json!({ "environment": "production" })))
        .build()
        .expect("build");

    assert_eq!(bootstrap.environment(), "production");
    assert_eq!(bootstrap.db_config().get("database"), Some(&json!("live")));
}

/// A file applied after build cannot move a pinned environment.
#[test]
fn apply_keeps_pinned_environment() {
    let site = SiteDir::new();
    let mut bootstrap = Bootstrap::builder(site.request())
        .environment("production")
        .build()
        .expect("build");
    let path = site.write_config(
        "late.yml",
        "environment: staging\nproduction:\n  config_vars:\n    site_label: Live\nstaging:\n  config_vars:\n    site_label: Staging\n",
    );

    bootstrap.apply_config_file(&path).expect("apply");

    assert_eq!(bootstrap.environment(), "production");
    assert_eq!(bootstrap.config_vars().get("site_label"), Some(&json!("Live")));
}

/// Without a pin, a late file may still switch the environment.
#[test]
fn apply_without_pin_follows_file_environment() {
    let site = SiteDir::new();
    let mut bootstrap = Bootstrap::builder(site.request()).build().expect("build");
    let path = site.write_config("late.yml", "environment: staging\n");

    bootstrap.apply_config_file(&path).expect("apply");

    assert_eq!(bootstrap.environment(), "staging");
}
