//! Tests for command-line parsing and command output.

use clap::Parser;
use cms_bootstrap::cli::{self, BundleKind, Cli, Command, OutputFormat};
use cms_bootstrap_test_utils::SiteDir;
use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use std::collections::HashMap;

/// Run with no process variables visible.
fn run(site: &SiteDir, args: &[&str]) -> anyhow::Result<String> {
    run_with(site, &[], args)
}

fn run_with(site: &SiteDir, vars: &[(&str, &str)], args: &[&str]) -> anyhow::Result<String> {
    let root = site.root().display().to_string();
    let mut argv = vec!["cms-bootstrap", "--root", root.as_str(), "--host", "www.example.com"];
    argv.extend_from_slice(args);
    let cli = Cli::try_parse_from(argv).expect("parse");
    let vars: HashMap<String, String> = vars
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    let mut out = Vec::new();
    cli::run_with_vars(&cli, |name| vars.get(name).cloned(), &mut out)?;
    Ok(String::from_utf8(out).expect("utf8"))
}

#[test]
fn parses_global_flags_after_subcommand() {
    let cli = Cli::try_parse_from([
        "cms-bootstrap",
        "dump",
        "--bundle",
        "template-vars",
        "--format",
        "yaml",
        "--env",
        "production",
        "--config",
        "a.yml",
        "--config",
        "b.json",
        "--marker",
        "+",
    ])
    .expect("parse");

    assert_eq!(cli.environment.as_deref(), Some("production"));
    assert_eq!(cli.configs.len(), 2);
    assert_eq!(cli.marker, Some('+'));
    assert!(matches!(
        cli.command,
        Command::Dump {
            bundle: BundleKind::TemplateVars,
            format: OutputFormat::Yaml
        }
    ));
}

#[test]
fn dump_database_bundle_as_json() {
    let site = SiteDir::new();
    site.write_config(
        "config.yml",
        "db_config:\n  database: site\nproduction:\n  db_config:\n    database: live\n",
    );

    let output = run(&site, &["--discover", "--env", "production", "dump", "--bundle", "database"])
        .expect("run");
    let value: Value = serde_json::from_str(&output).expect("json");
    assert_eq!(value["database"], json!("live"));
    assert_eq!(value["dbprefix"], json!("exp_"));
}

#[test]
fn get_prints_one_property() {
    let site = SiteDir::new();
    let output = run(&site, &["--env", "staging", "get", "environment"]).expect("run");
    assert_eq!(output.trim(), "\"staging\"");

    let err = run(&site, &["get", "nope"]).unwrap_err();
    assert!(err.to_string().contains("unknown property: nope"));

    let output = run(&site, &["get", "db_config.dbprefix"]).expect("run");
    assert_eq!(output.trim(), "\"exp_\"");
    let err = run(&site, &["get", "db_config.missing"]).unwrap_err();
    assert_eq!(err.to_string(), "no value at db_config.missing");
}

#[test]
fn check_reports_missing_database() {
    let site = SiteDir::new();
    let err = run(&site, &["check"]).unwrap_err();
    assert!(err.to_string().starts_with("requirement not met"));

    let config = site.write_config("db.json", r#"{ "db_config": { "database": "site" } }"#);
    let config = config.display().to_string();
    let output = run(&site, &["--env", "production", "--config", config.as_str(), "check"]).expect("run");
    assert_eq!(output.trim(), "ok (environment=production, database=site)");
}

#[test]
fn custom_marker_replaces_maps() {
    let site = SiteDir::new();
    let config = site.write_config(
        "config.json",
        r#"{ "+db_config": { "database": "only" } }"#,
    );
    let config = config.display().to_string();
    let output = run(
        &site,
        &["--marker", "+", "--config", config.as_str(), "dump", "--bundle", "database", "--format", "yaml"],
    )
    .expect("run");
    assert_eq!(output.trim(), "database: only");
}

#[test]
fn variables_come_from_the_supplied_lookup() {
    let site = SiteDir::new();
    let vars = [("BOOTSTRAP_ENV", "staging"), ("BOOTSTRAP_DEBUG", "1"), ("HTTPS", "on")];

    let output = run_with(&site, &vars, &["get", "environment"]).expect("run");
    assert_eq!(output.trim(), "\"staging\"");
    let output = run_with(&site, &vars, &["get", "debug"]).expect("run");
    assert_eq!(output.trim(), "1");

    let output = run_with(&site, &vars, &["dump", "--bundle", "directives"]).expect("run");
    let value: Value = serde_json::from_str(&output).expect("json");
    assert_eq!(value["base_url"], json!("https://www.example.com/"));

    let output = run(&site, &["get", "environment"]).expect("run");
    assert_eq!(output.trim(), "\"development\"");
}
