//! Command-line options and command dispatch.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use cms_bootstrap_config::{get_path, value_as_map};
use cms_bootstrap_core::{Bootstrap, BootstrapError, RequestContext};
use log::{debug, info};
use serde_json::Value;
use std::io::Write;
use std::path::PathBuf;

/// Resolve and print a site's bootstrap configuration
#[derive(Debug, Parser)]
#[command(name = "cms-bootstrap", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Site root; defaults to BOOTSTRAP_ROOT or DOCUMENT_ROOT
    #[arg(long, global = true)]
    pub root: Option<PathBuf>,
    /// Request host; defaults to HTTP_HOST or SERVER_NAME
    #[arg(long, global = true)]
    pub host: Option<String>,
    /// Treat the request as HTTPS
    #[arg(long, global = true)]
    pub https: bool,
    /// Pin the environment (otherwise BOOTSTRAP_ENV or config files decide)
    #[arg(long = "env", global = true)]
    pub environment: Option<String>,
    /// Pin the debug level
    #[arg(long, global = true)]
    pub debug: Option<u8>,
    /// Config file to apply; repeat for more, later files win
    #[arg(long = "config", global = true)]
    pub configs: Vec<PathBuf>,
    /// Also read config.{yml,yaml,ini,json,json5} from the config directory
    #[arg(long, global = true)]
    pub discover: bool,
    /// Character marking keys that replace instead of merge
    #[arg(long, global = true)]
    pub marker: Option<char>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print resolved bundles
    Dump {
        /// Which bundle to print
        #[arg(long, value_enum, default_value_t = BundleKind::All)]
        bundle: BundleKind,
        /// Output encoding
        #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,
    },
    /// Print a single property as JSON; `db_config.database` reaches inside
    Get { property: String },
    /// Verify the environment and database name are set
    Check,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BundleKind {
    All,
    Database,
    Directives,
    TemplateVars,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Yaml,
}

impl Cli {
    /// Request context from the flags, falling back to CGI variables.
    pub fn request(&self) -> RequestContext {
        self.request_with_vars(|name| std::env::var(name).ok())
    }

    /// Like [`Cli::request`], reading variables through `lookup`.
    pub fn request_with_vars<F>(&self, lookup: F) -> RequestContext
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut request = RequestContext::from_vars(lookup);
        if let Some(host) = &self.host {
            request.host = host.clone();
        }
        if self.https {
            request.https = true;
        }
        if let Some(root) = &self.root {
            request = request.with_bootstrap_root(root.display().to_string());
        }
        request
    }

    /// Build from the flags and the process environment.
    pub fn bootstrap(&self) -> Result<Bootstrap, BootstrapError> {
        self.bootstrap_with_vars(|name| std::env::var(name).ok())
    }

    /// Build from the flags, reading variables through `lookup`.
    pub fn bootstrap_with_vars<F>(&self, lookup: F) -> Result<Bootstrap, BootstrapError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut builder =
            Bootstrap::builder(self.request_with_vars(&lookup)).selectors_from_vars(&lookup);
        if let Some(environment) = &self.environment {
            builder = builder.environment(environment.clone());
        }
        if let Some(level) = self.debug {
            builder = builder.debug(level);
        }
        if let Some(marker) = self.marker {
            builder = builder.override_marker(marker);
        }
        if self.discover {
            builder = builder.discover_config_files();
        }
        for path in &self.configs {
            builder = builder.config_file(path.clone());
        }
        builder.build()
    }
}

/// Execute `cli`, writing command output to `out`.
pub fn run(cli: &Cli, out: &mut dyn Write) -> Result<()> {
    run_with_vars(cli, |name| std::env::var(name).ok(), out)
}

/// Execute `cli` with request and selector variables read through `lookup`.
pub fn run_with_vars<F>(cli: &Cli, lookup: F, out: &mut dyn Write) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    info!(
        "starting cms-bootstrap (configs={}, discover={}, env_set={})",
        cli.configs.len(),
        cli.discover,
        cli.environment.is_some()
    );
    let bootstrap = cli.bootstrap_with_vars(lookup).context("failed to assemble bootstrap")?;
    debug!(
        "bootstrap ready (environment={}, root={})",
        bootstrap.environment(),
        bootstrap.paths().bootstrap_root
    );

    match &cli.command {
        Command::Dump { bundle, format } => {
            let value = bundle_value(&bootstrap, *bundle)?;
            write_value(out, &value, *format)
        }
        Command::Get { property } => {
            let value = self::lookup(&bootstrap, property)?;
            write_value(out, value, OutputFormat::Json)
        }
        Command::Check => {
            bootstrap.check_requirements()?;
            writeln!(
                out,
                "ok (environment={}, database={})",
                bootstrap.environment(),
                bootstrap
                    .db_config()
                    .get("database")
                    .map(|name| match name {
                        Value::String(name) => name.clone(),
                        other => other.to_string(),
                    })
                    .unwrap_or_default()
            )?;
            Ok(())
        }
    }
}

fn lookup<'b>(bootstrap: &'b Bootstrap, path: &str) -> Result<&'b Value> {
    let (name, rest) = match path.split_once('.') {
        Some((name, rest)) => (name, Some(rest)),
        None => (path, None),
    };
    let value = bootstrap.property(name)?;
    let Some(rest) = rest else {
        return Ok(value);
    };
    value_as_map(value)
        .and_then(|map| get_path(map, rest))
        .with_context(|| format!("no value at {path}"))
}

fn bundle_value(bootstrap: &Bootstrap, bundle: BundleKind) -> Result<Value> {
    let value = match bundle {
        BundleKind::All => serde_json::to_value(bootstrap.bundles())?,
        BundleKind::Database => {
            Value::Object(bootstrap.database_settings(Default::default()))
        }
        BundleKind::Directives => {
            Value::Object(bootstrap.directives(Default::default()).into_map())
        }
        BundleKind::TemplateVars => {
            Value::Object(bootstrap.template_vars(Default::default()).into_map())
        }
    };
    Ok(value)
}

fn write_value(out: &mut dyn Write, value: &Value, format: OutputFormat) -> Result<()> {
    let rendered = match format {
        OutputFormat::Json => serde_json::to_string_pretty(value)?,
        OutputFormat::Yaml => serde_yaml::to_string(value)?,
    };
    writeln!(out, "{}", rendered.trim_end())?;
    Ok(())
}
