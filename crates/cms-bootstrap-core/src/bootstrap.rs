//! Assembles the bootstrap properties from defaults, config files, and
//! programmatic overrides, and hands out the derived bundles.

use crate::BootstrapError;
use crate::database::DatabaseConfig;
use crate::defaults::{self, DefaultsContext};
use crate::directives::{Directives, normalize_upload_preferences};
use crate::layout::{Layout, Paths};
use crate::property::{Property, debug_level, select};
use crate::request::RequestContext;
use crate::template::{TemplateVarOptions, TemplateVars};
use chrono::{DateTime, Local};
use cms_bootstrap_config::{
    ConfigDocument, ConfigLoader, ConfigMap, DEFAULT_ENVIRONMENT, Merger, value_as_map,
};
use log::{debug, info, warn};
use serde::Serialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

/// Variable naming the environment when no builder value is given.
pub const ENV_ENVIRONMENT: &str = "BOOTSTRAP_ENV";
/// Variable naming the debug level when no builder value is given.
pub const ENV_DEBUG: &str = "BOOTSTRAP_DEBUG";

const DISCOVERED_STEM: &str = "config";
const DISCOVERED_EXTENSIONS: [&str; 5] = ["yml", "yaml", "ini", "json", "json5"];

static NULL: Value = Value::Null;
static EMPTY_MAP: LazyLock<ConfigMap> = LazyLock::new(ConfigMap::new);

#[derive(Debug, Clone)]
struct ConfigSource {
    path: PathBuf,
    under: Option<Property>,
}

/// Collects the inputs of a [`Bootstrap`].
#[derive(Debug, Clone)]
pub struct BootstrapBuilder {
    request: RequestContext,
    environment: Option<String>,
    debug: Option<u8>,
    selected_environment: Option<String>,
    selected_debug: Option<u8>,
    layout: Layout,
    merger: Merger,
    sources: Vec<ConfigSource>,
    discover: bool,
    host_global_vars: ConfigMap,
    overrides: ConfigMap,
    now: Option<DateTime<Local>>,
    template_options: TemplateVarOptions,
}

impl BootstrapBuilder {
    fn new(request: RequestContext) -> Self {
        Self {
            request,
            environment: None,
            debug: None,
            selected_environment: None,
            selected_debug: None,
            layout: Layout::default(),
            merger: Merger::default(),
            sources: Vec::new(),
            discover: false,
            host_global_vars: ConfigMap::new(),
            overrides: ConfigMap::new(),
            now: None,
            template_options: TemplateVarOptions::default(),
        }
    }

    /// Pin the environment; config files cannot change it.
    pub fn environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = Some(environment.into());
        self
    }

    /// Pin the debug level; config files cannot change it.
    pub fn debug(mut self, level: u8) -> Self {
        self.debug = Some(level);
        self
    }

    /// Read `BOOTSTRAP_ENV` and `BOOTSTRAP_DEBUG` from the process environment.
    pub fn selectors_from_env(self) -> Self {
        self.selectors_from_vars(|name| std::env::var(name).ok())
    }

    /// Read the environment and debug selectors through `lookup`.
    ///
    /// Selectors sit below config files: a file naming its own environment
    /// wins over them.
    pub fn selectors_from_vars<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        self.selected_environment = lookup(ENV_ENVIRONMENT).filter(|value| !value.is_empty());
        self.selected_debug = lookup(ENV_DEBUG).and_then(|value| {
            let level = debug_level(&Value::String(value.clone()));
            if level.is_none() {
                warn!("ignoring unparseable {ENV_DEBUG} value: {value}");
            }
            level
        });
        self
    }

    /// Directory names under the site root.
    pub fn layout(mut self, layout: Layout) -> Self {
        self.layout = layout;
        self
    }

    /// Use `marker` instead of `!` to flag replacing keys.
    pub fn override_marker(mut self, marker: char) -> Self {
        self.merger = Merger::new(marker);
        self
    }

    /// Queue a config file. Later files take precedence over earlier ones.
    pub fn config_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.sources.push(ConfigSource {
            path: path.into(),
            under: None,
        });
        self
    }

    /// Queue a config file whose content belongs beneath `property`.
    ///
    /// Scalar top-level entries and the active environment's section are
    /// used; sections for other environments are skipped.
    pub fn config_file_under(mut self, path: impl Into<PathBuf>, property: Property) -> Self {
        self.sources.push(ConfigSource {
            path: path.into(),
            under: Some(property),
        });
        self
    }

    /// Queue `config.{yml,yaml,ini,json,json5}` from the config directory
    /// ahead of any explicitly queued file.
    pub fn discover_config_files(mut self) -> Self {
        self.discover = true;
        self
    }

    /// Template variables supplied by the host application.
    pub fn host_global_vars(mut self, vars: ConfigMap) -> Self {
        self.host_global_vars = vars;
        self
    }

    /// Property overrides applied after every config file.
    pub fn overrides(mut self, overrides: ConfigMap) -> Self {
        self.overrides = overrides;
        self
    }

    /// Clock used for time-derived defaults.
    pub fn now(mut self, now: DateTime<Local>) -> Self {
        self.now = Some(now);
        self
    }

    /// How template variables are prefixed and serialised.
    pub fn template_options(mut self, options: TemplateVarOptions) -> Self {
        self.template_options = options;
        self
    }

    fn discovered_sources(&self) -> Vec<ConfigSource> {
        let config_dir = Path::new(&self.request.root()).join(&self.layout.config_dir);
        DISCOVERED_EXTENSIONS
            .iter()
            .map(|extension| config_dir.join(format!("{DISCOVERED_STEM}.{extension}")))
            .filter(|path| path.is_file())
            .map(|path| ConfigSource { path, under: None })
            .collect()
    }

    /// Load the queued files and resolve every property.
    pub fn build(self) -> Result<Bootstrap, BootstrapError> {
        let mut sources = if self.discover {
            self.discovered_sources()
        } else {
            Vec::new()
        };
        sources.extend(self.sources.iter().cloned());

        let fallback_environment = self
            .selected_environment
            .clone()
            .unwrap_or_else(|| DEFAULT_ENVIRONMENT.to_string());
        // overrides are applied last, so their environment outranks a pin
        let pinned_environment = environment_in(&self.merger, &self.overrides)
            .or_else(|| self.environment.clone());
        let loader = ConfigLoader::new(fallback_environment.clone());
        let mut stack = LayerStack::new(
            &self.merger,
            fallback_environment.clone(),
            pinned_environment.clone(),
        );

        let mut applied = 0usize;
        for source in &sources {
            let document = loader.load_document(&source.path)?;
            if document.is_empty() {
                continue;
            }
            debug!(
                "applying config file (path={}, under={:?})",
                source.path.display(),
                source.under.map(Property::as_str)
            );
            stack.push_document(&document, source.under);
            applied += 1;
        }

        let mut pinned = ConfigMap::new();
        if let Some(environment) = &self.environment {
            pinned.insert(
                Property::Environment.as_str().to_string(),
                Value::from(environment.as_str()),
            );
        }
        if let Some(level) = self.debug {
            pinned.insert(Property::Debug.as_str().to_string(), Value::from(level));
        }
        stack.push(&pinned);
        stack.push(&self.overrides);

        let effective = stack.preview();
        let environment = effective
            .get(Property::Environment.as_str())
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or(fallback_environment);
        let debug = effective
            .get(Property::Debug.as_str())
            .and_then(debug_level)
            .or(self.selected_debug)
            .unwrap_or(0);
        let paths = Paths::derive(
            &self.request,
            &self.layout,
            effective
                .get(Property::SystemPath.as_str())
                .and_then(Value::as_str),
        );

        let explicit = |property: Property| {
            effective
                .get(property.as_str())
                .and_then(value_as_map)
                .unwrap_or(&*EMPTY_MAP)
        };
        let ctx = DefaultsContext {
            environment: &environment,
            debug,
            paths: &paths,
            request: &self.request,
            now: self.now.unwrap_or_else(Local::now),
        };
        let db_config = defaults::database(&ctx, explicit(Property::DbConfig));
        let config_vars = defaults::directives(&ctx, explicit(Property::ConfigVars));
        let effective_directives = self
            .merger
            .merge(config_vars.clone(), explicit(Property::ConfigVars).clone());
        let global_preview = self.merger.merge(
            self.host_global_vars.clone(),
            explicit(Property::GlobalVars).clone(),
        );
        let global_vars = self.merger.merge(
            defaults::template_vars(&ctx, &global_preview, &effective_directives),
            self.host_global_vars.clone(),
        );

        let mut base = ConfigMap::new();
        base.insert(Property::DbConfig.as_str().to_string(), Value::Object(db_config));
        base.insert(Property::ConfigVars.as_str().to_string(), Value::Object(config_vars));
        base.insert(Property::GlobalVars.as_str().to_string(), Value::Object(global_vars));
        let mut properties = self.merger.merge_all(base, stack.into_layers());
        properties.insert(
            Property::Environment.as_str().to_string(),
            Value::from(environment.as_str()),
        );
        properties.insert(Property::Debug.as_str().to_string(), Value::from(debug));
        properties.insert(
            Property::SystemPath.as_str().to_string(),
            Value::from(paths.system_path.as_str()),
        );

        info!(
            "bootstrap assembled (environment={environment}, debug={debug}, files={applied}, root={})",
            paths.bootstrap_root
        );
        Ok(Bootstrap {
            properties,
            merger: self.merger,
            paths,
            request: self.request,
            template_options: self.template_options,
            pinned_environment,
        })
    }
}

/// Property-keyed layers in increasing precedence.
struct LayerStack<'m> {
    merger: &'m Merger,
    fallback_environment: String,
    pinned_environment: Option<String>,
    layers: Vec<ConfigMap>,
}

impl<'m> LayerStack<'m> {
    fn new(
        merger: &'m Merger,
        fallback_environment: String,
        pinned_environment: Option<String>,
    ) -> Self {
        Self {
            merger,
            fallback_environment,
            pinned_environment,
            layers: Vec::new(),
        }
    }

    fn push(&mut self, incoming: &ConfigMap) {
        let selected = select(self.merger, incoming);
        if !selected.is_empty() {
            self.layers.push(selected);
        }
    }

    /// Like [`LayerStack::push`], but a pinned environment is kept.
    fn push_file_layer(&mut self, incoming: &ConfigMap) {
        let mut selected = select(self.merger, incoming);
        if self.pinned_environment.is_some() {
            let merger = self.merger;
            selected.retain(|key, _| merger.target_key(key) != Property::Environment.as_str());
        }
        if !selected.is_empty() {
            self.layers.push(selected);
        }
    }

    /// Push the document's top level, then the section for whichever
    /// environment is current once that top level is in place.
    fn push_document(&mut self, document: &ConfigDocument, under: Option<Property>) {
        match under {
            None => {
                self.push_file_layer(document.root());
                let environment = self.current_environment();
                self.push_file_layer(&document.environment_section(&environment));
            }
            Some(property) => {
                let scalars = document
                    .root()
                    .iter()
                    .filter(|(_, value)| !value.is_object())
                    .map(|(key, value)| (key.clone(), value.clone()))
                    .collect();
                self.push_file_layer(&nest(property, scalars));
                let environment = self.current_environment();
                self.push_file_layer(&nest(property, document.environment_section(&environment)));
            }
        }
    }

    fn current_environment(&self) -> String {
        if let Some(pinned) = &self.pinned_environment {
            return pinned.clone();
        }
        self.preview()
            .get(Property::Environment.as_str())
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| self.fallback_environment.clone())
    }

    /// Every layer merged, markers resolved.
    fn preview(&self) -> ConfigMap {
        self.merger
            .merge_all(ConfigMap::new(), self.layers.iter().cloned())
    }

    fn into_layers(self) -> Vec<ConfigMap> {
        self.layers
    }
}

/// Environment named by `map`, honouring marked keys.
fn environment_in(merger: &Merger, map: &ConfigMap) -> Option<String> {
    map.iter()
        .filter(|(key, _)| merger.target_key(key) == Property::Environment.as_str())
        .filter_map(|(_, value)| value.as_str())
        .last()
        .map(str::to_string)
}

fn nest(property: Property, map: ConfigMap) -> ConfigMap {
    let mut nested = ConfigMap::new();
    if !map.is_empty() {
        nested.insert(property.as_str().to_string(), Value::Object(map));
    }
    nested
}

/// The three bundles handed to the host framework.
#[derive(Debug, Clone, Serialize)]
pub struct Bundles {
    /// Database connection settings.
    pub database: ConfigMap,
    /// Framework directives.
    pub directives: Directives,
    /// Prefixed template variables.
    pub template_vars: TemplateVars,
}

/// Resolved bootstrap properties.
///
/// Built once per request with [`Bootstrap::builder`] and passed to
/// whatever needs the bundles.
#[derive(Debug, Clone)]
pub struct Bootstrap {
    properties: ConfigMap,
    merger: Merger,
    paths: Paths,
    request: RequestContext,
    template_options: TemplateVarOptions,
    pinned_environment: Option<String>,
}

impl Bootstrap {
    /// Start collecting inputs for `request`.
    pub fn builder(request: RequestContext) -> BootstrapBuilder {
        BootstrapBuilder::new(request)
    }

    /// Build from the process environment, discovering config files under
    /// the request root.
    pub fn from_env() -> Result<Self, BootstrapError> {
        Self::builder(RequestContext::from_env())
            .selectors_from_env()
            .discover_config_files()
            .build()
    }

    /// Look up a property by name.
    pub fn property(&self, name: &str) -> Result<&Value, BootstrapError> {
        let property: Property = name.parse()?;
        Ok(self.properties.get(property.as_str()).unwrap_or(&NULL))
    }

    /// Replace a property outright. Defaults are not recomputed.
    pub fn set_property(&mut self, name: &str, value: Value) -> Result<(), BootstrapError> {
        let property: Property = name.parse()?;
        property.validate(&value)?;
        let value = match property {
            Property::Debug => Value::from(debug_level(&value).unwrap_or(0)),
            _ => self.merger.normalize(&value),
        };
        if property == Property::Environment && self.pinned_environment.is_some() {
            self.pinned_environment = value.as_str().map(str::to_string);
        }
        self.properties.insert(property.as_str().to_string(), value);
        Ok(())
    }

    /// Merge another config file into the live properties.
    ///
    /// A pinned environment stays pinned; the file's `environment` key is
    /// ignored in that case.
    pub fn apply_config_file(&mut self, path: impl AsRef<Path>) -> Result<(), BootstrapError> {
        self.apply(path.as_ref(), None)
    }

    /// Merge another config file beneath `property`.
    pub fn apply_config_file_under(
        &mut self,
        path: impl AsRef<Path>,
        property: Property,
    ) -> Result<(), BootstrapError> {
        self.apply(path.as_ref(), Some(property))
    }

    fn apply(&mut self, path: &Path, under: Option<Property>) -> Result<(), BootstrapError> {
        let environment = self.environment().to_string();
        let document = ConfigLoader::new(environment.clone()).load_document(path)?;
        if document.is_empty() {
            return Ok(());
        }
        let mut stack =
            LayerStack::new(&self.merger, environment, self.pinned_environment.clone());
        stack.push_document(&document, under);
        let layers = stack.into_layers();

        let properties = std::mem::take(&mut self.properties);
        self.properties = self.merger.merge_all(properties, layers);
        if let Some(level) = self.properties.get(Property::Debug.as_str()).and_then(debug_level) {
            self.properties
                .insert(Property::Debug.as_str().to_string(), Value::from(level));
        }
        debug!(
            "applied config file (path={}, environment={})",
            path.display(),
            self.environment()
        );
        Ok(())
    }

    /// Active environment name.
    pub fn environment(&self) -> &str {
        self.properties
            .get(Property::Environment.as_str())
            .and_then(Value::as_str)
            .unwrap_or_default()
    }

    /// Debug level; 0 means off.
    pub fn debug(&self) -> u8 {
        self.properties
            .get(Property::Debug.as_str())
            .and_then(debug_level)
            .unwrap_or(0)
    }

    /// Framework system directory with a trailing slash.
    pub fn system_path(&self) -> &str {
        self.properties
            .get(Property::SystemPath.as_str())
            .and_then(Value::as_str)
            .unwrap_or_default()
    }

    /// Database settings before `extra` values are merged in.
    pub fn db_config(&self) -> &ConfigMap {
        self.map_property(Property::DbConfig)
    }

    /// Raw directive map; string upload destinations are not yet expanded.
    pub fn config_vars(&self) -> &ConfigMap {
        self.map_property(Property::ConfigVars)
    }

    /// Template variables before prefixing.
    pub fn global_vars(&self) -> &ConfigMap {
        self.map_property(Property::GlobalVars)
    }

    fn map_property(&self, property: Property) -> &ConfigMap {
        self.properties
            .get(property.as_str())
            .and_then(value_as_map)
            .unwrap_or(&*EMPTY_MAP)
    }

    /// Paths and URLs derived at build time.
    pub fn paths(&self) -> &Paths {
        &self.paths
    }

    /// Request the bootstrap was built for.
    pub fn request(&self) -> &RequestContext {
        &self.request
    }

    /// Merger used for every fold, with its override marker.
    pub fn merger(&self) -> &Merger {
        &self.merger
    }

    /// Fail when no environment is active or no database is named.
    pub fn check_requirements(&self) -> Result<(), BootstrapError> {
        if self.environment().trim().is_empty() {
            return Err(BootstrapError::Requirement(
                "no environment is set".to_string(),
            ));
        }
        let named = match self.db_config().get("database") {
            Some(Value::String(name)) => !name.trim().is_empty(),
            Some(Value::Number(_)) => true,
            _ => false,
        };
        if !named {
            return Err(BootstrapError::Requirement(format!(
                "no database name is configured for environment {}",
                self.environment()
            )));
        }
        Ok(())
    }

    /// Database settings with `extra` merged on top.
    pub fn database_settings(&self, extra: ConfigMap) -> ConfigMap {
        self.merger.merge(self.db_config().clone(), extra)
    }

    /// Database settings decoded into their typed form.
    pub fn database(&self) -> Result<DatabaseConfig, BootstrapError> {
        serde_json::from_value(Value::Object(self.database_settings(ConfigMap::new()))).map_err(
            |source| BootstrapError::Decode {
                bundle: "database",
                source,
            },
        )
    }

    /// Framework directives with `extra` merged on top and string upload
    /// destinations expanded.
    pub fn directives(&self, extra: ConfigMap) -> Directives {
        let mut directives = self.merger.merge(self.config_vars().clone(), extra);
        normalize_upload_preferences(
            &mut directives,
            &self.paths.bootstrap_root,
            &self.paths.public_dir_name,
        );
        Directives::new(directives)
    }

    /// Prefixed template variables with `extra` merged on top.
    pub fn template_vars(&self, extra: ConfigMap) -> TemplateVars {
        let vars = self.merger.merge(self.global_vars().clone(), extra);
        TemplateVars::from_map(vars, &self.template_options)
    }

    /// All three bundles with no extra values.
    pub fn bundles(&self) -> Bundles {
        Bundles {
            database: self.database_settings(ConfigMap::new()),
            directives: self.directives(ConfigMap::new()),
            template_vars: self.template_vars(ConfigMap::new()),
        }
    }
}
