//! Request-derived inputs: protocol, host, and filesystem root.

use std::sync::LazyLock;

use log::warn;
use regex::Regex;

/// CGI variable carrying `on` for TLS requests.
const VAR_HTTPS: &str = "HTTPS";
/// Preferred host source.
const VAR_HTTP_HOST: &str = "HTTP_HOST";
/// Fallback host source.
const VAR_SERVER_NAME: &str = "SERVER_NAME";
/// Web server document root.
const VAR_DOCUMENT_ROOT: &str = "DOCUMENT_ROOT";
/// Explicit bootstrap root; wins over the document root.
const VAR_BOOTSTRAP_ROOT: &str = "BOOTSTRAP_ROOT";
/// Raw query string, inspected for the profiler trigger.
const VAR_QUERY_STRING: &str = "QUERY_STRING";
/// Query parameter that marks a control-panel request.
const PROFILER_PARAM: &str = "D";
/// Host used when the request names none.
const FALLBACK_HOST: &str = "localhost";

/// Leading `www.` (optionally after a scheme) followed by a two-label domain.
const WWW_PATTERN: &str = r"^(https?://)?w{3}\.(\w+\.\w+)";

/// Everything the bootstrap needs to know about the current request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    /// Whether the request arrived over TLS.
    pub https: bool,
    /// Host name as sent by the client.
    pub host: String,
    /// Web server document root.
    pub document_root: String,
    /// Explicit bootstrap root overriding the document root.
    pub bootstrap_root: Option<String>,
    /// Value of the `D` query parameter, if any.
    pub profiler_trigger: Option<String>,
}

impl RequestContext {
    /// Plain-HTTP request for `host` rooted at `document_root`.
    pub fn new(host: impl Into<String>, document_root: impl Into<String>) -> Self {
        Self {
            https: false,
            host: host.into(),
            document_root: document_root.into(),
            bootstrap_root: None,
            profiler_trigger: None,
        }
    }

    /// Mark the request as TLS.
    pub fn with_https(mut self, https: bool) -> Self {
        self.https = https;
        self
    }

    /// Use `root` instead of the document root.
    pub fn with_bootstrap_root(mut self, root: impl Into<String>) -> Self {
        self.bootstrap_root = Some(root.into());
        self
    }

    /// Record the `D` query parameter.
    pub fn with_profiler_trigger(mut self, trigger: impl Into<String>) -> Self {
        self.profiler_trigger = Some(trigger.into());
        self
    }

    /// Read the request from the process environment (CGI conventions).
    pub fn from_env() -> Self {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    /// Build the request from an arbitrary variable lookup.
    pub fn from_vars<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |name: &str| lookup(name).filter(|value| !value.is_empty());
        let https = lookup(VAR_HTTPS).is_some_and(|value| value.eq_ignore_ascii_case("on"));
        let host = non_empty(VAR_HTTP_HOST)
            .or_else(|| non_empty(VAR_SERVER_NAME))
            .unwrap_or_else(|| {
                warn!("no request host available, falling back to {FALLBACK_HOST}");
                FALLBACK_HOST.to_string()
            });
        let document_root = lookup(VAR_DOCUMENT_ROOT).unwrap_or_default();
        let profiler_trigger = lookup(VAR_QUERY_STRING)
            .and_then(|query| query_param(&query, PROFILER_PARAM).map(str::to_string));

        Self {
            https,
            host,
            document_root,
            bootstrap_root: non_empty(VAR_BOOTSTRAP_ROOT),
            profiler_trigger,
        }
    }

    /// `https://` or `http://`.
    pub fn protocol(&self) -> &'static str {
        if self.https { "https://" } else { "http://" }
    }

    /// Filesystem root with exactly one trailing slash.
    pub fn root(&self) -> String {
        let root = self
            .bootstrap_root
            .as_deref()
            .unwrap_or(&self.document_root);
        format!("{}/", root.trim_end_matches('/'))
    }

    /// Site base URL with a trailing slash.
    pub fn base_url(&self) -> String {
        format!("{}{}/", self.protocol(), self.host)
    }

    /// True when the request targets the control panel (`D=cp`).
    pub fn is_control_panel(&self) -> bool {
        self.profiler_trigger.as_deref() == Some("cp")
    }
}

fn query_param<'q>(query: &'q str, name: &str) -> Option<&'q str> {
    query.split('&').find_map(|pair| {
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        (key == name).then_some(value)
    })
}

/// Strip a leading `www.` from a host or URL, keeping any scheme.
pub fn remove_www(host: &str) -> String {
    match WWW.as_ref() {
        Some(regex) => regex.replace(host, "${1}${2}").into_owned(),
        None => host.to_string(),
    }
}

/// Compiled once; `None` leaves hosts untouched.
static WWW: LazyLock<Option<Regex>> = LazyLock::new(|| match Regex::new(WWW_PATTERN) {
    Ok(regex) => Some(regex),
    Err(err) => {
        warn!("www pattern failed to compile: {err}");
        None
    }
});
