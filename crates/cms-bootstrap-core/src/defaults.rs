//! Built-in defaults for the three bundles.
//!
//! Defaults are computed after config files have been read, so a default may
//! depend on the effective value of an earlier key: whatever a file set, or
//! else the earlier default.

use crate::layout::Paths;
use crate::request::{RequestContext, remove_www};
use chrono::{DateTime, Datelike, Local, TimeZone};
use cms_bootstrap_config::ConfigMap;
use rand::Rng;
use serde_json::{Value, json};

/// Placeholder 32-character key; real installs override it.
pub const DEFAULT_ENCRYPTION_KEY: &str = "aU807G5kLzw2nwu43n0TC4C0W770z566";
/// Environment in which analytics and production-only defaults switch on.
pub const PRODUCTION: &str = "production";

const SECONDS_PER_DAY: i64 = 60 * 60 * 24;

/// Inputs shared by every default.
pub(crate) struct DefaultsContext<'a> {
    pub environment: &'a str,
    pub debug: u8,
    pub paths: &'a Paths,
    pub request: &'a RequestContext,
    pub now: DateTime<Local>,
}

impl DefaultsContext<'_> {
    fn is_production(&self) -> bool {
        self.environment == PRODUCTION
    }

    fn yes_no(flag: bool) -> &'static str {
        if flag { "y" } else { "n" }
    }
}

/// Default map whose lookups see explicit values first.
///
/// `explicit` is the merged preview of every config source for one bundle;
/// it only steers lookups; the caller folds the real sources on top of
/// [`LazyDefaults::finish`].
pub(crate) struct LazyDefaults<'a> {
    explicit: &'a ConfigMap,
    defaults: ConfigMap,
}

impl<'a> LazyDefaults<'a> {
    pub(crate) fn new(explicit: &'a ConfigMap) -> Self {
        Self {
            explicit,
            defaults: ConfigMap::new(),
        }
    }

    pub(crate) fn set(&mut self, key: &str, value: impl Into<Value>) {
        self.defaults.insert(key.to_string(), value.into());
    }

    /// Effective value of `key` so far.
    pub(crate) fn get(&self, key: &str) -> Option<&Value> {
        self.explicit
            .get(key)
            .filter(|value| !value.is_null())
            .or_else(|| self.defaults.get(key))
    }

    /// Effective value rendered as a string; empty when unset.
    pub(crate) fn get_string(&self, key: &str) -> String {
        match self.get(key) {
            Some(Value::String(text)) => text.clone(),
            Some(Value::Number(number)) => number.to_string(),
            Some(Value::Bool(flag)) => flag.to_string(),
            _ => String::new(),
        }
    }

    fn get_i64(&self, key: &str) -> Option<i64> {
        match self.get(key)? {
            Value::Number(number) => number.as_i64(),
            Value::String(text) => text.trim().parse().ok(),
            _ => None,
        }
    }

    /// The computed defaults alone.
    pub(crate) fn finish(self) -> ConfigMap {
        self.defaults
    }
}

/// Database driver defaults.
pub(crate) fn database(ctx: &DefaultsContext<'_>, explicit: &ConfigMap) -> ConfigMap {
    let mut d = LazyDefaults::new(explicit);
    d.set("dbdriver", "mysql");
    d.set("pconnect", false);
    d.set("dbprefix", "exp_");
    d.set("swap_pre", d.get_string("dbprefix"));
    d.set("db_debug", true);
    d.set("cache_on", false);
    d.set("autoinit", false);
    d.set("char_set", "utf8");
    d.set("dbcollat", "utf8_general_ci");
    d.set("cachedir", ctx.paths.db_cache_path.clone());
    d.finish()
}

/// Framework directive defaults.
pub(crate) fn directives(ctx: &DefaultsContext<'_>, explicit: &ConfigMap) -> ConfigMap {
    let p = ctx.paths;
    let debug = ctx.debug > 0;
    let mut d = LazyDefaults::new(explicit);

    d.set("app_version", 255);
    d.set("license_number", "");
    d.set("upload_preferences", json!({}));

    // Paths and URLs
    d.set("index_page", "");
    d.set("site_index", d.get_string("index_page"));
    d.set("base_url", p.base_url.clone());
    d.set("site_url", p.base_url.clone());
    d.set("cp_url", format!("{}cp/index.php", p.base_url));
    d.set("theme_folder_path", format!("{}themes/", p.base_path));
    d.set("theme_folder_url", format!("{}themes/", p.base_url));
    d.set("emoticon_path", format!("{}smileys/", p.member_images_url));
    d.set("emoticon_url", format!("{}smileys/", p.member_images_url));
    d.set("captcha_path", format!("{}captchas/", p.member_images_path));
    d.set("captcha_url", format!("{}captchas/", p.member_images_url));
    d.set("avatar_path", format!("{}avatars/", p.member_images_path));
    d.set("avatar_url", format!("{}avatars/", p.member_images_url));
    d.set("photo_path", format!("{}member_photos/", p.member_images_path));
    d.set("photo_url", format!("{}member_photos/", p.member_images_url));
    d.set("sig_img_path", format!("{}signature_attachments/", p.member_images_path));
    d.set("sig_img_url", format!("{}signature_attachments/", p.member_images_url));
    d.set("prv_msg_upload_path", format!("{}pm_attachments/", p.member_images_path));
    d.set("third_party_path", format!("{}third_party/", p.vendor_path));
    d.set("tmpl_file_basepath", format!("{}site_templates/", p.template_path));

    // Debugging
    d.set("is_system_on", "y");
    d.set("allow_extensions", "y");
    d.set("email_debug", DefaultsContext::yes_no(debug));
    d.set(
        "show_profiler",
        DefaultsContext::yes_no(debug && !ctx.request.is_control_panel()),
    );
    d.set("template_debugging", DefaultsContext::yes_no(debug));
    // 1: errors shown to super admins, 2: errors shown to everyone
    d.set("debug", if debug { "2" } else { "1" });

    // Tracking and performance
    d.set("disable_all_tracking", "y");
    d.set("enable_sql_caching", "n");
    d.set("disable_tag_caching", "n");
    d.set("enable_online_user_tracking", "n");
    d.set("dynamic_tracking_disabling", "500");
    d.set("enable_hit_tracking", "n");
    d.set("enable_entry_view_tracking", "n");
    d.set("log_referrers", "n");
    d.set("gzip_output", "n");

    // Cookies and session
    d.set("cookie_domain", format!(".{}", remove_www(&ctx.request.host)));
    d.set("cookie_path", "");
    d.set("user_session_type", "c");
    d.set("admin_session_type", "cs");

    // Localization
    d.set(
        "daylight_savings",
        DefaultsContext::yes_no(is_daylight_saving(&ctx.now)),
    );
    d.set("server_timezone", "UM5");
    d.set("default_site_dst", d.get_string("daylight_savings"));
    d.set("default_site_timezone", d.get_string("server_timezone"));
    d.set("time_format", "us");
    d.set("server_offset", "");
    d.set("allow_member_localization", "n");

    // Members
    d.set("profile_trigger", profile_trigger(&ctx.now));
    d.set("enable_emoticons", "n");
    d.set("enable_avatars", "n");
    d.set("enable_photos", "n");
    d.set("sig_allow_img_upload", "n");
    d.set("captcha_require_members", "n");
    d.set("allow_member_registration", "n");

    // URLs and templates
    d.set("use_category_name", "y");
    d.set("reserved_category_word", "category");
    d.set("word_separator", "dash");
    d.set("strict_urls", "y");
    d.set("site_404", "site/404");
    d.set("save_tmpl_files", "y");
    d.set("hidden_template_indicator", "_");
    d.set("uri_protocol", "PATH_INFO");
    d.set("enable_query_strings", true);
    d.set("permitted_uri_chars", "a-z 0-9~%.:_\\-");

    // Other
    d.set("encryption_key", DEFAULT_ENCRYPTION_KEY);
    d.set("save_tmpl_revisions", "n");
    d.set("new_version_check", "n");
    d.set("protect_javascript", "y");
    // 0 disables entry autosave
    d.set("autosave_interval_seconds", "0");
    d.set("password_lockout", "n");
    d.set("cp_theme", "default");

    // Rarely changed framework settings
    d.set("install_lock", "");
    d.set("doc_url", "http://ellislab.com/expressionengine/user-guide/");
    d.set("site_label", "");
    d.set("url_suffix", "");
    d.set("language", "english");
    d.set("charset", "UTF-8");
    d.set("enable_hooks", false);
    d.set("subclass_prefix", "EE_");
    d.set("directory_trigger", "D");
    d.set("controller_trigger", "C");
    d.set("function_trigger", "M");
    d.set("log_threshold", 0);
    d.set("log_path", "");
    d.set("log_date_format", "Y-m-d H:i:s");
    d.set("cache_path", "");
    d.set("global_xss_filtering", false);
    d.set("csrf_protection", false);
    d.set("compress_output", false);
    d.set("time_reference", "local");
    d.set("rewrite_short_tags", true);
    d.set("proxy_ips", "");

    // Add-on settings
    d.set("ce_image_document_root", p.base_path.clone());
    d.set("ce_image_cache_dir", "/cache/made/");
    d.set("ce_image_remote_dir", "/cache/remote/");
    d.set("ce_image_memory_limit", 64);
    d.set("ce_image_remote_cache_time", 1440);
    d.set("ce_image_quality", 90);
    d.set("ce_image_disable_xss_check", "no");
    d.set("playa_site_index", p.base_url.clone());
    d.set("minimee_cache_path", p.public_cache_path.clone());
    d.set("minimee_cache_url", p.public_cache_url.clone());
    d.set("minimee_base_path", p.base_path.clone());
    d.set("minimee_base_url", p.base_url.clone());
    d.set("minimee_debug", "n");
    d.set("minimee_disable", "n");
    d.set("minimee_remote_mode", "auto");
    d.set("minimee_minify_html", "yes");
    d.set("assets_site_url", "/index.php");
    d.set("assets_cp_path", p.system_path.clone());
    d.set("low_variables_save_as_files", "y");
    d.set("low_variables_file_path", format!("{}low_variables/", p.template_path));
    d.set("stash_file_basepath", format!("{}stash_templates/", p.template_path));
    d.set("stash_file_sync", !ctx.is_production());

    // Site settings
    d.set(
        "google_analytics_id",
        if ctx.is_production() { "UA-XXXXXXX-XX" } else { "" },
    );
    d.set("cookie_expire_days", 30);
    let expire_days = d.get_i64("cookie_expire_days").unwrap_or(30);
    d.set(
        "cookie_expire_from_now",
        ctx.now.timestamp() + SECONDS_PER_DAY * expire_days,
    );
    d.set(
        "global_json",
        json!({
            "env": ctx.environment,
            "salt": d.get_string("encryption_key"),
            "googleAnalyticsId": d.get_string("google_analytics_id"),
            "cookieSettings": {
                "path": d.get_string("cookie_path"),
                "domain": d.get_string("cookie_domain"),
                "expires": expire_days,
            },
            "html": {},
        }),
    );

    d.finish()
}

/// Template variable defaults.
///
/// `directives` is the effective directive map, so `gv_salt` follows an
/// overridden encryption key.
pub(crate) fn template_vars(
    ctx: &DefaultsContext<'_>,
    explicit: &ConfigMap,
    directives: &ConfigMap,
) -> ConfigMap {
    let mut d = LazyDefaults::new(explicit);

    // Date formats
    d.set("gv_date_fmt", "%F %j, %Y");
    d.set("gv_date_fmt_time", "%g:%i %a");
    d.set("gv_date_fmt_full", "%F %j %Y, %g:%i %a");

    // Tag parameter shortcuts
    d.set("gv_param_no_limit", r#"limit="9999999999""#);
    d.set(
        "gv_param_structure_nav_defaults",
        r#"show_depth="1" max_depth="1" current_class="active" css_id="none" channel:title="page:cf_page_title""#,
    );
    d.set(
        "gv_param_low_title_entry_defaults",
        r#"entry_id="{entry_id}" fallback="yes" custom_field="cf_{channel_short_name}_title""#,
    );
    d.set(
        "gv_param_ce_img_defaults",
        r#"fallback_src="/assets/styles/images/other/placeholder.png" allow_scale_larger="yes" crop="yes""#,
    );

    d.set("gv_env", ctx.environment);
    d.set("gv_path_vendor", ctx.paths.vendor_path.clone());
    // site_url is parsed late by the host, so templates get their own copy
    d.set("gv_base_url", ctx.paths.base_url.clone());
    d.set(
        "gv_salt",
        directives
            .get("encryption_key")
            .cloned()
            .unwrap_or_else(|| Value::from(DEFAULT_ENCRYPTION_KEY)),
    );
    if let Some(global_json) = directives.get("global_json") {
        d.set("gv_global_json", global_json.clone());
    }

    d.finish()
}

/// Whether `now` falls inside the local daylight-saving period.
///
/// Compares the current UTC offset with January and July of the same year;
/// zones without a seasonal change never report DST.
pub(crate) fn is_daylight_saving<Tz: TimeZone>(now: &DateTime<Tz>) -> bool {
    use chrono::Offset;

    let tz = now.timezone();
    let year = now.year();
    let offset_at = |month: u32| {
        tz.with_ymd_and_hms(year, month, 1, 12, 0, 0)
            .single()
            .map(|moment| moment.offset().fix().local_minus_utc())
    };
    match (offset_at(1), offset_at(7)) {
        (Some(january), Some(july)) if january != july => {
            now.offset().fix().local_minus_utc() == january.max(july)
        }
        _ => false,
    }
}

/// Random member-profile trigger between zero and the current timestamp.
fn profile_trigger(now: &DateTime<Local>) -> i64 {
    let upper = now.timestamp().max(0);
    rand::rng().random_range(0..=upper)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::FixedOffset;
    use pretty_assertions::assert_eq;

    #[test]
    fn lazy_defaults_prefer_explicit_values() {
        let mut explicit = ConfigMap::new();
        explicit.insert("server_timezone".to_string(), json!("UTC"));
        explicit.insert("site_label".to_string(), Value::Null);

        let mut d = LazyDefaults::new(&explicit);
        d.set("server_timezone", "UM5");
        d.set("default_site_timezone", d.get_string("server_timezone"));
        d.set("site_label", "Default");

        assert_eq!(d.get_string("server_timezone"), "UTC");
        assert_eq!(d.get_string("site_label"), "Default");
        let defaults = d.finish();
        assert_eq!(defaults.get("default_site_timezone"), Some(&json!("UTC")));
        assert_eq!(defaults.get("server_timezone"), Some(&json!("UM5")));
    }

    #[test]
    fn fixed_offsets_never_observe_dst() {
        let zone = FixedOffset::east_opt(3600).expect("offset");
        let now = zone
            .with_ymd_and_hms(2024, 7, 15, 12, 0, 0)
            .single()
            .expect("time");
        assert!(!is_daylight_saving(&now));
    }

    #[test]
    fn profile_trigger_stays_in_range() {
        let now = Local::now();
        for _ in 0..32 {
            let trigger = profile_trigger(&now);
            assert!((0..=now.timestamp()).contains(&trigger));
        }
    }
}
