use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use tokio::fs;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// URL of the domain-to-stylesheet config (JSON or JSONP).
    #[serde(default = "default_config_url")]
    pub config_url: String,

    /// Base URL under which `<style>.css` files are published.
    #[serde(default = "default_style_base_url")]
    pub style_base_url: String,

    /// Shared font-face sheet, loaded in addition to the site sheet
    /// when a rule opts in.
    #[serde(default = "default_fonts_css_url")]
    pub fonts_css_url: String,

    /// Optional version resource; fetched cache-bypassing and used as a
    /// `?v=` cache buster on style URLs.
    #[serde(default)]
    pub version_url: Option<String>,

    /// Base URL serving the Google Fonts CSS API; font families annotated
    /// in stylesheets are loaded from here as `<link>` sheets.
    #[serde(default = "default_google_fonts_mirror")]
    pub google_fonts_mirror: String,

    /// Stylesheet applied when no rule matches and the `default` step
    /// is part of the policy.
    #[serde(default = "default_default_style")]
    pub default_style: Option<String>,

    /// Ordered matching steps: exact, suffix, heuristic, default.
    #[serde(default = "default_resolution_policy")]
    pub resolution_policy: Vec<String>,

    #[serde(default = "default_fetch_timeout_ms")]
    pub fetch_timeout_ms: u64,

    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub build: BuildConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CacheConfig {
    #[serde(default = "default_cache_enable")]
    pub enable: bool,
    #[serde(default = "default_cache_capacity")]
    pub capacity: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BuildConfig {
    #[serde(default = "default_domain_map")]
    pub domain_map: String,
    #[serde(default = "default_version_file")]
    pub version_file: String,
    #[serde(default = "default_templates_dir")]
    pub templates_dir: String,
    #[serde(default = "default_styles_dir")]
    pub styles_dir: String,
    #[serde(default = "default_dist_dir")]
    pub dist_dir: String,
    /// Optional payload appended after each rendered header.
    #[serde(default)]
    pub payload: Option<String>,
    #[serde(default = "default_concurrent_copies")]
    pub concurrent_copies: usize,
}

// Defaults
fn default_config_url() -> String {
    "https://cdn.jsdelivr.net/gh/flinhong/userscripts/public/domain.jsonp".to_string()
}
fn default_style_base_url() -> String {
    "https://cdn.jsdelivr.net/gh/flinhong/userscripts/configs/styles".to_string()
}
fn default_fonts_css_url() -> String {
    "https://cdn.jsdelivr.net/gh/flinhong/userscripts/configs/styles/fonts.css".to_string()
}
fn default_google_fonts_mirror() -> String {
    "https://google-fonts.mirrors.sjtug.sjtu.edu.cn".to_string()
}
fn default_default_style() -> Option<String> {
    Some("default".to_string())
}
fn default_resolution_policy() -> Vec<String> {
    vec![
        "exact".to_string(),
        "suffix".to_string(),
        "heuristic".to_string(),
        "default".to_string(),
    ]
}
fn default_fetch_timeout_ms() -> u64 {
    10_000
}
fn default_cache_enable() -> bool {
    true
}
fn default_cache_capacity() -> u64 {
    1000
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_domain_map() -> String {
    "configs/domain-map.json".to_string()
}
fn default_version_file() -> String {
    "configs/version.json".to_string()
}
fn default_templates_dir() -> String {
    "templates".to_string()
}
fn default_styles_dir() -> String {
    "configs/styles".to_string()
}
fn default_dist_dir() -> String {
    "dist".to_string()
}
fn default_concurrent_copies() -> usize {
    4
}

impl Default for Config {
    fn default() -> Self {
        Self {
            config_url: default_config_url(),
            style_base_url: default_style_base_url(),
            fonts_css_url: default_fonts_css_url(),
            version_url: None,
            google_fonts_mirror: default_google_fonts_mirror(),
            default_style: default_default_style(),
            resolution_policy: default_resolution_policy(),
            fetch_timeout_ms: default_fetch_timeout_ms(),
            cache: CacheConfig::default(),
            logging: LoggingConfig::default(),
            build: BuildConfig::default(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enable: default_cache_enable(),
            capacity: default_cache_capacity(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            domain_map: default_domain_map(),
            version_file: default_version_file(),
            templates_dir: default_templates_dir(),
            styles_dir: default_styles_dir(),
            dist_dir: default_dist_dir(),
            payload: None,
            concurrent_copies: default_concurrent_copies(),
        }
    }
}

impl Config {
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .await
            .context("Failed to read config file")?;
        let config: Config = toml::from_str(&contents).context("Failed to parse config TOML")?;
        Ok(config)
    }
}
