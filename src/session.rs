use crate::apply::{Document, StyleApplicator};
use crate::config::Config;
use crate::engine::{ConfigManager, RemoteConfigManager, Resolution};
use crate::loader::ResourceLoader;
use anyhow::{Context, Result};
use regex::Regex;
use rustc_hash::FxHashSet;
use serde::Deserialize;
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

#[derive(Debug, Deserialize)]
struct VersionInfo {
    version: String,
}

/// Font families annotated in a stylesheet as `/* google-font: Name */`
/// comments, in order of appearance.
pub fn extract_google_fonts(css: &str) -> Vec<String> {
    static FONT_COMMENT: OnceLock<Regex> = OnceLock::new();
    let re = FONT_COMMENT
        .get_or_init(|| Regex::new(r"(?i)/\*\s*google-font:\s*([^*]+?)\s*\*/").unwrap());
    re.captures_iter(css)
        .map(|caps| caps[1].to_string())
        .collect()
}

/// Everything that happens for one page load: version check, config fetch,
/// hostname resolution, stylesheet fetch and injection. Owns the loader
/// cache and the applicator, so state is page-scoped rather than ambient.
///
/// Every failure along the way degrades to "leave the page unstyled".
pub struct PageSession {
    config: Config,
    loader: Arc<ResourceLoader>,
    applicator: StyleApplicator,
    version: Option<String>,
    loaded_fonts: FxHashSet<String>,
}

impl PageSession {
    pub fn new(config: Config) -> Self {
        let loader = Arc::new(ResourceLoader::new(
            &config.cache,
            Duration::from_millis(config.fetch_timeout_ms),
        ));
        Self {
            config,
            loader,
            applicator: StyleApplicator::new(),
            version: None,
            loaded_fonts: FxHashSet::default(),
        }
    }

    pub fn loader(&self) -> Arc<ResourceLoader> {
        self.loader.clone()
    }

    pub fn applicator_mut(&mut self) -> &mut StyleApplicator {
        &mut self.applicator
    }

    /// Runs the pipeline for a page URL against the given document.
    /// Returns the resolution that was applied, if any.
    pub async fn run(&mut self, page_url: &str, doc: &mut Document) -> Result<Option<Resolution>> {
        let url = Url::parse(page_url).context("Invalid page URL")?;
        let hostname = url.host_str().unwrap_or_default().to_string();

        self.check_version().await;

        // Config must be loaded before the resolver runs; sequencing the
        // awaits is the only synchronization needed.
        let manager = RemoteConfigManager::new(self.config.clone(), self.loader.clone());
        let matcher = manager.refresh().await;

        let Some(resolution) = matcher.resolve(&hostname, Some(page_url)) else {
            info!("No style rule for {}", hostname);
            return Ok(None);
        };

        let mut applied = false;
        for candidate in self.candidate_urls(&resolution) {
            if let Some(css) = self.loader.fetch_ok(&candidate, false).await {
                self.applicator.apply(doc, &css);
                self.load_google_fonts(doc, &css);
                info!("Applied '{}' to {}", resolution.style, hostname);
                applied = true;
                break;
            }
            debug!("Candidate unavailable: {}", candidate);
        }

        if resolution.fonts {
            if let Some(css) = self.loader.fetch_ok(&self.fonts_url(), false).await {
                self.applicator.apply(doc, &css);
                self.load_google_fonts(doc, &css);
                info!("Applied shared font sheet to {}", hostname);
            }
        }

        Ok(applied.then_some(resolution))
    }

    /// The version resource must always be fresh, so it bypasses the cache.
    async fn check_version(&mut self) {
        let Some(version_url) = self.config.version_url.clone() else {
            return;
        };
        if let Some(text) = self.loader.fetch_ok(&version_url, true).await {
            match serde_json::from_str::<VersionInfo>(&text) {
                Ok(info) => {
                    debug!("Published version: {}", info.version);
                    self.version = Some(info.version);
                }
                Err(e) => debug!("Unusable version resource: {}", e),
            }
        }
    }

    /// Resolved style first, then the configured default as a fallback
    /// when it differs.
    fn candidate_urls(&self, resolution: &Resolution) -> Vec<String> {
        let mut urls = vec![self.style_url(&resolution.style)];
        if let Some(default) = &self.config.default_style {
            if default != &resolution.style {
                urls.push(self.style_url(default));
            }
        }
        urls
    }

    fn style_url(&self, style: &str) -> String {
        let base = self.config.style_base_url.trim_end_matches('/');
        match &self.version {
            Some(v) => format!("{base}/{style}.css?v={v}"),
            None => format!("{base}/{style}.css"),
        }
    }

    fn fonts_url(&self) -> String {
        let base = &self.config.fonts_css_url;
        match &self.version {
            Some(v) => {
                let sep = if base.contains('?') { '&' } else { '?' };
                format!("{base}{sep}v={v}")
            }
            None => base.clone(),
        }
    }

    /// Injects a stylesheet `<link>` for every font family the CSS
    /// annotates, once per family per session.
    fn load_google_fonts(&mut self, doc: &mut Document, css: &str) {
        for family in extract_google_fonts(css) {
            if !self.loaded_fonts.insert(family.clone()) {
                continue;
            }
            let href = self.font_link_url(&family);
            self.applicator.apply_link(doc, &href);
            info!("Loading Google font '{}'", family);
        }
    }

    fn font_link_url(&self, family: &str) -> String {
        format!(
            "{}/css2?family={}&display=swap",
            self.config.google_fonts_mirror.trim_end_matches('/'),
            family.replace(' ', "+")
        )
    }
}
