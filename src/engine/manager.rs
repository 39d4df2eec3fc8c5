use super::matcher::{parse_policy, DomainRule, RuleMatcher};
use super::traits::{ConfigManager, StyleMatcher};
use crate::config::Config;
use crate::loader::ResourceLoader;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, warn};

/// Wire shape of the remote domain config: a `rules` array where each rule
/// names a stylesheet file plus explicit domains and/or match patterns.
#[derive(Debug, Deserialize)]
struct WireConfig {
    #[serde(default)]
    rules: Vec<WireRule>,
}

#[derive(Debug, Deserialize)]
struct WireRule {
    file: String,
    #[serde(default)]
    domains: Vec<String>,
    #[serde(default, rename = "match")]
    match_patterns: Vec<String>,
    #[serde(default)]
    fonts: bool,
}

/// Strips a JSONP wrapper (`anyCallback({...});`) down to the JSON payload.
/// The wrapper is removed syntactically; nothing is ever evaluated.
/// Plain JSON passes through unchanged.
pub fn strip_jsonp(text: &str) -> &str {
    let trimmed = text.trim();
    if trimmed.starts_with('{') || trimmed.starts_with('[') {
        return trimmed;
    }

    let Some(open) = trimmed.find('(') else {
        return trimmed;
    };
    let callback = &trimmed[..open];
    let is_identifier = !callback.is_empty()
        && callback
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '$' | '.'));
    if !is_identifier {
        return trimmed;
    }

    let mut body = trimmed[open + 1..].trim_end();
    body = body.strip_suffix(';').unwrap_or(body).trim_end();
    match body.strip_suffix(')') {
        Some(inner) => inner.trim(),
        None => trimmed,
    }
}

/// Parses a domain config document (JSON or JSONP) into rules.
pub fn parse_domain_config(text: &str) -> Result<Vec<DomainRule>> {
    let wire: WireConfig =
        serde_json::from_str(strip_jsonp(text)).context("Failed to parse domain config")?;

    Ok(wire
        .rules
        .into_iter()
        .map(|rule| {
            let mut patterns = rule.domains;
            patterns.extend(rule.match_patterns);
            DomainRule {
                patterns,
                style: style_id(&rule.file),
                fonts: rule.fonts,
            }
        })
        .collect())
}

/// Stylesheet identifiers are logical names; the wire format may carry the
/// published filename instead.
fn style_id(file: &str) -> String {
    file.strip_suffix(".css").unwrap_or(file).to_string()
}

/// Fetches the domain config from the CDN and builds the rule matcher.
pub struct RemoteConfigManager {
    config: Config,
    loader: Arc<ResourceLoader>,
}

impl RemoteConfigManager {
    pub fn new(config: Config, loader: Arc<ResourceLoader>) -> Self {
        Self { config, loader }
    }

    async fn load_rules(&self) -> Result<Vec<DomainRule>> {
        let text = self
            .loader
            .fetch(&self.config.config_url, false)
            .await
            .with_context(|| format!("Failed to fetch domain config {}", self.config.config_url))?;
        parse_domain_config(&text)
    }
}

#[async_trait::async_trait]
impl ConfigManager for RemoteConfigManager {
    async fn refresh(&self) -> Arc<dyn StyleMatcher> {
        let policy = parse_policy(&self.config.resolution_policy);
        let default_style = self.config.default_style.clone();

        match self.load_rules().await {
            Ok(rules) => {
                let matcher = RuleMatcher::new(&rules, policy, default_style);
                info!(
                    "Domain config loaded: {} rules from {}",
                    matcher.rule_count(),
                    self.config.config_url
                );
                Arc::new(matcher)
            }
            Err(e) => {
                warn!("Domain config unavailable, leaving pages unstyled: {:#}", e);
                Arc::new(RuleMatcher::empty(policy, default_style))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAYLOAD: &str = r#"{
        "rules": [
            { "file": "github.css", "domains": ["github.com"] },
            { "file": "search.css", "match": ["*://*.bing.com/*"], "fonts": true }
        ]
    }"#;

    #[test]
    fn test_parse_bare_json() {
        let rules = parse_domain_config(PAYLOAD).unwrap();
        assert_eq!(rules.len(), 2);
        assert_eq!(rules[0].style, "github");
        assert_eq!(rules[0].patterns, vec!["github.com"]);
        assert!(!rules[0].fonts);
        assert_eq!(rules[1].style, "search");
        assert_eq!(rules[1].patterns, vec!["*://*.bing.com/*"]);
        assert!(rules[1].fonts);
    }

    #[test]
    fn test_parse_jsonp_matches_bare_json() {
        let jsonp = format!("domainConfigCallback({PAYLOAD});");
        let from_jsonp = parse_domain_config(&jsonp).unwrap();
        let from_json = parse_domain_config(PAYLOAD).unwrap();
        assert_eq!(from_jsonp.len(), from_json.len());
        for (a, b) in from_jsonp.iter().zip(from_json.iter()) {
            assert_eq!(a.style, b.style);
            assert_eq!(a.patterns, b.patterns);
            assert_eq!(a.fonts, b.fonts);
        }
    }

    #[test]
    fn test_strip_jsonp_variants() {
        assert_eq!(strip_jsonp("cb({\"a\":1})"), "{\"a\":1}");
        assert_eq!(strip_jsonp("ns.cb({\"a\":1});"), "{\"a\":1}");
        assert_eq!(strip_jsonp("  cb({\"a\":1})  "), "{\"a\":1}");
        // Plain JSON is untouched even if it contains parentheses
        assert_eq!(strip_jsonp("{\"a\":\"(b)\"}"), "{\"a\":\"(b)\"}");
    }

    #[test]
    fn test_malformed_config_is_an_error() {
        assert!(parse_domain_config("not json at all").is_err());
        assert!(parse_domain_config("cb(truncated").is_err());
    }

    #[test]
    fn test_rules_default_to_empty() {
        let rules = parse_domain_config("{}").unwrap();
        assert!(rules.is_empty());
    }

    #[test]
    fn test_domains_and_match_patterns_combine() {
        let text = r#"{"rules": [{"file": "mixed", "domains": ["a.com"], "match": ["*://b.com/*"]}]}"#;
        let rules = parse_domain_config(text).unwrap();
        assert_eq!(rules[0].patterns, vec!["a.com", "*://b.com/*"]);
        assert_eq!(rules[0].style, "mixed");
    }
}
