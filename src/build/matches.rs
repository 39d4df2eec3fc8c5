use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use tokio::fs;

/// Domain map entry: one stylesheet id or several.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum StyleTargets {
    One(String),
    Many(Vec<String>),
}

impl StyleTargets {
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        let slice = match self {
            Self::One(s) => std::slice::from_ref(s),
            Self::Many(v) => v.as_slice(),
        };
        slice.iter().map(String::as_str)
    }
}

/// Hostname (possibly with wildcards) to stylesheet id(s).
pub type DomainMap = BTreeMap<String, StyleTargets>;

pub async fn load_domain_map(path: &str) -> Result<DomainMap> {
    let text = fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read domain map {path}"))?;
    serde_json::from_str(&text).with_context(|| format!("Failed to parse domain map {path}"))
}

/// Renders `// @match` header lines for every mapped domain. Plain domains
/// come first, wildcard domains after, each as `*://<domain>/*` with dots
/// escaped and `*` expanded for the wildcard group.
pub fn generate_match_lines(map: &DomainMap) -> Vec<String> {
    let mut direct = Vec::new();
    let mut patterns = Vec::new();

    for domain in map.keys() {
        if domain.contains('*') {
            let escaped = domain.replace('.', "\\.").replace('*', ".*");
            patterns.push(format!("*://{escaped}/*"));
        } else {
            direct.push(format!("*://{domain}/*"));
        }
    }

    direct
        .into_iter()
        .chain(patterns)
        .map(|m| format!("// @match        {m}"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map_from(json: &str) -> DomainMap {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_plain_domains_become_match_lines() {
        let map = map_from(r#"{"github.com": "github", "bing.com": ["search", "fonts"]}"#);
        let lines = generate_match_lines(&map);
        assert_eq!(
            lines,
            vec![
                "// @match        *://bing.com/*",
                "// @match        *://github.com/*",
            ]
        );
    }

    #[test]
    fn test_wildcard_domains_are_escaped_and_sorted_last() {
        let map = map_from(r#"{"*.wikipedia.org": "wiki", "github.com": "github"}"#);
        let lines = generate_match_lines(&map);
        assert_eq!(
            lines,
            vec![
                "// @match        *://github.com/*",
                "// @match        *://.*\\.wikipedia\\.org/*",
            ]
        );
    }

    #[test]
    fn test_targets_iterate_uniformly() {
        let map = map_from(r#"{"a.com": "one", "b.com": ["two", "three"]}"#);
        let targets: Vec<&str> = map.values().flat_map(StyleTargets::iter).collect();
        assert_eq!(targets, vec!["one", "two", "three"]);
    }
}
