use super::traits::StyleMatcher;
use regex::Regex;
use rustc_hash::FxHashMap;
use tracing::warn;

/// Second-to-last labels that indicate a compound TLD (`co.uk`, `com.hk`),
/// so the registrable domain sits one label further left.
const COMPOUND_TLD_LABELS: [&str; 7] = ["co", "com", "net", "org", "gov", "edu", "ac"];

/// A single domain-to-stylesheet rule. Patterns may be plain hostnames,
/// hostname globs (`*.bing.com`) or userscript match patterns
/// (`*://github.com/*`).
#[derive(Debug, Clone)]
pub struct DomainRule {
    pub patterns: Vec<String>,
    pub style: String,
    pub fonts: bool,
}

/// The outcome of resolving a page: which stylesheet to load, and whether
/// the shared font sheet should load alongside it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub style: String,
    pub fonts: bool,
}

/// One step of the resolution policy, tried in configured order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchStep {
    Exact,
    Suffix,
    Heuristic,
    Default,
}

impl MatchStep {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "exact" => Some(Self::Exact),
            "suffix" => Some(Self::Suffix),
            "heuristic" => Some(Self::Heuristic),
            "default" => Some(Self::Default),
            _ => None,
        }
    }
}

/// Parses the configured policy steps, skipping unknown names.
/// An empty or fully invalid list falls back to the full ordering.
pub fn parse_policy(steps: &[String]) -> Vec<MatchStep> {
    let mut policy = Vec::new();
    for step in steps {
        match MatchStep::parse(step) {
            Some(s) if !policy.contains(&s) => policy.push(s),
            Some(_) => {}
            None => warn!("Unknown resolution step '{}', ignoring", step),
        }
    }
    if policy.is_empty() {
        policy = vec![
            MatchStep::Exact,
            MatchStep::Suffix,
            MatchStep::Heuristic,
            MatchStep::Default,
        ];
    }
    policy
}

/// Heuristic main-domain extraction: strip one leading `www.`, then take
/// the second-level label unless the second-to-last label is a compound
/// TLD marker. Single-label hostnames come back unchanged.
pub fn main_domain(hostname: &str) -> Option<&str> {
    let host = hostname.strip_prefix("www.").unwrap_or(hostname);
    if host.is_empty() {
        return None;
    }
    let labels: Vec<&str> = host.split('.').collect();
    if labels.iter().any(|l| l.is_empty()) {
        return None;
    }
    match labels.len() {
        1 => Some(labels[0]),
        2 => Some(labels[0]),
        n => {
            if COMPOUND_TLD_LABELS.contains(&labels[n - 2]) {
                Some(labels[n - 3])
            } else {
                Some(labels[n - 2])
            }
        }
    }
}

enum CompiledPattern {
    /// Glob over the hostname only (`*.bing.com`).
    Host(Regex),
    /// Glob over the full page URL (`*://github.com/issues/*`).
    Url(Regex),
}

/// In-memory matcher over the loaded rule set.
///
/// Plain hostnames live in a hash table shared by the exact and suffix
/// steps; wildcard patterns are compiled to anchored regexes and checked
/// in rule order during the exact step.
pub struct RuleMatcher {
    // Map hostname -> rule index
    domains: FxHashMap<Box<str>, usize>,
    patterns: Vec<(CompiledPattern, usize)>,
    // Map style id -> fonts flag, for the heuristic step
    known_styles: FxHashMap<Box<str>, bool>,
    targets: Vec<(Box<str>, bool)>,
    policy: Vec<MatchStep>,
    default_style: Option<Box<str>>,
}

impl RuleMatcher {
    pub fn new(
        rules: &[DomainRule],
        policy: Vec<MatchStep>,
        default_style: Option<String>,
    ) -> Self {
        let mut domains = FxHashMap::default();
        let mut patterns = Vec::new();
        let mut known_styles = FxHashMap::default();
        let mut targets = Vec::new();

        for (idx, rule) in rules.iter().enumerate() {
            targets.push((rule.style.clone().into_boxed_str(), rule.fonts));
            known_styles
                .entry(rule.style.to_lowercase().into_boxed_str())
                .or_insert(rule.fonts);

            for pattern in &rule.patterns {
                match classify_pattern(pattern) {
                    Some(PatternKind::Hostname(host)) => {
                        // First rule wins for duplicate hostnames
                        domains.entry(host.into_boxed_str()).or_insert(idx);
                    }
                    Some(PatternKind::HostGlob(glob)) => match glob_to_regex(&glob) {
                        Ok(re) => patterns.push((CompiledPattern::Host(re), idx)),
                        Err(e) => warn!("Skipping unusable pattern '{}': {}", pattern, e),
                    },
                    Some(PatternKind::UrlGlob(glob)) => match glob_to_regex(&glob) {
                        Ok(re) => patterns.push((CompiledPattern::Url(re), idx)),
                        Err(e) => warn!("Skipping unusable pattern '{}': {}", pattern, e),
                    },
                    None => warn!("Skipping empty pattern in rule '{}'", rule.style),
                }
            }
        }

        Self {
            domains,
            patterns,
            known_styles,
            targets,
            policy,
            default_style: default_style.map(String::into_boxed_str),
        }
    }

    /// Matcher with no rules; only the default step can ever produce a hit.
    pub fn empty(policy: Vec<MatchStep>, default_style: Option<String>) -> Self {
        Self::new(&[], policy, default_style)
    }

    pub fn rule_count(&self) -> usize {
        self.targets.len()
    }

    fn target(&self, idx: usize) -> Resolution {
        let (style, fonts) = &self.targets[idx];
        Resolution {
            style: style.to_string(),
            fonts: *fonts,
        }
    }

    fn check_exact(&self, hostname: &str, url: Option<&str>) -> Option<Resolution> {
        if let Some(&idx) = self.domains.get(hostname) {
            return Some(self.target(idx));
        }
        for (pattern, idx) in &self.patterns {
            let hit = match pattern {
                CompiledPattern::Host(re) => re.is_match(hostname),
                CompiledPattern::Url(re) => url.is_some_and(|u| re.is_match(u)),
            };
            if hit {
                return Some(self.target(*idx));
            }
        }
        None
    }

    /// Iterative suffix match: strip leading labels until the remainder is
    /// a configured domain. The first hit while stripping downward is the
    /// longest configured suffix, so the most specific rule wins regardless
    /// of rule order.
    fn check_suffix(&self, hostname: &str) -> Option<Resolution> {
        let mut part = hostname;
        while let Some(dot) = part.find('.') {
            part = &part[dot + 1..];
            if part.is_empty() {
                break;
            }
            if let Some(&idx) = self.domains.get(part) {
                return Some(self.target(idx));
            }
        }
        None
    }

    fn check_heuristic(&self, hostname: &str) -> Option<Resolution> {
        let label = main_domain(hostname)?;
        let fonts = *self.known_styles.get(label)?;
        Some(Resolution {
            style: label.to_string(),
            fonts,
        })
    }

    fn check_default(&self) -> Option<Resolution> {
        self.default_style.as_deref().map(|style| Resolution {
            style: style.to_string(),
            fonts: false,
        })
    }
}

impl StyleMatcher for RuleMatcher {
    fn resolve(&self, hostname: &str, url: Option<&str>) -> Option<Resolution> {
        let hostname = hostname.trim().to_ascii_lowercase();
        if hostname.is_empty() {
            return None;
        }

        for step in &self.policy {
            let hit = match step {
                MatchStep::Exact => self.check_exact(&hostname, url),
                MatchStep::Suffix => self.check_suffix(&hostname),
                MatchStep::Heuristic => self.check_heuristic(&hostname),
                MatchStep::Default => self.check_default(),
            };
            if hit.is_some() {
                return hit;
            }
        }
        None
    }
}

enum PatternKind {
    Hostname(String),
    HostGlob(String),
    UrlGlob(String),
}

/// Normalizes a rule pattern. Userscript match patterns with a literal
/// host and a trivial path collapse to the bare hostname so they take
/// part in suffix matching; everything containing a wildcard stays a glob.
fn classify_pattern(pattern: &str) -> Option<PatternKind> {
    let pattern = pattern.trim();
    if pattern.is_empty() {
        return None;
    }

    if let Some(rest) = pattern.split_once("://").map(|(_, rest)| rest) {
        let (host, path) = match rest.find('/') {
            Some(slash) => (&rest[..slash], &rest[slash..]),
            None => (rest, ""),
        };
        if host.is_empty() {
            return None;
        }
        if !host.contains('*') && matches!(path, "" | "/" | "/*") {
            return Some(PatternKind::Hostname(host.to_lowercase()));
        }
        if path.is_empty() || path == "/*" {
            return Some(PatternKind::HostGlob(host.to_lowercase()));
        }
        return Some(PatternKind::UrlGlob(pattern.to_string()));
    }

    if pattern.contains('*') {
        Some(PatternKind::HostGlob(pattern.to_lowercase()))
    } else {
        Some(PatternKind::Hostname(pattern.to_lowercase()))
    }
}

/// Converts a wildcard glob to an anchored regex, escaping everything
/// except `*`, which expands to `.*`. Compiled case-insensitively so URL
/// globs match pages regardless of scheme or path casing.
fn glob_to_regex(glob: &str) -> Result<Regex, regex::Error> {
    let mut source = String::with_capacity(glob.len() + 12);
    source.push_str("(?i)^");
    for ch in glob.chars() {
        match ch {
            '*' => source.push_str(".*"),
            c if "\\.+?()[]{}|^$".contains(c) => {
                source.push('\\');
                source.push(c);
            }
            c => source.push(c),
        }
    }
    source.push('$');
    Regex::new(&source)
}
