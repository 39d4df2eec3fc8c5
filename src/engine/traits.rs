use super::matcher::Resolution;
use std::sync::Arc;

/// The "Hot Path" for mapping a page to its stylesheet.
pub trait StyleMatcher: Send + Sync {
    /// Returns the stylesheet to load for this page, or None to leave it
    /// unstyled. The full URL is only consulted by URL-glob rules.
    fn resolve(&self, hostname: &str, url: Option<&str>) -> Option<Resolution>;
}

/// The "Control Plane" that turns the remote domain config into a matcher.
#[async_trait::async_trait]
pub trait ConfigManager: Send + Sync {
    /// Fetches and parses the domain config and builds a new matcher.
    /// Never fails: an unreachable or malformed config yields an empty
    /// matcher, leaving pages unstyled.
    async fn refresh(&self) -> Arc<dyn StyleMatcher>;
}
