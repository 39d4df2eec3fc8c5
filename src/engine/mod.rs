mod manager;
mod matcher;
mod traits;

pub use manager::{parse_domain_config, strip_jsonp, RemoteConfigManager};
pub use matcher::{main_domain, parse_policy, DomainRule, MatchStep, Resolution, RuleMatcher};
pub use traits::{ConfigManager, StyleMatcher};
