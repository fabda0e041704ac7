use crate::config::ScopeConfig;
use crate::ConfigError;
use regex::Regex;
use url::Url;

/// Checks if a domain matches a wildcard pattern
///
/// This function supports two types of patterns:
/// 1. Exact match: "example.com" matches only "example.com"
/// 2. Wildcard match: "*.example.com" matches the bare domain and any
///    subdomain at any depth
///
/// # Examples
///
/// ```
/// use regatlas::url::matches_wildcard;
///
/// assert!(matches_wildcard("example.com", "example.com"));
/// assert!(!matches_wildcard("example.com", "other.com"));
///
/// assert!(matches_wildcard("*.example.com", "example.com"));
/// assert!(matches_wildcard("*.example.com", "api.v2.example.com"));
/// assert!(!matches_wildcard("*.example.com", "example.org"));
/// ```
pub fn matches_wildcard(pattern: &str, candidate: &str) -> bool {
    if let Some(base) = pattern.strip_prefix("*.") {
        candidate == base || candidate.ends_with(&format!(".{}", base))
    } else {
        candidate == pattern
    }
}

/// The part of the web a crawl is allowed to follow
///
/// A link is in scope when its host matches the domain pattern and its path
/// starts with the configured prefix. Anchor texts matching one of the skip
/// patterns are dropped regardless of address.
#[derive(Debug, Clone)]
pub struct CrawlScope {
    domain_pattern: String,
    path_prefix: String,
    skip_anchors: Vec<Regex>,
}

impl CrawlScope {
    /// Creates a scope with no skip patterns
    pub fn new(domain_pattern: impl Into<String>, path_prefix: impl Into<String>) -> Self {
        Self {
            domain_pattern: domain_pattern.into().to_lowercase(),
            path_prefix: path_prefix.into(),
            skip_anchors: Vec::new(),
        }
    }

    /// Builds the scope from configuration, compiling the skip patterns
    pub fn from_config(config: &ScopeConfig) -> Result<Self, ConfigError> {
        let skip_anchors = config
            .skip_anchor_patterns
            .iter()
            .map(|p| {
                Regex::new(p)
                    .map_err(|e| ConfigError::InvalidPattern(format!("skip pattern '{}': {}", p, e)))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            skip_anchors,
            ..Self::new(
                config.allowed_domain.clone(),
                config.allowed_path_prefix.clone(),
            )
        })
    }

    /// Adds an anchor text pattern whose links are never followed
    pub fn with_skip_anchor(mut self, pattern: Regex) -> Self {
        self.skip_anchors.push(pattern);
        self
    }

    /// Returns true if the address lies inside the crawl scope
    pub fn contains(&self, url: &Url) -> bool {
        let host = match url.host_str() {
            Some(host) => host.to_lowercase(),
            None => return false,
        };

        matches_wildcard(&self.domain_pattern, &host) && url.path().starts_with(&self.path_prefix)
    }

    /// Returns true if a link with this anchor text must be dropped
    pub fn skips_anchor(&self, anchor_text: &str) -> bool {
        self.skip_anchors.iter().any(|re| re.is_match(anchor_text))
    }
}
