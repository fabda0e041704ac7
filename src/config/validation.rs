use crate::config::types::{
    AcronymEntry, Config, CrawlerConfig, RetrievalConfig, ScopeConfig, StorageConfig,
    UserAgentConfig,
};
use crate::url::matches_wildcard;
use crate::ConfigError;
use regex::Regex;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_scope_config(&config.scope)?;
    validate_crawler_config(&config.crawler, &config.scope)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_storage_config(&config.storage)?;
    validate_retrieval_config(&config.retrieval)?;
    validate_acronyms(&config.acronyms)?;
    Ok(())
}

/// Validates crawl budgets and the root address
fn validate_crawler_config(config: &CrawlerConfig, scope: &ScopeConfig) -> Result<(), ConfigError> {
    if config.max_pages < 1 {
        return Err(ConfigError::Validation(format!(
            "max_pages must be >= 1, got {}",
            config.max_pages
        )));
    }

    if config.timeout_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "timeout_secs must be >= 1, got {}",
            config.timeout_secs
        )));
    }

    let root = Url::parse(&config.root_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid root_url: {}", e)))?;

    if root.scheme() != "http" && root.scheme() != "https" {
        return Err(ConfigError::Validation(format!(
            "root_url '{}' must use http or https",
            config.root_url
        )));
    }

    let host = root.host_str().map(|h| h.to_lowercase()).unwrap_or_default();
    if !matches_wildcard(&scope.allowed_domain, &host)
        || !root.path().starts_with(&scope.allowed_path_prefix)
    {
        return Err(ConfigError::Validation(format!(
            "root_url '{}' is outside the configured scope",
            config.root_url
        )));
    }

    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler_name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "crawler_name must contain only alphanumeric characters and hyphens, got '{}'",
            config.crawler_name
        )));
    }

    Url::parse(&config.contact_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact_url: {}", e)))?;

    Ok(())
}

/// Validates the crawl scope
fn validate_scope_config(config: &ScopeConfig) -> Result<(), ConfigError> {
    validate_domain_pattern(&config.allowed_domain)?;

    if !config.allowed_path_prefix.starts_with('/') {
        return Err(ConfigError::InvalidPattern(format!(
            "allowed_path_prefix must start with '/', got '{}'",
            config.allowed_path_prefix
        )));
    }

    for pattern in &config.skip_anchor_patterns {
        Regex::new(pattern).map_err(|e| {
            ConfigError::InvalidPattern(format!("skip pattern '{}': {}", pattern, e))
        })?;
    }

    Ok(())
}

fn validate_storage_config(config: &StorageConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database_path cannot be empty".to_string(),
        ));
    }
    Ok(())
}

/// Validates the excerpt policy constants
fn validate_retrieval_config(config: &RetrievalConfig) -> Result<(), ConfigError> {
    if config.window_size == 0 {
        return Err(ConfigError::Validation(
            "window_size must be > 0".to_string(),
        ));
    }

    if !(config.backward_bias > 0.0 && config.backward_bias < 1.0) {
        return Err(ConfigError::Validation(format!(
            "backward_bias must be in (0, 1), got {}",
            config.backward_bias
        )));
    }

    if config.min_anchor_len == 0 || config.min_anchor_len > config.anchor_max_len {
        return Err(ConfigError::Validation(format!(
            "min_anchor_len must be in 1..={}, got {}",
            config.anchor_max_len, config.min_anchor_len
        )));
    }

    if config.result_limit == 0
        || config.excerpt_top_n > config.result_limit
        || config.result_limit > config.candidate_limit
    {
        return Err(ConfigError::Validation(format!(
            "expected excerpt_top_n ({}) <= result_limit ({}) <= candidate_limit ({}) with result_limit > 0",
            config.excerpt_top_n, config.result_limit, config.candidate_limit
        )));
    }

    Ok(())
}

fn validate_acronyms(entries: &[AcronymEntry]) -> Result<(), ConfigError> {
    for entry in entries {
        if entry.short.trim().is_empty() || entry.expansion.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "acronym entries need both short and expansion, got '{}' -> '{}'",
                entry.short, entry.expansion
            )));
        }
    }
    Ok(())
}

/// Validates a domain pattern (supports wildcards)
fn validate_domain_pattern(pattern: &str) -> Result<(), ConfigError> {
    if pattern.is_empty() {
        return Err(ConfigError::InvalidPattern(
            "Domain pattern cannot be empty".to_string(),
        ));
    }

    let domain = pattern.strip_prefix("*.").unwrap_or(pattern);
    validate_domain_string(domain)
}

/// Validates a domain string (without wildcard prefix)
fn validate_domain_string(domain: &str) -> Result<(), ConfigError> {
    if domain.is_empty() {
        return Err(ConfigError::InvalidPattern(
            "Domain cannot be empty".to_string(),
        ));
    }

    if !domain
        .chars()
        .all(|c| c.is_alphanumeric() || c == '.' || c == '-')
    {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' contains invalid characters",
            domain
        )));
    }

    if domain.starts_with('.')
        || domain.ends_with('.')
        || domain.starts_with('-')
        || domain.ends_with('-')
    {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' cannot start or end with '.' or '-'",
            domain
        )));
    }

    if domain.contains("..") {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' cannot contain consecutive dots",
            domain
        )));
    }

    Ok(())
}
