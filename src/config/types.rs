use serde::Deserialize;

/// Main configuration structure for Regatlas
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub scope: ScopeConfig,
    pub storage: StorageConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default, rename = "acronym")]
    pub acronyms: Vec<AcronymEntry>,
}

/// Crawl budgets and politeness settings
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Address the breadth-first traversal starts from
    #[serde(rename = "root-url")]
    pub root_url: String,

    /// Maximum number of documents committed in one run
    #[serde(rename = "max-pages")]
    pub max_pages: u32,

    /// Maximum BFS distance from the root
    #[serde(rename = "max-depth")]
    pub max_depth: u32,

    /// Wall-clock budget for one run (seconds)
    #[serde(rename = "timeout-secs")]
    pub timeout_secs: u64,

    /// Delay held between successive fetches (milliseconds)
    #[serde(rename = "request-delay-ms")]
    pub request_delay_ms: u64,
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,
}

/// Which links are part of the document tree
#[derive(Debug, Clone, Deserialize)]
pub struct ScopeConfig {
    /// Domain pattern (e.g., "example.com" or "*.example.com")
    #[serde(rename = "allowed-domain")]
    pub allowed_domain: String,

    /// Path prefix every followed link must start with
    #[serde(rename = "allowed-path-prefix", default = "default_path_prefix")]
    pub allowed_path_prefix: String,

    /// Regexes matched against anchor text; matching links are dropped
    #[serde(rename = "skip-anchor-patterns", default)]
    pub skip_anchor_patterns: Vec<String>,
}

/// Storage configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,
}

/// Excerpt and candidate policy for the retrieval engine
///
/// All fields are optional in the file; missing ones take the defaults below.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Excerpt window size in characters
    #[serde(rename = "window-size")]
    pub window_size: usize,

    /// Fraction of the window placed before the anchor
    #[serde(rename = "backward-bias")]
    pub backward_bias: f64,

    /// Shortest snippet segment accepted as an anchor (characters)
    #[serde(rename = "min-anchor-len")]
    pub min_anchor_len: usize,

    /// Anchor is truncated to this many characters before searching the body
    #[serde(rename = "anchor-max-len")]
    pub anchor_max_len: usize,

    /// Leading region skipped when no anchor can be located (characters)
    #[serde(rename = "boilerplate-skip")]
    pub boilerplate_skip: usize,

    /// Number of lexical candidates requested from the store
    #[serde(rename = "candidate-limit")]
    pub candidate_limit: usize,

    /// Number of candidates returned to the caller
    #[serde(rename = "result-limit")]
    pub result_limit: usize,

    /// Number of leading candidates that get a windowed excerpt of the full body
    #[serde(rename = "excerpt-top-n")]
    pub excerpt_top_n: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            window_size: 8000,
            backward_bias: 0.75,
            min_anchor_len: 10,
            anchor_max_len: 80,
            boilerplate_skip: 800,
            candidate_limit: 10,
            result_limit: 5,
            excerpt_top_n: 2,
        }
    }
}

/// Additional entry for the acronym expansion table
#[derive(Debug, Clone, Deserialize)]
pub struct AcronymEntry {
    /// The acronym as it appears in queries (matched case-sensitively)
    pub short: String,

    /// Text appended after the acronym
    pub expansion: String,
}

fn default_path_prefix() -> String {
    "/".to_string()
}
