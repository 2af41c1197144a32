use serde::Deserialize;

/// Main configuration structure for site-audit
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub crawler: CrawlerConfig,
    pub http: HttpConfig,
    pub output: OutputConfig,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct CrawlerConfig {
    /// Maximum number of URLs processed in one crawl
    pub crawl_limit: u64,

    /// Number of concurrent worker loops
    pub workers: usize,

    /// Upper bound of the randomized delay before each request (milliseconds)
    pub max_delay_ms: u64,

    /// Crawl URLs even when robots.txt disallows them
    pub ignore_robots_txt: bool,

    /// Follow links marked rel="nofollow" and pages with a nofollow robots directive
    pub follow_nofollow: bool,

    /// Emit results for pages carrying a noindex robots directive
    pub include_noindex: bool,

    /// Fetch sitemaps to tag pages as "in sitemap"
    pub crawl_sitemap: bool,

    /// Treat strict subdomains of the seed host as part of the site
    pub allow_subdomains: bool,

    /// Issue HEAD requests for links leaving the site
    pub check_external_links: bool,

    /// Period between status snapshots (milliseconds)
    pub status_interval_ms: u64,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            crawl_limit: 500,
            workers: 2,
            max_delay_ms: 300,
            ignore_robots_txt: false,
            follow_nofollow: false,
            include_noindex: false,
            crawl_sitemap: true,
            allow_subdomains: false,
            check_external_links: false,
            status_interval_ms: 1000,
        }
    }
}

/// HTTP client configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct HttpConfig {
    /// User-Agent header sent with every request, also used for robots.txt matching
    pub user_agent: String,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Maximum number of redirects followed per request
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,

    /// Optional HTTP basic auth credentials
    #[serde(default)]
    pub basic_auth: Option<BasicAuth>,
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_redirects() -> usize {
    5
}

/// HTTP basic auth credentials
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct BasicAuth {
    pub username: String,
    pub password: String,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,
}

impl HttpConfig {
    /// Builds an HTTP config with default timeouts for the given user agent
    pub fn with_user_agent(user_agent: &str) -> Self {
        Self {
            user_agent: user_agent.to_string(),
            timeout_secs: default_timeout_secs(),
            max_redirects: default_max_redirects(),
            basic_auth: None,
        }
    }
}
