use serde::Deserialize;

/// Main configuration structure for Atelier-Rank
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub crawl: CrawlConfig,
    #[serde(default)]
    pub enrich: EnrichConfig,
    #[serde(default)]
    pub scoring: ScoringConfig,
    #[serde(default)]
    pub discovery: DiscoveryConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub storage: StorageConfig,
    #[serde(default)]
    pub seeds: Vec<SeedEntry>,
}

/// Fetch client behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct FetchConfig {
    /// Minimum time between requests to the same host (milliseconds)
    #[serde(rename = "min-delay-ms", default = "default_min_delay_ms")]
    pub min_delay_ms: u64,

    /// Maximum retry attempts for transient failures
    #[serde(rename = "max-retries", default = "default_max_retries")]
    pub max_retries: u32,

    /// Request timeout (seconds)
    #[serde(rename = "timeout-secs", default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Connect timeout (seconds)
    #[serde(rename = "connect-timeout-secs", default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

/// Backfill crawl configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlConfig {
    /// Hard ceiling on listing pages walked per parent
    #[serde(rename = "page-cap", default = "default_page_cap")]
    pub page_cap: u32,

    /// Number of parents processed concurrently
    #[serde(default = "default_workers")]
    pub workers: u32,
}

/// Enrichment scheduler configuration
#[derive(Debug, Clone, Deserialize)]
pub struct EnrichConfig {
    /// Per-class budget for due-item selection
    #[serde(default = "default_budget")]
    pub budget: u32,

    /// Cooldown before a hidden-ratings item is revisited (days)
    #[serde(rename = "hidden-cooldown-days", default = "default_seven_days")]
    pub hidden_cooldown_days: i64,

    /// Age after which a settled item becomes stale (days)
    #[serde(rename = "stale-after-days", default = "default_seven_days")]
    pub stale_after_days: i64,

    /// Number of items enriched concurrently
    #[serde(default = "default_workers")]
    pub workers: u32,
}

/// Scoring configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ScoringConfig {
    /// Minimum-votes prior `m` in the Bayesian average
    #[serde(rename = "min-votes-prior", default = "default_min_votes_prior")]
    pub min_votes_prior: u32,

    /// Fallback mean used when the system has no rated items yet
    #[serde(rename = "prior-mean", default = "default_prior_mean")]
    pub prior_mean: f64,
}

/// Discovery source configuration
#[derive(Debug, Clone, Deserialize)]
pub struct DiscoveryConfig {
    /// RSS/Atom release feeds to poll
    #[serde(default)]
    pub feeds: Vec<String>,

    /// Storefront browse/listing pages to walk for discovery
    #[serde(rename = "browse-pages", default)]
    pub browse_pages: Vec<String>,

    /// Page ceiling per browse source
    #[serde(rename = "browse-page-cap", default = "default_browse_page_cap")]
    pub browse_page_cap: u32,
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the scraper
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the scraper
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the scraper
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for scraper-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

/// Storage configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,
}

/// Seed creator entry
#[derive(Debug, Clone, Deserialize)]
pub struct SeedEntry {
    /// Creator handle (unique)
    pub handle: String,

    /// Canonical profile URL
    #[serde(rename = "profile-url")]
    pub profile_url: String,
}

impl UserAgentConfig {
    /// Formats the User-Agent header value:
    /// `Name/Version (+ContactURL; ContactEmail)`
    pub fn header_value(&self) -> String {
        format!(
            "{}/{} (+{}; {})",
            self.crawler_name, self.crawler_version, self.contact_url, self.contact_email
        )
    }
}

fn default_min_delay_ms() -> u64 {
    2000
}

fn default_max_retries() -> u32 {
    3
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_page_cap() -> u32 {
    50
}

fn default_workers() -> u32 {
    4
}

fn default_budget() -> u32 {
    100
}

fn default_seven_days() -> i64 {
    7
}

fn default_min_votes_prior() -> u32 {
    10
}

fn default_prior_mean() -> f64 {
    3.5
}

fn default_browse_page_cap() -> u32 {
    3
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            min_delay_ms: default_min_delay_ms(),
            max_retries: default_max_retries(),
            timeout_secs: default_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            page_cap: default_page_cap(),
            workers: default_workers(),
        }
    }
}

impl Default for EnrichConfig {
    fn default() -> Self {
        Self {
            budget: default_budget(),
            hidden_cooldown_days: default_seven_days(),
            stale_after_days: default_seven_days(),
            workers: default_workers(),
        }
    }
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            min_votes_prior: default_min_votes_prior(),
            prior_mean: default_prior_mean(),
        }
    }
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            feeds: Vec::new(),
            browse_pages: Vec::new(),
            browse_page_cap: default_browse_page_cap(),
        }
    }
}
