use serde::Deserialize;
use std::path::PathBuf;

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub fetcher: FetcherConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Crawl scope and concurrency configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Site root all draw and match addresses are built from
    #[serde(rename = "base-url", default = "default_base_url")]
    pub base_url: String,

    /// Competition identifier used in draw addresses
    #[serde(rename = "competition-id")]
    pub competition_id: i64,

    /// Display name stored with the competition row
    #[serde(rename = "competition-name")]
    pub competition_name: String,

    /// Season years to crawl. Empty selects the most recent listed season.
    #[serde(default)]
    pub seasons: Vec<String>,

    /// Crawl every listed season, ignoring `seasons`
    #[serde(rename = "all-seasons", default)]
    pub all_seasons: bool,

    /// Maximum number of concurrent page fetches
    #[serde(rename = "max-concurrent-fetches", default = "default_max_fetches")]
    pub max_concurrent_fetches: u32,

    /// Timeout for a single fetch attempt (seconds)
    #[serde(rename = "fetch-timeout-secs", default = "default_fetch_timeout")]
    pub fetch_timeout_secs: u64,
}

/// Which fetcher implementation renders pages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FetcherMode {
    /// Headless Chromium dumping the rendered DOM
    #[default]
    Browser,
    /// Plain HTTP GET, for sources that are already rendered
    Http,
}

/// Fetcher configuration
#[derive(Debug, Clone, Deserialize)]
pub struct FetcherConfig {
    #[serde(default)]
    pub mode: FetcherMode,

    /// Path to the Chromium/Chrome executable
    #[serde(rename = "browser-path", default = "default_browser_path")]
    pub browser_path: PathBuf,

    /// Time a loaded page is given to run its scripts before interaction (milliseconds)
    #[serde(rename = "render-budget-ms", default = "default_render_budget")]
    pub render_budget_ms: u64,

    /// User agent sent by the HTTP fetcher
    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,
}

/// Record store configuration
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file
    pub path: String,

    /// Size of the connection pool
    #[serde(rename = "max-connections", default = "default_max_connections")]
    pub max_connections: u32,

    /// Wall-clock budget for establishing a connection under contention
    #[serde(rename = "connect-deadline-secs", default = "default_connect_deadline")]
    pub connect_deadline_secs: u64,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Where the JSON dump of the crawled tree is written
    #[serde(rename = "dump-path", default = "default_dump_path")]
    pub dump_path: String,

    /// How often progress counters are logged (seconds)
    #[serde(rename = "progress-interval-secs", default = "default_progress_interval")]
    pub progress_interval_secs: u64,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            mode: FetcherMode::default(),
            browser_path: default_browser_path(),
            render_budget_ms: default_render_budget(),
            user_agent: default_user_agent(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dump_path: default_dump_path(),
            progress_interval_secs: default_progress_interval(),
        }
    }
}

fn default_base_url() -> String {
    "https://www.nrl.com".to_string()
}

fn default_max_fetches() -> u32 {
    10
}

fn default_fetch_timeout() -> u64 {
    60
}

fn default_browser_path() -> PathBuf {
    PathBuf::from("chromium")
}

fn default_render_budget() -> u64 {
    5000
}

fn default_user_agent() -> String {
    concat!("nrl-harvest/", env!("CARGO_PKG_VERSION")).to_string()
}

fn default_max_connections() -> u32 {
    8
}

fn default_connect_deadline() -> u64 {
    60
}

fn default_dump_path() -> String {
    "./output/results.json".to_string()
}

fn default_progress_interval() -> u64 {
    5
}
