//! Crawler module for page fetching and crawl orchestration
//!
//! This module contains the core crawling logic, including:
//! - Page fetchers behind the `Fetcher` trait
//! - Fetch and connection retry policies
//! - The fetch gate limiting concurrent fetches
//! - Progress counters and their periodic reporter
//! - The recursive crawl coordinator

mod coordinator;
mod fetcher;
mod gate;
mod progress;
mod retry;

pub use coordinator::{
    draw_address, index_rounds, run_crawl, select_seasons, Coordinator, CrawlReport,
};
pub use fetcher::{
    build_fetcher, run_script, BrowserFetcher, FetchError, FetchRequest, Fetcher, HttpFetcher,
    Interaction, PageDriver, StaticFetcher,
};
pub use gate::{FetchGate, FetchSlot};
pub use progress::{spawn_reporter, ProgressTracker, UnitGuard};
pub use retry::{fetch_with_retry, ConnectRetry, REQUIRED_FETCH_ATTEMPTS};
