//! Page fetchers
//!
//! This module defines the fetcher contract used by the crawler, plus:
//! - A headless browser fetcher that returns the rendered DOM
//! - A plain HTTP fetcher for sources that serve rendered markup
//! - A canned-content fetcher for tests and offline runs

use crate::config::{FetcherConfig, FetcherMode};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::Page;
use futures::StreamExt;
use reqwest::Client;
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::OnceCell;

/// Errors produced by a single fetch attempt
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Request timeout for {address} after {secs}s")]
    Timeout { address: String, secs: u64 },

    #[error("HTTP error for {address}: {source}")]
    Http {
        address: String,
        source: reqwest::Error,
    },

    #[error("HTTP {status} for {address}")]
    Status { address: String, status: u16 },

    #[error("Browser failed to render {address}: {message}")]
    Browser { address: String, message: String },

    #[error("No content available for {address}")]
    NotFound { address: String },

    #[error("Fetch cancelled for {address}")]
    Cancelled { address: String },

    #[error("Failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}

/// One step of scripted page interaction, run after the page is ready
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Interaction {
    /// Wait until an element matching the selector is visible
    WaitVisible(String),
    /// Click the first element matching the selector
    Click(String),
    /// Let the page run for a fixed time
    Sleep(Duration),
}

/// Address plus optional interaction script
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub address: String,
    pub script: Option<Vec<Interaction>>,
}

impl FetchRequest {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            script: None,
        }
    }

    pub fn with_script(mut self, script: Vec<Interaction>) -> Self {
        self.script = Some(script);
        self
    }
}

/// Source of fully rendered page content
///
/// Implementations perform a single attempt; retries and timeouts are
/// applied by the caller.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, request: &FetchRequest) -> Result<String, FetchError>;
}

/// Builds the fetcher selected by configuration
pub fn build_fetcher(config: &FetcherConfig) -> Result<Arc<dyn Fetcher>, FetchError> {
    Ok(match config.mode {
        FetcherMode::Browser => Arc::new(BrowserFetcher::new(
            config.browser_path.clone(),
            Duration::from_millis(config.render_budget_ms),
        )),
        FetcherMode::Http => Arc::new(HttpFetcher::new(&config.user_agent)?),
    })
}

/// Page operations an interaction script runs against
#[async_trait]
pub trait PageDriver: Send + Sync {
    /// Whether an element matching the selector is currently visible
    async fn is_visible(&self, selector: &str) -> Result<bool, String>;

    /// Clicks the first element matching the selector
    async fn click(&self, selector: &str) -> Result<(), String>;
}

/// Runs each step of `script` against the page, in order
///
/// `WaitVisible` polls until the element shows up; the caller's attempt
/// timeout bounds the wait.
pub async fn run_script<D>(driver: &D, script: &[Interaction]) -> Result<(), String>
where
    D: PageDriver + ?Sized,
{
    for step in script {
        match step {
            Interaction::WaitVisible(selector) => {
                while !driver.is_visible(selector).await? {
                    tokio::time::sleep(VISIBILITY_POLL).await;
                }
            }
            Interaction::Click(selector) => driver.click(selector).await?,
            Interaction::Sleep(duration) => tokio::time::sleep(*duration).await,
        }
    }
    Ok(())
}

const VISIBILITY_POLL: Duration = Duration::from_millis(100);

#[async_trait]
impl PageDriver for Page {
    async fn is_visible(&self, selector: &str) -> Result<bool, String> {
        let quoted = serde_json::to_string(selector).map_err(|e| e.to_string())?;
        let check = format!(
            "(() => {{ const el = document.querySelector({}); \
             return !!el && el.getClientRects().length > 0; }})()",
            quoted
        );

        self.evaluate(check)
            .await
            .map_err(|e| e.to_string())?
            .into_value::<bool>()
            .map_err(|e| e.to_string())
    }

    async fn click(&self, selector: &str) -> Result<(), String> {
        let element = self.find_element(selector).await.map_err(|e| e.to_string())?;
        element.click().await.map_err(|e| e.to_string())?;
        Ok(())
    }
}

/// Open tab that is closed even when the fetch future is dropped
struct OpenPage {
    page: Option<Page>,
    runtime: tokio::runtime::Handle,
}

impl OpenPage {
    fn new(page: Page) -> Self {
        Self {
            page: Some(page),
            runtime: tokio::runtime::Handle::current(),
        }
    }

    fn page(&self) -> Option<&Page> {
        self.page.as_ref()
    }

    async fn close(mut self) {
        if let Some(page) = self.page.take() {
            if let Err(e) = page.close().await {
                tracing::debug!("Failed to close browser tab: {}", e);
            }
        }
    }
}

impl Drop for OpenPage {
    fn drop(&mut self) {
        if let Some(page) = self.page.take() {
            self.runtime.spawn(async move {
                let _ = page.close().await;
            });
        }
    }
}

/// Renders pages in a shared headless Chromium over CDP
///
/// The browser is launched on first use. Each fetch opens a tab, waits for
/// the document body and the render budget, runs the interaction script,
/// and returns the serialized DOM.
pub struct BrowserFetcher {
    executable: PathBuf,
    render_budget: Duration,
    browser: OnceCell<Browser>,
}

impl fmt::Debug for BrowserFetcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BrowserFetcher")
            .field("executable", &self.executable)
            .field("render_budget", &self.render_budget)
            .field("launched", &self.browser.initialized())
            .finish()
    }
}

impl BrowserFetcher {
    pub fn new(executable: PathBuf, render_budget: Duration) -> Self {
        Self {
            executable,
            render_budget,
            browser: OnceCell::new(),
        }
    }

    async fn browser(&self) -> Result<&Browser, String> {
        self.browser
            .get_or_try_init(|| async {
                let config = BrowserConfig::builder()
                    .chrome_executable(&self.executable)
                    .arg("--disable-gpu")
                    .arg("--mute-audio")
                    .arg("--blink-settings=imagesEnabled=false")
                    .build()?;

                let (browser, mut handler) = Browser::launch(config).await.map_err(|e| {
                    format!("failed to launch {}: {}", self.executable.display(), e)
                })?;

                tokio::spawn(async move {
                    while let Some(event) = handler.next().await {
                        if let Err(e) = event {
                            tracing::debug!("Browser connection closed: {}", e);
                            break;
                        }
                    }
                });

                tracing::info!("Launched headless browser {}", self.executable.display());
                Ok(browser)
            })
            .await
    }

    async fn render(&self, request: &FetchRequest) -> Result<String, String> {
        let browser = self.browser().await?;
        let tab = OpenPage::new(
            browser
                .new_page(request.address.as_str())
                .await
                .map_err(|e| e.to_string())?,
        );
        let page = tab.page().ok_or("tab already closed")?;

        page.wait_for_navigation().await.map_err(|e| e.to_string())?;
        run_script(page, &[Interaction::WaitVisible("body".to_string())]).await?;
        tokio::time::sleep(self.render_budget).await;

        if let Some(script) = &request.script {
            run_script(page, script).await?;
        }

        let html = page.content().await.map_err(|e| e.to_string())?;
        tab.close().await;
        Ok(html)
    }
}

#[async_trait]
impl Fetcher for BrowserFetcher {
    async fn fetch(&self, request: &FetchRequest) -> Result<String, FetchError> {
        let html = self
            .render(request)
            .await
            .map_err(|message| FetchError::Browser {
                address: request.address.clone(),
                message,
            })?;

        if html.trim().is_empty() {
            return Err(FetchError::Browser {
                address: request.address.clone(),
                message: "empty document".to_string(),
            });
        }

        Ok(html)
    }
}

/// Fetches pages with a plain GET
///
/// Interaction scripts are ignored.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(user_agent: &str) -> Result<Self, FetchError> {
        let client = Client::builder()
            .user_agent(user_agent)
            .connect_timeout(Duration::from_secs(10))
            .gzip(true)
            .brotli(true)
            .build()
            .map_err(FetchError::Client)?;

        Ok(Self { client })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, request: &FetchRequest) -> Result<String, FetchError> {
        let address = &request.address;

        let response = self
            .client
            .get(address)
            .send()
            .await
            .map_err(|source| FetchError::Http {
                address: address.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                address: address.clone(),
                status: status.as_u16(),
            });
        }

        response.text().await.map_err(|source| FetchError::Http {
            address: address.clone(),
            source,
        })
    }
}

/// Serves canned content keyed by address
///
/// Addresses can be set to fail a number of times before succeeding (or
/// forever), and every attempt is counted.
#[derive(Debug, Default)]
pub struct StaticFetcher {
    pages: HashMap<String, String>,
    failures: HashMap<String, u32>,
    attempts: Mutex<HashMap<String, u32>>,
}

impl StaticFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serves `content` for `address`
    pub fn with_page(mut self, address: impl Into<String>, content: impl Into<String>) -> Self {
        self.pages.insert(address.into(), content.into());
        self
    }

    /// Fails the first `times` attempts on `address`
    pub fn failing(mut self, address: impl Into<String>, times: u32) -> Self {
        self.failures.insert(address.into(), times);
        self
    }

    /// Number of attempts made on `address` so far
    pub fn attempts(&self, address: &str) -> u32 {
        self.attempts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(address)
            .copied()
            .unwrap_or(0)
    }

    /// Total attempts over all addresses
    pub fn total_attempts(&self) -> u32 {
        self.attempts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .sum()
    }
}

#[async_trait]
impl Fetcher for StaticFetcher {
    async fn fetch(&self, request: &FetchRequest) -> Result<String, FetchError> {
        let address = &request.address;

        let attempt = {
            let mut attempts = self.attempts.lock().unwrap_or_else(PoisonError::into_inner);
            let count = attempts.entry(address.clone()).or_insert(0);
            *count += 1;
            *count
        };

        if attempt <= self.failures.get(address).copied().unwrap_or(0) {
            return Err(FetchError::Browser {
                address: address.clone(),
                message: format!("injected failure on attempt {}", attempt),
            });
        }

        self.pages
            .get(address)
            .cloned()
            .ok_or_else(|| FetchError::NotFound {
                address: address.clone(),
            })
    }
}
