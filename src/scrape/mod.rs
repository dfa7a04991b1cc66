// src/scrape/mod.rs
// Browser-automation seam for sources that need page rendering.
//
// The rendering engine is a capability, not a dependency: scrapers talk to
// `PageRenderer`/`PageSession` and never to a concrete engine. The default
// `HttpRenderer` fetches server-rendered HTML over plain HTTP; a headless
// browser implementation slots in behind the same traits.

pub mod metaschool;
pub mod playhouse;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Navigation timeout applied by the default renderer.
const NAVIGATION_TIMEOUT: Duration = Duration::from_secs(30);
/// Navigation attempts before the error propagates to the fetch boundary.
const MAX_NAV_RETRIES: u32 = 3;

#[async_trait::async_trait]
pub trait PageRenderer: Send + Sync {
    /// Acquire a fresh session. Sessions are scoped to one fetch and
    /// released on all paths.
    async fn open(&self) -> Result<Box<dyn PageSession>>;
}

#[async_trait::async_trait]
pub trait PageSession: Send {
    /// Navigate and return the rendered HTML.
    async fn navigate(&mut self, url: &str) -> Result<String>;
    async fn close(&mut self) -> Result<()>;
}

/// Default renderer: one shared reqwest client, no JS execution.
pub struct HttpRenderer {
    client: reqwest::Client,
}

impl HttpRenderer {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(NAVIGATION_TIMEOUT)
            .user_agent(concat!("jobmesh-aggregator/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("building scrape http client")?;
        Ok(Self { client })
    }
}

#[async_trait::async_trait]
impl PageRenderer for HttpRenderer {
    async fn open(&self) -> Result<Box<dyn PageSession>> {
        Ok(Box::new(HttpSession {
            client: self.client.clone(),
        }))
    }
}

struct HttpSession {
    client: reqwest::Client,
}

#[async_trait::async_trait]
impl PageSession for HttpSession {
    async fn navigate(&mut self, url: &str) -> Result<String> {
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("navigating to {}", url))?
            .error_for_status()
            .with_context(|| format!("navigation status for {}", url))?;
        resp.text().await.context("reading page body")
    }

    async fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Shared scraping plumbing: per-source inter-request delay, navigation
/// retry with linearly increasing backoff, and session acquire/release
/// around every page fetch. The last-request timestamp belongs to this
/// client alone; scrapers for different sources never contend on it.
pub struct ScrapeClient {
    renderer: Arc<dyn PageRenderer>,
    min_delay: Duration,
    last_request: Mutex<Option<Instant>>,
}

impl ScrapeClient {
    pub fn new(renderer: Arc<dyn PageRenderer>, min_delay: Duration) -> Self {
        Self {
            renderer,
            min_delay,
            last_request: Mutex::new(None),
        }
    }

    /// Fetch one page through a scoped session. The session is closed on
    /// success and on every error path.
    pub async fn fetch_page(&self, url: &str) -> Result<String> {
        self.wait_if_needed().await;

        let mut session = self
            .renderer
            .open()
            .await
            .context("opening scrape session")?;
        let result = self.navigate_with_retry(session.as_mut(), url).await;
        if let Err(e) = session.close().await {
            tracing::warn!(error = ?e, url, "scrape session close failed");
        }
        result
    }

    async fn wait_if_needed(&self) {
        let mut last = self.last_request.lock().await;
        if let Some(prev) = *last {
            let elapsed = prev.elapsed();
            if elapsed < self.min_delay {
                tokio::time::sleep(self.min_delay - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }

    async fn navigate_with_retry(
        &self,
        session: &mut dyn PageSession,
        url: &str,
    ) -> Result<String> {
        let mut attempt = 0u32;
        loop {
            match session.navigate(url).await {
                Ok(html) => return Ok(html),
                Err(e) => {
                    attempt += 1;
                    if attempt >= MAX_NAV_RETRIES {
                        return Err(e)
                            .with_context(|| format!("navigation failed after {} attempts", attempt));
                    }
                    tracing::info!(url, attempt, max = MAX_NAV_RETRIES, "navigation retry");
                    tokio::time::sleep(Duration::from_secs(u64::from(attempt))).await;
                }
            }
        }
    }
}
