// src/scrape/playhouse.rs
// Playhouse lists business-automation agents as anchor cards with an
// h2/h3 title and a short paragraph. Prices, when present, appear as
// dollar amounts in the card text.

use anyhow::Result;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::connectors::{apply_filter, Connector};
use crate::listing::{Listing, ListingFilter};
use crate::normalize::{
    classify, derived_id, normalize_text, normalize_title, parse_compensation,
};
use crate::scrape::ScrapeClient;

const BASE_URL: &str = "https://playhouse.bot";

static RE_CARD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?is)<a\s[^>]*href="([^"]+)"[^>]*>(.*?)</a>"#).unwrap());
static RE_TITLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<h[23][^>]*>(.*?)</h[23]>").unwrap());
static RE_DESC: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<p[^>]*>(.*?)</p>").unwrap());
static RE_PRICE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\$\s*\d[\d,.]*").unwrap());

pub struct PlayhouseScraper {
    client: ScrapeClient,
    base_url: String,
}

impl PlayhouseScraper {
    pub fn new(client: ScrapeClient) -> Self {
        Self {
            client,
            base_url: BASE_URL.to_string(),
        }
    }

    /// Extraction strategy for the agents index page.
    fn extract(&self, html: &str) -> Vec<Listing> {
        let mut out = Vec::new();
        for card in RE_CARD.captures_iter(html) {
            let href = card.get(1).map(|m| m.as_str()).unwrap_or_default();
            let inner = card.get(2).map(|m| m.as_str()).unwrap_or_default();

            let title = match RE_TITLE.captures(inner) {
                Some(t) => normalize_title(t.get(1).map(|m| m.as_str()).unwrap_or_default()),
                None => continue,
            };
            if title.is_empty() {
                continue;
            }

            let description = RE_DESC
                .captures(inner)
                .map(|d| normalize_text(d.get(1).map(|m| m.as_str()).unwrap_or_default()))
                .filter(|d| !d.is_empty())
                .unwrap_or_else(|| "Business automation agent".to_string());

            let url = if href.starts_with("http") {
                href.to_string()
            } else {
                format!("{}{}", self.base_url, href)
            };

            let compensation = RE_PRICE
                .find(inner)
                .map(|m| parse_compensation(m.as_str()))
                .unwrap_or_else(|| crate::listing::Compensation::zero("USD"));

            let tags = vec!["business-automation".to_string()];
            out.push(Listing {
                id: derived_id(self.name(), &url, &title),
                source: self.name().to_string(),
                category: classify(&title, &description, &tags),
                compensation,
                posted_at: chrono::Utc::now(),
                url,
                title,
                description,
                tags,
            });
        }
        out
    }
}

#[async_trait::async_trait]
impl Connector for PlayhouseScraper {
    fn name(&self) -> &'static str {
        "playhouse"
    }

    async fn fetch_raw(&self, filter: &ListingFilter) -> Result<Vec<Listing>> {
        let html = self
            .client
            .fetch_page(&format!("{}/agents", self.base_url))
            .await?;
        let listings = self.extract(&html);
        tracing::debug!(source = self.name(), found = listings.len(), "scrape extracted");
        Ok(apply_filter(self.name(), listings, filter))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scrape::{PageRenderer, PageSession};
    use std::sync::Arc;
    use std::time::Duration;

    const PAGE: &str = r#"
        <main>
          <a class="card" href="/agents/invoice-bot">
            <h3>Invoice Reconciliation Agent</h3>
            <p>Matches invoices to payments nightly. From $29/month.</p>
          </a>
          <a class="card" href="https://playhouse.bot/agents/support">
            <h2>Support &amp; Inbox Assistant</h2>
            <p>Triages your support inbox.</p>
          </a>
          <a class="nav" href="/pricing">Pricing</a>
        </main>"#;

    struct StaticRenderer(String);
    struct StaticSession(String);

    #[async_trait::async_trait]
    impl PageRenderer for StaticRenderer {
        async fn open(&self) -> Result<Box<dyn PageSession>> {
            Ok(Box::new(StaticSession(self.0.clone())))
        }
    }

    #[async_trait::async_trait]
    impl PageSession for StaticSession {
        async fn navigate(&mut self, _url: &str) -> Result<String> {
            Ok(self.0.clone())
        }
        async fn close(&mut self) -> Result<()> {
            Ok(())
        }
    }

    fn scraper_for(page: &str) -> PlayhouseScraper {
        let client = ScrapeClient::new(
            Arc::new(StaticRenderer(page.to_string())),
            Duration::from_millis(0),
        );
        PlayhouseScraper::new(client)
    }

    #[tokio::test]
    async fn extracts_titled_cards_only() {
        let out = scraper_for(PAGE)
            .fetch_raw(&ListingFilter::default())
            .await
            .unwrap();
        assert_eq!(out.len(), 2);

        assert_eq!(out[0].title, "Invoice Reconciliation Agent");
        assert_eq!(out[0].url, "https://playhouse.bot/agents/invoice-bot");
        assert_eq!(out[0].compensation.min, 29.0);

        assert_eq!(out[1].title, "Support & Inbox Assistant");
        assert!(out[1].compensation.is_unpriced());
    }

    #[tokio::test]
    async fn ids_are_stable_across_scrapes() {
        let a = scraper_for(PAGE)
            .fetch_raw(&ListingFilter::default())
            .await
            .unwrap();
        let b = scraper_for(PAGE)
            .fetch_raw(&ListingFilter::default())
            .await
            .unwrap();
        assert_eq!(a[0].id, b[0].id);
    }
}
