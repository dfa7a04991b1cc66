// src/scrape/metaschool.rs
// Metaschool's marketplace renders agents and tools as cards with an
// optional category badge; listings are unpriced.

use anyhow::Result;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::connectors::{apply_filter, Connector};
use crate::listing::{Compensation, Listing, ListingFilter};
use crate::normalize::{classify, derived_id, normalize_text, normalize_title};
use crate::scrape::ScrapeClient;

const BASE_URL: &str = "https://metaschool.so";

static RE_CARD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)<div[^>]*class="[^"]*card[^"]*"[^>]*>(.*?)</div>"#).unwrap()
});
static RE_TITLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<h[23][^>]*>(.*?)</h[23]>").unwrap());
static RE_DESC: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<p[^>]*>(.*?)</p>").unwrap());
static RE_LINK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?is)<a\s[^>]*href="([^"]+)""#).unwrap());
static RE_BADGE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)<span[^>]*class="[^"]*(?:category|type)[^"]*"[^>]*>(.*?)</span>"#).unwrap()
});

pub struct MetaschoolScraper {
    client: ScrapeClient,
    base_url: String,
}

impl MetaschoolScraper {
    pub fn new(client: ScrapeClient) -> Self {
        Self {
            client,
            base_url: BASE_URL.to_string(),
        }
    }

    fn extract(&self, html: &str) -> Vec<Listing> {
        let mut out = Vec::new();
        for card in RE_CARD.captures_iter(html) {
            let inner = card.get(1).map(|m| m.as_str()).unwrap_or_default();

            let title = match RE_TITLE.captures(inner) {
                Some(t) => normalize_title(t.get(1).map(|m| m.as_str()).unwrap_or_default()),
                None => continue,
            };
            let href = match RE_LINK.captures(inner) {
                Some(l) => l.get(1).map(|m| m.as_str()).unwrap_or_default().to_string(),
                None => continue,
            };
            if title.is_empty() || href.is_empty() {
                continue;
            }

            let description = RE_DESC
                .captures(inner)
                .map(|d| normalize_text(d.get(1).map(|m| m.as_str()).unwrap_or_default()))
                .filter(|d| !d.is_empty())
                .unwrap_or_else(|| "AI agent or automation tool".to_string());

            let url = if href.starts_with("http") {
                href
            } else {
                format!("{}{}", self.base_url, href)
            };

            let mut tags = vec!["automation".to_string(), "tools".to_string()];
            if let Some(badge) = RE_BADGE.captures(inner) {
                let b = normalize_text(badge.get(1).map(|m| m.as_str()).unwrap_or_default());
                if !b.is_empty() {
                    tags.insert(0, b);
                }
            }

            out.push(Listing {
                id: derived_id(self.name(), &url, &title),
                source: self.name().to_string(),
                category: classify(&title, &description, &tags),
                compensation: Compensation::zero("USD"),
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
impl Connector for MetaschoolScraper {
    fn name(&self) -> &'static str {
        "metaschool"
    }

    async fn fetch_raw(&self, filter: &ListingFilter) -> Result<Vec<Listing>> {
        let html = self
            .client
            .fetch_page(&format!("{}/ai-agents", self.base_url))
            .await?;
        let listings = self.extract(&html);
        tracing::debug!(source = self.name(), found = listings.len(), "scrape extracted");
        Ok(apply_filter(self.name(), listings, filter))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::listing::Category;
    use crate::scrape::{PageRenderer, PageSession};
    use std::sync::Arc;
    use std::time::Duration;

    const PAGE: &str = r#"
        <div class="grid">
          <div class="agent-card">
            <span class="badge category">Data</span>
            <h3>CSV Analysis Agent</h3>
            <p>Uploads, profiles and charts your datasets.</p>
            <a href="/ai-agents/csv-analyst">Open</a>
          </div>
          <div class="card tool">
            <h2>Prompt Library</h2>
            <a href="https://metaschool.so/tools/prompts"></a>
          </div>
          <div class="card broken"><p>no title, skipped</p></div>
        </div>"#;

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

    #[tokio::test]
    async fn extracts_cards_with_title_and_link() {
        let client = ScrapeClient::new(
            Arc::new(StaticRenderer(PAGE.to_string())),
            Duration::from_millis(0),
        );
        let out = MetaschoolScraper::new(client)
            .fetch_raw(&ListingFilter::default())
            .await
            .unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].title, "CSV Analysis Agent");
        assert_eq!(out[0].category, Category::Data);
        assert_eq!(out[0].tags[0], "Data");
        assert_eq!(out[1].description, "AI agent or automation tool");
    }
}
