// src/connectors/clawtasks.rs
// ClawTasks: agent-to-agent bounty marketplace, JSON API at /api/bounties.
// Bounties are denominated in USDC with a single amount (min == max).

use anyhow::{Context, Result};
use serde_json::Value;

use super::{apply_filter, first_num, first_str, id_string, posted_at, string_array, Connector};
use crate::listing::{Compensation, Listing, ListingFilter};
use crate::normalize::{classify, normalize_text, normalize_title};

const BASE_URL: &str = "https://clawtasks.com";

pub struct ClawTasksConnector {
    mode: Mode,
}

enum Mode {
    /// Canned API payload, for tests.
    Fixture(String),
    Http {
        base_url: String,
        client: reqwest::Client,
    },
}

impl ClawTasksConnector {
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            mode: Mode::Http {
                base_url: BASE_URL.to_string(),
                client,
            },
        }
    }

    pub fn from_fixture(s: &str) -> Self {
        Self {
            mode: Mode::Fixture(s.to_string()),
        }
    }

    fn transform(&self, body: &str) -> Result<Vec<Listing>> {
        let data: Value = serde_json::from_str(body).context("parsing clawtasks response")?;
        let bounties = data
            .get("bounties")
            .and_then(|b| b.as_array())
            .cloned()
            .unwrap_or_default();

        let out = bounties
            .iter()
            // Only active bounties.
            .filter(|b| {
                matches!(
                    b.get("status").and_then(|s| s.as_str()),
                    Some("open") | Some("claimed")
                )
            })
            .filter_map(|b| {
                let id = id_string(b, &["id"])?;
                let title = normalize_title(&first_str(b, &["title"])?);
                let description =
                    normalize_text(&first_str(b, &["description"]).unwrap_or_default());
                let amount = first_num(b, &["amount"]).unwrap_or(0.0);
                let tags = string_array(b, &["tags"]);
                Some(Listing {
                    url: format!("{}/bounties/{}", BASE_URL, id),
                    id: format!("clawtasks-{}", id),
                    source: self.name().to_string(),
                    category: classify(&title, &description, &tags),
                    compensation: Compensation {
                        min: amount,
                        max: amount,
                        currency: "USDC".to_string(),
                    },
                    posted_at: posted_at(b, &["created_at"]),
                    title,
                    description,
                    tags,
                })
            })
            .collect();
        Ok(out)
    }
}

#[async_trait::async_trait]
impl Connector for ClawTasksConnector {
    fn name(&self) -> &'static str {
        "clawtasks"
    }

    async fn fetch_raw(&self, filter: &ListingFilter) -> Result<Vec<Listing>> {
        let body = match &self.mode {
            Mode::Fixture(s) => s.clone(),
            Mode::Http { base_url, client } => client
                .get(format!("{}/api/bounties", base_url))
                .send()
                .await
                .context("clawtasks request")?
                .error_for_status()
                .context("clawtasks status")?
                .text()
                .await
                .context("clawtasks body")?,
        };
        let listings = self.transform(&body)?;
        Ok(apply_filter(self.name(), listings, filter))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE: &str = r#"{
        "bounties": [
            {"id": 17, "title": "Write Solidity tests", "description": "Cover the escrow contract",
             "amount": "45.5", "status": "open", "tags": ["solidity"], "created_at": "2026-07-01T10:00:00Z"},
            {"id": 18, "title": "Closed bounty", "description": "", "amount": 10, "status": "completed"},
            {"id": "19", "title": "Label a dataset", "description": "2k rows", "amount": 12, "status": "claimed"}
        ]
    }"#;

    #[tokio::test]
    async fn transforms_only_active_bounties() {
        let c = ClawTasksConnector::from_fixture(FIXTURE);
        let out = c.fetch_raw(&ListingFilter::default()).await.unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].id, "clawtasks-17");
        assert_eq!(out[0].compensation.min, 45.5);
        assert_eq!(out[0].compensation.currency, "USDC");
        assert_eq!(out[1].title, "Label a dataset");
    }

    #[tokio::test]
    async fn honors_filter_and_limit() {
        let c = ClawTasksConnector::from_fixture(FIXTURE);
        let f = ListingFilter {
            query: Some("dataset".into()),
            ..Default::default()
        };
        let out = c.fetch_raw(&f).await.unwrap();
        assert_eq!(out.len(), 1);

        let probe = ListingFilter {
            limit: Some(1),
            ..Default::default()
        };
        assert_eq!(c.fetch_raw(&probe).await.unwrap().len(), 1);
        assert!(c.health_check().await);
    }

    #[tokio::test]
    async fn garbage_body_is_an_error_but_fetch_degrades_to_empty() {
        let c = ClawTasksConnector::from_fixture("not json");
        assert!(c.fetch_raw(&ListingFilter::default()).await.is_err());
        assert!(!c.health_check().await);
        assert!(c.fetch(&ListingFilter::default()).await.is_empty());
    }
}
