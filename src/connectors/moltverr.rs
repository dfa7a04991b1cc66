// src/connectors/moltverr.rs
// Moltverr: freelance gig marketplace with authenticated API access.
// The connector is only registered when MOLTVERR_API_KEY is configured;
// construction takes the key rather than reading the environment itself.

use anyhow::{Context, Result};
use serde_json::Value;

use super::{apply_filter, first_num, first_str, id_string, posted_at, string_array, Connector};
use crate::listing::{Compensation, Listing, ListingFilter};
use crate::normalize::{classify, normalize_text, normalize_title};

const BASE_URL: &str = "https://www.moltverr.com";
const USER_AGENT: &str = concat!("jobmesh-aggregator/", env!("CARGO_PKG_VERSION"));

pub struct MoltverrConnector {
    mode: Mode,
}

enum Mode {
    Fixture(String),
    Http {
        base_url: String,
        client: reqwest::Client,
        api_key: String,
    },
}

impl MoltverrConnector {
    pub fn new(client: reqwest::Client, api_key: String) -> Self {
        Self {
            mode: Mode::Http {
                base_url: BASE_URL.to_string(),
                client,
                api_key,
            },
        }
    }

    pub fn from_fixture(s: &str) -> Self {
        Self {
            mode: Mode::Fixture(s.to_string()),
        }
    }

    fn transform(&self, body: &str) -> Result<Vec<Listing>> {
        let data: Value = serde_json::from_str(body).context("parsing moltverr response")?;
        let gigs = data
            .get("gigs")
            .and_then(|g| g.as_array())
            .cloned()
            .or_else(|| data.get("data").and_then(|g| g.as_array()).cloned())
            .or_else(|| data.as_array().cloned())
            .unwrap_or_default();

        let out = gigs
            .iter()
            // Open gigs only; a missing status means open.
            .filter(|g| {
                matches!(g.get("status").and_then(|s| s.as_str()), Some("open") | None)
            })
            .filter_map(|g| {
                let id = id_string(g, &["id", "_id"])?;
                let title = normalize_title(
                    &first_str(g, &["title"]).unwrap_or_else(|| "Untitled Gig".into()),
                );
                let description =
                    normalize_text(&first_str(g, &["description"]).unwrap_or_default());
                let budget = first_num(g, &["budget"]).unwrap_or(0.0);
                let mut tags = string_array(g, &["tags"]);
                if tags.is_empty() {
                    if let Some(cat) = first_str(g, &["category"]) {
                        tags.push(cat);
                    }
                }
                Some(Listing {
                    url: format!("{}/gigs/{}", BASE_URL, id),
                    id: format!("moltverr-{}", id),
                    source: self.name().to_string(),
                    category: classify(&title, &description, &tags),
                    compensation: Compensation {
                        min: budget,
                        max: budget,
                        currency: "USD".to_string(),
                    },
                    posted_at: posted_at(g, &["createdAt", "created_at"]),
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
impl Connector for MoltverrConnector {
    fn name(&self) -> &'static str {
        "moltverr"
    }

    async fn fetch_raw(&self, filter: &ListingFilter) -> Result<Vec<Listing>> {
        let body = match &self.mode {
            Mode::Fixture(s) => s.clone(),
            Mode::Http {
                base_url,
                client,
                api_key,
            } => client
                .get(format!("{}/api/gigs", base_url))
                .header("Accept", "application/json")
                .header("Authorization", format!("Bearer {}", api_key))
                .header("User-Agent", USER_AGENT)
                .send()
                .await
                .context("moltverr request")?
                .error_for_status()
                .context("moltverr status")?
                .text()
                .await
                .context("moltverr body")?,
        };
        let listings = self.transform(&body)?;
        Ok(apply_filter(self.name(), listings, filter))
    }
}
