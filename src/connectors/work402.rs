// src/connectors/work402.rs
// Work402: agent-to-agent commerce protocol. Supports server-side search
// (`s` = skill query, `p` = minimum pay), so those filter fields are pushed
// into the request; everything is re-checked locally anyway.

use anyhow::{Context, Result};
use serde_json::Value;

use super::{apply_filter, first_num, first_str, id_string, posted_at, string_array, Connector};
use crate::listing::{Compensation, Listing, ListingFilter};
use crate::normalize::{classify, normalize_text, normalize_title};

const API_URL: &str = "https://api.work402.com/v1";
const SITE_URL: &str = "https://work402.com";

pub struct Work402Connector {
    mode: Mode,
}

enum Mode {
    Fixture(String),
    Http {
        api_url: String,
        client: reqwest::Client,
    },
}

impl Work402Connector {
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            mode: Mode::Http {
                api_url: API_URL.to_string(),
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
        let data: Value = serde_json::from_str(body).context("parsing work402 response")?;
        let bounties = data
            .get("bounties")
            .and_then(|b| b.as_array())
            .cloned()
            .or_else(|| data.as_array().cloned())
            .unwrap_or_default();

        let out = bounties
            .iter()
            .filter_map(|b| {
                let id = id_string(b, &["id", "_id"])?;
                let title = normalize_title(
                    &first_str(b, &["title", "name"]).unwrap_or_else(|| "Untitled Bounty".into()),
                );
                let description = normalize_text(
                    &first_str(b, &["description", "details"])
                        .unwrap_or_else(|| "No description provided".into()),
                );
                let pay = first_num(b, &["pay", "amount", "reward"]).unwrap_or(0.0);
                let tags = string_array(b, &["skills", "tags"]);
                Some(Listing {
                    url: format!("{}/bounties/{}", SITE_URL, id),
                    id: format!("work402-{}", id),
                    source: self.name().to_string(),
                    category: classify(&title, &description, &tags),
                    compensation: Compensation {
                        min: pay,
                        max: pay,
                        currency: "USDC".to_string(),
                    },
                    posted_at: posted_at(b, &["createdAt", "created_at"]),
                    title,
                    description,
                    tags,
                })
            })
            // Work402 lists unpaid "practice" bounties; only paid ones count.
            .filter(|l| l.compensation.min > 0.0)
            .collect();
        Ok(out)
    }
}

#[async_trait::async_trait]
impl Connector for Work402Connector {
    fn name(&self) -> &'static str {
        "work402"
    }

    async fn fetch_raw(&self, filter: &ListingFilter) -> Result<Vec<Listing>> {
        let body = match &self.mode {
            Mode::Fixture(s) => s.clone(),
            Mode::Http { api_url, client } => {
                let mut req = client.get(format!("{}/bounties", api_url));
                if let Some(q) = &filter.query {
                    req = req.query(&[("s", q.as_str())]);
                }
                if let Some(min) = filter.min_price {
                    req = req.query(&[("p", min.to_string())]);
                }
                req.send()
                    .await
                    .context("work402 request")?
                    .error_for_status()
                    .context("work402 status")?
                    .text()
                    .await
                    .context("work402 body")?
            }
        };
        let listings = self.transform(&body)?;
        Ok(apply_filter(self.name(), listings, filter))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE: &str = r#"[
        {"_id": "a1", "name": "Summarize governance forum", "details": "Weekly digest", "reward": 8},
        {"id": "a2", "title": "Unpaid practice task", "description": "", "pay": 0},
        {"id": "a3", "title": "Scrape pricing data", "description": "daily run", "amount": "15", "skills": ["scraping"]}
    ]"#;

    #[tokio::test]
    async fn keeps_only_paid_bounties_and_reads_field_aliases() {
        let c = Work402Connector::from_fixture(FIXTURE);
        let out = c.fetch_raw(&ListingFilter::default()).await.unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].id, "work402-a1");
        assert_eq!(out[0].title, "Summarize governance forum");
        assert_eq!(out[1].compensation.max, 15.0);
        assert_eq!(out[1].tags, vec!["scraping".to_string()]);
    }

    #[tokio::test]
    async fn wrapped_object_payload_also_parses() {
        let wrapped = format!(r#"{{"bounties": {}}}"#, FIXTURE);
        let c = Work402Connector::from_fixture(&wrapped);
        assert_eq!(c.fetch_raw(&ListingFilter::default()).await.unwrap().len(), 2);
    }
}
