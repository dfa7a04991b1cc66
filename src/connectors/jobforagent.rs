// src/connectors/jobforagent.rs
// JobForAgent exposes a raw JSON dump of its board. Budgets come as
// free-text salary strings, so this is the main consumer of
// `parse_compensation`.

use anyhow::{Context, Result};
use serde_json::Value;

use super::{apply_filter, first_str, id_string, posted_at, string_array, Connector};
use crate::listing::{Listing, ListingFilter};
use crate::normalize::{classify, derived_id, normalize_text, normalize_title, parse_compensation};

const BASE_URL: &str = "https://jobforagent.com";

pub struct JobForAgentConnector {
    mode: Mode,
}

enum Mode {
    Fixture(String),
    Http {
        base_url: String,
        client: reqwest::Client,
    },
}

impl JobForAgentConnector {
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
        let data: Value = serde_json::from_str(body).context("parsing jobforagent response")?;
        let jobs = data
            .as_array()
            .cloned()
            .or_else(|| data.get("jobs").and_then(|j| j.as_array()).cloned())
            .unwrap_or_default();

        let out = jobs
            .iter()
            .filter_map(|j| {
                let title = normalize_title(
                    &first_str(j, &["title", "name"]).unwrap_or_else(|| "Untitled Job".into()),
                );
                let description =
                    normalize_text(&first_str(j, &["description", "details"]).unwrap_or_default());
                let url = first_str(j, &["url", "link"]).unwrap_or_else(|| BASE_URL.to_string());
                let id = id_string(j, &["id"])
                    .map(|raw| format!("jobforagent-{}", raw))
                    .unwrap_or_else(|| derived_id(self.name(), &url, &title));
                let salary_text =
                    first_str(j, &["salary", "payment", "budget"]).unwrap_or_default();
                let mut tags = string_array(j, &["tags"]);
                if tags.is_empty() {
                    tags.push("ai-agent-job".to_string());
                }
                Some(Listing {
                    id,
                    source: self.name().to_string(),
                    category: classify(&title, &description, &tags),
                    compensation: parse_compensation(&salary_text),
                    posted_at: posted_at(j, &["created_at", "createdAt"]),
                    url,
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
impl Connector for JobForAgentConnector {
    fn name(&self) -> &'static str {
        "jobforagent"
    }

    async fn fetch_raw(&self, filter: &ListingFilter) -> Result<Vec<Listing>> {
        let body = match &self.mode {
            Mode::Fixture(s) => s.clone(),
            Mode::Http { base_url, client } => client
                .get(format!("{}/api/jobs/raw", base_url))
                .send()
                .await
                .context("jobforagent request")?
                .error_for_status()
                .context("jobforagent status")?
                .text()
                .await
                .context("jobforagent body")?,
        };
        let listings = self.transform(&body)?;
        Ok(apply_filter(self.name(), listings, filter))
    }
}
