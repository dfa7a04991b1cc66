// src/aggregator.rs
// Fan-out/fan-in across every registered connector with per-source error
// isolation and cross-source deduplication.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Result};
use futures_util::future::join_all;
use serde::Serialize;

use crate::config::Config;
use crate::connectors::{
    clawtasks::ClawTasksConnector, jobforagent::JobForAgentConnector,
    moltverr::MoltverrConnector, work402::Work402Connector, Connector,
};
use crate::listing::{Listing, ListingFilter};
use crate::scrape::{
    metaschool::MetaschoolScraper, playhouse::PlayhouseScraper, PageRenderer, ScrapeClient,
};

#[derive(Debug, Clone, Serialize)]
pub struct AggregatorStats {
    #[serde(rename = "totalConnectors")]
    pub total_connectors: usize,
    pub platforms: Vec<&'static str>,
    pub status: &'static str,
}

pub struct AggregationEngine {
    connectors: Vec<Box<dyn Connector>>,
}

impl AggregationEngine {
    /// Build the registry from configuration. Credential-gated sources are
    /// omitted when their key is absent; an empty registry is the one
    /// unrecoverable startup failure in this subsystem.
    pub fn from_config(cfg: &Config, renderer: Arc<dyn PageRenderer>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()?;
        let min_delay = Duration::from_millis(cfg.scrape_min_delay_ms);

        let mut connectors: Vec<Box<dyn Connector>> = vec![
            Box::new(ClawTasksConnector::new(client.clone())),
            Box::new(Work402Connector::new(client.clone())),
            Box::new(JobForAgentConnector::new(client.clone())),
            Box::new(PlayhouseScraper::new(ScrapeClient::new(
                renderer.clone(),
                min_delay,
            ))),
            Box::new(MetaschoolScraper::new(ScrapeClient::new(
                renderer,
                min_delay,
            ))),
        ];

        match &cfg.moltverr_api_key {
            Some(key) => connectors.push(Box::new(MoltverrConnector::new(client, key.clone()))),
            None => tracing::info!("MOLTVERR_API_KEY not set, moltverr connector omitted"),
        }

        Self::with_connectors(connectors)
    }

    /// Registry injection point; tests hand in fakes here.
    pub fn with_connectors(connectors: Vec<Box<dyn Connector>>) -> Result<Self> {
        if connectors.is_empty() {
            bail!("no connectors could be constructed");
        }
        Ok(Self { connectors })
    }

    /// Invoke every connector concurrently and merge the results.
    ///
    /// Each invocation is independently shielded (the connector's own catch
    /// boundary degrades failures to empty sets), so no single source can
    /// reduce the result below what healthy sources provide. The output
    /// order is the registration order of connectors; callers may rely on
    /// it for stable pagination of the first N results.
    pub async fn fetch_all(&self, filter: &ListingFilter) -> Vec<Listing> {
        tracing::info!(connectors = self.connectors.len(), "aggregating listings");

        let fetches = self.connectors.iter().map(|c| c.fetch(filter));
        let results = join_all(fetches).await;

        let merged: Vec<Listing> = results.into_iter().flatten().collect();
        let total = merged.len();
        let unique = dedup_listings(merged);
        tracing::info!(raw = total, unique = unique.len(), "aggregation complete");
        unique
    }

    pub fn stats(&self) -> AggregatorStats {
        AggregatorStats {
            total_connectors: self.connectors.len(),
            platforms: self.connectors.iter().map(|c| c.name()).collect(),
            status: "active",
        }
    }

    pub fn source_names(&self) -> Vec<&'static str> {
        self.connectors.iter().map(|c| c.name()).collect()
    }
}

/// First-seen-wins dedup on the composite key
/// `(source, title.trim().to_lowercase())`.
///
/// This is deliberately an exact-key heuristic: near-duplicate titles from
/// one source, and the same underlying task cross-posted to two sources,
/// are NOT merged.
pub fn dedup_listings(listings: Vec<Listing>) -> Vec<Listing> {
    let mut seen: HashSet<String> = HashSet::with_capacity(listings.len());
    listings
        .into_iter()
        .filter(|l| seen.insert(format!("{}:{}", l.source, l.title.trim().to_lowercase())))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::listing::{Category, Compensation};
    use anyhow::anyhow;
    use chrono::Utc;

    fn listing(source: &str, title: &str) -> Listing {
        Listing {
            id: format!("{}-{}", source, title.len()),
            source: source.into(),
            title: title.into(),
            description: String::new(),
            url: "https://example.test".into(),
            compensation: Compensation::zero("USD"),
            posted_at: Utc::now(),
            category: Category::Other,
            tags: vec![],
        }
    }

    struct FixedConnector {
        name: &'static str,
        listings: Vec<Listing>,
    }

    #[async_trait::async_trait]
    impl Connector for FixedConnector {
        fn name(&self) -> &'static str {
            self.name
        }
        async fn fetch_raw(&self, _filter: &ListingFilter) -> anyhow::Result<Vec<Listing>> {
            Ok(self.listings.clone())
        }
    }

    struct FailingConnector;

    #[async_trait::async_trait]
    impl Connector for FailingConnector {
        fn name(&self) -> &'static str {
            "failing"
        }
        async fn fetch_raw(&self, _filter: &ListingFilter) -> anyhow::Result<Vec<Listing>> {
            Err(anyhow!("source exploded"))
        }
    }

    #[tokio::test]
    async fn one_failing_source_cannot_sink_the_batch() {
        let engine = AggregationEngine::with_connectors(vec![
            Box::new(FixedConnector {
                name: "alpha",
                listings: vec![listing("alpha", "Task A"), listing("alpha", "Task B")],
            }),
            Box::new(FailingConnector),
            Box::new(FixedConnector {
                name: "gamma",
                // Same title as alpha's, but different source: kept.
                listings: vec![listing("gamma", "Task A")],
            }),
        ])
        .unwrap();

        let out = engine.fetch_all(&ListingFilter::default()).await;
        assert_eq!(out.len(), 3);
    }

    #[tokio::test]
    async fn duplicate_title_same_source_keeps_first_occurrence() {
        let engine = AggregationEngine::with_connectors(vec![
            Box::new(FixedConnector {
                name: "alpha",
                listings: vec![listing("alpha", "Task A"), listing("alpha", "Task B")],
            }),
            Box::new(FailingConnector),
            Box::new(FixedConnector {
                name: "alpha2",
                listings: vec![{
                    let mut l = listing("alpha", "  task a  ");
                    l.id = "alpha-dup".into();
                    l
                }],
            }),
        ])
        .unwrap();

        let out = engine.fetch_all(&ListingFilter::default()).await;
        // 2 + 1 with the duplicate dropped.
        assert_eq!(out.len(), 2);
        assert!(out.iter().all(|l| l.id != "alpha-dup"));
    }

    #[test]
    fn dedup_is_idempotent_and_order_preserving() {
        let input = vec![
            listing("a", "One"),
            listing("a", "one "),
            listing("b", "One"),
            listing("a", "Two"),
        ];
        let once = dedup_listings(input);
        let twice = dedup_listings(once.clone());
        assert_eq!(once, twice);
        assert_eq!(
            once.iter().map(|l| l.title.as_str()).collect::<Vec<_>>(),
            vec!["One", "One", "Two"]
        );
    }

    #[test]
    fn empty_registry_is_fatal() {
        assert!(AggregationEngine::with_connectors(Vec::new()).is_err());
    }
}
