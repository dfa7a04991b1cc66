// src/listing.rs
// The normalized listing schema shared by every connector, plus the
// filter policy applied both at fetch time and defensively on output.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Hard cap on normalized titles; longer titles are truncated upstream.
pub const MAX_TITLE_LEN: usize = 300;

/// Sanity bound on compensation amounts. Anything above this is a parse
/// artifact (e.g. a transaction hash read as a number), not a real price.
pub const MAX_COMPENSATION: f64 = 10_000_000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Development,
    Design,
    Writing,
    Marketing,
    Data,
    ContentWriting,
    SocialMedia,
    Assistant,
    Creative,
    Other,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Compensation {
    pub min: f64,
    pub max: f64,
    pub currency: String,
}

impl Compensation {
    pub fn zero(currency: &str) -> Self {
        Self {
            min: 0.0,
            max: 0.0,
            currency: currency.to_string(),
        }
    }

    /// Zero on both ends means the source published no price. That is a
    /// valid "unpriced" signal, not missing data.
    pub fn is_unpriced(&self) -> bool {
        self.min == 0.0 && self.max == 0.0
    }
}

/// One normalized job/task record. Built once per raw record returned by a
/// source, immutable afterwards, discarded at the end of the aggregation
/// cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Listing {
    /// Globally unique, namespaced by source, e.g. `clawtasks-17`.
    pub id: String,
    pub source: String,
    pub title: String,
    pub description: String,
    pub url: String,
    pub compensation: Compensation,
    pub posted_at: DateTime<Utc>,
    pub category: Category,
    pub tags: Vec<String>,
}

impl Listing {
    /// Invariant check applied defensively after normalization. Connectors
    /// drop (and log) records that fail it rather than letting malformed
    /// shapes past the connector boundary.
    pub fn is_valid(&self) -> bool {
        !self.title.trim().is_empty()
            && self.title.chars().count() <= MAX_TITLE_LEN
            && self.compensation.min >= 0.0
            && self.compensation.min <= self.compensation.max
            && self.compensation.min <= MAX_COMPENSATION
    }
}

/// Filter arguments accepted by `findListings` and pushed down to each
/// connector. All fields optional; an empty filter matches everything.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ListingFilter {
    pub query: Option<String>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub category: Option<Category>,
    /// Source allow-list; `None` means all registered sources.
    pub sources: Option<Vec<String>>,
    /// Result-limit hint for sources that support it. `health_check` uses 1.
    pub limit: Option<usize>,
}

impl ListingFilter {
    pub fn with_query(query: &str) -> Self {
        Self {
            query: Some(query.to_string()),
            ..Self::default()
        }
    }
}

/// Shared filter policy: case-insensitive substring match on
/// title+description for `query`, inclusive bound checks on min/max.
/// Unpriced listings (min == 0) pass unless an explicit `min_price`
/// excludes them.
pub fn matches_filter(listing: &Listing, filter: &ListingFilter) -> bool {
    if let Some(q) = &filter.query {
        let q = q.to_lowercase();
        if !listing.title.to_lowercase().contains(&q)
            && !listing.description.to_lowercase().contains(&q)
        {
            return false;
        }
    }

    if let Some(min) = filter.min_price {
        if listing.compensation.min < min {
            return false;
        }
    }
    if let Some(max) = filter.max_price {
        if listing.compensation.max > max {
            return false;
        }
    }

    if let Some(cat) = filter.category {
        if listing.category != cat {
            return false;
        }
    }

    if let Some(sources) = &filter.sources {
        if !sources.iter().any(|s| s.eq_ignore_ascii_case(&listing.source)) {
            return false;
        }
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(title: &str, min: f64, max: f64) -> Listing {
        Listing {
            id: "test-1".into(),
            source: "clawtasks".into(),
            title: title.into(),
            description: "Build a trading bot in Rust".into(),
            url: "https://example.test/1".into(),
            compensation: Compensation {
                min,
                max,
                currency: "USDC".into(),
            },
            posted_at: Utc::now(),
            category: Category::Development,
            tags: vec![],
        }
    }

    #[test]
    fn query_matches_title_or_description_case_insensitive() {
        let l = sample("Audit smart contract", 10.0, 20.0);
        assert!(matches_filter(&l, &ListingFilter::with_query("AUDIT")));
        assert!(matches_filter(&l, &ListingFilter::with_query("trading bot")));
        assert!(!matches_filter(&l, &ListingFilter::with_query("translation")));
    }

    #[test]
    fn price_bounds_are_inclusive() {
        let l = sample("Task", 100.0, 200.0);
        let f = ListingFilter {
            min_price: Some(100.0),
            max_price: Some(200.0),
            ..Default::default()
        };
        assert!(matches_filter(&l, &f));

        let too_low = ListingFilter {
            min_price: Some(100.01),
            ..Default::default()
        };
        assert!(!matches_filter(&l, &too_low));
    }

    #[test]
    fn unpriced_listings_survive_an_empty_filter() {
        let l = sample("Unpriced task", 0.0, 0.0);
        assert!(l.compensation.is_unpriced());
        assert!(matches_filter(&l, &ListingFilter::default()));
    }

    #[test]
    fn source_allow_list_is_case_insensitive() {
        let l = sample("Task", 1.0, 1.0);
        let f = ListingFilter {
            sources: Some(vec!["ClawTasks".into()]),
            ..Default::default()
        };
        assert!(matches_filter(&l, &f));
        let other = ListingFilter {
            sources: Some(vec!["work402".into()]),
            ..Default::default()
        };
        assert!(!matches_filter(&l, &other));
    }

    #[test]
    fn validity_rejects_empty_titles_and_inverted_ranges() {
        assert!(sample("ok", 1.0, 2.0).is_valid());
        assert!(!sample("  ", 1.0, 2.0).is_valid());
        assert!(!sample("ok", 5.0, 2.0).is_valid());
        assert!(!sample("ok", MAX_COMPENSATION * 2.0, MAX_COMPENSATION * 3.0).is_valid());
    }
}
