// src/connectors/mod.rs
pub mod clawtasks;
pub mod jobforagent;
pub mod moltverr;
pub mod work402;

use anyhow::Result;
use chrono::{DateTime, Utc};
use metrics::counter;
use serde_json::Value;

use crate::listing::{matches_filter, Listing, ListingFilter};

/// Single-source contract. `fetch_raw` is the source-specific part and may
/// fail; `fetch` is the boundary the aggregator calls and never does.
#[async_trait::async_trait]
pub trait Connector: Send + Sync {
    fn name(&self) -> &'static str;

    /// Fetch and normalize this source's listings. Errors escape here so
    /// that `health_check` can observe them.
    async fn fetch_raw(&self, filter: &ListingFilter) -> Result<Vec<Listing>>;

    /// Catch boundary: any source failure degrades to an empty result.
    async fn fetch(&self, filter: &ListingFilter) -> Vec<Listing> {
        match self.fetch_raw(filter).await {
            Ok(listings) => {
                counter!("jobmesh_listings_aggregated_total", "platform" => self.name())
                    .increment(listings.len() as u64);
                listings
            }
            Err(e) => {
                tracing::warn!(error = ?e, source = self.name(), "source fetch failed");
                counter!("jobmesh_source_errors_total", "platform" => self.name()).increment(1);
                Vec::new()
            }
        }
    }

    /// Liveness probe: a minimal fetch (result limit 1), success iff no
    /// error escaped.
    async fn health_check(&self) -> bool {
        let probe = ListingFilter {
            limit: Some(1),
            ..Default::default()
        };
        self.fetch_raw(&probe).await.is_ok()
    }
}

/// Defensive post-pass every connector runs on its normalized output:
/// drop records that violate listing invariants, re-apply the filter
/// (sources only honor parts of it), and honor the result-limit hint.
pub(crate) fn apply_filter(
    source: &str,
    mut listings: Vec<Listing>,
    filter: &ListingFilter,
) -> Vec<Listing> {
    listings.retain(|l| {
        if !l.is_valid() {
            tracing::warn!(source, id = %l.id, "dropping listing that failed validation");
            return false;
        }
        matches_filter(l, filter)
    });
    if let Some(limit) = filter.limit {
        listings.truncate(limit);
    }
    listings
}

// --- helpers for the untyped payloads marketplaces return ---
// Raw responses stay `serde_json::Value` right up to normalization; no
// unclassified shape flows past the connector boundary.

pub(crate) fn first_str(v: &Value, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|k| v.get(*k))
        .filter_map(|f| f.as_str())
        .map(|s| s.to_string())
        .find(|s| !s.trim().is_empty())
}

/// Source-side ids arrive as strings or numbers.
pub(crate) fn id_string(v: &Value, keys: &[&str]) -> Option<String> {
    keys.iter().filter_map(|k| v.get(*k)).find_map(|f| match f {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

/// Numeric field that may arrive as a JSON number or a numeric string.
pub(crate) fn first_num(v: &Value, keys: &[&str]) -> Option<f64> {
    keys.iter().filter_map(|k| v.get(*k)).find_map(|f| match f {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    })
}

/// RFC 3339 timestamp, defaulting to discovery time when the source omits
/// or mangles it.
pub(crate) fn posted_at(v: &Value, keys: &[&str]) -> DateTime<Utc> {
    first_str(v, keys)
        .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(Utc::now)
}

pub(crate) fn string_array(v: &Value, keys: &[&str]) -> Vec<String> {
    for k in keys {
        if let Some(arr) = v.get(*k).and_then(|f| f.as_array()) {
            return arr
                .iter()
                .filter_map(|x| x.as_str())
                .map(|s| s.to_string())
                .collect();
        }
    }
    Vec::new()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn first_str_skips_blank_and_missing_fields() {
        let v = json!({"title": "  ", "name": "Fallback"});
        assert_eq!(first_str(&v, &["title", "name"]).as_deref(), Some("Fallback"));
        assert_eq!(first_str(&v, &["missing"]), None);
    }

    #[test]
    fn first_num_accepts_numbers_and_numeric_strings() {
        let v = json!({"pay": "12.5", "reward": 3});
        assert_eq!(first_num(&v, &["amount", "pay"]), Some(12.5));
        assert_eq!(first_num(&v, &["reward"]), Some(3.0));
        assert_eq!(first_num(&v, &["amount"]), None);
    }

    #[test]
    fn posted_at_falls_back_to_now() {
        let v = json!({"created_at": "not a date"});
        let before = Utc::now();
        let ts = posted_at(&v, &["created_at"]);
        assert!(ts >= before);

        let v = json!({"created_at": "2026-01-02T03:04:05Z"});
        assert_eq!(posted_at(&v, &["created_at"]).to_rfc3339(), "2026-01-02T03:04:05+00:00");
    }
}
