// src/normalize.rs
// Best-effort normalization heuristics shared by all connectors:
// salary-string parsing, keyword-table category classification, and
// HTML-ish text cleanup. These are deliberately simple and table-driven
// so behavior stays reproducible; overriding the table is the extension
// point, not swapping in smarter matching.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use sha2::{Digest, Sha256};

use crate::listing::{Category, Compensation, MAX_TITLE_LEN};

static RE_TAGS: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)</?[^>]+>").unwrap());
static RE_WS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());
static RE_RATE_WORDS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)per hour|/hr|hourly").unwrap());
static RE_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\d+(?:,\d{3})*(?:\.\d+)?").unwrap());

/// Normalize free text coming off a page or API field: decode HTML
/// entities, strip tags, collapse whitespace, cap the length.
pub fn normalize_text(s: &str) -> String {
    let mut out = html_escape::decode_html_entities(s).to_string();
    out = RE_TAGS.replace_all(&out, " ").to_string();
    out = RE_WS.replace_all(&out, " ").trim().to_string();
    if out.chars().count() > 1500 {
        out = out.chars().take(1500).collect();
    }
    out
}

/// Title variant of `normalize_text` with the tighter listing cap.
pub fn normalize_title(s: &str) -> String {
    let out = normalize_text(s);
    if out.chars().count() > MAX_TITLE_LEN {
        out.chars().take(MAX_TITLE_LEN).collect()
    } else {
        out
    }
}

/// Parse a free-text salary/budget string into a structured range.
///
/// Currency is inferred by substring match on known tokens; numbers are
/// extracted and min/max taken over them, so `min <= max` holds no matter
/// how the source ordered them. No numeric substring yields a zero-valued
/// ("unpriced") compensation.
pub fn parse_compensation(raw: &str) -> Compensation {
    if raw.trim().is_empty() {
        return Compensation::zero("USD");
    }

    let cleaned = RE_RATE_WORDS
        .replace_all(&raw.to_lowercase(), "")
        .trim()
        .to_string();

    let currency = if cleaned.contains("usdc") {
        "USDC"
    } else if cleaned.contains("eth") {
        "ETH"
    } else if cleaned.contains('€') || cleaned.contains("eur") {
        "EUR"
    } else if cleaned.contains('£') || cleaned.contains("gbp") {
        "GBP"
    } else {
        "USD"
    };

    let values: Vec<f64> = RE_NUMBER
        .find_iter(&cleaned)
        .filter_map(|m| m.as_str().replace(',', "").parse::<f64>().ok())
        .collect();

    if values.is_empty() {
        return Compensation::zero(currency);
    }

    let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    Compensation {
        min,
        max,
        currency: currency.to_string(),
    }
}

#[derive(Debug, Deserialize)]
struct KeywordRow {
    category: Category,
    keywords: Vec<String>,
}

/// Fixed keyword table, ordered: the first category with a hit wins.
static CATEGORY_TABLE: Lazy<Vec<KeywordRow>> = Lazy::new(|| {
    let raw = include_str!("../category_keywords.json");
    serde_json::from_str(raw).expect("valid category keyword table")
});

/// Best-effort category classification: substring keyword matching over
/// title, description, and tags. Falls through to `Other` when no keyword
/// matches.
pub fn classify(title: &str, description: &str, tags: &[String]) -> Category {
    let mut haystack = format!("{} {}", title, description).to_lowercase();
    for t in tags {
        haystack.push(' ');
        haystack.push_str(&t.to_lowercase());
    }

    for row in CATEGORY_TABLE.iter() {
        if row.keywords.iter().any(|k| haystack.contains(k.as_str())) {
            return row.category;
        }
    }
    Category::Other
}

/// Stable id for scraped records that carry no source-side id: a short
/// hash over source + url + title. Re-scraping the same card yields the
/// same id across cycles.
pub fn derived_id(source: &str, url: &str, title: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(source.as_bytes());
    hasher.update(b"\x1f");
    hasher.update(url.as_bytes());
    hasher.update(b"\x1f");
    hasher.update(title.as_bytes());
    let digest = hasher.finalize();
    let hex: String = digest[..6].iter().map(|b| format!("{:02x}", b)).collect();
    format!("{}-{}", source, hex)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_range_with_currency_token() {
        let c = parse_compensation("$1,200 - $2,500 USDC");
        assert_eq!(c.min, 1200.0);
        assert_eq!(c.max, 2500.0);
        assert_eq!(c.currency, "USDC");
    }

    #[test]
    fn parse_single_value_and_hourly_noise() {
        let c = parse_compensation("25 per hour");
        assert_eq!((c.min, c.max), (25.0, 25.0));
        assert_eq!(c.currency, "USD");
    }

    #[test]
    fn parse_keeps_min_below_max_regardless_of_order() {
        let c = parse_compensation("500 ETH down from 2000");
        assert!(c.min <= c.max);
        assert_eq!((c.min, c.max), (500.0, 2000.0));
        assert_eq!(c.currency, "ETH");
    }

    #[test]
    fn parse_without_numbers_is_unpriced() {
        let c = parse_compensation("negotiable, paid in €");
        assert!(c.is_unpriced());
        assert_eq!(c.currency, "EUR");
    }

    #[test]
    fn classify_prefers_earlier_table_rows() {
        assert_eq!(
            classify("Build a Solidity contract", "", &[]),
            Category::Development
        );
        assert_eq!(
            classify("Weekly blog post", "long-form article", &[]),
            Category::ContentWriting
        );
        assert_eq!(classify("Mystery gig", "no keywords here", &[]), Category::Other);
    }

    #[test]
    fn classify_reads_tags_too() {
        assert_eq!(
            classify("Untitled", "", &["tiktok".to_string()]),
            Category::SocialMedia
        );
    }

    #[test]
    fn normalize_text_strips_tags_and_entities() {
        assert_eq!(
            normalize_text("<b>Hello&nbsp;world</b>  <i>again</i>"),
            "Hello world again"
        );
    }

    #[test]
    fn derived_ids_are_stable_and_namespaced() {
        let a = derived_id("playhouse", "https://x/1", "Agent");
        let b = derived_id("playhouse", "https://x/1", "Agent");
        let c = derived_id("playhouse", "https://x/2", "Agent");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a.starts_with("playhouse-"));
    }
}
