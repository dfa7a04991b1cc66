// src/tools.rs
// The tool-call boundary. The transport (HTTP shim, MCP bridge, ...) hands
// in an operation name, an argument object and an optional payment proof;
// it gets back a content envelope that is JSON-serializable on any of
// them. Nothing here ever panics the host: failures become `isError`
// envelopes.

use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::aggregator::AggregationEngine;
use crate::listing::ListingFilter;
use crate::metrics::RequestRecorder;
use crate::notify::{EmailSender, SubscriptionBook};
use crate::payment::{PaymentError, PaymentGate};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ToolContent {
    #[serde(rename = "text")]
    Text { text: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallResult {
    pub content: Vec<ToolContent>,
    #[serde(default, rename = "isError", skip_serializing_if = "Option::is_none")]
    pub is_error: Option<bool>,
}

impl ToolCallResult {
    pub fn text(text: String) -> Self {
        Self {
            content: vec![ToolContent::Text { text }],
            is_error: None,
        }
    }

    pub fn json(value: &impl Serialize) -> Self {
        let text = serde_json::to_string_pretty(value).unwrap_or_else(|e| e.to_string());
        Self::text(text)
    }

    pub fn error(message: String) -> Self {
        Self {
            content: vec![ToolContent::Text { text: message }],
            is_error: Some(true),
        }
    }

    pub fn json_error(value: &impl Serialize) -> Self {
        let text = serde_json::to_string_pretty(value).unwrap_or_else(|e| e.to_string());
        Self::error(text)
    }
}

pub struct Toolbox {
    aggregator: Arc<AggregationEngine>,
    gate: Arc<PaymentGate>,
    subscriptions: Arc<SubscriptionBook>,
    mailer: Option<Arc<EmailSender>>,
    recorder: Arc<RequestRecorder>,
}

impl Toolbox {
    pub fn new(
        aggregator: Arc<AggregationEngine>,
        gate: Arc<PaymentGate>,
        subscriptions: Arc<SubscriptionBook>,
        mailer: Option<Arc<EmailSender>>,
        recorder: Arc<RequestRecorder>,
    ) -> Self {
        Self {
            aggregator,
            gate,
            subscriptions,
            mailer,
            recorder,
        }
    }

    pub fn tool_names() -> &'static [&'static str] {
        &["findListings", "comparePrice", "getPlatformStats", "subscribeToAlerts"]
    }

    /// Dispatch one tool call: authorize, execute, record.
    pub async fn call(&self, name: &str, args: Value, proof: Option<&str>) -> ToolCallResult {
        let started = Instant::now();
        tracing::info!(tool = name, "handling tool call");

        match self.gate.check_payment(name, proof).await {
            Ok(()) => {}
            Err(PaymentError::Required(signal)) => {
                self.recorder.observe(name, false, started.elapsed());
                return ToolCallResult::json_error(&self.gate.payment_required_body(&signal));
            }
            Err(e @ PaymentError::UnknownTool(_)) => {
                self.recorder.observe(name, false, started.elapsed());
                return ToolCallResult::error(e.to_string());
            }
        }

        let result = match name {
            "findListings" => self.find_listings(args).await,
            "comparePrice" => self.compare_price(args).await,
            "getPlatformStats" => Ok(ToolCallResult::json(&self.aggregator.stats())),
            "subscribeToAlerts" => self.subscribe_to_alerts(args).await,
            other => Err(anyhow::anyhow!("unknown tool: {other}")),
        };

        match result {
            Ok(res) => {
                self.recorder.observe(name, true, started.elapsed());
                res
            }
            Err(e) => {
                tracing::warn!(tool = name, error = ?e, "tool call failed");
                self.recorder.observe(name, false, started.elapsed());
                ToolCallResult::error(format!("Error handling {name}: {e:#}"))
            }
        }
    }

    async fn find_listings(&self, args: Value) -> Result<ToolCallResult> {
        #[derive(Debug, Default, Deserialize)]
        #[serde(default, rename_all = "camelCase")]
        struct Args {
            query: Option<String>,
            min_price: Option<f64>,
            max_price: Option<f64>,
            source_name: Option<String>,
        }

        let args: Args = serde_json::from_value(args).context("invalid findListings arguments")?;
        let filter = ListingFilter {
            query: args.query,
            min_price: args.min_price,
            max_price: args.max_price,
            sources: args.source_name.map(|s| vec![s]),
            ..Default::default()
        };

        let listings = self.aggregator.fetch_all(&filter).await;
        Ok(ToolCallResult::json(&listings))
    }

    async fn compare_price(&self, args: Value) -> Result<ToolCallResult> {
        #[derive(Debug, Deserialize)]
        struct Args {
            query: String,
        }

        let args: Args = serde_json::from_value(args).context("invalid comparePrice arguments")?;
        let listings = self
            .aggregator
            .fetch_all(&ListingFilter::with_query(&args.query))
            .await;

        // Unpriced listings count as matches but not toward price stats.
        let prices: Vec<f64> = listings
            .iter()
            .filter(|l| l.compensation.min > 0.0)
            .map(|l| l.compensation.min)
            .collect();

        #[derive(Serialize)]
        struct PriceMatch {
            platform: String,
            title: String,
            price: String,
        }

        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct PriceAnalysis {
            query: String,
            total_matches: usize,
            average_price: f64,
            min_price: f64,
            max_price: f64,
            matches: Vec<PriceMatch>,
        }

        let analysis = PriceAnalysis {
            total_matches: listings.len(),
            average_price: if prices.is_empty() {
                0.0
            } else {
                prices.iter().sum::<f64>() / prices.len() as f64
            },
            min_price: prices.iter().cloned().reduce(f64::min).unwrap_or(0.0),
            max_price: prices.iter().cloned().reduce(f64::max).unwrap_or(0.0),
            matches: listings
                .iter()
                .take(10)
                .map(|l| PriceMatch {
                    platform: l.source.clone(),
                    title: l.title.clone(),
                    price: if l.compensation.is_unpriced() {
                        "N/A".to_string()
                    } else {
                        format!("{} {}", l.compensation.min, l.compensation.currency)
                    },
                })
                .collect(),
            query: args.query,
        };

        Ok(ToolCallResult::json(&analysis))
    }

    async fn subscribe_to_alerts(&self, args: Value) -> Result<ToolCallResult> {
        #[derive(Debug, Deserialize)]
        struct Args {
            email: String,
            query: String,
        }

        let args: Args =
            serde_json::from_value(args).context("invalid subscribeToAlerts arguments")?;
        if !args.email.contains('@') {
            anyhow::bail!("invalid email address: {}", args.email);
        }

        let sub = self.subscriptions.subscribe(&args.email, &args.query);
        tracing::info!(email = %sub.email, query = %sub.query, "new alert subscription");

        if let Some(mailer) = &self.mailer {
            if let Err(e) = mailer.send_confirmation(&sub).await {
                tracing::warn!(error = ?e, "confirmation email failed");
            }
        }

        Ok(ToolCallResult::text(format!(
            "Successfully subscribed {} to alerts for \"{}\". You will be notified via email.",
            sub.email, sub.query
        )))
    }
}
