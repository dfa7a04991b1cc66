// src/metrics.rs
// Prometheus exposition (install recorder once, hand out a /metrics
// router) plus the in-process request counters that back metric
// snapshots.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use axum::{routing::get, Router};
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

/// One-time metrics registration (so series show up on /metrics).
pub fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("jobmesh_requests_total", "Total tool requests by tool and status.");
        describe_histogram!(
            "jobmesh_request_duration_seconds",
            "Tool request duration in seconds."
        );
        describe_gauge!(
            "jobmesh_platform_health",
            "Health of data source platforms (1 healthy, 0 down)."
        );
        describe_counter!(
            "jobmesh_listings_aggregated_total",
            "Listings aggregated per platform."
        );
        describe_counter!(
            "jobmesh_source_errors_total",
            "Connector fetch errors per platform."
        );
    });
}

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the Prometheus recorder. Call once, from the binary.
    pub fn init() -> Self {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .expect("prometheus: install recorder");
        ensure_metrics_described();
        Self { handle }
    }

    /// Router exposing `/metrics` in the Prometheus exposition format.
    pub fn router(&self) -> Router {
        let handle = self.handle.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let h = handle.clone();
                async move { h.render() }
            }),
        )
    }
}

/// Lock-free per-process request counters. These feed the periodic metric
/// snapshots directly; the Prometheus series are updated alongside.
#[derive(Debug, Default)]
pub struct RequestRecorder {
    success: AtomicU64,
    error: AtomicU64,
    latency_ms_sum: AtomicU64,
    latency_count: AtomicU64,
}

/// Percentiles reported before any request has been observed.
const PLACEHOLDER_PERCENTILES: (u64, u64, u64) = (150, 450, 850);

impl RequestRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&self, tool: &str, ok: bool, latency: Duration) {
        let status = if ok { "success" } else { "error" };
        counter!("jobmesh_requests_total", "tool" => tool.to_string(), "status" => status)
            .increment(1);
        histogram!("jobmesh_request_duration_seconds", "tool" => tool.to_string())
            .record(latency.as_secs_f64());

        if ok {
            self.success.fetch_add(1, Ordering::Relaxed);
        } else {
            self.error.fetch_add(1, Ordering::Relaxed);
        }
        self.latency_ms_sum
            .fetch_add(latency.as_millis() as u64, Ordering::Relaxed);
        self.latency_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn total_requests(&self) -> u64 {
        self.success.load(Ordering::Relaxed) + self.error.load(Ordering::Relaxed)
    }

    /// Success rate in 0..=1, optimistic 1.0 when nothing has been
    /// observed yet, rounded to 4 decimal places.
    pub fn success_rate(&self) -> f64 {
        let success = self.success.load(Ordering::Relaxed) as f64;
        let total = self.total_requests() as f64;
        if total == 0.0 {
            return 1.0;
        }
        (success / total * 10_000.0).round() / 10_000.0
    }

    /// Latency percentile estimates in milliseconds.
    ///
    /// No histogram is kept, so percentiles are average-derived:
    /// p50 = 0.9*avg, p95 = 2*avg, p99 = 3*avg. With zero observations the
    /// fixed conservative placeholders are reported instead.
    pub fn latency_percentiles(&self) -> (u64, u64, u64) {
        let count = self.latency_count.load(Ordering::Relaxed);
        if count == 0 {
            return PLACEHOLDER_PERCENTILES;
        }
        let avg = self.latency_ms_sum.load(Ordering::Relaxed) as f64 / count as f64;
        (
            (avg * 0.9).round() as u64,
            (avg * 2.0).round() as u64,
            (avg * 3.0).round() as u64,
        )
    }
}
