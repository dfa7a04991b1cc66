// src/snapshot/mod.rs
pub mod store;

pub use store::{SnapshotStore, RETENTION_DAYS};

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;

use crate::health::HealthMonitor;
use crate::metrics::RequestRecorder;

/// Default capture cadence.
pub const DEFAULT_SNAPSHOT_INTERVAL: Duration = Duration::from_secs(5 * 60);
/// Delay before the first capture, so in-process counters accumulate.
pub const DEFAULT_INITIAL_DELAY: Duration = Duration::from_secs(60);

/// One persisted point-in-time metrics record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSnapshot {
    pub timestamp: DateTime<Utc>,
    pub uptime_7d: f64,
    pub uptime_30d: f64,
    pub uptime_90d: f64,
    pub latency_p50: u64,
    pub latency_p95: u64,
    pub latency_p99: u64,
    pub success_rate: f64,
    pub total_requests: u64,
    pub active_platforms: usize,
}

/// Assemble one snapshot from the in-process counters, the health cache,
/// and previously persisted history, then append it to the store.
///
/// Uptime windows are computed from history *before* the new snapshot is
/// persisted, so a snapshot never counts itself.
pub fn capture_snapshot(
    store: &SnapshotStore,
    recorder: &RequestRecorder,
    health: &HealthMonitor,
    now: DateTime<Utc>,
) -> Result<MetricSnapshot> {
    let (latency_p50, latency_p95, latency_p99) = recorder.latency_percentiles();

    let snapshot = MetricSnapshot {
        timestamp: now,
        uptime_7d: store.uptime_percentage(7, now),
        uptime_30d: store.uptime_percentage(30, now),
        uptime_90d: store.uptime_percentage(90, now),
        latency_p50,
        latency_p95,
        latency_p99,
        success_rate: recorder.success_rate(),
        total_requests: recorder.total_requests(),
        active_platforms: health.active_count(),
    };

    store.append(&snapshot)?;
    tracing::info!(
        success_rate = snapshot.success_rate,
        active_platforms = snapshot.active_platforms,
        "metrics snapshot captured"
    );
    Ok(snapshot)
}

/// Capture on a fixed interval after an initial delay. A failed capture is
/// logged and the loop keeps going; the next tick self-heals.
pub fn spawn_snapshot_scheduler(
    store: Arc<SnapshotStore>,
    recorder: Arc<RequestRecorder>,
    health: Arc<HealthMonitor>,
    initial_delay: Duration,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        tracing::info!(?interval, "starting metrics snapshot scheduler");
        tokio::time::sleep(initial_delay).await;
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            if let Err(e) = capture_snapshot(&store, &recorder, &health, Utc::now()) {
                tracing::warn!(error = ?e, "snapshot capture failed");
            }
        }
    })
}
