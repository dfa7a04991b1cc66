// src/health.rs
// Periodic liveness probes against each marketplace, one overwritten
// record per source. The probe table is wider than the connector registry:
// platforms are monitored even where no connector is registered yet.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures_util::future::join_all;
use metrics::gauge;
use serde::Serialize;
use tokio::task::JoinHandle;

/// Probe timeout; a source slower than this counts as down.
const PROBE_TIMEOUT: Duration = Duration::from_secs(5);
/// Default probe interval.
pub const DEFAULT_PROBE_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
pub struct ProbeTarget {
    pub name: &'static str,
    pub url: &'static str,
}

/// Marketplaces under watch.
pub const PROBE_TARGETS: &[ProbeTarget] = &[
    ProbeTarget { name: "x402", url: "https://www.x402.org/facilitator" },
    ProbeTarget { name: "rentahuman", url: "https://rentahuman.ai" },
    ProbeTarget { name: "virtuals", url: "https://virtuals.io" },
    ProbeTarget { name: "clawtasks", url: "https://clawtasks.com" },
    ProbeTarget { name: "work402", url: "https://work402.com" },
    ProbeTarget { name: "moltverr", url: "https://moltverr.com" },
    ProbeTarget { name: "jobforagent", url: "https://jobforagent.com" },
    ProbeTarget { name: "playhouse", url: "https://playhouse.bot" },
    ProbeTarget { name: "metaschool", url: "https://metaschool.so" },
];

/// Latest probe outcome for one source, overwritten in place every cycle.
/// History is the snapshot store's job, not this cache's.
#[derive(Debug, Clone, Serialize)]
pub struct SourceHealthRecord {
    pub source: String,
    pub healthy: bool,
    pub last_checked: DateTime<Utc>,
    pub response_time_ms: Option<u64>,
    pub last_error: Option<String>,
}

pub struct HealthMonitor {
    client: reqwest::Client,
    targets: Vec<ProbeTarget>,
    // Unknown state = no entry yet (no probe has completed).
    statuses: RwLock<HashMap<String, SourceHealthRecord>>,
}

impl HealthMonitor {
    pub fn new() -> Self {
        Self::with_targets(PROBE_TARGETS.to_vec())
    }

    pub fn with_targets(targets: Vec<ProbeTarget>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(PROBE_TIMEOUT)
            .build()
            .expect("probe http client");
        Self {
            client,
            targets,
            statuses: RwLock::new(HashMap::new()),
        }
    }

    /// One probe cycle over all targets, concurrently. Public so tests and
    /// callers can drive cycles without the timer.
    pub async fn probe_all(&self) {
        join_all(self.targets.iter().map(|t| self.probe_one(t))).await;
    }

    async fn probe_one(&self, target: &ProbeTarget) {
        let started = std::time::Instant::now();
        let outcome = self.client.head(target.url).send().await;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        let record = match outcome {
            Ok(resp) if resp.status().is_success() => SourceHealthRecord {
                source: target.name.to_string(),
                healthy: true,
                last_checked: Utc::now(),
                response_time_ms: Some(elapsed_ms),
                last_error: None,
            },
            Ok(resp) => SourceHealthRecord {
                source: target.name.to_string(),
                healthy: false,
                last_checked: Utc::now(),
                response_time_ms: Some(elapsed_ms),
                last_error: Some(format!("status {}", resp.status())),
            },
            Err(e) => SourceHealthRecord {
                source: target.name.to_string(),
                healthy: false,
                last_checked: Utc::now(),
                response_time_ms: None,
                last_error: Some(e.to_string()),
            },
        };

        if !record.healthy {
            tracing::warn!(
                source = target.name,
                error = record.last_error.as_deref().unwrap_or("unknown"),
                "probe failed"
            );
        }
        gauge!("jobmesh_platform_health", "platform" => target.name)
            .set(if record.healthy { 1.0 } else { 0.0 });

        self.statuses
            .write()
            .expect("health statuses lock poisoned")
            .insert(target.name.to_string(), record);
    }

    /// Read-only snapshot of all current records. Freshness is bounded by
    /// the probe interval.
    pub fn statuses(&self) -> Vec<SourceHealthRecord> {
        let map = self.statuses.read().expect("health statuses lock poisoned");
        let mut out: Vec<_> = map.values().cloned().collect();
        out.sort_by(|a, b| a.source.cmp(&b.source));
        out
    }

    pub fn active_count(&self) -> usize {
        self.statuses
            .read()
            .expect("health statuses lock poisoned")
            .values()
            .filter(|r| r.healthy)
            .count()
    }

    pub fn target_count(&self) -> usize {
        self.targets.len()
    }

    /// Probe immediately, then on the given interval for the process
    /// lifetime.
    pub fn spawn(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let monitor = Arc::clone(self);
        tokio::spawn(async move {
            tracing::info!(targets = monitor.targets.len(), "starting platform health checks");
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                monitor.probe_all().await;
                tracing::debug!(active = monitor.active_count(), "health probe cycle done");
            }
        })
    }

    /// Inject a record directly; test hook for status derivation.
    #[doc(hidden)]
    pub fn set_record(&self, record: SourceHealthRecord) {
        self.statuses
            .write()
            .expect("health statuses lock poisoned")
            .insert(record.source.clone(), record);
    }
}

impl Default for HealthMonitor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unreachable_source_is_recorded_unhealthy_with_error() {
        // Reserved TEST-NET-1 address; connection fails within the timeout.
        let monitor = HealthMonitor::with_targets(vec![ProbeTarget {
            name: "blackhole",
            url: "http://192.0.2.1:9",
        }]);

        assert!(monitor.statuses().is_empty()); // Unknown until first probe

        monitor.probe_all().await;

        let statuses = monitor.statuses();
        assert_eq!(statuses.len(), 1);
        let rec = &statuses[0];
        assert!(!rec.healthy);
        assert!(rec.last_error.is_some());
        assert_eq!(monitor.active_count(), 0);
    }

    #[test]
    fn records_overwrite_in_place() {
        let monitor = HealthMonitor::with_targets(vec![]);
        let mk = |healthy| SourceHealthRecord {
            source: "clawtasks".into(),
            healthy,
            last_checked: Utc::now(),
            response_time_ms: Some(10),
            last_error: None,
        };
        monitor.set_record(mk(false));
        monitor.set_record(mk(true));
        let statuses = monitor.statuses();
        assert_eq!(statuses.len(), 1);
        assert!(statuses[0].healthy);
    }
}
