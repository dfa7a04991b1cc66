// src/status.rs
// Public status derivation: collapses the health cache and snapshot
// history into the report served at /status.json.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::health::HealthMonitor;
use crate::snapshot::{MetricSnapshot, SnapshotStore};

pub const SLA_UPTIME_TARGET: f64 = 99.5;
pub const SLA_LATENCY_TARGET_P95_MS: u64 = 500;

/// Active-source thresholds against the probe table.
const OPERATIONAL_MIN_ACTIVE: usize = 7;
const DEGRADED_MIN_ACTIVE: usize = 5;

#[derive(Debug, Serialize)]
pub struct StatusReport {
    pub status: &'static str,
    pub last_updated: DateTime<Utc>,
    pub uptime: UptimeBlock,
    pub latency: LatencyBlock,
    pub success_rate: f64,
    pub requests: RequestsBlock,
    pub platforms: PlatformsBlock,
    pub sla: SlaBlock,
    pub trend: TrendBlock,
    pub version: &'static str,
}

#[derive(Debug, Serialize)]
pub struct UptimeBlock {
    #[serde(rename = "7d")]
    pub seven_d: f64,
    #[serde(rename = "30d")]
    pub thirty_d: f64,
    #[serde(rename = "90d")]
    pub ninety_d: f64,
}

#[derive(Debug, Serialize)]
pub struct LatencyBlock {
    pub p50: u64,
    pub p95: u64,
    pub p99: u64,
    pub unit: &'static str,
}

#[derive(Debug, Serialize)]
pub struct RequestsBlock {
    pub total: u64,
    pub period: &'static str,
}

#[derive(Debug, Serialize)]
pub struct PlatformsBlock {
    pub total: usize,
    pub active: usize,
    pub degraded: usize,
    pub details: Vec<PlatformDetail>,
}

#[derive(Debug, Serialize)]
pub struct PlatformDetail {
    pub name: String,
    pub status: &'static str,
    pub last_check: DateTime<Utc>,
    pub response_time: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SlaBlock {
    pub uptime_target: f64,
    pub latency_target_p95: u64,
    pub current_uptime: f64,
    pub current_latency_p95: u64,
    pub meeting_sla: bool,
}

#[derive(Debug, Serialize)]
pub struct TrendBlock {
    pub uptime: &'static str,
    pub latency: &'static str,
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

pub fn build_status(
    health: &HealthMonitor,
    store: &SnapshotStore,
    now: DateTime<Utc>,
) -> StatusReport {
    let statuses = health.statuses();
    let active = statuses.iter().filter(|s| s.healthy).count();

    let uptime_7d = store.uptime_percentage(7, now);
    let uptime_30d = store.uptime_percentage(30, now);
    let uptime_90d = store.uptime_percentage(90, now);

    // Freshest persisted snapshot; before the first capture, fall back to
    // placeholders with the current health ratio as the success rate.
    let health_ratio = if statuses.is_empty() {
        1.0
    } else {
        active as f64 / statuses.len() as f64
    };
    let latest = store
        .historical(1, now)
        .ok()
        .and_then(|mut v| if v.is_empty() { None } else { Some(v.remove(0)) })
        .unwrap_or(MetricSnapshot {
            timestamp: now,
            uptime_7d,
            uptime_30d,
            uptime_90d,
            latency_p50: 150,
            latency_p95: 450,
            latency_p99: 850,
            success_rate: health_ratio,
            total_requests: 0,
            active_platforms: active,
        });

    let status = if active >= OPERATIONAL_MIN_ACTIVE {
        "operational"
    } else if active >= DEGRADED_MIN_ACTIVE {
        "degraded"
    } else {
        "outage"
    };

    StatusReport {
        status,
        last_updated: now,
        uptime: UptimeBlock {
            seven_d: round2(uptime_7d),
            thirty_d: round2(uptime_30d),
            ninety_d: round2(uptime_90d),
        },
        latency: LatencyBlock {
            p50: latest.latency_p50,
            p95: latest.latency_p95,
            p99: latest.latency_p99,
            unit: "ms",
        },
        success_rate: round2(latest.success_rate * 100.0),
        requests: RequestsBlock {
            total: latest.total_requests,
            period: "24h",
        },
        platforms: PlatformsBlock {
            total: statuses.len(),
            active,
            degraded: statuses.len() - active,
            details: statuses
                .into_iter()
                .map(|s| PlatformDetail {
                    name: s.source,
                    status: if s.healthy { "operational" } else { "down" },
                    last_check: s.last_checked,
                    response_time: s.response_time_ms.map(|ms| format!("{}ms", ms)),
                    error: s.last_error,
                })
                .collect(),
        },
        sla: SlaBlock {
            uptime_target: SLA_UPTIME_TARGET,
            latency_target_p95: SLA_LATENCY_TARGET_P95_MS,
            current_uptime: round2(uptime_30d),
            current_latency_p95: latest.latency_p95,
            meeting_sla: uptime_30d >= SLA_UPTIME_TARGET
                && latest.latency_p95 <= SLA_LATENCY_TARGET_P95_MS,
        },
        trend: TrendBlock {
            uptime: if uptime_7d > uptime_30d {
                "improving"
            } else if uptime_7d < uptime_30d {
                "degrading"
            } else {
                "stable"
            },
            latency: "stable",
        },
        version: env!("CARGO_PKG_VERSION"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::health::SourceHealthRecord;

    fn record(name: &str, healthy: bool) -> SourceHealthRecord {
        SourceHealthRecord {
            source: name.to_string(),
            healthy,
            last_checked: Utc::now(),
            response_time_ms: healthy.then_some(20),
            last_error: (!healthy).then(|| "status 503".to_string()),
        }
    }

    fn monitor_with(healthy: usize, down: usize) -> HealthMonitor {
        let monitor = HealthMonitor::with_targets(vec![]);
        let names = [
            "s0", "s1", "s2", "s3", "s4", "s5", "s6", "s7", "s8",
        ];
        for (i, name) in names.into_iter().enumerate().take(healthy + down) {
            monitor.set_record(record(name, i < healthy));
        }
        monitor
    }

    #[test]
    fn status_thresholds_follow_active_count() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path());
        let now = Utc::now();

        let report = build_status(&monitor_with(8, 1), &store, now);
        assert_eq!(report.status, "operational");

        let report = build_status(&monitor_with(5, 4), &store, now);
        assert_eq!(report.status, "degraded");

        let report = build_status(&monitor_with(2, 7), &store, now);
        assert_eq!(report.status, "outage");
    }

    #[test]
    fn cold_store_reports_placeholder_latency_and_health_ratio() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path());
        let report = build_status(&monitor_with(3, 1), &store, Utc::now());

        assert_eq!(report.latency.p95, 450);
        assert_eq!(report.success_rate, 75.0);
        assert_eq!(report.uptime.thirty_d, 100.0);
        // 100% uptime on an empty window, placeholder latency within target.
        assert!(report.sla.meeting_sla);
    }

    #[test]
    fn unhealthy_record_shows_as_down_detail() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path());
        let monitor = HealthMonitor::with_targets(vec![]);
        monitor.set_record(record("clawtasks", false));

        let report = build_status(&monitor, &store, Utc::now());
        assert_eq!(report.platforms.active, 0);
        assert_eq!(report.platforms.details[0].status, "down");
        assert_eq!(
            report.platforms.details[0].error.as_deref(),
            Some("status 503")
        );
    }
}
