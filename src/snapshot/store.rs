// src/snapshot/store.rs
// Day-partitioned, append-only snapshot persistence with a fixed 90-day
// retention window.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, NaiveDate, Utc};

use super::MetricSnapshot;

pub const RETENTION_DAYS: i64 = 90;

/// Snapshots accumulate in one JSON file per calendar day,
/// `metrics-YYYY-MM-DD.json`, each holding the day's array.
pub struct SnapshotStore {
    dir: PathBuf,
}

impl SnapshotStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn ensure_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("creating metrics dir {}", self.dir.display()))
    }

    fn file_path(&self, date: NaiveDate) -> PathBuf {
        self.dir.join(format!("metrics-{}.json", date.format("%Y-%m-%d")))
    }

    /// Append one snapshot to its day partition. Every append re-triggers
    /// the retention purge.
    pub fn append(&self, snapshot: &MetricSnapshot) -> Result<()> {
        self.ensure_dir()?;

        let path = self.file_path(snapshot.timestamp.date_naive());
        let mut snapshots: Vec<MetricSnapshot> = if path.exists() {
            let content = fs::read_to_string(&path)
                .with_context(|| format!("reading {}", path.display()))?;
            serde_json::from_str(&content)
                .with_context(|| format!("parsing {}", path.display()))?
        } else {
            Vec::new()
        };

        snapshots.push(snapshot.clone());
        let body = serde_json::to_string_pretty(&snapshots)?;
        fs::write(&path, body).with_context(|| format!("writing {}", path.display()))?;

        self.cleanup_old(snapshot.timestamp);
        Ok(())
    }

    /// All snapshots within the trailing `days` window, newest first.
    /// Unparseable partitions are skipped with a warning.
    pub fn historical(&self, days: i64, now: DateTime<Utc>) -> Result<Vec<MetricSnapshot>> {
        self.ensure_dir()?;
        let cutoff = (now - Duration::days(days)).date_naive();

        let mut all = Vec::new();
        for entry in fs::read_dir(&self.dir).context("listing metrics dir")? {
            let entry = entry?;
            let Some(date) = partition_date(&entry.file_name().to_string_lossy()) else {
                continue;
            };
            if date < cutoff {
                continue;
            }
            let path = entry.path();
            let content = match fs::read_to_string(&path) {
                Ok(c) => c,
                Err(e) => {
                    tracing::warn!(error = ?e, path = %path.display(), "unreadable metrics partition");
                    continue;
                }
            };
            match serde_json::from_str::<Vec<MetricSnapshot>>(&content) {
                Ok(mut snaps) => all.append(&mut snaps),
                Err(e) => {
                    tracing::warn!(error = ?e, path = %path.display(), "corrupt metrics partition");
                }
            }
        }

        all.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(all)
    }

    /// Rolling uptime over the trailing window: the share of snapshots
    /// whose success rate clears 0.95. With no history at all, report 100
    /// (assume healthy absent evidence otherwise). A storage failure
    /// degrades to 0 with a warning rather than propagating.
    pub fn uptime_percentage(&self, days: i64, now: DateTime<Utc>) -> f64 {
        let snapshots = match self.historical(days, now) {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!(error = ?e, days, "failed to compute uptime");
                return 0.0;
            }
        };
        if snapshots.is_empty() {
            return 100.0;
        }
        let up = snapshots.iter().filter(|s| s.success_rate > 0.95).count();
        up as f64 / snapshots.len() as f64 * 100.0
    }

    fn cleanup_old(&self, now: DateTime<Utc>) {
        let cutoff = (now - Duration::days(RETENTION_DAYS)).date_naive();
        let entries = match fs::read_dir(&self.dir) {
            Ok(e) => e,
            Err(e) => {
                tracing::warn!(error = ?e, "metrics cleanup skipped");
                return;
            }
        };
        for entry in entries.flatten() {
            let name = entry.file_name().to_string_lossy().to_string();
            let Some(date) = partition_date(&name) else { continue };
            if date < cutoff {
                if let Err(e) = fs::remove_file(entry.path()) {
                    tracing::warn!(error = ?e, file = %name, "failed to purge metrics partition");
                } else {
                    tracing::info!(file = %name, "purged old metrics partition");
                }
            }
        }
    }
}

fn partition_date(file_name: &str) -> Option<NaiveDate> {
    let stem = file_name.strip_prefix("metrics-")?.strip_suffix(".json")?;
    NaiveDate::parse_from_str(stem, "%Y-%m-%d").ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snap(ts: DateTime<Utc>, success_rate: f64) -> MetricSnapshot {
        MetricSnapshot {
            timestamp: ts,
            uptime_7d: 100.0,
            uptime_30d: 100.0,
            uptime_90d: 100.0,
            latency_p50: 150,
            latency_p95: 450,
            latency_p99: 850,
            success_rate,
            total_requests: 10,
            active_platforms: 9,
        }
    }

    fn ts(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn uptime_with_no_history_is_exactly_100() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path());
        assert_eq!(store.uptime_percentage(7, Utc::now()), 100.0);
    }

    #[test]
    fn uptime_counts_snapshots_over_threshold() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path());
        let now = ts("2026-08-07T12:00:00Z");

        for i in 0..10i64 {
            let rate = if i < 8 { 0.99 } else { 0.5 };
            store.append(&snap(now - Duration::minutes(i * 5), rate)).unwrap();
        }
        assert_eq!(store.uptime_percentage(7, now), 80.0);
    }

    #[test]
    fn same_day_snapshots_share_one_partition() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path());
        let now = ts("2026-08-07T12:00:00Z");

        store.append(&snap(now, 1.0)).unwrap();
        store.append(&snap(now + Duration::minutes(5), 1.0)).unwrap();

        let files: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(files.len(), 1);
        assert_eq!(store.historical(1, now).unwrap().len(), 2);
    }

    #[test]
    fn historical_is_window_bounded_and_newest_first() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path());
        let now = ts("2026-08-07T12:00:00Z");

        store.append(&snap(now - Duration::days(10), 1.0)).unwrap();
        store.append(&snap(now - Duration::days(1), 0.9)).unwrap();
        store.append(&snap(now, 1.0)).unwrap();

        let week = store.historical(7, now).unwrap();
        assert_eq!(week.len(), 2);
        assert!(week[0].timestamp > week[1].timestamp);

        let month = store.historical(30, now).unwrap();
        assert_eq!(month.len(), 3);
    }

    #[test]
    fn append_purges_partitions_past_retention() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path());
        let now = ts("2026-08-07T12:00:00Z");

        store
            .append(&snap(now - Duration::days(RETENTION_DAYS + 5), 1.0))
            .unwrap();
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);

        // Appending a current snapshot triggers the purge of the old file.
        store.append(&snap(now, 1.0)).unwrap();
        let names: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["metrics-2026-08-07.json".to_string()]);
    }
}
