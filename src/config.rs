// src/config.rs
// Environment configuration surface. Missing per-source credentials are
// resolved by omitting that connector, never by failing startup.

use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub moltverr_api_key: Option<String>,
    pub payment_verification_enabled: bool,
    pub wallet_address: Option<String>,
    pub metrics_dir: PathBuf,
    pub probe_interval: Duration,
    pub snapshot_interval: Duration,
    pub snapshot_initial_delay: Duration,
    pub scrape_min_delay_ms: u64,
    pub dev_mode: bool,
}

impl Config {
    pub fn from_env() -> Self {
        let metrics_dir = env_nonempty("METRICS_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| std::env::temp_dir().join("jobmesh-metrics"));

        let dev_mode = matches!(
            std::env::var("APP_ENV")
                .unwrap_or_default()
                .to_ascii_lowercase()
                .as_str(),
            "local" | "development" | "dev"
        );

        Self {
            port: env_u64("PORT", 3002) as u16,
            moltverr_api_key: env_nonempty("MOLTVERR_API_KEY"),
            payment_verification_enabled: std::env::var("PAYMENT_VERIFICATION_ENABLED")
                .map(|v| v == "true")
                .unwrap_or(false),
            wallet_address: env_nonempty("WALLET_ADDRESS"),
            metrics_dir,
            probe_interval: Duration::from_secs(env_u64("HEALTH_PROBE_INTERVAL_SECS", 60)),
            snapshot_interval: Duration::from_secs(env_u64("SNAPSHOT_INTERVAL_SECS", 300)),
            snapshot_initial_delay: Duration::from_secs(env_u64(
                "SNAPSHOT_INITIAL_DELAY_SECS",
                60,
            )),
            scrape_min_delay_ms: env_u64("SCRAPE_MIN_DELAY_MS", 2000),
            dev_mode,
        }
    }
}

fn env_nonempty(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}
