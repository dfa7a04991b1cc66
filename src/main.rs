//! jobmesh-aggregator binary entrypoint.
//! Boots the Axum HTTP server, the connector registry, and the background
//! monitoring loops (health probes + metric snapshots).

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use jobmesh_aggregator::aggregator::AggregationEngine;
use jobmesh_aggregator::api::{self, AppState};
use jobmesh_aggregator::config::Config;
use jobmesh_aggregator::health::HealthMonitor;
use jobmesh_aggregator::metrics::{Metrics, RequestRecorder};
use jobmesh_aggregator::notify::{EmailSender, SubscriptionBook};
use jobmesh_aggregator::payment::{
    AcceptAllVerifier, PaymentGate, ProofVerifier, RejectAllVerifier,
};
use jobmesh_aggregator::scrape::{HttpRenderer, PageRenderer};
use jobmesh_aggregator::snapshot::{spawn_snapshot_scheduler, SnapshotStore};
use jobmesh_aggregator::tools::Toolbox;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,jobmesh_aggregator=info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cfg = Config::from_env();
    let metrics = Metrics::init();

    // Connector registry. The only fatal startup condition in this
    // subsystem is an empty registry.
    let renderer: Arc<dyn PageRenderer> = Arc::new(HttpRenderer::new()?);
    let aggregator = Arc::new(AggregationEngine::from_config(&cfg, renderer)?);
    tracing::info!(sources = ?aggregator.source_names(), "connector registry ready");

    let verifier: Arc<dyn ProofVerifier> = if cfg.dev_mode {
        Arc::new(AcceptAllVerifier)
    } else {
        Arc::new(RejectAllVerifier)
    };
    let gate = Arc::new(PaymentGate::new(
        cfg.payment_verification_enabled,
        cfg.wallet_address.clone().unwrap_or_else(|| "TBD".to_string()),
        verifier,
    ));

    let recorder = Arc::new(RequestRecorder::new());
    let health = Arc::new(HealthMonitor::new());
    let store = Arc::new(SnapshotStore::new(cfg.metrics_dir.clone()));

    let mailer = match EmailSender::from_env() {
        Ok(m) => Some(Arc::new(m)),
        Err(e) => {
            tracing::info!(reason = %e, "email alerts disabled");
            None
        }
    };
    let subscriptions = Arc::new(SubscriptionBook::with_capacity(2000));

    let toolbox = Arc::new(Toolbox::new(
        Arc::clone(&aggregator),
        gate,
        subscriptions,
        mailer,
        Arc::clone(&recorder),
    ));

    // Background loops: both run for the process lifetime.
    let _probe_loop = health.spawn(cfg.probe_interval);
    let _snapshot_loop = spawn_snapshot_scheduler(
        Arc::clone(&store),
        Arc::clone(&recorder),
        Arc::clone(&health),
        cfg.snapshot_initial_delay,
        cfg.snapshot_interval,
    );

    let state = AppState {
        toolbox,
        health,
        store,
    };
    let router = api::create_router(state).merge(metrics.router());

    let addr = SocketAddr::from(([0, 0, 0, 0], cfg.port));
    tracing::info!(%addr, "jobmesh aggregator listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;
    Ok(())
}
