//! Beacon service binary
//!
//! Wires the store, session cache, scheduler, notification channels and
//! escalation engine together and serves the HTTP API.
//!
//! # Usage
//!
//! ```bash
//! # Defaults: ./beacon-state, 127.0.0.1:8080, 3 minute grace period
//! beacon
//!
//! # Short grace period and a webhook relay for escalation notices
//! beacon --grace-secs 60 --webhook-url http://relay.internal:9000
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tracing::info;

use beacon::api::{self, ApiState};
use beacon::escalation::{EngineConfig, EscalationEngine};
use beacon::notify::{DurableChannel, FanoutChannel, LoggingDurableChannel, WebhookDurableChannel};
use beacon::scheduler::DelayedTaskScheduler;
use beacon::store::AlertStore;
use beacon::{MokaSessionCache, SessionCache, SharedDirectory, StoreDirectory};

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the RocksDB state directory
    #[arg(long, default_value = "./beacon-state")]
    data_dir: PathBuf,

    /// Address to serve the HTTP API on
    #[arg(long, default_value = "127.0.0.1:8080")]
    listen: SocketAddr,

    /// Grace period in seconds before an unresolved alert escalates
    #[arg(long, default_value_t = 180)]
    grace_secs: u64,

    /// Scheduler poll interval in milliseconds
    #[arg(long, default_value_t = 500)]
    poll_millis: u64,

    /// Webhook endpoint for durable escalation notices (logged if unset)
    #[arg(long)]
    webhook_url: Option<String>,

    /// Maximum live session entries held in the cache
    #[arg(long, default_value_t = 10_000)]
    max_sessions: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();

    let args = Args::parse();

    let store = AlertStore::open(&args.data_dir)?.shared();
    let cache: Arc<dyn SessionCache> = MokaSessionCache::new(args.max_sessions).shared();
    let scheduler = DelayedTaskScheduler::new(
        store.clone(),
        Duration::from_millis(args.poll_millis),
    )
    .shared();
    let fanout = FanoutChannel::new().shared();
    let directory = StoreDirectory::new(store.clone()).shared();

    let durable: Arc<dyn DurableChannel> = match &args.webhook_url {
        Some(url) => {
            info!(endpoint = %url, "Durable notices via webhook");
            Arc::new(WebhookDurableChannel::new(url))
        }
        None => {
            info!("No webhook endpoint configured; durable notices go to the log");
            Arc::new(LoggingDurableChannel)
        }
    };

    let engine = EscalationEngine::new(
        store,
        cache,
        scheduler,
        fanout,
        durable,
        directory.clone() as SharedDirectory,
        EngineConfig {
            grace_period: Duration::from_secs(args.grace_secs),
            poll_interval: Duration::from_millis(args.poll_millis),
        },
    )
    .shared();

    // Picks up escalation checks that came due while the process was down.
    engine.start_worker();

    let app = api::router(ApiState {
        engine,
        directory,
    });

    info!(
        listen = %args.listen,
        data_dir = %args.data_dir.display(),
        grace_secs = args.grace_secs,
        "Beacon listening"
    );
    let listener = tokio::net::TcpListener::bind(args.listen).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
