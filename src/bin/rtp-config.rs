//! Coordination service
//!
//! Run with: cargo run --bin rtp-config -- --http 0.0.0.0:8080

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;

use rtp_mesh::media::{LaunchEngine, DEFAULT_PROGRAM};
use rtp_mesh::orchestrator::{MediaRelaySpawner, OrchestratorConfig, RelayOrchestrator};
use rtp_mesh::persist::{Persistence, DEFAULT_CACHE_FILE};
use rtp_mesh::server::{ConfigServer, ServerConfig};
use rtp_mesh::stats::FleetCounters;
use rtp_mesh::store::{StateStore, StoreConfig};

#[derive(Parser, Debug)]
#[command(name = "rtp-config", about = "Config coordination service for an audio relay fleet")]
struct Args {
    /// HTTP listen address
    #[arg(long, env = "RTP_HTTP", default_value = "0.0.0.0:8080")]
    http: SocketAddr,

    /// State cache file
    #[arg(long, env = "RTP_CONFIG_CACHE", default_value = DEFAULT_CACHE_FILE)]
    config_cache: PathBuf,

    /// Host transient relays run on (defaults to $HOSTNAME)
    #[arg(long, env = "RTP_RELAY_HOST")]
    relay_host: Option<String>,

    /// First port handed to transient relays
    #[arg(long, env = "RTP_RELAY_BASE_PORT", default_value_t = 48110)]
    relay_base_port: u16,

    /// Seconds without heartbeat before an entity is evicted
    #[arg(long, env = "RTP_LIVENESS_TIMEOUT", default_value_t = 60)]
    liveness_timeout: u64,

    /// Seconds between liveness sweeps
    #[arg(long, env = "RTP_SWEEP_INTERVAL", default_value_t = 60)]
    sweep_interval: u64,

    /// Seconds between idle relay reclamation passes
    #[arg(long, env = "RTP_RECLAIM_INTERVAL", default_value_t = 30)]
    reclaim_interval: u64,

    /// Media pipeline launcher
    #[arg(long, env = "RTP_MEDIA_PROGRAM", default_value = DEFAULT_PROGRAM)]
    media_program: String,

    /// Verbose logging
    #[arg(short, long, env = "RTP_VERBOSE")]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    rtp_mesh::logging::init("rtp-config", args.verbose)?;

    let relay_host = args
        .relay_host
        .or_else(|| std::env::var("HOSTNAME").ok())
        .unwrap_or_else(|| "localhost".to_string());

    let store_config = StoreConfig::default()
        .liveness_timeout(Duration::from_secs(args.liveness_timeout))
        .sweep_interval(Duration::from_secs(args.sweep_interval));
    let store = Arc::new(StateStore::open(store_config, Persistence::new(&args.config_cache)).await);

    let counters = Arc::new(FleetCounters::new());
    let spawner = MediaRelaySpawner::new(Arc::new(LaunchEngine::new(args.media_program)));
    let orchestrator = Arc::new(RelayOrchestrator::new(
        Arc::clone(&store),
        spawner,
        OrchestratorConfig::new(relay_host.clone())
            .base_port(args.relay_base_port)
            .reclaim_interval(Duration::from_secs(args.reclaim_interval)),
        Arc::clone(&counters),
    ));

    tracing::info!(
        http = %args.http,
        cache = %args.config_cache.display(),
        relay_host = %relay_host,
        "Starting coordination service"
    );

    let server = ConfigServer::new(ServerConfig::with_addr(args.http), store, orchestrator, counters);
    server
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for shutdown signal");
                std::future::pending::<()>().await;
            }
        })
        .await?;

    tracing::info!("Coordination service stopped");
    Ok(())
}
