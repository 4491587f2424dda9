//! Static sender: streams a local source and registers as a relay
//!
//! Run with: cargo run --bin rtp-sender -- --name studio --uri alsa:hw:0

use std::sync::Arc;

use clap::Parser;

use rtp_mesh::client::config::DEFAULT_CONFIG_SERVER;
use rtp_mesh::client::{ClientConfig, FleetClient, Role, WatchMode};
use rtp_mesh::media::{LaunchEngine, DEFAULT_PROGRAM};

#[derive(Parser, Debug)]
#[command(name = "rtp-sender", about = "Stream an audio source to the relay fleet")]
struct Args {
    /// Relay name
    #[arg(long, env = "RTP_NAME")]
    name: String,

    /// Host receivers connect to
    #[arg(long, env = "RTP_HOST", default_value = "localhost")]
    host: String,

    /// Port receivers connect to
    #[arg(long, env = "RTP_PORT", default_value_t = 48100)]
    port: u16,

    /// Coordination service URL
    #[arg(long, env = "RTP_CONFIG_SERVER", default_value = DEFAULT_CONFIG_SERVER)]
    config_server: String,

    /// Source URI: test, alsa[:device], pulse[:device] or any media URI
    #[arg(long, env = "RTP_URI")]
    uri: String,

    /// How state changes are followed: push or poll
    #[arg(long, env = "RTP_WATCH", default_value_t = WatchMode::Push)]
    watch: WatchMode,

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
    rtp_mesh::logging::init("rtp-sender", args.verbose)?;

    let role = Role::Sender {
        name: args.name,
        host: args.host,
        port: args.port,
        uri: Some(args.uri),
    };
    let config = ClientConfig::new(args.config_server).watch(args.watch);
    let client = FleetClient::new(config, role, Arc::new(LaunchEngine::new(args.media_program)));

    client
        .run(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for shutdown signal");
                std::future::pending::<()>().await;
            }
        })
        .await?;

    Ok(())
}
