//! Contract event relay daemon.
//!
//! ```text
//!   chain RPC ──eth_getLogs──▶ AlloyEventFeed ──▶ Relay ──HTTP──▶ streaming service
//!                                                  ▲
//!                          admin API / relay-cli ──┘
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;

use tip_relay::admin::{self, AdminState};
use tip_relay::blockchain::{AlloyEventFeed, BlockchainClient, DisabledFeed};
use tip_relay::clock::SystemClock;
use tip_relay::config::load_config;
use tip_relay::events::{ContractAddresses, EventFeed};
use tip_relay::leaderboard::LeaderboardTally;
use tip_relay::lifecycle::{signals::wait_for_shutdown_signal, Shutdown};
use tip_relay::observability::{logging::init_logging, metrics::init_metrics};
use tip_relay::relay::{Relay, RelayDeps};
use tip_relay::stream::HttpStreamSink;

#[derive(Parser)]
#[command(name = "tip-relay")]
#[command(about = "Relays tipping and profile contract events to the streaming service", long_about = None)]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let config = load_config(&args.config)?;

    init_logging(&config.observability);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), config = %args.config.display(), "tip-relay starting");

    if config.observability.metrics_enabled {
        if let Ok(addr) = config.observability.metrics_address.parse() {
            init_metrics(addr);
        } else {
            tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            );
        }
    }

    let feed: Arc<dyn EventFeed> = if config.blockchain.enabled {
        let client = BlockchainClient::new(config.blockchain.clone()).await?;
        Arc::new(AlloyEventFeed::new(Arc::new(client)))
    } else {
        tracing::warn!("Blockchain integration disabled; the relay cannot start until it is enabled");
        Arc::new(DisabledFeed)
    };
    let sink = Arc::new(HttpStreamSink::new(&config.stream)?);
    let contracts = ContractAddresses::from_config(&config.contracts)?;

    let relay = Arc::new(Relay::new(
        &config.relay,
        contracts,
        RelayDeps {
            feed,
            sink,
            clock: Arc::new(SystemClock),
            leaderboard: config.leaderboard.enabled.then(LeaderboardTally::new),
        },
    ));

    if let Err(e) = relay.start().await {
        // The admin API can retry the start later.
        tracing::error!(error = %e, "Initial start failed");
    }

    let shutdown = Shutdown::new();
    let admin_task = if config.admin.enabled {
        let listener = TcpListener::bind(&config.admin.bind_address).await?;
        let state = AdminState::new(relay.clone(), config.admin.api_key.as_str());
        Some(tokio::spawn(admin::serve(listener, state, shutdown.subscribe())))
    } else {
        None
    };

    wait_for_shutdown_signal().await;
    tracing::info!("Shutting down");

    shutdown.trigger();
    relay.stop().await;
    if let Some(task) = admin_task {
        match task.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::error!(error = %e, "Admin API failed"),
            Err(e) => tracing::error!(error = %e, "Admin API task panicked"),
        }
    }

    let metrics = relay.get_metrics();
    tracing::info!(
        published = metrics.published.total(),
        queued = metrics.queue_size,
        "Shutdown complete"
    );
    Ok(())
}
