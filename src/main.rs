use std::{path::PathBuf, sync::Arc};

use clap::{Args, Parser};
use tokio::{sync::broadcast, task::JoinError};
use tracing::{error, info};

use usage_gateway::{
    config::GatewayConfig, errors::InitializationError, setup_logging, start_http_server,
    AccountSource, Aggregator, ApiState, BackendClient, GatewayError, PopDirectory, PopSource,
    StaticAccounts, StatsSource,
};

#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    #[command(flatten)]
    common: CommonArgs,
}

#[derive(Args)]
struct CommonArgs {
    /// Path to a YAML config file, layered config/ directory when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Dump default config and exit
    #[arg(long = "dump-default-config")]
    dump_default: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if cli.common.dump_default {
        let config = GatewayConfig::default();
        print!("{}", serde_yaml::to_string(&config)?);
        return Ok(());
    }

    let config = match &cli.common.config {
        Some(path) => GatewayConfig::from_file(path.clone()),
        None => GatewayConfig::new(),
    }
    .map_err(GatewayError::from)?;

    let _log_guard = setup_logging(&config.logging)?;

    if let Some(path) = &cli.common.config {
        info!("Loaded config from {}", path.display());
    }

    if let Err(e) = run(config).await {
        error!("Gateway failed: {}", e);
        return Err(e.into());
    }

    Ok(())
}

async fn run(config: GatewayConfig) -> Result<(), GatewayError> {
    let backend = Arc::new(BackendClient::new(&config.backend)?);
    info!("Using metering backend at {}", backend.base_url());

    let stats: Arc<dyn StatsSource> = backend.clone();
    let pops: Arc<dyn PopSource> = backend;

    let directory = PopDirectory::connect(pops).await?;
    info!("Pop directory loaded with {} pops", directory.len());

    let aggregator = Arc::new(Aggregator::new(stats, &config.fanout));
    let accounts = StaticAccounts::new(config.accounts.clone());
    info!("Serving {} owners", accounts.owners());
    let accounts: Arc<dyn AccountSource> = Arc::new(accounts);

    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);

    if !config.http.enabled {
        info!("HTTP API disabled");
        wait_for_shutdown().await?;
        return Ok(());
    }

    let state = ApiState::new(aggregator, directory, accounts);
    let mut server = tokio::spawn(start_http_server(
        config.http.listen_addr(),
        state,
        shutdown_rx,
    ));

    tokio::select! {
        joined = &mut server => {
            // Only a failed bind or accept loop ends the server on its own
            return server_outcome(joined);
        }
        signal = wait_for_shutdown() => {
            signal?;
        }
    }

    let _ = shutdown_tx.send(());
    server_outcome(server.await)?;

    info!("Gateway stopped");
    Ok(())
}

async fn wait_for_shutdown() -> Result<(), GatewayError> {
    tokio::signal::ctrl_c().await.map_err(|e| {
        InitializationError::http(format!("Failed to listen for shutdown signal: {}", e))
    })?;
    info!("Received shutdown signal");
    Ok(())
}

fn server_outcome(joined: Result<Result<(), GatewayError>, JoinError>) -> Result<(), GatewayError> {
    joined.map_err(|e| InitializationError::http(format!("HTTP server task failed: {}", e)))?
}
