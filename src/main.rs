use clap::Parser;
use log::{error, info};
use std::env;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tokio::sync::RwLock;
use tokio::time::interval;

use etherscan_exporter::api::ApiServer;
use etherscan_exporter::config::AppConfig;
use etherscan_exporter::connector::Connector;
use etherscan_exporter::etherscan::EtherscanConnector;

#[derive(Parser)]
#[command(name = "exporter")]
#[command(about = "Etherscan account balance exporter")]
#[command(version = "0.1.0")]
struct Args {
    /// Configuration file path
    #[arg(long)]
    config: Option<String>,

    /// Server port override
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    if let Some(path) = &args.config {
        env::set_var("CONFIG_FILE", path);
    }

    let mut config = AppConfig::load()?;
    if let Some(port) = args.port {
        config.exporter.port = port;
    }

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(config.logging.level.as_str()),
    )
    .init();

    info!("Starting Etherscan balance exporter");

    let connector = EtherscanConnector::new(config.connector.clone())?;
    let connector = Arc::new(RwLock::new(connector));

    let server = ApiServer::new(
        connector.clone(),
        &config.exporter.host,
        config.exporter.port,
    );
    tokio::spawn(async move {
        if let Err(e) = server.start().await {
            error!("HTTP server failed: {}", e);
        }
    });

    // Graceful shutdown on ctrl-c
    let shutdown_signal = Arc::new(AtomicBool::new(false));
    let shutdown = Arc::clone(&shutdown_signal);
    tokio::spawn(async move {
        match signal::ctrl_c().await {
            Ok(()) => {
                info!("Received shutdown signal");
                shutdown.store(true, Ordering::Relaxed);
            }
            Err(err) => {
                error!("Unable to listen for shutdown signal: {}", err);
            }
        }
    });

    info!(
        "Polling balances every {} seconds",
        config.exporter.poll_interval_seconds
    );
    let mut poll = interval(Duration::from_secs(config.exporter.poll_interval_seconds));

    loop {
        if shutdown_signal.load(Ordering::Relaxed) {
            info!("Shutdown signal received, stopping exporter");
            break;
        }

        poll.tick().await;

        // A disabled connector returns the table untouched without network I/O
        let mut connector = connector.write().await;
        connector.retrieve_accounts().await;
    }

    Ok(())
}
