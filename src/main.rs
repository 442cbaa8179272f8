//! HotLabel API gateway.
//!
//! Startup ordering: parse CLI → load and validate config (fail fast) →
//! init logging and metrics → compile route table → bind → serve until a
//! shutdown signal drains the server.

use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;

use hotlabel_gateway::config;
use hotlabel_gateway::lifecycle::{signals, Shutdown};
use hotlabel_gateway::observability::{logging, metrics};
use hotlabel_gateway::GatewayServer;

#[derive(Parser)]
#[command(name = "hotlabel-gateway")]
#[command(about = "Declarative API gateway for the HotLabel platform", long_about = None)]
struct Cli {
    /// Path to the declarative gateway configuration.
    #[arg(short, long, default_value = "gateway.yaml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match config::load_config(&cli.config) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("failed to load {}: {err}", cli.config.display());
            process::exit(1);
        }
    };

    logging::init(&config.observability.log_level);

    tracing::info!(
        config = %cli.config.display(),
        services = config.services.len(),
        bind_address = %config.listener.bind_address,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => {
                tracing::error!(
                    metrics_address = %config.observability.metrics_address,
                    "Failed to parse metrics address"
                );
            }
        }
    }

    let bind_address = config.listener.bind_address.clone();
    let server = match GatewayServer::new(config) {
        Ok(server) => server,
        Err(err) => {
            tracing::error!(error = %err, "Failed to compile route table");
            process::exit(1);
        }
    };

    let listener = match TcpListener::bind(&bind_address).await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!(address = %bind_address, error = %err, "Failed to bind listener");
            process::exit(1);
        }
    };

    let shutdown = Arc::new(Shutdown::new());
    tokio::spawn(signals::watch(shutdown.clone()));

    if let Err(err) = server.run(listener, shutdown).await {
        tracing::error!(error = %err, "Server error");
        process::exit(1);
    }

    tracing::info!("Shutdown complete");
}
