//! ICRA Server
//!
//! Hosts the browsing monitor and bridges the message broker to WebSocket
//! clients.

use anyhow::Result;
use clap::Parser;
use icra_core::Hub;
use icra_server::bridge::{self, MessagingBridge};
use icra_server::telemetry::{init_metrics, init_tracing};
use icra_server::{run_server, AppState, Cli, ServerConfig};
use tokio::signal;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose);

    info!("Starting ICRA visit stream");

    // Load and validate configuration before anything is started
    let config = ServerConfig::load(&cli)?;
    config.validate()?;
    info!("Broker: {}", bridge::BrokerAddress::parse(&config.broker)?);
    info!("Topics: {}", config.topics().collect::<Vec<_>>().join(", "));
    info!(
        buffer_size = config.buffer_size,
        cache_size = config.cache_size,
        "Configuration loaded successfully"
    );

    let metrics_handle = init_metrics()?;

    // Start the visit hub
    let hub = Hub::spawn(config.hub_config())?;

    // Connect to the message broker
    let topics = config.topics().map(str::to_string).collect();
    let bridge = MessagingBridge::connect(&config.broker, &bridge::client_id(), topics, hub.clone())
        .await?;

    let state = AppState::new(hub.clone(), config.static_dir.clone()).with_metrics(metrics_handle);
    let listener = tokio::net::TcpListener::bind(config.listen_addr()?).await?;

    // Graceful shutdown handler
    let shutdown = async move {
        shutdown_signal().await;
        warn!("Shutdown signal received, stopping server...");
        bridge.close().await;
        hub.shutdown().await;
    };

    run_server(listener, state, shutdown).await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Listen for shutdown signals (SIGTERM, SIGINT)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
