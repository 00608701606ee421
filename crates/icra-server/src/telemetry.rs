//! Logging and metrics setup for the binary

use crate::error::{Error, Result};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Initialize tracing/logging
pub fn init_tracing(verbose: bool) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = if verbose {
        EnvFilter::new("icra_core=debug,icra_server=debug,tower_http=debug")
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("icra_core=info,icra_server=info"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Install the Prometheus recorder and return a handle for rendering
pub fn init_metrics() -> Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| Error::config(format!("failed to install metrics recorder: {}", e)))?;

    metrics::describe_counter!(
        "icra_visits_published_total",
        "Total number of visits received from the broker"
    );
    metrics::describe_counter!(
        "icra_sessions_registered_total",
        "Total number of WebSocket sessions registered"
    );
    metrics::describe_gauge!("icra_sessions_active", "Number of connected sessions");

    tracing::info!("Metrics exporter initialized");
    Ok(handle)
}
