use icra_core::HubHandle;
use metrics_exporter_prometheus::PrometheusHandle;
use std::path::PathBuf;
use std::sync::Arc;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Handle to the visit hub
    pub hub: HubHandle,

    /// Prometheus renderer, when a recorder is installed
    pub metrics: Option<Arc<PrometheusHandle>>,

    /// Directory served for unmatched paths
    pub static_dir: PathBuf,
}

impl AppState {
    pub fn new(hub: HubHandle, static_dir: impl Into<PathBuf>) -> Self {
        Self {
            hub,
            metrics: None,
            static_dir: static_dir.into(),
        }
    }

    /// Attach a Prometheus handle for the `/metrics` endpoint
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(Arc::new(handle));
        self
    }
}
