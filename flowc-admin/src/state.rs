use std::sync::Arc;
use std::time::{Duration, Instant};

use flowc_core::CancellationToken;
use flowc_topology::{DeploymentService, EnvironmentService, GatewayService, ListenerService};

#[cfg(feature = "prometheus")]
use flowc_observability::MetricsCollector;

/// Shared state wired in once at process start (`flowc-server`), handed to
/// every handler via axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    pub gateways: Arc<GatewayService>,
    pub listeners: Arc<ListenerService>,
    pub environments: Arc<EnvironmentService>,
    pub deployments: Arc<DeploymentService>,
    #[cfg(feature = "prometheus")]
    pub metrics: Option<Arc<MetricsCollector>>,
    started_at: Instant,
    read_timeout: Duration,
    write_timeout: Duration,
}

impl AppState {
    pub fn new(
        gateways: Arc<GatewayService>,
        listeners: Arc<ListenerService>,
        environments: Arc<EnvironmentService>,
        deployments: Arc<DeploymentService>,
        read_timeout: Duration,
        write_timeout: Duration,
    ) -> Self {
        Self {
            gateways,
            listeners,
            environments,
            deployments,
            #[cfg(feature = "prometheus")]
            metrics: None,
            started_at: Instant::now(),
            read_timeout,
            write_timeout,
        }
    }

    #[cfg(feature = "prometheus")]
    pub fn with_metrics(mut self, metrics: Arc<MetricsCollector>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Token for a read-only request, bounded by the configured read
    /// timeout.
    pub fn read_token(&self) -> CancellationToken {
        CancellationToken::with_timeout(self.read_timeout)
    }

    /// Token for a mutating request, bounded by the configured write
    /// timeout.
    pub fn write_token(&self) -> CancellationToken {
        CancellationToken::with_timeout(self.write_timeout)
    }

    pub fn uptime_secs(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}
