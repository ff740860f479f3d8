use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use flowc_admin::AdminServer;
use flowc_admin::AppState;
use flowc_bundle::ParserRegistry;
use flowc_core::config::{ControlPlaneConfig, RepositoryBackend};
use flowc_observability::init_tracing;
use flowc_store::{InMemoryRepository, Repository, SnapshotCache};
use flowc_topology::{DeploymentService, EnvironmentService, GatewayService, ListenerService};
use flowc_translator::{DefaultStrategyFactory, StrategyConfig};
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "flowc-server", version, about = "flowc control plane")]
struct Cli {
    /// Path to the control plane's YAML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Fallback log level used when `RUST_LOG` is unset.
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Emit structured JSON logs instead of the default human-readable format.
    #[arg(long, default_value_t = false)]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level, cli.json_logs);

    info!(version = env!("CARGO_PKG_VERSION"), "flowc control plane starting");

    let config = ControlPlaneConfig::load(cli.config.as_deref().and_then(|p| p.to_str()))?;

    let repo: Arc<dyn Repository> = match config.repository.backend {
        RepositoryBackend::Memory => {
            info!("using in-memory repository backend");
            Arc::new(InMemoryRepository::new())
        }
        RepositoryBackend::Pluggable => {
            #[cfg(feature = "etcd")]
            {
                let repo = flowc_store::etcd::EtcdRepository::connect(
                    &config.repository.endpoints,
                    "flowc",
                )
                .await?;
                Arc::new(repo)
            }
            #[cfg(not(feature = "etcd"))]
            {
                error!("repository.backend = pluggable requires the `etcd` feature; falling back to in-memory");
                Arc::new(InMemoryRepository::new())
            }
        }
    };

    #[cfg(feature = "prometheus")]
    let metrics = if config.observability.prometheus.enabled {
        Some(Arc::new(flowc_observability::MetricsCollector::new()?))
    } else {
        None
    };

    let cache = Arc::new(SnapshotCache::new());

    let mut environments_svc = EnvironmentService::new(repo.clone(), cache.clone());
    #[cfg(feature = "prometheus")]
    if let Some(m) = &metrics {
        environments_svc = environments_svc.with_metrics(m.clone());
    }
    let environments = Arc::new(environments_svc);

    let mut listeners_svc = ListenerService::new(repo.clone(), cache.clone(), environments.clone());
    #[cfg(feature = "prometheus")]
    if let Some(m) = &metrics {
        listeners_svc = listeners_svc.with_metrics(m.clone());
    }
    let listeners = Arc::new(listeners_svc);

    let mut gateways_svc = GatewayService::new(repo.clone(), cache.clone(), listeners.clone());
    #[cfg(feature = "prometheus")]
    if let Some(m) = &metrics {
        gateways_svc = gateways_svc.with_metrics(m.clone());
    }
    let gateways = Arc::new(gateways_svc);

    let mut deployments_svc = DeploymentService::new(
        repo.clone(),
        cache.clone(),
        ParserRegistry::with_defaults(),
        Arc::new(DefaultStrategyFactory),
        StrategyConfig::default(),
    );
    #[cfg(feature = "prometheus")]
    if let Some(m) = &metrics {
        deployments_svc = deployments_svc.with_metrics(m.clone());
    }
    let deployments = Arc::new(deployments_svc);

    let mut state = AppState::new(
        gateways,
        listeners,
        environments,
        deployments,
        Duration::from_millis(config.timeouts.read_ms),
        Duration::from_millis(config.timeouts.write_ms),
    );

    #[cfg(feature = "prometheus")]
    if let Some(m) = metrics {
        state = state.with_metrics(m);
    }

    let admin = AdminServer::new(config.admin.clone(), Arc::new(state));

    info!(addr = %config.admin.addr, "admin API ready");
    if let Err(e) = admin.start().await {
        error!(error = %e, "admin API exited with an error");
        return Err(e);
    }

    info!("flowc control plane stopped");
    Ok(())
}
