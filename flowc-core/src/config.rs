use figment::providers::{Env, Format, Yaml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

/// Top-level configuration for the flowc control plane.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControlPlaneConfig {
    #[serde(default)]
    pub admin: AdminConfig,

    #[serde(default)]
    pub repository: RepositoryConfig,

    #[serde(default)]
    pub snapshot: SnapshotConfig,

    #[serde(default)]
    pub timeouts: TimeoutsConfig,

    #[serde(default)]
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminConfig {
    #[serde(default = "default_admin_addr")]
    pub addr: SocketAddr,

    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default)]
    pub cors_origins: Vec<String>,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            addr: default_admin_addr(),
            enabled: true,
            cors_origins: vec![],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RepositoryBackend {
    Memory,
    Pluggable,
}

impl Default for RepositoryBackend {
    fn default() -> Self {
        RepositoryBackend::Memory
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepositoryConfig {
    #[serde(default)]
    pub backend: RepositoryBackend,

    /// Endpoint list, meaningful only when `backend = pluggable`
    /// (e.g. an etcd-backed implementation).
    #[serde(default)]
    pub endpoints: Vec<String>,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            backend: RepositoryBackend::default(),
            endpoints: vec![],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotConfig {
    #[serde(default = "default_listener_port")]
    pub default_listener_port: u16,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            default_listener_port: default_listener_port(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeoutsConfig {
    #[serde(default = "default_read_timeout")]
    pub read_ms: u64,
    #[serde(default = "default_write_timeout")]
    pub write_ms: u64,
    #[serde(default = "default_idle_timeout")]
    pub idle_ms: u64,
}

impl Default for TimeoutsConfig {
    fn default() -> Self {
        Self {
            read_ms: default_read_timeout(),
            write_ms: default_write_timeout(),
            idle_ms: default_idle_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    #[serde(default)]
    pub prometheus: PrometheusConfig,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            prometheus: PrometheusConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrometheusConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_metrics_path")]
    pub path: String,
}

impl Default for PrometheusConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: default_metrics_path(),
        }
    }
}

impl ControlPlaneConfig {
    /// Load configuration from a YAML file plus `FLOWC_`-prefixed
    /// environment variable overrides (double-underscore nesting, e.g.
    /// `FLOWC_ADMIN__ADDR`).
    pub fn load(config_path: Option<&str>) -> anyhow::Result<Self> {
        let mut figment = Figment::new();

        if let Some(path) = config_path {
            figment = figment.merge(Yaml::file(path));
        } else {
            for default_path in &["flowc.yaml", "/etc/flowc/flowc.yaml", "config/flowc.yaml"] {
                if std::path::Path::new(default_path).exists() {
                    figment = figment.merge(Yaml::file(default_path));
                    break;
                }
            }
        }

        figment = figment.merge(Env::prefixed("FLOWC_").split("__"));

        let config: Self = figment.extract()?;
        Ok(config)
    }
}

impl Default for ControlPlaneConfig {
    fn default() -> Self {
        Self {
            admin: AdminConfig::default(),
            repository: RepositoryConfig::default(),
            snapshot: SnapshotConfig::default(),
            timeouts: TimeoutsConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

fn default_admin_addr() -> SocketAddr {
    "127.0.0.1:9180".parse().unwrap()
}

fn default_listener_port() -> u16 {
    8080
}

fn default_read_timeout() -> u64 {
    15000
}

fn default_write_timeout() -> u64 {
    15000
}

fn default_idle_timeout() -> u64 {
    60000
}

fn default_metrics_path() -> String {
    "/metrics".to_string()
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let cfg = ControlPlaneConfig::default();
        assert_eq!(cfg.admin.addr.port(), 9180);
        assert_eq!(cfg.snapshot.default_listener_port, 8080);
        assert_eq!(cfg.repository.backend, RepositoryBackend::Memory);
    }

    #[test]
    fn test_load_falls_back_to_defaults_without_file() {
        let cfg = ControlPlaneConfig::load(Some("/nonexistent/flowc.yaml")).unwrap();
        assert_eq!(cfg.admin.addr.port(), 9180);
    }
}
