use serde::{Deserialize, Serialize};

/// A proxy listener resource, as produced by the translator and held in
/// the snapshot cache. Distinct from `entity::Listener`, which is the
/// control-plane's port-binding record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProxyListener {
    pub name: String,
    pub address: String,
    pub port: u16,
    pub filter_chains: Vec<FilterChain>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterChain {
    /// SNI match, `environment.hostname`.
    pub server_name: String,
    pub route_config_name: String,
    pub http_filters: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteConfiguration {
    pub name: String,
    pub virtual_hosts: Vec<VirtualHost>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VirtualHost {
    pub name: String,
    #[serde(default = "default_domains")]
    pub domains: Vec<String>,
    pub routes: Vec<RouteEntry>,
}

fn default_domains() -> Vec<String> {
    vec!["*".to_string()]
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteEntry {
    pub path_prefix: String,
    pub methods: Vec<String>,
    pub cluster_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cluster {
    pub name: String,
    #[serde(default = "default_lb_policy")]
    pub lb_policy: String,
    #[serde(default)]
    pub health_check: Option<HealthCheck>,
    pub connect_timeout_ms: u64,
}

fn default_lb_policy() -> String {
    "round_robin".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthCheck {
    pub path: String,
    pub interval_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Endpoint {
    pub cluster_name: String,
    pub host: String,
    pub port: u16,
    #[serde(default = "default_weight")]
    pub weight: u32,
}

fn default_weight() -> u32 {
    1
}

/// The output of the translator for one deployment: everything the
/// snapshot cache needs to overlay onto a node's current snapshot.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResourceBundle {
    pub listeners: Vec<ProxyListener>,
    pub routes: Vec<RouteConfiguration>,
    pub clusters: Vec<Cluster>,
    pub endpoints: Vec<Endpoint>,
}

/// The versioned resource tuple held per-`nodeId` by the snapshot cache.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SnapshotTuple {
    pub listeners: Vec<ProxyListener>,
    pub routes: Vec<RouteConfiguration>,
    pub clusters: Vec<Cluster>,
    pub endpoints: Vec<Endpoint>,
    pub version: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_virtual_host_default_domains() {
        let json = r#"{"name":"vh","routes":[]}"#;
        let vh: VirtualHost = serde_json::from_str(json).unwrap();
        assert_eq!(vh.domains, vec!["*".to_string()]);
    }

    #[test]
    fn test_snapshot_tuple_default_is_empty_at_version_zero() {
        let snap = SnapshotTuple::default();
        assert_eq!(snap.version, 0);
        assert!(snap.listeners.is_empty());
    }

    #[test]
    fn test_cluster_default_lb_policy() {
        let json = r#"{"name":"c1","connect_timeout_ms":1000}"#;
        let c: Cluster = serde_json::from_str(json).unwrap();
        assert_eq!(c.lb_policy, "round_robin");
    }
}
