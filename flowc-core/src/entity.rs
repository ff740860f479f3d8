use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Connection state as last observed from the data-plane attach stream.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum GatewayStatus {
    Connected,
    Disconnected,
    Unknown,
}

impl Default for GatewayStatus {
    fn default() -> Self {
        GatewayStatus::Unknown
    }
}

/// Control-plane record for one proxy instance, identified by `nodeId`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Gateway {
    pub id: String,

    /// Globally unique; the identity the data plane uses to attach to
    /// the snapshot cache. Never hard-code this to a single constant —
    /// it must always be resolved per gateway.
    pub node_id: String,

    pub name: String,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub status: GatewayStatus,

    #[serde(default)]
    pub defaults: Option<GatewayDefaults>,

    #[serde(default)]
    pub labels: HashMap<String, String>,

    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

/// Defaults applied when a `CreateGateway` request omits its listener tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayDefaults {
    #[serde(default = "default_listener_port")]
    pub listener_port: u16,
    #[serde(default = "default_environment_name")]
    pub environment_name: String,
}

impl Default for GatewayDefaults {
    fn default() -> Self {
        Self {
            listener_port: default_listener_port(),
            environment_name: default_environment_name(),
        }
    }
}

fn default_listener_port() -> u16 {
    8080
}

fn default_environment_name() -> String {
    "production".to_string()
}

/// Port binding on a gateway. `(gateway_id, port)` is unique.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Listener {
    pub id: String,
    pub gateway_id: String,
    pub port: u16,

    #[serde(default = "default_address")]
    pub address: String,

    #[serde(default)]
    pub tls: Option<TlsConfig>,

    #[serde(default = "default_true")]
    pub http2: bool,

    #[serde(default)]
    pub access_log: Option<AccessLogConfig>,

    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

fn default_address() -> String {
    "0.0.0.0".to_string()
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TlsConfig {
    pub cert_chain: String,
    pub private_key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessLogConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub path: Option<String>,
}

/// SNI-hostname-scoped slot within a listener. Both `(listener_id, name)`
/// and `(listener_id, hostname)` are unique. Hostname `*` is the catch-all.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Environment {
    pub id: String,
    pub listener_id: String,
    pub name: String,
    pub hostname: String,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub http_filters: Vec<String>,

    #[serde(default)]
    pub labels: HashMap<String, String>,

    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl Environment {
    pub fn is_catch_all(&self) -> bool {
        self.hostname == "*"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gateway_defaults() {
        let d = GatewayDefaults::default();
        assert_eq!(d.listener_port, 8080);
        assert_eq!(d.environment_name, "production");
    }

    #[test]
    fn test_environment_catch_all() {
        let env = Environment {
            id: "e1".into(),
            listener_id: "l1".into(),
            name: "production".into(),
            hostname: "*".into(),
            description: None,
            http_filters: vec![],
            labels: Default::default(),
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        };
        assert!(env.is_catch_all());
    }

    #[test]
    fn test_gateway_status_default_is_unknown() {
        assert_eq!(GatewayStatus::default(), GatewayStatus::Unknown);
    }
}
