use std::collections::HashMap;

use flowc_core::entity::{AccessLogConfig, GatewayDefaults, GatewayStatus, TlsConfig};
use serde::{Deserialize, Serialize};

/// Body of `POST /api/v1/gateways`. An empty `listeners` list is defaulted
/// to one listener on `defaults.listener_port` with one `production`/`*`
/// environment; an empty `environments` list within a listener is defaulted
/// the same way.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateGatewayRequest {
    pub node_id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub defaults: Option<GatewayDefaults>,
    #[serde(default)]
    pub labels: Option<HashMap<String, String>>,
    #[serde(default)]
    pub listeners: Vec<CreateListenerSpec>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateGatewayRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<Option<String>>,
    #[serde(default)]
    pub status: Option<GatewayStatus>,
}

/// A listener as embedded in `CreateGatewayRequest`, or standalone as the
/// body of `POST /api/v1/gateways/{id}/listeners`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateListenerSpec {
    pub port: u16,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub tls: Option<TlsConfig>,
    #[serde(default)]
    pub http2: Option<bool>,
    #[serde(default)]
    pub access_log: Option<AccessLogConfig>,
    #[serde(default)]
    pub environments: Vec<CreateEnvironmentSpec>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateListenerRequest {
    #[serde(default)]
    pub tls: Option<Option<TlsConfig>>,
    #[serde(default)]
    pub http2: Option<bool>,
    #[serde(default)]
    pub access_log: Option<Option<AccessLogConfig>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateEnvironmentSpec {
    pub name: String,
    #[serde(default)]
    pub hostname: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub http_filters: Option<Vec<String>>,
    #[serde(default)]
    pub labels: Option<HashMap<String, String>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateEnvironmentRequest {
    #[serde(default)]
    pub hostname: Option<String>,
    #[serde(default)]
    pub description: Option<Option<String>>,
    #[serde(default)]
    pub http_filters: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentStats {
    pub total: usize,
    pub deployed: usize,
    pub failed: usize,
    pub pending: usize,
    pub updating: usize,
    pub deploying: usize,
}
