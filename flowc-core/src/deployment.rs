use serde::{Deserialize, Serialize};

/// Deployment lifecycle state. Monotone through
/// `pending -> deploying -> deployed` on success, `updating -> deployed`
/// on a successful update, and `failed` from any translate/publish error
/// in either path.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DeploymentStatus {
    Pending,
    Deploying,
    Updating,
    Deployed,
    Failed,
}

impl DeploymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeploymentStatus::Pending => "pending",
            DeploymentStatus::Deploying => "deploying",
            DeploymentStatus::Updating => "updating",
            DeploymentStatus::Deployed => "deployed",
            DeploymentStatus::Failed => "failed",
        }
    }
}

/// An API bundle materialized into proxy routes under exactly one
/// environment. The environment binding itself lives in the repository's
/// `deploymentId -> environmentId` mapping, not on this struct.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Deployment {
    pub id: String,
    pub name: String,
    pub version: String,

    /// Base path the deployment's routes are rooted under.
    pub context: String,

    pub status: DeploymentStatus,

    #[serde(default)]
    pub description: Option<String>,

    /// The manifest parsed from the uploaded bundle (§4.8), retained for
    /// re-translation on `update`.
    pub manifest: BundleManifest,

    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

/// Parsed `flowc.y(a)ml` manifest, after default application.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleManifest {
    pub name: String,
    pub version: String,
    pub context: String,

    #[serde(default = "default_api_type")]
    pub api_type: ApiType,

    pub upstream: UpstreamRef,
    pub gateway: GatewayBinding,

    #[serde(default)]
    pub spec_file: Option<String>,
}

fn default_api_type() -> ApiType {
    ApiType::Rest
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ApiType {
    Rest,
    Websocket,
    Grpc,
    Graphql,
}

impl ApiType {
    /// Auto-detection priority order when the manifest omits `apiType`.
    pub fn detect_priority() -> [ApiType; 4] {
        [
            ApiType::Rest,
            ApiType::Websocket,
            ApiType::Grpc,
            ApiType::Graphql,
        ]
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpstreamRef {
    pub host: String,
    pub port: u16,

    #[serde(default = "default_scheme")]
    pub scheme: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout: u64,
}

fn default_scheme() -> String {
    "http".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

/// Identifies which gateway/port/environment a deployment binds to.
/// Either `gateway_id` or `node_id` must be present.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayBinding {
    #[serde(default)]
    pub gateway_id: Option<String>,

    #[serde(default)]
    pub node_id: Option<String>,

    pub port: u16,
    pub environment: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_as_str() {
        assert_eq!(DeploymentStatus::Pending.as_str(), "pending");
        assert_eq!(DeploymentStatus::Deployed.as_str(), "deployed");
        assert_eq!(DeploymentStatus::Failed.as_str(), "failed");
    }

    #[test]
    fn test_api_type_detect_priority() {
        let order = ApiType::detect_priority();
        assert_eq!(order[0], ApiType::Rest);
        assert_eq!(order[3], ApiType::Graphql);
    }

    #[test]
    fn test_upstream_ref_defaults_via_serde() {
        let json = r#"{"host":"127.0.0.1","port":8000}"#;
        let up: UpstreamRef = serde_json::from_str(json).unwrap();
        assert_eq!(up.scheme, "http");
        assert_eq!(up.timeout, 30);
    }
}
