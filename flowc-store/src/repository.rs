use async_trait::async_trait;
use flowc_core::{CancellationToken, Deployment, Environment, FlowcError, Gateway, Listener};

/// Partial update for a gateway. `None` fields are left unchanged.
#[derive(Debug, Clone, Default)]
pub struct GatewayPatch {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub status: Option<flowc_core::entity::GatewayStatus>,
}

/// Partial update for a listener. Port is immutable once created.
#[derive(Debug, Clone, Default)]
pub struct ListenerPatch {
    pub tls: Option<Option<flowc_core::entity::TlsConfig>>,
    pub http2: Option<bool>,
    pub access_log: Option<Option<flowc_core::entity::AccessLogConfig>>,
}

/// Partial update for an environment. `name` cannot be changed; `hostname`
/// changes require a uniqueness re-check.
#[derive(Debug, Clone, Default)]
pub struct EnvironmentPatch {
    pub hostname: Option<String>,
    pub description: Option<Option<String>>,
    pub http_filters: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default)]
pub struct DeploymentPatch {
    pub status: Option<flowc_core::deployment::DeploymentStatus>,
    pub description: Option<Option<String>>,
}

/// Uniform data-access contract for topology entities and the
/// deployment-to-proxy mappings. All multi-step invariant checks (e.g.
/// uniqueness) are resolved inside a single critical section by the
/// implementation; callers never need to "check then insert".
///
/// Every operation accepts a cancellation token and must check it before
/// doing any work.
#[async_trait]
pub trait Repository: Send + Sync {
    // ---- Gateway ----
    async fn create_gateway(
        &self,
        gateway: Gateway,
        token: &CancellationToken,
    ) -> Result<Gateway, FlowcError>;
    async fn get_gateway(&self, id: &str, token: &CancellationToken) -> Result<Gateway, FlowcError>;
    async fn get_gateway_by_node_id(
        &self,
        node_id: &str,
        token: &CancellationToken,
    ) -> Result<Gateway, FlowcError>;
    async fn list_gateways(&self, token: &CancellationToken) -> Result<Vec<Gateway>, FlowcError>;
    async fn update_gateway(
        &self,
        id: &str,
        patch: GatewayPatch,
        token: &CancellationToken,
    ) -> Result<Gateway, FlowcError>;
    async fn delete_gateway(&self, id: &str, token: &CancellationToken) -> Result<(), FlowcError>;

    // ---- Listener ----
    async fn create_listener(
        &self,
        listener: Listener,
        token: &CancellationToken,
    ) -> Result<Listener, FlowcError>;
    async fn get_listener(&self, id: &str, token: &CancellationToken) -> Result<Listener, FlowcError>;
    async fn list_listeners_by_gateway(
        &self,
        gateway_id: &str,
        token: &CancellationToken,
    ) -> Result<Vec<Listener>, FlowcError>;
    async fn update_listener(
        &self,
        id: &str,
        patch: ListenerPatch,
        token: &CancellationToken,
    ) -> Result<Listener, FlowcError>;
    async fn delete_listener(&self, id: &str, token: &CancellationToken) -> Result<(), FlowcError>;

    // ---- Environment ----
    async fn create_environment(
        &self,
        environment: Environment,
        token: &CancellationToken,
    ) -> Result<Environment, FlowcError>;
    async fn get_environment(
        &self,
        id: &str,
        token: &CancellationToken,
    ) -> Result<Environment, FlowcError>;
    async fn list_environments_by_listener(
        &self,
        listener_id: &str,
        token: &CancellationToken,
    ) -> Result<Vec<Environment>, FlowcError>;
    async fn update_environment(
        &self,
        id: &str,
        patch: EnvironmentPatch,
        token: &CancellationToken,
    ) -> Result<Environment, FlowcError>;
    async fn delete_environment(&self, id: &str, token: &CancellationToken) -> Result<(), FlowcError>;

    // ---- Deployment ----
    async fn create_deployment(
        &self,
        deployment: Deployment,
        token: &CancellationToken,
    ) -> Result<Deployment, FlowcError>;
    async fn get_deployment(
        &self,
        id: &str,
        token: &CancellationToken,
    ) -> Result<Deployment, FlowcError>;
    async fn list_deployments(&self, token: &CancellationToken) -> Result<Vec<Deployment>, FlowcError>;
    async fn update_deployment(
        &self,
        id: &str,
        deployment: Deployment,
        token: &CancellationToken,
    ) -> Result<Deployment, FlowcError>;
    async fn patch_deployment_status(
        &self,
        id: &str,
        patch: DeploymentPatch,
        token: &CancellationToken,
    ) -> Result<Deployment, FlowcError>;
    async fn delete_deployment(&self, id: &str, token: &CancellationToken) -> Result<(), FlowcError>;

    // ---- deploymentId -> nodeId mapping ----
    async fn set_node_id(
        &self,
        deployment_id: &str,
        node_id: &str,
        token: &CancellationToken,
    ) -> Result<(), FlowcError>;
    async fn get_node_id(
        &self,
        deployment_id: &str,
        token: &CancellationToken,
    ) -> Result<String, FlowcError>;
    async fn delete_node_id(&self, deployment_id: &str, token: &CancellationToken) -> Result<(), FlowcError>;
    async fn list_deployments_by_node_id(
        &self,
        node_id: &str,
        token: &CancellationToken,
    ) -> Result<Vec<String>, FlowcError>;

    // ---- deploymentId -> environmentId mapping ----
    async fn set_environment_id(
        &self,
        deployment_id: &str,
        environment_id: &str,
        token: &CancellationToken,
    ) -> Result<(), FlowcError>;
    async fn get_environment_id(
        &self,
        deployment_id: &str,
        token: &CancellationToken,
    ) -> Result<String, FlowcError>;
    async fn delete_environment_id(
        &self,
        deployment_id: &str,
        token: &CancellationToken,
    ) -> Result<(), FlowcError>;
    async fn list_deployments_by_environment_id(
        &self,
        environment_id: &str,
        token: &CancellationToken,
    ) -> Result<Vec<String>, FlowcError>;
}
