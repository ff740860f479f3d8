use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use flowc_core::{CancellationToken, Deployment, Environment, FlowcError, Gateway, Listener};
use tracing::{debug, warn};

use crate::repository::{DeploymentPatch, EnvironmentPatch, GatewayPatch, ListenerPatch, Repository};

/// All mutable state behind a single reader/writer lock, so that every
/// multi-entity uniqueness check is resolved inside one writer critical
/// section instead of a separate check-then-insert.
#[derive(Default)]
struct Inner {
    gateways: HashMap<String, Gateway>,
    listeners: HashMap<String, Listener>,
    environments: HashMap<String, Environment>,
    deployments: HashMap<String, Deployment>,

    node_id_to_gateway: HashMap<String, String>,
    deployment_to_node: HashMap<String, String>,
    deployment_to_environment: HashMap<String, String>,
    node_to_deployments: HashMap<String, Vec<String>>,
    environment_to_deployments: HashMap<String, Vec<String>>,
}

impl Inner {
    fn listener_port_taken(&self, gateway_id: &str, port: u16, exclude_id: Option<&str>) -> bool {
        self.listeners.values().any(|l| {
            l.gateway_id == gateway_id && l.port == port && Some(l.id.as_str()) != exclude_id
        })
    }

    fn environment_name_taken(&self, listener_id: &str, name: &str, exclude_id: Option<&str>) -> bool {
        self.environments.values().any(|e| {
            e.listener_id == listener_id && e.name == name && Some(e.id.as_str()) != exclude_id
        })
    }

    fn environment_hostname_taken(
        &self,
        listener_id: &str,
        hostname: &str,
        exclude_id: Option<&str>,
    ) -> bool {
        self.environments.values().any(|e| {
            e.listener_id == listener_id
                && e.hostname == hostname
                && Some(e.id.as_str()) != exclude_id
        })
    }
}

/// Reference in-memory repository. Thread-safe; every write path acquires
/// the single lock once for its whole critical section.
pub struct InMemoryRepository {
    inner: RwLock<Inner>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
        }
    }
}

impl Default for InMemoryRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn create_gateway(
        &self,
        gateway: Gateway,
        token: &CancellationToken,
    ) -> Result<Gateway, FlowcError> {
        token.check()?;
        let mut inner = self.inner.write().unwrap();
        if inner.node_id_to_gateway.contains_key(&gateway.node_id) {
            return Err(FlowcError::AlreadyExists(format!(
                "gateway with nodeId {}",
                gateway.node_id
            )));
        }
        inner
            .node_id_to_gateway
            .insert(gateway.node_id.clone(), gateway.id.clone());
        inner.gateways.insert(gateway.id.clone(), gateway.clone());
        debug!(gateway_id = %gateway.id, node_id = %gateway.node_id, "gateway created");
        Ok(gateway)
    }

    async fn get_gateway(&self, id: &str, token: &CancellationToken) -> Result<Gateway, FlowcError> {
        token.check()?;
        let inner = self.inner.read().unwrap();
        inner
            .gateways
            .get(id)
            .cloned()
            .ok_or_else(|| FlowcError::NotFound(format!("gateway {id}")))
    }

    async fn get_gateway_by_node_id(
        &self,
        node_id: &str,
        token: &CancellationToken,
    ) -> Result<Gateway, FlowcError> {
        token.check()?;
        let inner = self.inner.read().unwrap();
        let gateway_id = inner
            .node_id_to_gateway
            .get(node_id)
            .ok_or_else(|| FlowcError::NotFound(format!("gateway with nodeId {node_id}")))?;
        inner
            .gateways
            .get(gateway_id)
            .cloned()
            .ok_or_else(|| FlowcError::NotFound(format!("gateway {gateway_id}")))
    }

    async fn list_gateways(&self, token: &CancellationToken) -> Result<Vec<Gateway>, FlowcError> {
        token.check()?;
        let inner = self.inner.read().unwrap();
        Ok(inner.gateways.values().cloned().collect())
    }

    async fn update_gateway(
        &self,
        id: &str,
        patch: GatewayPatch,
        token: &CancellationToken,
    ) -> Result<Gateway, FlowcError> {
        token.check()?;
        let mut inner = self.inner.write().unwrap();
        let gateway = inner
            .gateways
            .get_mut(id)
            .ok_or_else(|| FlowcError::NotFound(format!("gateway {id}")))?;
        if let Some(name) = patch.name {
            gateway.name = name;
        }
        if let Some(description) = patch.description {
            gateway.description = description;
        }
        if let Some(status) = patch.status {
            gateway.status = status;
        }
        gateway.updated_at = chrono::Utc::now();
        Ok(gateway.clone())
    }

    async fn delete_gateway(&self, id: &str, token: &CancellationToken) -> Result<(), FlowcError> {
        token.check()?;
        let mut inner = self.inner.write().unwrap();
        let gateway = inner
            .gateways
            .remove(id)
            .ok_or_else(|| FlowcError::NotFound(format!("gateway {id}")))?;
        inner.node_id_to_gateway.remove(&gateway.node_id);
        Ok(())
    }

    async fn create_listener(
        &self,
        listener: Listener,
        token: &CancellationToken,
    ) -> Result<Listener, FlowcError> {
        token.check()?;
        let mut inner = self.inner.write().unwrap();
        if !inner.gateways.contains_key(&listener.gateway_id) {
            return Err(FlowcError::NotFound(format!(
                "gateway {}",
                listener.gateway_id
            )));
        }
        if inner.listener_port_taken(&listener.gateway_id, listener.port, None) {
            return Err(FlowcError::PortInUse(listener.port.to_string()));
        }
        inner.listeners.insert(listener.id.clone(), listener.clone());
        Ok(listener)
    }

    async fn get_listener(&self, id: &str, token: &CancellationToken) -> Result<Listener, FlowcError> {
        token.check()?;
        let inner = self.inner.read().unwrap();
        inner
            .listeners
            .get(id)
            .cloned()
            .ok_or_else(|| FlowcError::NotFound(format!("listener {id}")))
    }

    async fn list_listeners_by_gateway(
        &self,
        gateway_id: &str,
        token: &CancellationToken,
    ) -> Result<Vec<Listener>, FlowcError> {
        token.check()?;
        let inner = self.inner.read().unwrap();
        Ok(inner
            .listeners
            .values()
            .filter(|l| l.gateway_id == gateway_id)
            .cloned()
            .collect())
    }

    async fn update_listener(
        &self,
        id: &str,
        patch: ListenerPatch,
        token: &CancellationToken,
    ) -> Result<Listener, FlowcError> {
        token.check()?;
        let mut inner = self.inner.write().unwrap();
        let listener = inner
            .listeners
            .get_mut(id)
            .ok_or_else(|| FlowcError::NotFound(format!("listener {id}")))?;
        if let Some(tls) = patch.tls {
            listener.tls = tls;
        }
        if let Some(http2) = patch.http2 {
            listener.http2 = http2;
        }
        if let Some(access_log) = patch.access_log {
            listener.access_log = access_log;
        }
        listener.updated_at = chrono::Utc::now();
        Ok(listener.clone())
    }

    async fn delete_listener(&self, id: &str, token: &CancellationToken) -> Result<(), FlowcError> {
        token.check()?;
        let mut inner = self.inner.write().unwrap();
        inner
            .listeners
            .remove(id)
            .ok_or_else(|| FlowcError::NotFound(format!("listener {id}")))?;
        Ok(())
    }

    async fn create_environment(
        &self,
        environment: Environment,
        token: &CancellationToken,
    ) -> Result<Environment, FlowcError> {
        token.check()?;
        let mut inner = self.inner.write().unwrap();
        if !inner.listeners.contains_key(&environment.listener_id) {
            return Err(FlowcError::NotFound(format!(
                "listener {}",
                environment.listener_id
            )));
        }
        if inner.environment_name_taken(&environment.listener_id, &environment.name, None) {
            return Err(FlowcError::NameInUse(environment.name.clone()));
        }
        if inner.environment_hostname_taken(&environment.listener_id, &environment.hostname, None) {
            return Err(FlowcError::HostnameInUse(environment.hostname.clone()));
        }
        inner
            .environments
            .insert(environment.id.clone(), environment.clone());
        Ok(environment)
    }

    async fn get_environment(
        &self,
        id: &str,
        token: &CancellationToken,
    ) -> Result<Environment, FlowcError> {
        token.check()?;
        let inner = self.inner.read().unwrap();
        inner
            .environments
            .get(id)
            .cloned()
            .ok_or_else(|| FlowcError::NotFound(format!("environment {id}")))
    }

    async fn list_environments_by_listener(
        &self,
        listener_id: &str,
        token: &CancellationToken,
    ) -> Result<Vec<Environment>, FlowcError> {
        token.check()?;
        let inner = self.inner.read().unwrap();
        Ok(inner
            .environments
            .values()
            .filter(|e| e.listener_id == listener_id)
            .cloned()
            .collect())
    }

    async fn update_environment(
        &self,
        id: &str,
        patch: EnvironmentPatch,
        token: &CancellationToken,
    ) -> Result<Environment, FlowcError> {
        token.check()?;
        let mut inner = self.inner.write().unwrap();
        let (listener_id, current_hostname) = {
            let env = inner
                .environments
                .get(id)
                .ok_or_else(|| FlowcError::NotFound(format!("environment {id}")))?;
            (env.listener_id.clone(), env.hostname.clone())
        };
        if let Some(ref hostname) = patch.hostname {
            if hostname != &current_hostname
                && inner.environment_hostname_taken(&listener_id, hostname, Some(id))
            {
                return Err(FlowcError::HostnameInUse(hostname.clone()));
            }
        }
        let env = inner.environments.get_mut(id).unwrap();
        if let Some(hostname) = patch.hostname {
            env.hostname = hostname;
        }
        if let Some(description) = patch.description {
            env.description = description;
        }
        if let Some(http_filters) = patch.http_filters {
            env.http_filters = http_filters;
        }
        env.updated_at = chrono::Utc::now();
        Ok(env.clone())
    }

    async fn delete_environment(&self, id: &str, token: &CancellationToken) -> Result<(), FlowcError> {
        token.check()?;
        let mut inner = self.inner.write().unwrap();
        inner
            .environments
            .remove(id)
            .ok_or_else(|| FlowcError::NotFound(format!("environment {id}")))?;
        Ok(())
    }

    async fn create_deployment(
        &self,
        deployment: Deployment,
        token: &CancellationToken,
    ) -> Result<Deployment, FlowcError> {
        token.check()?;
        let mut inner = self.inner.write().unwrap();
        if inner.deployments.contains_key(&deployment.id) {
            return Err(FlowcError::AlreadyExists(format!(
                "deployment {}",
                deployment.id
            )));
        }
        inner
            .deployments
            .insert(deployment.id.clone(), deployment.clone());
        Ok(deployment)
    }

    async fn get_deployment(
        &self,
        id: &str,
        token: &CancellationToken,
    ) -> Result<Deployment, FlowcError> {
        token.check()?;
        let inner = self.inner.read().unwrap();
        inner
            .deployments
            .get(id)
            .cloned()
            .ok_or_else(|| FlowcError::NotFound(format!("deployment {id}")))
    }

    async fn list_deployments(&self, token: &CancellationToken) -> Result<Vec<Deployment>, FlowcError> {
        token.check()?;
        let inner = self.inner.read().unwrap();
        Ok(inner.deployments.values().cloned().collect())
    }

    async fn update_deployment(
        &self,
        id: &str,
        deployment: Deployment,
        token: &CancellationToken,
    ) -> Result<Deployment, FlowcError> {
        token.check()?;
        let mut inner = self.inner.write().unwrap();
        if !inner.deployments.contains_key(id) {
            return Err(FlowcError::NotFound(format!("deployment {id}")));
        }
        inner.deployments.insert(id.to_string(), deployment.clone());
        Ok(deployment)
    }

    async fn patch_deployment_status(
        &self,
        id: &str,
        patch: DeploymentPatch,
        token: &CancellationToken,
    ) -> Result<Deployment, FlowcError> {
        token.check()?;
        let mut inner = self.inner.write().unwrap();
        let deployment = inner
            .deployments
            .get_mut(id)
            .ok_or_else(|| FlowcError::NotFound(format!("deployment {id}")))?;
        if let Some(status) = patch.status {
            deployment.status = status;
        }
        if let Some(description) = patch.description {
            deployment.description = description;
        }
        deployment.updated_at = chrono::Utc::now();
        Ok(deployment.clone())
    }

    async fn delete_deployment(&self, id: &str, token: &CancellationToken) -> Result<(), FlowcError> {
        token.check()?;
        let mut inner = self.inner.write().unwrap();
        inner
            .deployments
            .remove(id)
            .ok_or_else(|| FlowcError::NotFound(format!("deployment {id}")))?;
        Ok(())
    }

    async fn set_node_id(
        &self,
        deployment_id: &str,
        node_id: &str,
        token: &CancellationToken,
    ) -> Result<(), FlowcError> {
        token.check()?;
        let mut inner = self.inner.write().unwrap();
        inner
            .deployment_to_node
            .insert(deployment_id.to_string(), node_id.to_string());
        inner
            .node_to_deployments
            .entry(node_id.to_string())
            .or_default()
            .push(deployment_id.to_string());
        Ok(())
    }

    async fn get_node_id(
        &self,
        deployment_id: &str,
        token: &CancellationToken,
    ) -> Result<String, FlowcError> {
        token.check()?;
        let inner = self.inner.read().unwrap();
        inner
            .deployment_to_node
            .get(deployment_id)
            .cloned()
            .ok_or_else(|| FlowcError::NotFound(format!("nodeId mapping for deployment {deployment_id}")))
    }

    async fn delete_node_id(&self, deployment_id: &str, token: &CancellationToken) -> Result<(), FlowcError> {
        token.check()?;
        let mut inner = self.inner.write().unwrap();
        if let Some(node_id) = inner.deployment_to_node.remove(deployment_id) {
            if let Some(list) = inner.node_to_deployments.get_mut(&node_id) {
                list.retain(|d| d != deployment_id);
            }
        } else {
            warn!(deployment_id, "no nodeId mapping to delete");
        }
        Ok(())
    }

    async fn list_deployments_by_node_id(
        &self,
        node_id: &str,
        token: &CancellationToken,
    ) -> Result<Vec<String>, FlowcError> {
        token.check()?;
        let inner = self.inner.read().unwrap();
        Ok(inner
            .node_to_deployments
            .get(node_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn set_environment_id(
        &self,
        deployment_id: &str,
        environment_id: &str,
        token: &CancellationToken,
    ) -> Result<(), FlowcError> {
        token.check()?;
        let mut inner = self.inner.write().unwrap();
        inner
            .deployment_to_environment
            .insert(deployment_id.to_string(), environment_id.to_string());
        inner
            .environment_to_deployments
            .entry(environment_id.to_string())
            .or_default()
            .push(deployment_id.to_string());
        Ok(())
    }

    async fn get_environment_id(
        &self,
        deployment_id: &str,
        token: &CancellationToken,
    ) -> Result<String, FlowcError> {
        token.check()?;
        let inner = self.inner.read().unwrap();
        inner
            .deployment_to_environment
            .get(deployment_id)
            .cloned()
            .ok_or_else(|| {
                FlowcError::NotFound(format!("environmentId mapping for deployment {deployment_id}"))
            })
    }

    async fn delete_environment_id(
        &self,
        deployment_id: &str,
        token: &CancellationToken,
    ) -> Result<(), FlowcError> {
        token.check()?;
        let mut inner = self.inner.write().unwrap();
        if let Some(environment_id) = inner.deployment_to_environment.remove(deployment_id) {
            if let Some(list) = inner.environment_to_deployments.get_mut(&environment_id) {
                list.retain(|d| d != deployment_id);
            }
        } else {
            warn!(deployment_id, "no environmentId mapping to delete");
        }
        Ok(())
    }

    async fn list_deployments_by_environment_id(
        &self,
        environment_id: &str,
        token: &CancellationToken,
    ) -> Result<Vec<String>, FlowcError> {
        token.check()?;
        let inner = self.inner.read().unwrap();
        Ok(inner
            .environment_to_deployments
            .get(environment_id)
            .cloned()
            .unwrap_or_default())
    }
}
