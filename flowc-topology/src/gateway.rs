use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use flowc_core::entity::{Gateway, GatewayDefaults};
use flowc_core::{CancellationToken, Deployment, FlowcError};
use flowc_observability::AuditEntry;
#[cfg(feature = "prometheus")]
use flowc_observability::MetricsCollector;
use flowc_store::{GatewayPatch, Repository, SnapshotCache};
use tracing::{error, info};
use uuid::Uuid;

use crate::dto::{CreateEnvironmentSpec, CreateGatewayRequest, CreateListenerSpec, UpdateGatewayRequest};
use crate::listener::ListenerService;

/// Gateway lifecycle: the root of the topology tree, identified by its
/// `nodeId`.
pub struct GatewayService {
    repo: Arc<dyn Repository>,
    cache: Arc<SnapshotCache>,
    listeners: Arc<ListenerService>,
    #[cfg(feature = "prometheus")]
    metrics: Option<Arc<MetricsCollector>>,
}

impl GatewayService {
    pub fn new(
        repo: Arc<dyn Repository>,
        cache: Arc<SnapshotCache>,
        listeners: Arc<ListenerService>,
    ) -> Self {
        Self {
            repo,
            cache,
            listeners,
            #[cfg(feature = "prometheus")]
            metrics: None,
        }
    }

    #[cfg(feature = "prometheus")]
    pub fn with_metrics(mut self, metrics: Arc<MetricsCollector>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Validates node-id uniqueness (enforced by the repository) and the
    /// entire nested tree before creating anything. Defaults an empty
    /// listener list and, per listener, an empty environment list. Creates
    /// bottom-up (listener -> environments -> snapshot publish) and rolls
    /// back top-down on any failure, finally removing the node from the
    /// snapshot cache.
    pub async fn create(
        &self,
        req: CreateGatewayRequest,
        token: &CancellationToken,
    ) -> Result<Gateway, FlowcError> {
        token.check()?;
        let defaults = req.defaults.clone().unwrap_or_default();
        let listener_specs = resolve_listener_specs(req.listeners, &defaults);
        validate_unique_ports(&listener_specs)?;

        let now = Utc::now();
        let gateway = Gateway {
            id: Uuid::new_v4().to_string(),
            node_id: req.node_id,
            name: req.name,
            description: req.description,
            status: Default::default(),
            defaults: Some(defaults),
            labels: req.labels.unwrap_or_default(),
            created_at: now,
            updated_at: now,
        };
        let created = self.repo.create_gateway(gateway, token).await?;

        let mut created_listener_ids: Vec<String> = Vec::new();
        for spec in listener_specs {
            match self.listeners.create(&created.id, spec, token).await {
                Ok(listener) => created_listener_ids.push(listener.id),
                Err(e) => {
                    error!(gateway_id = %created.id, error = %e, "rolling back gateway after listener creation failure");
                    for listener_id in &created_listener_ids {
                        let _ = self.listeners.delete(listener_id, true, token).await;
                    }
                    let _ = self.repo.delete_gateway(&created.id, token).await;
                    self.cache.remove_node(&created.node_id);
                    AuditEntry::failure("create", "gateway", &created.id, &e.to_string()).emit();
                    return Err(e);
                }
            }
        }

        info!(gateway_id = %created.id, node_id = %created.node_id, "gateway created");
        AuditEntry::success("create", "gateway", &created.id).emit();
        #[cfg(feature = "prometheus")]
        if let Some(m) = &self.metrics {
            m.gateways_total.with_label_values(&[]).inc();
        }
        Ok(created)
    }

    pub async fn update(
        &self,
        id: &str,
        req: UpdateGatewayRequest,
        token: &CancellationToken,
    ) -> Result<Gateway, FlowcError> {
        token.check()?;
        let result = self
            .repo
            .update_gateway(
                id,
                GatewayPatch {
                    name: req.name,
                    description: req.description,
                    status: req.status,
                },
                token,
            )
            .await;
        match &result {
            Ok(_) => AuditEntry::success("update", "gateway", id).emit(),
            Err(e) => AuditEntry::failure("update", "gateway", id, &e.to_string()).emit(),
        }
        result
    }

    pub async fn get(&self, id: &str, token: &CancellationToken) -> Result<Gateway, FlowcError> {
        token.check()?;
        self.repo.get_gateway(id, token).await
    }

    pub async fn list(&self, token: &CancellationToken) -> Result<Vec<Gateway>, FlowcError> {
        token.check()?;
        self.repo.list_gateways(token).await
    }

    /// Refuses if listeners exist and `force` is false; otherwise cascades
    /// through listeners, environments, and deployments, then removes the
    /// node's snapshot entry.
    pub async fn delete(
        &self,
        id: &str,
        force: bool,
        token: &CancellationToken,
    ) -> Result<(), FlowcError> {
        token.check()?;
        let gateway = self.repo.get_gateway(id, token).await?;
        let listeners = self.repo.list_listeners_by_gateway(id, token).await?;
        if !listeners.is_empty() && !force {
            let e = FlowcError::HasChildren(format!(
                "gateway {id} still has {} listener(s)",
                listeners.len()
            ));
            AuditEntry::failure("delete", "gateway", id, &e.to_string()).emit();
            return Err(e);
        }
        for listener in &listeners {
            if let Err(e) = self.listeners.delete(&listener.id, true, token).await {
                AuditEntry::failure("delete", "gateway", id, &e.to_string()).emit();
                return Err(e);
            }
        }
        self.repo.delete_gateway(id, token).await?;
        self.cache.remove_node(&gateway.node_id);
        info!(gateway_id = %id, "gateway deleted");
        AuditEntry::success("delete", "gateway", id).emit();
        #[cfg(feature = "prometheus")]
        if let Some(m) = &self.metrics {
            m.gateways_total.with_label_values(&[]).dec();
        }
        Ok(())
    }

    /// Walks `deploymentsByNodeId(gateway.nodeId)` and returns the resolved
    /// deployments; deployments that no longer exist are silently skipped.
    pub async fn get_apis(
        &self,
        id: &str,
        token: &CancellationToken,
    ) -> Result<Vec<Deployment>, FlowcError> {
        token.check()?;
        let gateway = self.repo.get_gateway(id, token).await?;
        let deployment_ids = self
            .repo
            .list_deployments_by_node_id(&gateway.node_id, token)
            .await?;
        let mut deployments = Vec::with_capacity(deployment_ids.len());
        for deployment_id in deployment_ids {
            if let Ok(deployment) = self.repo.get_deployment(&deployment_id, token).await {
                deployments.push(deployment);
            }
        }
        Ok(deployments)
    }
}

fn resolve_listener_specs(
    listeners: Vec<CreateListenerSpec>,
    defaults: &GatewayDefaults,
) -> Vec<CreateListenerSpec> {
    if listeners.is_empty() {
        return vec![CreateListenerSpec {
            port: defaults.listener_port,
            address: None,
            tls: None,
            http2: None,
            access_log: None,
            environments: vec![default_environment_spec(defaults)],
        }];
    }
    listeners
        .into_iter()
        .map(|mut spec| {
            if spec.environments.is_empty() {
                spec.environments = vec![default_environment_spec(defaults)];
            }
            spec
        })
        .collect()
}

fn default_environment_spec(defaults: &GatewayDefaults) -> CreateEnvironmentSpec {
    CreateEnvironmentSpec {
        name: defaults.environment_name.clone(),
        hostname: Some("*".to_string()),
        description: None,
        http_filters: None,
        labels: None,
    }
}

fn validate_unique_ports(specs: &[CreateListenerSpec]) -> Result<(), FlowcError> {
    let mut ports = HashSet::new();
    for spec in specs {
        if !ports.insert(spec.port) {
            return Err(FlowcError::PortInUse(format!(
                "duplicate listener port {} in request",
                spec.port
            )));
        }
    }
    Ok(())
}
