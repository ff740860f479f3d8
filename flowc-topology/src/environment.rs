use std::sync::Arc;

use chrono::Utc;
use flowc_core::entity::{Environment, Listener};
use flowc_core::resource::{FilterChain, ProxyListener};
use flowc_core::{CancellationToken, FlowcError};
use flowc_observability::AuditEntry;
#[cfg(feature = "prometheus")]
use flowc_observability::MetricsCollector;
use flowc_store::{EnvironmentPatch, Repository, SnapshotCache};
use tracing::{error, info};
use uuid::Uuid;

use crate::dto::CreateEnvironmentSpec;

/// Environment lifecycle, scoped one level below listeners. Every mutation
/// that changes the set of environments on a listener regenerates that
/// listener's xDS listener resource, since filter chains are per-environment.
pub struct EnvironmentService {
    repo: Arc<dyn Repository>,
    cache: Arc<SnapshotCache>,
    #[cfg(feature = "prometheus")]
    metrics: Option<Arc<MetricsCollector>>,
}

impl EnvironmentService {
    pub fn new(repo: Arc<dyn Repository>, cache: Arc<SnapshotCache>) -> Self {
        Self {
            repo,
            cache,
            #[cfg(feature = "prometheus")]
            metrics: None,
        }
    }

    #[cfg(feature = "prometheus")]
    pub fn with_metrics(mut self, metrics: Arc<MetricsCollector>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Inserts the environment record only; does not touch the snapshot.
    /// Used by `ListenerService::create`, which publishes all of a
    /// listener's environments in a single `bulkUpdate` once they all exist.
    pub(crate) async fn insert(
        &self,
        listener_id: &str,
        spec: CreateEnvironmentSpec,
        token: &CancellationToken,
    ) -> Result<Environment, FlowcError> {
        token.check()?;
        let now = Utc::now();
        let environment = Environment {
            id: Uuid::new_v4().to_string(),
            listener_id: listener_id.to_string(),
            name: spec.name,
            hostname: spec.hostname.unwrap_or_else(|| "*".to_string()),
            description: spec.description,
            http_filters: spec.http_filters.unwrap_or_default(),
            labels: spec.labels.unwrap_or_default(),
            created_at: now,
            updated_at: now,
        };
        self.repo.create_environment(environment, token).await
    }

    /// Creates a standalone environment under an existing listener and
    /// republishes the listener's snapshot. Rolls back the insert if the
    /// republish fails.
    pub async fn create(
        &self,
        listener_id: &str,
        spec: CreateEnvironmentSpec,
        token: &CancellationToken,
    ) -> Result<Environment, FlowcError> {
        token.check()?;
        let listener = self.repo.get_listener(listener_id, token).await?;
        let created = self.insert(listener_id, spec, token).await?;

        if let Err(e) = self.regenerate_listener_snapshot(&listener, token).await {
            error!(environment_id = %created.id, error = %e, "rolling back environment after snapshot publish failure");
            let _ = self.repo.delete_environment(&created.id, token).await;
            AuditEntry::failure("create", "environment", &created.id, &e.to_string()).emit();
            return Err(e);
        }
        info!(environment_id = %created.id, listener_id, "environment created");
        AuditEntry::success("create", "environment", &created.id).emit();
        #[cfg(feature = "prometheus")]
        if let Some(m) = &self.metrics {
            m.environments_total.with_label_values(&[]).inc();
        }
        Ok(created)
    }

    pub async fn update(
        &self,
        id: &str,
        patch: EnvironmentPatch,
        token: &CancellationToken,
    ) -> Result<Environment, FlowcError> {
        token.check()?;
        let updated = match self.repo.update_environment(id, patch, token).await {
            Ok(updated) => updated,
            Err(e) => {
                AuditEntry::failure("update", "environment", id, &e.to_string()).emit();
                return Err(e);
            }
        };
        let listener = self.repo.get_listener(&updated.listener_id, token).await?;
        self.regenerate_listener_snapshot(&listener, token).await?;
        AuditEntry::success("update", "environment", id).emit();
        Ok(updated)
    }

    pub async fn get(&self, id: &str, token: &CancellationToken) -> Result<Environment, FlowcError> {
        token.check()?;
        self.repo.get_environment(id, token).await
    }

    pub async fn list(
        &self,
        listener_id: &str,
        token: &CancellationToken,
    ) -> Result<Vec<Environment>, FlowcError> {
        token.check()?;
        self.repo.list_environments_by_listener(listener_id, token).await
    }

    /// Cascades through any deployments bound to this environment before
    /// deleting it, then regenerates the owning listener's snapshot.
    pub async fn delete(
        &self,
        id: &str,
        force: bool,
        token: &CancellationToken,
    ) -> Result<(), FlowcError> {
        token.check()?;
        let environment = self.repo.get_environment(id, token).await?;
        let deployment_ids = self.repo.list_deployments_by_environment_id(id, token).await?;
        if !deployment_ids.is_empty() && !force {
            let e = FlowcError::HasChildren(format!(
                "environment {id} still has {} deployment(s)",
                deployment_ids.len()
            ));
            AuditEntry::failure("delete", "environment", id, &e.to_string()).emit();
            return Err(e);
        }
        for deployment_id in &deployment_ids {
            let _ = self.repo.delete_deployment(deployment_id, token).await;
            let _ = self.repo.delete_node_id(deployment_id, token).await;
            let _ = self.repo.delete_environment_id(deployment_id, token).await;
        }

        self.repo.delete_environment(id, token).await?;
        let listener = self.repo.get_listener(&environment.listener_id, token).await?;
        self.regenerate_listener_snapshot(&listener, token).await?;
        info!(environment_id = %id, "environment deleted");
        AuditEntry::success("delete", "environment", id).emit();
        #[cfg(feature = "prometheus")]
        if let Some(m) = &self.metrics {
            m.environments_total.with_label_values(&[]).dec();
        }
        Ok(())
    }

    /// Rebuilds the listener's xDS listener resource from its current set
    /// of environments (one filter chain per environment, SNI-matched on
    /// `environment.hostname`) and republishes it via `addListener`.
    pub(crate) async fn regenerate_listener_snapshot(
        &self,
        listener: &Listener,
        token: &CancellationToken,
    ) -> Result<(), FlowcError> {
        token.check()?;
        let gateway = self.repo.get_gateway(&listener.gateway_id, token).await?;
        let environments = self
            .repo
            .list_environments_by_listener(&listener.id, token)
            .await?;

        let filter_chains = environments
            .iter()
            .map(|env| FilterChain {
                server_name: env.hostname.clone(),
                route_config_name: format!("route_{}_{}", listener.id, env.name),
                http_filters: env.http_filters.clone(),
            })
            .collect();

        let name = format!("listener_{}", listener.port);
        let proxy_listener = ProxyListener {
            name: name.clone(),
            address: listener.address.clone(),
            port: listener.port,
            filter_chains,
        };
        self.cache.add_listener(&gateway.node_id, &name, proxy_listener);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowc_core::entity::Gateway;
    use flowc_core::CancellationToken;
    use flowc_store::InMemoryRepository;

    async fn setup() -> (EnvironmentService, Arc<dyn Repository>, Arc<SnapshotCache>, Listener, CancellationToken) {
        let repo: Arc<dyn Repository> = Arc::new(InMemoryRepository::new());
        let cache = Arc::new(SnapshotCache::new());
        let svc = EnvironmentService::new(repo.clone(), cache.clone());
        let token = CancellationToken::new();
        let now = Utc::now();
        let gateway = repo
            .create_gateway(
                Gateway {
                    id: Uuid::new_v4().to_string(),
                    node_id: "n1".to_string(),
                    name: "gw1".to_string(),
                    description: None,
                    status: Default::default(),
                    defaults: None,
                    labels: Default::default(),
                    created_at: now,
                    updated_at: now,
                },
                &token,
            )
            .await
            .unwrap();
        let listener = repo
            .create_listener(
                Listener {
                    id: Uuid::new_v4().to_string(),
                    gateway_id: gateway.id.clone(),
                    port: 8080,
                    address: "0.0.0.0".to_string(),
                    tls: None,
                    http2: true,
                    access_log: None,
                    created_at: now,
                    updated_at: now,
                },
                &token,
            )
            .await
            .unwrap();
        (svc, repo, cache, listener, token)
    }

    #[tokio::test]
    async fn test_create_regenerates_listener_snapshot() {
        let (svc, _, cache, listener, token) = setup().await;
        svc.create(
            &listener.id,
            CreateEnvironmentSpec {
                name: "production".to_string(),
                hostname: Some("*".to_string()),
                ..Default::default()
            },
            &token,
        )
        .await
        .unwrap();
        let snap = cache.get("n1").unwrap();
        assert_eq!(snap.listeners.len(), 1);
        assert_eq!(snap.listeners[0].filter_chains.len(), 1);
        assert_eq!(snap.listeners[0].filter_chains[0].server_name, "*");
    }

    #[tokio::test]
    async fn test_duplicate_hostname_rejected() {
        let (svc, _, _, listener, token) = setup().await;
        svc.create(
            &listener.id,
            CreateEnvironmentSpec {
                name: "production".to_string(),
                hostname: Some("*".to_string()),
                ..Default::default()
            },
            &token,
        )
        .await
        .unwrap();
        let err = svc
            .create(
                &listener.id,
                CreateEnvironmentSpec {
                    name: "staging".to_string(),
                    hostname: Some("*".to_string()),
                    ..Default::default()
                },
                &token,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, FlowcError::HostnameInUse(_)));
    }

    #[tokio::test]
    async fn test_delete_refuses_with_deployments_unless_forced() {
        let (svc, repo, _, listener, token) = setup().await;
        let env = svc
            .create(
                &listener.id,
                CreateEnvironmentSpec {
                    name: "production".to_string(),
                    hostname: Some("*".to_string()),
                    ..Default::default()
                },
                &token,
            )
            .await
            .unwrap();
        repo.set_environment_id("dep1", &env.id, &token).await.unwrap();
        let err = svc.delete(&env.id, false, &token).await.unwrap_err();
        assert!(matches!(err, FlowcError::HasChildren(_)));
    }
}
