use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use flowc_core::entity::Listener;
use flowc_core::resource::{ProxyListener, RouteConfiguration, VirtualHost};
use flowc_core::{CancellationToken, FlowcError};
use flowc_observability::AuditEntry;
#[cfg(feature = "prometheus")]
use flowc_observability::MetricsCollector;
use flowc_store::snapshot::BulkUpdate;
use flowc_store::{ListenerPatch, Repository, SnapshotCache};
use tracing::{error, info};
use uuid::Uuid;

use crate::dto::{CreateEnvironmentSpec, CreateListenerSpec};
use crate::environment::EnvironmentService;

/// Listener lifecycle: a port binding on a gateway, holding one or more
/// environments.
pub struct ListenerService {
    repo: Arc<dyn Repository>,
    cache: Arc<SnapshotCache>,
    environments: Arc<EnvironmentService>,
    #[cfg(feature = "prometheus")]
    metrics: Option<Arc<MetricsCollector>>,
}

impl ListenerService {
    pub fn new(
        repo: Arc<dyn Repository>,
        cache: Arc<SnapshotCache>,
        environments: Arc<EnvironmentService>,
    ) -> Self {
        Self {
            repo,
            cache,
            environments,
            #[cfg(feature = "prometheus")]
            metrics: None,
        }
    }

    #[cfg(feature = "prometheus")]
    pub fn with_metrics(mut self, metrics: Arc<MetricsCollector>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Requires at least one environment in `spec`. Creates the listener,
    /// then its environments sequentially, then issues one `bulkUpdate`
    /// adding the xDS listener plus an empty route configuration per
    /// environment. Any failure unwinds everything created in this call.
    pub async fn create(
        &self,
        gateway_id: &str,
        spec: CreateListenerSpec,
        token: &CancellationToken,
    ) -> Result<Listener, FlowcError> {
        token.check()?;
        if spec.environments.is_empty() {
            return Err(FlowcError::InvalidInput(
                "listener requires at least one environment".to_string(),
            ));
        }
        validate_unique_environments(&spec.environments)?;

        let gateway = self.repo.get_gateway(gateway_id, token).await?;
        let now = Utc::now();
        let listener = Listener {
            id: Uuid::new_v4().to_string(),
            gateway_id: gateway_id.to_string(),
            port: spec.port,
            address: spec.address.unwrap_or_else(|| "0.0.0.0".to_string()),
            tls: spec.tls,
            http2: spec.http2.unwrap_or(true),
            access_log: spec.access_log,
            created_at: now,
            updated_at: now,
        };
        let created = self.repo.create_listener(listener, token).await?;

        let mut created_environments = Vec::new();
        for env_spec in spec.environments {
            match self.environments.insert(&created.id, env_spec, token).await {
                Ok(env) => created_environments.push(env),
                Err(e) => {
                    error!(listener_id = %created.id, error = %e, "rolling back listener after environment creation failure");
                    for env in &created_environments {
                        let _ = self.repo.delete_environment(&env.id, token).await;
                    }
                    let _ = self.repo.delete_listener(&created.id, token).await;
                    AuditEntry::failure("create", "listener", &created.id, &e.to_string()).emit();
                    return Err(e);
                }
            }
        }

        let filter_chains = created_environments
            .iter()
            .map(|env| flowc_core::resource::FilterChain {
                server_name: env.hostname.clone(),
                route_config_name: format!("route_{}_{}", created.id, env.name),
                http_filters: env.http_filters.clone(),
            })
            .collect();
        let proxy_listener = ProxyListener {
            name: format!("listener_{}", created.port),
            address: created.address.clone(),
            port: created.port,
            filter_chains,
        };
        let route_configs: Vec<RouteConfiguration> = created_environments
            .iter()
            .map(|env| RouteConfiguration {
                name: format!("route_{}_{}", created.id, env.name),
                virtual_hosts: vec![VirtualHost {
                    name: format!("vh_{}_{}", created.id, env.name),
                    domains: vec!["*".to_string()],
                    routes: vec![],
                }],
            })
            .collect();

        self.cache.bulk_update(
            &gateway.node_id,
            BulkUpdate {
                add_listeners: vec![proxy_listener],
                add_routes: route_configs,
                ..Default::default()
            },
        );

        info!(listener_id = %created.id, gateway_id, port = created.port, "listener created");
        AuditEntry::success("create", "listener", &created.id).emit();
        #[cfg(feature = "prometheus")]
        if let Some(m) = &self.metrics {
            m.listeners_total.with_label_values(&[]).inc();
        }
        Ok(created)
    }

    pub async fn update(
        &self,
        id: &str,
        patch: ListenerPatch,
        token: &CancellationToken,
    ) -> Result<Listener, FlowcError> {
        token.check()?;
        let result = self.repo.update_listener(id, patch, token).await;
        match &result {
            Ok(_) => AuditEntry::success("update", "listener", id).emit(),
            Err(e) => AuditEntry::failure("update", "listener", id, &e.to_string()).emit(),
        }
        result
    }

    pub async fn get(&self, id: &str, token: &CancellationToken) -> Result<Listener, FlowcError> {
        token.check()?;
        self.repo.get_listener(id, token).await
    }

    pub async fn list(
        &self,
        gateway_id: &str,
        token: &CancellationToken,
    ) -> Result<Vec<Listener>, FlowcError> {
        token.check()?;
        self.repo.list_listeners_by_gateway(gateway_id, token).await
    }

    /// Cascades through this listener's environments (which in turn cascade
    /// through their deployments), then removes the listener's xDS listener
    /// and route configurations from the snapshot cache.
    pub async fn delete(
        &self,
        id: &str,
        force: bool,
        token: &CancellationToken,
    ) -> Result<(), FlowcError> {
        token.check()?;
        let listener = self.repo.get_listener(id, token).await?;
        let environments = self
            .repo
            .list_environments_by_listener(id, token)
            .await?;
        if !environments.is_empty() && !force {
            let e = FlowcError::HasChildren(format!(
                "listener {id} still has {} environment(s)",
                environments.len()
            ));
            AuditEntry::failure("delete", "listener", id, &e.to_string()).emit();
            return Err(e);
        }

        let route_names: Vec<String> = environments
            .iter()
            .map(|env| format!("route_{}_{}", id, env.name))
            .collect();
        for env in &environments {
            if let Err(e) = self.environments.delete(&env.id, true, token).await {
                AuditEntry::failure("delete", "listener", id, &e.to_string()).emit();
                return Err(e);
            }
        }

        self.repo.delete_listener(id, token).await?;
        let gateway = self.repo.get_gateway(&listener.gateway_id, token).await?;
        self.cache.bulk_update(
            &gateway.node_id,
            BulkUpdate {
                remove_listener_names: vec![format!("listener_{}", listener.port)],
                remove_route_names: route_names,
                ..Default::default()
            },
        );
        info!(listener_id = %id, "listener deleted");
        AuditEntry::success("delete", "listener", id).emit();
        #[cfg(feature = "prometheus")]
        if let Some(m) = &self.metrics {
            m.listeners_total.with_label_values(&[]).dec();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::EnvironmentService;
    use flowc_core::entity::Gateway;
    use flowc_core::CancellationToken;
    use flowc_store::InMemoryRepository;

    async fn setup() -> (ListenerService, Arc<dyn Repository>, Arc<SnapshotCache>, Gateway, CancellationToken) {
        let repo: Arc<dyn Repository> = Arc::new(InMemoryRepository::new());
        let cache = Arc::new(SnapshotCache::new());
        let environments = Arc::new(EnvironmentService::new(repo.clone(), cache.clone()));
        let svc = ListenerService::new(repo.clone(), cache.clone(), environments);
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
        (svc, repo, cache, gateway, token)
    }

    #[tokio::test]
    async fn test_create_requires_at_least_one_environment() {
        let (svc, _, _, gateway, token) = setup().await;
        let err = svc
            .create(
                &gateway.id,
                CreateListenerSpec {
                    port: 8080,
                    ..Default::default()
                },
                &token,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, FlowcError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_create_publishes_listener_and_empty_route_configs() {
        let (svc, _, cache, gateway, token) = setup().await;
        let listener = svc
            .create(
                &gateway.id,
                CreateListenerSpec {
                    port: 8080,
                    environments: vec![
                        CreateEnvironmentSpec {
                            name: "production".to_string(),
                            hostname: Some("*".to_string()),
                            ..Default::default()
                        },
                        CreateEnvironmentSpec {
                            name: "staging".to_string(),
                            hostname: Some("staging.example.com".to_string()),
                            ..Default::default()
                        },
                    ],
                    ..Default::default()
                },
                &token,
            )
            .await
            .unwrap();
        let snap = cache.get("n1").unwrap();
        assert_eq!(snap.listeners.len(), 1);
        assert_eq!(snap.listeners[0].filter_chains.len(), 2);
        assert_eq!(snap.routes.len(), 2);
        assert!(snap.routes.iter().all(|r| r.virtual_hosts[0].routes.is_empty()));
        assert_eq!(listener.port, 8080);
    }

    #[tokio::test]
    async fn test_duplicate_environment_names_rejected() {
        let (svc, _, _, gateway, token) = setup().await;
        let err = svc
            .create(
                &gateway.id,
                CreateListenerSpec {
                    port: 8080,
                    environments: vec![
                        CreateEnvironmentSpec {
                            name: "production".to_string(),
                            ..Default::default()
                        },
                        CreateEnvironmentSpec {
                            name: "production".to_string(),
                            ..Default::default()
                        },
                    ],
                    ..Default::default()
                },
                &token,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, FlowcError::NameInUse(_)));
    }

    #[tokio::test]
    async fn test_delete_cascades_and_clears_snapshot() {
        let (svc, repo, cache, gateway, token) = setup().await;
        let listener = svc
            .create(
                &gateway.id,
                CreateListenerSpec {
                    port: 8080,
                    environments: vec![CreateEnvironmentSpec {
                        name: "production".to_string(),
                        ..Default::default()
                    }],
                    ..Default::default()
                },
                &token,
            )
            .await
            .unwrap();
        svc.delete(&listener.id, true, &token).await.unwrap();
        assert!(repo.get_listener(&listener.id, &token).await.is_err());
        let snap = cache.get("n1").unwrap();
        assert!(snap.listeners.is_empty());
        assert!(snap.routes.is_empty());
    }
}

fn validate_unique_environments(specs: &[CreateEnvironmentSpec]) -> Result<(), FlowcError> {
    let mut names = HashSet::new();
    let mut hostnames = HashSet::new();
    for spec in specs {
        if !names.insert(spec.name.clone()) {
            return Err(FlowcError::NameInUse(format!(
                "duplicate environment name {:?} in request",
                spec.name
            )));
        }
        let hostname = spec.hostname.clone().unwrap_or_else(|| "*".to_string());
        if !hostnames.insert(hostname.clone()) {
            return Err(FlowcError::HostnameInUse(format!(
                "duplicate environment hostname {hostname:?} in request"
            )));
        }
    }
    Ok(())
}
