use std::sync::Arc;

use chrono::Utc;
use flowc_bundle::{list_entries, load_bundle, ParserRegistry};
use flowc_core::deployment::{Deployment, DeploymentStatus};
use flowc_core::{CancellationToken, FlowcError};
use flowc_observability::AuditEntry;
#[cfg(feature = "prometheus")]
use flowc_observability::MetricsCollector;
use flowc_store::{DeploymentPatch, Repository, SnapshotCache};
use flowc_translator::{CompositeTranslator, StrategyConfig, StrategyFactory, TranslationContext};
use tracing::{error, info, instrument};
use uuid::Uuid;

use crate::dto::DeploymentStats;

/// Deployment lifecycle: loads a bundle, resolves which gateway/listener/
/// environment it targets, translates it, and publishes it to the
/// snapshot cache.
pub struct DeploymentService {
    repo: Arc<dyn Repository>,
    cache: Arc<SnapshotCache>,
    parsers: ParserRegistry,
    strategy_factory: Arc<dyn StrategyFactory>,
    strategy_config: StrategyConfig,
    #[cfg(feature = "prometheus")]
    metrics: Option<Arc<MetricsCollector>>,
}

impl DeploymentService {
    pub fn new(
        repo: Arc<dyn Repository>,
        cache: Arc<SnapshotCache>,
        parsers: ParserRegistry,
        strategy_factory: Arc<dyn StrategyFactory>,
        strategy_config: StrategyConfig,
    ) -> Self {
        Self {
            repo,
            cache,
            parsers,
            strategy_factory,
            strategy_config,
            #[cfg(feature = "prometheus")]
            metrics: None,
        }
    }

    #[cfg(feature = "prometheus")]
    pub fn with_metrics(mut self, metrics: Arc<MetricsCollector>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    #[cfg(feature = "prometheus")]
    async fn record_status_gauges(&self, token: &CancellationToken) {
        if let Some(m) = &self.metrics {
            if let Ok(deployments) = self.repo.list_deployments(token).await {
                let mut stats = DeploymentStats::default();
                for d in &deployments {
                    match d.status {
                        DeploymentStatus::Deployed => stats.deployed += 1,
                        DeploymentStatus::Failed => stats.failed += 1,
                        DeploymentStatus::Pending => stats.pending += 1,
                        DeploymentStatus::Updating => stats.updating += 1,
                        DeploymentStatus::Deploying => stats.deploying += 1,
                    }
                }
                m.deployments_total.with_label_values(&["deployed"]).set(stats.deployed as i64);
                m.deployments_total.with_label_values(&["failed"]).set(stats.failed as i64);
                m.deployments_total.with_label_values(&["pending"]).set(stats.pending as i64);
                m.deployments_total.with_label_values(&["updating"]).set(stats.updating as i64);
                m.deployments_total.with_label_values(&["deploying"]).set(stats.deploying as i64);
            }
        }
    }

    /// 1. Validate and load the bundle. 2. Insert the deployment as
    /// `deploying`, resolve its gateway/listener/environment binding and
    /// record the node-id and environment-id mappings; on any failure in
    /// this step the deployment row is deleted outright. 3. Translate; on
    /// error mark `failed` and bubble up. 4. Publish via `deployAPI`. 5.
    /// Mark `deployed`.
    #[instrument(skip(self, zip_bytes, token))]
    pub async fn deploy(
        &self,
        zip_bytes: &[u8],
        description: Option<String>,
        token: &CancellationToken,
    ) -> Result<Deployment, FlowcError> {
        token.check()?;
        let loaded = load_bundle(zip_bytes, &self.parsers)?;

        let now = Utc::now();
        let deployment = Deployment {
            id: Uuid::new_v4().to_string(),
            name: loaded.manifest.name.clone(),
            version: loaded.manifest.version.clone(),
            context: loaded.manifest.context.clone(),
            status: DeploymentStatus::Deploying,
            description,
            manifest: loaded.manifest.clone(),
            created_at: now,
            updated_at: now,
        };
        let created = self.repo.create_deployment(deployment, token).await?;

        let binding = match self.resolve_binding(&created, token).await {
            Ok(binding) => binding,
            Err(e) => {
                error!(deployment_id = %created.id, error = %e, "deleting deployment after binding resolution failure");
                let _ = self.repo.delete_deployment(&created.id, token).await;
                AuditEntry::failure("deploy", "deployment", &created.id, &e.to_string()).emit();
                return Err(e);
            }
        };

        if let Err(e) = self.repo.set_node_id(&created.id, &binding.node_id, token).await {
            let _ = self.repo.delete_deployment(&created.id, token).await;
            AuditEntry::failure("deploy", "deployment", &created.id, &e.to_string()).emit();
            return Err(e);
        }
        if let Err(e) = self
            .repo
            .set_environment_id(&created.id, &binding.environment_id, token)
            .await
        {
            let _ = self.repo.delete_node_id(&created.id, token).await;
            let _ = self.repo.delete_deployment(&created.id, token).await;
            AuditEntry::failure("deploy", "deployment", &created.id, &e.to_string()).emit();
            return Err(e);
        }

        let translator = CompositeTranslator::new(
            self.strategy_factory.build(&self.strategy_config, &created),
            self.strategy_config.clone(),
        );
        let translate_started = std::time::Instant::now();
        let translate_result = translator.translate(&binding.ctx, &created, &loaded.ir, &binding.node_id);
        #[cfg(feature = "prometheus")]
        if let Some(m) = &self.metrics {
            m.record_translate(translate_started.elapsed().as_secs_f64());
        }
        let bundle = match translate_result {
            Ok(b) => b,
            Err(e) => {
                let _ = self.mark_failed(&created.id, token).await;
                AuditEntry::failure("deploy", "deployment", &created.id, &e.to_string()).emit();
                #[cfg(feature = "prometheus")]
                self.record_status_gauges(token).await;
                return Err(e);
            }
        };

        let publish_started = std::time::Instant::now();
        self.cache.deploy_api(&binding.node_id, &bundle);
        #[cfg(feature = "prometheus")]
        if let Some(m) = &self.metrics {
            m.record_publish(publish_started.elapsed().as_secs_f64());
            if let Some(snap) = self.cache.get(&binding.node_id) {
                m.set_snapshot_version(&binding.node_id, snap.version);
            }
        }

        let deployed = self
            .repo
            .patch_deployment_status(
                &created.id,
                DeploymentPatch {
                    status: Some(DeploymentStatus::Deployed),
                    description: None,
                },
                token,
            )
            .await?;
        info!(deployment_id = %deployed.id, node_id = %binding.node_id, "deployment published");
        AuditEntry::success("deploy", "deployment", &deployed.id).emit();
        #[cfg(feature = "prometheus")]
        self.record_status_gauges(token).await;
        Ok(deployed)
    }

    /// Transitions through `updating`, re-translates against the new
    /// bundle, republishes, and restores `deployed` on completion. Any
    /// translate/publish failure marks `failed` without discarding the
    /// previous snapshot, since the cluster/route keys are stable across a
    /// re-deploy of the same deployment id and `deployAPI` merges rather
    /// than replaces.
    #[instrument(skip(self, zip_bytes, token))]
    pub async fn update(
        &self,
        id: &str,
        zip_bytes: &[u8],
        token: &CancellationToken,
    ) -> Result<Deployment, FlowcError> {
        token.check()?;
        let existing = self.repo.get_deployment(id, token).await?;

        self.repo
            .patch_deployment_status(
                id,
                DeploymentPatch {
                    status: Some(DeploymentStatus::Updating),
                    description: None,
                },
                token,
            )
            .await?;

        let loaded = match load_bundle(zip_bytes, &self.parsers) {
            Ok(loaded) => loaded,
            Err(e) => {
                let _ = self.mark_failed(id, token).await;
                AuditEntry::failure("update", "deployment", id, &e.to_string()).emit();
                #[cfg(feature = "prometheus")]
                self.record_status_gauges(token).await;
                return Err(e);
            }
        };

        let node_id = self.repo.get_node_id(id, token).await?;
        let environment_id = self.repo.get_environment_id(id, token).await?;
        let environment = self.repo.get_environment(&environment_id, token).await?;
        let listener = self.repo.get_listener(&environment.listener_id, token).await?;
        let ctx = translation_context(&listener, &environment);

        let mut next = existing;
        next.manifest = loaded.manifest.clone();
        next.version = loaded.manifest.version.clone();
        next.context = loaded.manifest.context.clone();

        let translator = CompositeTranslator::new(
            self.strategy_factory.build(&self.strategy_config, &next),
            self.strategy_config.clone(),
        );
        let translate_started = std::time::Instant::now();
        let translate_result = translator.translate(&ctx, &next, &loaded.ir, &node_id);
        #[cfg(feature = "prometheus")]
        if let Some(m) = &self.metrics {
            m.record_translate(translate_started.elapsed().as_secs_f64());
        }
        let bundle = match translate_result {
            Ok(b) => b,
            Err(e) => {
                let _ = self.mark_failed(id, token).await;
                AuditEntry::failure("update", "deployment", id, &e.to_string()).emit();
                #[cfg(feature = "prometheus")]
                self.record_status_gauges(token).await;
                return Err(e);
            }
        };

        let publish_started = std::time::Instant::now();
        self.cache.deploy_api(&node_id, &bundle);
        #[cfg(feature = "prometheus")]
        if let Some(m) = &self.metrics {
            m.record_publish(publish_started.elapsed().as_secs_f64());
            if let Some(snap) = self.cache.get(&node_id) {
                m.set_snapshot_version(&node_id, snap.version);
            }
        }

        next.status = DeploymentStatus::Deployed;
        next.updated_at = Utc::now();
        let saved = self.repo.update_deployment(id, next, token).await?;
        info!(deployment_id = %id, "deployment updated");
        AuditEntry::success("update", "deployment", id).emit();
        #[cfg(feature = "prometheus")]
        self.record_status_gauges(token).await;
        Ok(saved)
    }

    /// Removes the snapshot entry for the owning node if this is the only
    /// deployment bound to it, then deletes the deployment and its
    /// mappings.
    pub async fn delete(&self, id: &str, token: &CancellationToken) -> Result<(), FlowcError> {
        token.check()?;
        let node_id = self.repo.get_node_id(id, token).await?;
        let siblings = self.repo.list_deployments_by_node_id(&node_id, token).await?;
        if siblings.len() <= 1 {
            self.cache.remove_node(&node_id);
        }
        self.repo.delete_deployment(id, token).await?;
        let _ = self.repo.delete_node_id(id, token).await;
        let _ = self.repo.delete_environment_id(id, token).await;
        info!(deployment_id = %id, "deployment deleted");
        AuditEntry::success("delete", "deployment", id).emit();
        #[cfg(feature = "prometheus")]
        self.record_status_gauges(token).await;
        Ok(())
    }

    pub async fn get(&self, id: &str, token: &CancellationToken) -> Result<Deployment, FlowcError> {
        token.check()?;
        self.repo.get_deployment(id, token).await
    }

    pub async fn list(&self, token: &CancellationToken) -> Result<Vec<Deployment>, FlowcError> {
        token.check()?;
        self.repo.list_deployments(token).await
    }

    pub async fn stats(&self, token: &CancellationToken) -> Result<DeploymentStats, FlowcError> {
        token.check()?;
        let deployments = self.repo.list_deployments(token).await?;
        let mut stats = DeploymentStats::default();
        stats.total = deployments.len();
        for d in &deployments {
            match d.status {
                DeploymentStatus::Deployed => stats.deployed += 1,
                DeploymentStatus::Failed => stats.failed += 1,
                DeploymentStatus::Pending => stats.pending += 1,
                DeploymentStatus::Updating => stats.updating += 1,
                DeploymentStatus::Deploying => stats.deploying += 1,
            }
        }
        Ok(stats)
    }

    /// Pure bytes-in check used by `/api/v1/validate`: opens the zip and
    /// lists its entries without creating anything.
    pub fn validate_bundle(&self, zip_bytes: &[u8]) -> Result<Vec<String>, FlowcError> {
        list_entries(zip_bytes)
    }

    async fn mark_failed(&self, id: &str, token: &CancellationToken) -> Result<Deployment, FlowcError> {
        self.repo
            .patch_deployment_status(
                id,
                DeploymentPatch {
                    status: Some(DeploymentStatus::Failed),
                    description: None,
                },
                token,
            )
            .await
    }

    async fn resolve_binding(
        &self,
        deployment: &Deployment,
        token: &CancellationToken,
    ) -> Result<Binding, FlowcError> {
        let binding = &deployment.manifest.gateway;
        let gateway = match &binding.gateway_id {
            Some(gateway_id) => self.repo.get_gateway(gateway_id, token).await?,
            None => {
                let node_id = binding.node_id.as_deref().ok_or_else(|| {
                    FlowcError::InvalidInput("manifest gateway binding requires gatewayId or nodeId".to_string())
                })?;
                self.repo.get_gateway_by_node_id(node_id, token).await?
            }
        };

        let listeners = self.repo.list_listeners_by_gateway(&gateway.id, token).await?;
        let listener = listeners
            .into_iter()
            .find(|l| l.port == binding.port)
            .ok_or_else(|| {
                FlowcError::NotFound(format!(
                    "no listener on port {} for gateway {}",
                    binding.port, gateway.id
                ))
            })?;

        let environments = self.repo.list_environments_by_listener(&listener.id, token).await?;
        let environment = environments
            .into_iter()
            .find(|e| e.name == binding.environment)
            .ok_or_else(|| {
                FlowcError::NotFound(format!(
                    "no environment named {:?} on listener {}",
                    binding.environment, listener.id
                ))
            })?;

        let ctx = translation_context(&listener, &environment);
        Ok(Binding {
            node_id: gateway.node_id,
            environment_id: environment.id,
            ctx,
        })
    }
}

struct Binding {
    node_id: String,
    environment_id: String,
    ctx: TranslationContext,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::EnvironmentService;
    use crate::gateway::GatewayService;
    use crate::listener::ListenerService;
    use crate::dto::{CreateEnvironmentSpec, CreateGatewayRequest, CreateListenerSpec};
    use flowc_translator::DefaultStrategyFactory;
    use std::io::{Cursor, Write};
    use zip::write::SimpleFileOptions;

    fn build_zip(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut buf = Vec::new();
        {
            let cursor = Cursor::new(&mut buf);
            let mut writer = zip::ZipWriter::new(cursor);
            let options = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);
            for (name, contents) in entries {
                writer.start_file(*name, options).unwrap();
                writer.write_all(contents).unwrap();
            }
            writer.finish().unwrap();
        }
        buf
    }

    const MANIFEST: &[u8] = br#"
name: orders-api
version: "1.0.0"
context: /orders
upstream:
  host: orders.internal
  port: 8000
gateway:
  gatewayId: PLACEHOLDER
  port: 8080
  environment: production
"#;

    const OPENAPI: &[u8] = br#"
paths:
  /items:
    get: {}
"#;

    async fn setup() -> (
        DeploymentService,
        Arc<dyn Repository>,
        Arc<SnapshotCache>,
        flowc_core::entity::Gateway,
        CancellationToken,
    ) {
        let repo: Arc<dyn Repository> = Arc::new(flowc_store::InMemoryRepository::new());
        let cache = Arc::new(SnapshotCache::new());
        let environments = Arc::new(EnvironmentService::new(repo.clone(), cache.clone()));
        let listeners = Arc::new(ListenerService::new(repo.clone(), cache.clone(), environments));
        let gateways = GatewayService::new(repo.clone(), cache.clone(), listeners);
        let token = CancellationToken::new();
        let gateway = gateways
            .create(
                CreateGatewayRequest {
                    node_id: "n1".to_string(),
                    name: "gw1".to_string(),
                    listeners: vec![CreateListenerSpec {
                        port: 8080,
                        environments: vec![CreateEnvironmentSpec {
                            name: "production".to_string(),
                            hostname: Some("*".to_string()),
                            ..Default::default()
                        }],
                        ..Default::default()
                    }],
                    ..Default::default()
                },
                &token,
            )
            .await
            .unwrap();

        let svc = DeploymentService::new(
            repo.clone(),
            cache.clone(),
            ParserRegistry::with_defaults(),
            Arc::new(DefaultStrategyFactory),
            StrategyConfig::default(),
        );
        (svc, repo, cache, gateway, token)
    }

    fn manifest_for(gateway_id: &str) -> Vec<u8> {
        String::from_utf8(MANIFEST.to_vec())
            .unwrap()
            .replace("PLACEHOLDER", gateway_id)
            .into_bytes()
    }

    #[tokio::test]
    async fn test_deploy_publishes_routes_under_the_bound_environment() {
        let (svc, _, cache, gateway, token) = setup().await;
        let zip_bytes = build_zip(&[
            ("flowc.yaml", &manifest_for(&gateway.id)),
            ("openapi.yaml", OPENAPI),
        ]);
        let deployment = svc.deploy(&zip_bytes, None, &token).await.unwrap();
        assert_eq!(deployment.status, DeploymentStatus::Deployed);

        let snap = cache.get("n1").unwrap();
        let route = snap
            .routes
            .iter()
            .find(|r| r.name == "route_l1_production" || r.name.starts_with("route_"))
            .unwrap();
        assert_eq!(route.virtual_hosts[0].routes[0].path_prefix, "/orders/items");
    }

    #[tokio::test]
    async fn test_deploy_with_unknown_gateway_does_not_create_deployment() {
        let (svc, repo, _, _gateway, token) = setup().await;
        let zip_bytes = build_zip(&[
            ("flowc.yaml", &manifest_for("nonexistent-gateway")),
            ("openapi.yaml", OPENAPI),
        ]);
        let err = svc.deploy(&zip_bytes, None, &token).await.unwrap_err();
        assert!(matches!(err, FlowcError::NotFound(_)));
        assert!(repo.list_deployments(&token).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_removes_sole_node_snapshot() {
        let (svc, _, cache, gateway, token) = setup().await;
        let zip_bytes = build_zip(&[
            ("flowc.yaml", &manifest_for(&gateway.id)),
            ("openapi.yaml", OPENAPI),
        ]);
        let deployment = svc.deploy(&zip_bytes, None, &token).await.unwrap();
        svc.delete(&deployment.id, &token).await.unwrap();
        assert!(cache.get("n1").is_none());
    }

    #[tokio::test]
    async fn test_update_with_malformed_zip_marks_deployment_failed() {
        let (svc, _, cache, gateway, token) = setup().await;
        let zip_bytes = build_zip(&[
            ("flowc.yaml", &manifest_for(&gateway.id)),
            ("openapi.yaml", OPENAPI),
        ]);
        let deployment = svc.deploy(&zip_bytes, None, &token).await.unwrap();

        let err = svc.update(&deployment.id, b"not a zip file", &token).await.unwrap_err();
        assert!(matches!(err, FlowcError::BundleInvalid(_)));

        let reloaded = svc.get(&deployment.id, &token).await.unwrap();
        assert_eq!(reloaded.status, DeploymentStatus::Failed);
        assert!(cache.get("n1").is_some());
    }

    #[tokio::test]
    async fn test_validate_bundle_lists_entries() {
        let (svc, _, _, gateway, _) = setup().await;
        let zip_bytes = build_zip(&[
            ("flowc.yaml", &manifest_for(&gateway.id)),
            ("openapi.yaml", OPENAPI),
        ]);
        let entries = svc.validate_bundle(&zip_bytes).unwrap();
        assert_eq!(entries.len(), 2);
    }
}

fn translation_context(
    listener: &flowc_core::entity::Listener,
    environment: &flowc_core::entity::Environment,
) -> TranslationContext {
    TranslationContext {
        listener_id: listener.id.clone(),
        port: listener.port,
        address: listener.address.clone(),
        http2: listener.http2,
        environment_id: environment.id.clone(),
        environment_name: environment.name.clone(),
        hostname: environment.hostname.clone(),
        http_filters: environment.http_filters.clone(),
        access_log_enabled: listener
            .access_log
            .as_ref()
            .map(|log| log.enabled)
            .unwrap_or(false),
    }
}
