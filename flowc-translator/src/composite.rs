use flowc_core::deployment::Deployment;
use flowc_core::ir::Ir;
use flowc_core::resource::{ResourceBundle, RouteConfiguration, VirtualHost};
use flowc_core::FlowcError;
use tracing::{error, info};

use crate::strategy::{StrategyConfig, StrategySet, TranslationContext};

/// Turns `(deployment, ir, nodeId)` into the resource bundle the snapshot
/// cache can publish. Deterministic and total on valid inputs: any error
/// here must leave the deployment `failed` without touching the cache.
pub struct CompositeTranslator {
    strategies: StrategySet,
    config: StrategyConfig,
}

impl CompositeTranslator {
    pub fn new(strategies: StrategySet, config: StrategyConfig) -> Self {
        Self { strategies, config }
    }

    pub fn translate(
        &self,
        ctx: &TranslationContext,
        deployment: &Deployment,
        ir: &Ir,
        node_id: &str,
    ) -> Result<ResourceBundle, FlowcError> {
        let result = self.translate_inner(ctx, deployment, ir);
        match &result {
            Ok(_) => info!(
                node_id,
                deployment_id = %deployment.id,
                listener_id = %ctx.listener_id,
                environment = %ctx.environment_name,
                "translation succeeded"
            ),
            Err(e) => error!(
                node_id,
                deployment_id = %deployment.id,
                error = %e,
                "translation failed"
            ),
        }
        result
    }

    fn translate_inner(
        &self,
        ctx: &TranslationContext,
        deployment: &Deployment,
        ir: &Ir,
    ) -> Result<ResourceBundle, FlowcError> {
        let cluster_name = format!("cluster_{}", deployment.id);
        let route_config_name = format!("route_{}_{}", ctx.listener_id, ctx.environment_name);
        let virtual_host_name = format!("vh_{}_{}", ctx.listener_id, ctx.environment_name);

        let cluster =
            self.strategies
                .cluster_builder
                .build_cluster(&cluster_name, &deployment.manifest.upstream, &self.config)?;
        let endpoints = self
            .strategies
            .endpoint_builder
            .build_endpoints(&cluster_name, &deployment.manifest.upstream)?;
        let routes = self
            .strategies
            .route_builder
            .build_routes(ir, &deployment.context, &cluster_name)?;
        let listener = self
            .strategies
            .listener_builder
            .build_listener(ctx, &route_config_name)?;

        let route_config = RouteConfiguration {
            name: route_config_name,
            virtual_hosts: vec![VirtualHost {
                name: virtual_host_name,
                domains: vec!["*".to_string()],
                routes,
            }],
        };

        Ok(ResourceBundle {
            listeners: vec![listener],
            routes: vec![route_config],
            clusters: vec![cluster],
            endpoints,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::default_strategy::{
        DefaultClusterBuilder, DefaultEndpointBuilder, DefaultListenerBuilder, DefaultRouteBuilder,
        DefaultTransportStrategy,
    };
    use flowc_core::deployment::{ApiType, BundleManifest, DeploymentStatus, GatewayBinding, UpstreamRef};
    use flowc_core::ir::{IrMetadata, IrRoute};

    fn deployment() -> Deployment {
        Deployment {
            id: "d1".to_string(),
            name: "orders-api".to_string(),
            version: "1.0.0".to_string(),
            context: "/orders".to_string(),
            status: DeploymentStatus::Pending,
            description: None,
            manifest: BundleManifest {
                name: "orders-api".to_string(),
                version: "1.0.0".to_string(),
                context: "/orders".to_string(),
                api_type: ApiType::Rest,
                upstream: UpstreamRef {
                    host: "orders.internal".to_string(),
                    port: 8000,
                    scheme: "http".to_string(),
                    timeout: 30,
                },
                gateway: GatewayBinding {
                    gateway_id: Some("g1".to_string()),
                    node_id: None,
                    port: 8080,
                    environment: "production".to_string(),
                },
                spec_file: None,
            },
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        }
    }

    fn ctx() -> TranslationContext {
        TranslationContext {
            listener_id: "l1".to_string(),
            port: 8080,
            address: "0.0.0.0".to_string(),
            http2: true,
            environment_id: "e1".to_string(),
            environment_name: "production".to_string(),
            hostname: "*".to_string(),
            http_filters: vec![],
            access_log_enabled: false,
        }
    }

    fn translator() -> CompositeTranslator {
        CompositeTranslator::new(
            StrategySet {
                route_builder: Box::new(DefaultRouteBuilder),
                cluster_builder: Box::new(DefaultClusterBuilder),
                endpoint_builder: Box::new(DefaultEndpointBuilder),
                listener_builder: Box::new(DefaultListenerBuilder),
                transport: Box::new(DefaultTransportStrategy),
            },
            StrategyConfig::default(),
        )
    }

    #[test]
    fn test_naming_conventions() {
        let ir = Ir {
            metadata: IrMetadata { api_type: ApiType::Rest, base_path: "/orders".into() },
            routes: vec![IrRoute { path: "/items".into(), methods: vec!["GET".into()], operation_id: None }],
            servers: vec![],
        };
        let bundle = translator().translate(&ctx(), &deployment(), &ir, "n1").unwrap();

        assert_eq!(bundle.listeners[0].name, "listener_8080");
        assert_eq!(bundle.routes[0].name, "route_l1_production");
        assert_eq!(bundle.routes[0].virtual_hosts[0].name, "vh_l1_production");
        assert_eq!(bundle.routes[0].virtual_hosts[0].domains, vec!["*".to_string()]);
        assert_eq!(bundle.clusters[0].name, "cluster_d1");
        assert_eq!(bundle.endpoints[0].cluster_name, "cluster_d1");
        assert_eq!(bundle.routes[0].virtual_hosts[0].routes[0].path_prefix, "/orders/items");
    }
}
