use flowc_core::deployment::{Deployment, UpstreamRef};
use flowc_core::ir::Ir;
use flowc_core::resource::{Cluster, Endpoint, FilterChain, HealthCheck, ProxyListener, RouteEntry};
use flowc_core::FlowcError;

use crate::strategy::{
    ClusterBuilder, EndpointBuilder, ListenerBuilder, RouteBuilder, StrategyConfig, StrategyFactory,
    StrategySet, TransportStrategy, TranslationContext,
};

/// Builds routes in the IR's declared order, with `Ir::ordered_routes`
/// placing longer shared path prefixes before shorter ones.
pub struct DefaultRouteBuilder;

impl RouteBuilder for DefaultRouteBuilder {
    fn build_routes(
        &self,
        ir: &Ir,
        base_path: &str,
        cluster_name: &str,
    ) -> Result<Vec<RouteEntry>, FlowcError> {
        Ok(ir
            .ordered_routes()
            .into_iter()
            .map(|route| RouteEntry {
                path_prefix: join_path(base_path, &route.path),
                methods: route.methods.clone(),
                cluster_name: cluster_name.to_string(),
            })
            .collect())
    }
}

fn join_path(base: &str, route_path: &str) -> String {
    let base = base.trim_end_matches('/');
    let suffix = route_path.trim_start_matches('/');
    if suffix.is_empty() {
        base.to_string()
    } else {
        format!("{base}/{suffix}")
    }
}

/// Single upstream cluster, round-robin load balancing, no health check
/// unless the strategy config requests one.
pub struct DefaultClusterBuilder;

impl ClusterBuilder for DefaultClusterBuilder {
    fn build_cluster(
        &self,
        cluster_name: &str,
        upstream: &UpstreamRef,
        config: &StrategyConfig,
    ) -> Result<Cluster, FlowcError> {
        Ok(Cluster {
            name: cluster_name.to_string(),
            lb_policy: config.lb_policy.clone().unwrap_or_else(|| "round_robin".to_string()),
            health_check: config.health_check_path.clone().map(|path| HealthCheck {
                path,
                interval_secs: 5,
            }),
            connect_timeout_ms: upstream.timeout * 1000,
        })
    }
}

pub struct DefaultEndpointBuilder;

impl EndpointBuilder for DefaultEndpointBuilder {
    fn build_endpoints(
        &self,
        cluster_name: &str,
        upstream: &UpstreamRef,
    ) -> Result<Vec<Endpoint>, FlowcError> {
        Ok(vec![Endpoint {
            cluster_name: cluster_name.to_string(),
            host: upstream.host.clone(),
            port: upstream.port,
            weight: 1,
        }])
    }
}

/// Listener name `listener_<port>`; filter chain SNI-matches the
/// environment hostname and references `route_<listenerId>_<envName>`.
pub struct DefaultListenerBuilder;

impl ListenerBuilder for DefaultListenerBuilder {
    fn build_listener(
        &self,
        ctx: &TranslationContext,
        route_config_name: &str,
    ) -> Result<ProxyListener, FlowcError> {
        Ok(ProxyListener {
            name: format!("listener_{}", ctx.port),
            address: ctx.address.clone(),
            port: ctx.port,
            filter_chains: vec![self.build_filter_chain(ctx, route_config_name)?],
        })
    }

    fn build_filter_chain(
        &self,
        ctx: &TranslationContext,
        route_config_name: &str,
    ) -> Result<FilterChain, FlowcError> {
        Ok(FilterChain {
            server_name: ctx.hostname.clone(),
            route_config_name: route_config_name.to_string(),
            http_filters: ctx.http_filters.clone(),
        })
    }
}

pub struct DefaultTransportStrategy;

impl TransportStrategy for DefaultTransportStrategy {
    fn http_filters(&self, ctx: &TranslationContext) -> Vec<String> {
        ctx.http_filters.clone()
    }
}

/// Always builds the REST-over-HTTP/1.1 default strategy set.
pub struct DefaultStrategyFactory;

impl StrategyFactory for DefaultStrategyFactory {
    fn build(&self, _config: &StrategyConfig, _deployment: &Deployment) -> StrategySet {
        StrategySet {
            route_builder: Box::new(DefaultRouteBuilder),
            cluster_builder: Box::new(DefaultClusterBuilder),
            endpoint_builder: Box::new(DefaultEndpointBuilder),
            listener_builder: Box::new(DefaultListenerBuilder),
            transport: Box::new(DefaultTransportStrategy),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowc_core::ir::{IrMetadata, IrRoute};

    #[test]
    fn test_join_path_normalizes_slashes() {
        assert_eq!(join_path("/orders", "/items"), "/orders/items");
        assert_eq!(join_path("/orders/", "items"), "/orders/items");
        assert_eq!(join_path("/", "/items"), "/items");
    }

    #[test]
    fn test_default_route_builder_prefixes_base_path() {
        let ir = Ir {
            metadata: IrMetadata { api_type: flowc_core::deployment::ApiType::Rest, base_path: "/orders".into() },
            routes: vec![IrRoute { path: "/".into(), methods: vec!["GET".into()], operation_id: None }],
            servers: vec![],
        };
        let routes = DefaultRouteBuilder.build_routes(&ir, "/orders", "cluster_x").unwrap();
        assert_eq!(routes[0].path_prefix, "/orders");
        assert_eq!(routes[0].cluster_name, "cluster_x");
    }

    #[test]
    fn test_default_cluster_builder_converts_timeout_to_ms() {
        let upstream = UpstreamRef {
            host: "h".into(),
            port: 80,
            scheme: "http".into(),
            timeout: 30,
        };
        let cluster = DefaultClusterBuilder
            .build_cluster("cluster_x", &upstream, &StrategyConfig::default())
            .unwrap();
        assert_eq!(cluster.connect_timeout_ms, 30_000);
        assert_eq!(cluster.lb_policy, "round_robin");
    }

    #[test]
    fn test_default_listener_builder_names_by_port() {
        let ctx = TranslationContext {
            listener_id: "l1".into(),
            port: 8080,
            address: "0.0.0.0".into(),
            http2: true,
            environment_id: "e1".into(),
            environment_name: "production".into(),
            hostname: "*".into(),
            http_filters: vec![],
            access_log_enabled: false,
        };
        let listener = DefaultListenerBuilder
            .build_listener(&ctx, "route_l1_production")
            .unwrap();
        assert_eq!(listener.name, "listener_8080");
        assert_eq!(listener.filter_chains[0].server_name, "*");
        assert_eq!(listener.filter_chains[0].route_config_name, "route_l1_production");
    }
}
