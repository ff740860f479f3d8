use flowc_core::deployment::{Deployment, UpstreamRef};
use flowc_core::ir::Ir;
use flowc_core::resource::{Cluster, Endpoint, FilterChain, ProxyListener, RouteEntry};
use flowc_core::FlowcError;

/// Everything the translator needs about the listener/environment a
/// deployment is bound to, assembled by the caller (the deployment
/// service) from the repository.
#[derive(Debug, Clone)]
pub struct TranslationContext {
    pub listener_id: String,
    pub port: u16,
    pub address: String,
    pub http2: bool,
    pub environment_id: String,
    pub environment_name: String,
    pub hostname: String,
    pub http_filters: Vec<String>,
    pub access_log_enabled: bool,
}

/// Tunable knobs passed to a `StrategyFactory`; defaults cover REST over
/// HTTP/1.1 with a single upstream cluster.
#[derive(Debug, Clone, Default)]
pub struct StrategyConfig {
    pub lb_policy: Option<String>,
    pub health_check_path: Option<String>,
}

pub trait RouteBuilder: Send + Sync {
    /// Builds the ordered list of route entries for one deployment's IR,
    /// all pointing at `cluster_name`.
    fn build_routes(
        &self,
        ir: &Ir,
        base_path: &str,
        cluster_name: &str,
    ) -> Result<Vec<RouteEntry>, FlowcError>;
}

pub trait ClusterBuilder: Send + Sync {
    fn build_cluster(
        &self,
        cluster_name: &str,
        upstream: &UpstreamRef,
        config: &StrategyConfig,
    ) -> Result<Cluster, FlowcError>;
}

pub trait EndpointBuilder: Send + Sync {
    fn build_endpoints(
        &self,
        cluster_name: &str,
        upstream: &UpstreamRef,
    ) -> Result<Vec<Endpoint>, FlowcError>;
}

pub trait ListenerBuilder: Send + Sync {
    fn build_listener(
        &self,
        ctx: &TranslationContext,
        route_config_name: &str,
    ) -> Result<ProxyListener, FlowcError>;

    fn build_filter_chain(
        &self,
        ctx: &TranslationContext,
        route_config_name: &str,
    ) -> Result<FilterChain, FlowcError>;
}

pub trait TransportStrategy: Send + Sync {
    /// HTTP filter names applied ahead of routing, in order.
    fn http_filters(&self, ctx: &TranslationContext) -> Vec<String>;
}

/// A fully assembled set of strategies, handed to the `CompositeTranslator`.
pub struct StrategySet {
    pub route_builder: Box<dyn RouteBuilder>,
    pub cluster_builder: Box<dyn ClusterBuilder>,
    pub endpoint_builder: Box<dyn EndpointBuilder>,
    pub listener_builder: Box<dyn ListenerBuilder>,
    pub transport: Box<dyn TransportStrategy>,
}

/// Produces a `StrategySet` for a deployment. The default factory always
/// returns the REST-over-HTTP/1.1 defaults regardless of the deployment's
/// declared API type — every IR shape (REST, websocket, gRPC, GraphQL)
/// reduces to the same path-prefix routing model once it reaches the
/// translator.
pub trait StrategyFactory: Send + Sync {
    fn build(&self, config: &StrategyConfig, deployment: &Deployment) -> StrategySet;
}
