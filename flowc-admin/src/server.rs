use std::sync::Arc;

use axum::extract::{Request, State};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::{delete, get, post, put};
use axum::Router as AxumRouter;
use flowc_core::config::AdminConfig;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::handlers;
use crate::state::AppState;

/// Admin REST API server, built around `flowc-topology`'s services.
pub struct AdminServer {
    config: AdminConfig,
    state: Arc<AppState>,
}

impl AdminServer {
    pub fn new(config: AdminConfig, state: Arc<AppState>) -> Self {
        Self { config, state }
    }

    /// Builds the Axum router with every route from the admin surface,
    /// nested under `/api/v1`.
    pub fn build_router(&self) -> AxumRouter {
        build_admin_router(self.state.clone(), &self.config.cors_origins)
    }

    /// Starts the admin API server; a no-op if disabled in configuration.
    pub async fn start(self) -> anyhow::Result<()> {
        if !self.config.enabled {
            info!("admin API disabled");
            return Ok(());
        }

        let addr = self.config.addr;
        let app = self.build_router();

        info!(%addr, "starting admin API server");
        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, app).await?;
        Ok(())
    }
}

/// Assembles the full admin router against an already-built `AppState`,
/// without binding a port. Exercised directly by handler tests via
/// `tower::ServiceExt::oneshot`.
pub fn build_admin_router(state: Arc<AppState>, cors_origins: &[String]) -> AxumRouter {
    let api = AxumRouter::new()
        .route("/gateways", post(handlers::gateways::create_gateway))
        .route("/gateways", get(handlers::gateways::list_gateways))
        .route("/gateways/{id}", get(handlers::gateways::get_gateway))
        .route("/gateways/{id}", put(handlers::gateways::update_gateway))
        .route("/gateways/{id}", delete(handlers::gateways::delete_gateway))
        .route("/gateways/{id}/apis", get(handlers::gateways::get_apis))
        .route(
            "/gateways/{gateway_id}/listeners",
            post(handlers::listeners::create_listener),
        )
        .route(
            "/gateways/{gateway_id}/listeners",
            get(handlers::listeners::list_listeners),
        )
        .route("/listeners/{id}", get(handlers::listeners::get_listener))
        .route("/listeners/{id}", put(handlers::listeners::update_listener))
        .route("/listeners/{id}", delete(handlers::listeners::delete_listener))
        .route(
            "/listeners/{listener_id}/environments",
            post(handlers::environments::create_environment),
        )
        .route(
            "/listeners/{listener_id}/environments",
            get(handlers::environments::list_environments),
        )
        .route("/environments/{id}", get(handlers::environments::get_environment))
        .route(
            "/environments/{id}",
            put(handlers::environments::update_environment),
        )
        .route(
            "/environments/{id}",
            delete(handlers::environments::delete_environment),
        )
        .route("/deployments", post(handlers::deployments::deploy))
        .route("/deployments", get(handlers::deployments::list_deployments))
        .route("/deployments/stats", get(handlers::deployments::stats))
        .route("/deployments/{id}", get(handlers::deployments::get_deployment))
        .route("/deployments/{id}", put(handlers::deployments::update_deployment))
        .route(
            "/deployments/{id}",
            delete(handlers::deployments::delete_deployment),
        )
        .route("/validate", post(handlers::deployments::validate));

    let cors = if cors_origins.is_empty() {
        CorsLayer::new().allow_origin(Any)
    } else {
        let origins: Vec<_> = cors_origins.iter().filter_map(|o| o.parse().ok()).collect();
        CorsLayer::new().allow_origin(origins)
    };

    AxumRouter::new()
        .route("/health", get(handlers::health::health_check))
        .nest("/api/v1", api)
        .route("/metrics", get(metrics_handler))
        .layer(middleware::from_fn_with_state(state.clone(), record_metrics))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Records every admin request in the Prometheus counter, keyed by method,
/// matched route path, and response status. Runs outside `TraceLayer` so the
/// timing includes the full request/response cycle.
#[cfg_attr(not(feature = "prometheus"), allow(unused_variables))]
async fn record_metrics(State(state): State<Arc<AppState>>, request: Request, next: Next) -> Response {
    #[cfg(feature = "prometheus")]
    let started = std::time::Instant::now();
    #[cfg(feature = "prometheus")]
    let method = request.method().to_string();
    #[cfg(feature = "prometheus")]
    let path = request
        .extensions()
        .get::<axum::extract::MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| request.uri().path().to_string());

    let response = next.run(request).await;

    #[cfg(feature = "prometheus")]
    if let Some(m) = &state.metrics {
        m.record_admin_request(&method, &path, response.status().as_u16(), started.elapsed().as_secs_f64());
    }

    response
}

#[cfg_attr(not(feature = "prometheus"), allow(unused_variables))]
async fn metrics_handler(State(state): State<Arc<AppState>>) -> String {
    #[cfg(feature = "prometheus")]
    {
        state
            .metrics
            .as_ref()
            .map(|m| m.gather_text())
            .unwrap_or_default()
    }
    #[cfg(not(feature = "prometheus"))]
    {
        String::new()
    }
}
