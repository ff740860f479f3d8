//! Integration tests for the admin REST API.
//!
//! Uses `tower::ServiceExt::oneshot` to call handlers without binding a
//! real TCP port — every test gets a fresh in-memory state.

use std::sync::Arc;
use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::http::{Method, Request, StatusCode};
use flowc_admin::{build_admin_router, AppState};
use flowc_store::{InMemoryRepository, Repository, SnapshotCache};
use flowc_topology::{DeploymentService, EnvironmentService, GatewayService, ListenerService};
use flowc_translator::{DefaultStrategyFactory, StrategyConfig};
use tower::ServiceExt;

fn make_state() -> Arc<AppState> {
    let repo: Arc<dyn Repository> = Arc::new(InMemoryRepository::new());
    let cache = Arc::new(SnapshotCache::new());
    let environments = Arc::new(EnvironmentService::new(repo.clone(), cache.clone()));
    let listeners = Arc::new(ListenerService::new(repo.clone(), cache.clone(), environments.clone()));
    let gateways = Arc::new(GatewayService::new(repo.clone(), cache.clone(), listeners.clone()));
    let deployments = Arc::new(DeploymentService::new(
        repo.clone(),
        cache.clone(),
        flowc_bundle::ParserRegistry::with_defaults(),
        Arc::new(DefaultStrategyFactory),
        StrategyConfig::default(),
    ));
    Arc::new(AppState::new(
        gateways,
        listeners,
        environments,
        deployments,
        Duration::from_secs(15),
        Duration::from_secs(15),
    ))
}

fn get_req(uri: &str) -> Request<Body> {
    Request::builder().method(Method::GET).uri(uri).body(Body::empty()).unwrap()
}

fn delete_req(uri: &str) -> Request<Body> {
    Request::builder().method(Method::DELETE).uri(uri).body(Body::empty()).unwrap()
}

fn json_req(method: Method, uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn multipart_zip_req(uri: &str, zip_bytes: &[u8], description: Option<&str>) -> Request<Body> {
    let boundary = "flowc-test-boundary";
    let mut body = Vec::new();
    if let Some(description) = description {
        body.extend_from_slice(
            format!(
                "--{boundary}\r\nContent-Disposition: form-data; name=\"description\"\r\n\r\n{description}\r\n"
            )
            .as_bytes(),
        );
    }
    body.extend_from_slice(
        format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"bundle.zip\"\r\nContent-Type: application/zip\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(zip_bytes);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("content-type", format!("multipart/form-data; boundary={boundary}"))
        .body(Body::from(body))
        .unwrap()
}

fn build_zip(entries: &[(&str, &[u8])]) -> Vec<u8> {
    use std::io::{Cursor, Write};
    use zip::write::SimpleFileOptions;

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

async fn body_json(resp: axum::response::Response) -> serde_json::Value {
    let bytes = to_bytes(resp.into_body(), 1024 * 1024).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

const OPENAPI: &[u8] = br#"
paths:
  /items:
    get: {}
"#;

fn manifest_for(gateway_id: &str) -> Vec<u8> {
    format!(
        "name: orders-api\nversion: \"1.0.0\"\ncontext: /orders\nupstream:\n  host: orders.internal\n  port: 8000\ngateway:\n  gatewayId: {gateway_id}\n  port: 8080\n  environment: production\n"
    )
    .into_bytes()
}

#[tokio::test]
async fn health_check_returns_200() {
    let app = build_admin_router(make_state(), &[]);
    let resp = app.oneshot(get_req("/health")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let j = body_json(resp).await;
    assert_eq!(j["status"], "ok");
}

#[tokio::test]
async fn create_gateway_with_no_listeners_applies_defaults() {
    let app = build_admin_router(make_state(), &[]);
    let resp = app
        .oneshot(json_req(
            Method::POST,
            "/api/v1/gateways",
            serde_json::json!({ "nodeId": "n1", "name": "gw1" }),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let j = body_json(resp).await;
    assert_eq!(j["success"], true);
    assert_eq!(j["gateway"]["nodeId"], "n1");
}

#[tokio::test]
async fn get_gateway_returns_404_when_missing() {
    let app = build_admin_router(make_state(), &[]);
    let resp = app.oneshot(get_req("/api/v1/gateways/nonexistent")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let j = body_json(resp).await;
    assert_eq!(j["success"], false);
}

#[tokio::test]
async fn duplicate_node_id_returns_409() {
    let state = make_state();
    let app1 = build_admin_router(state.clone(), &[]);
    app1.oneshot(json_req(
        Method::POST,
        "/api/v1/gateways",
        serde_json::json!({ "nodeId": "n1", "name": "gw1" }),
    ))
    .await
    .unwrap();

    let app2 = build_admin_router(state, &[]);
    let resp = app2
        .oneshot(json_req(
            Method::POST,
            "/api/v1/gateways",
            serde_json::json!({ "nodeId": "n1", "name": "gw2" }),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn delete_gateway_refuses_with_children_unless_forced() {
    let state = make_state();
    let app1 = build_admin_router(state.clone(), &[]);
    let resp = app1
        .oneshot(json_req(
            Method::POST,
            "/api/v1/gateways",
            serde_json::json!({ "nodeId": "n1", "name": "gw1" }),
        ))
        .await
        .unwrap();
    let gateway_id = body_json(resp).await["gateway"]["id"].as_str().unwrap().to_string();

    let app2 = build_admin_router(state.clone(), &[]);
    let resp = app2
        .oneshot(delete_req(&format!("/api/v1/gateways/{gateway_id}")))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let app3 = build_admin_router(state, &[]);
    let resp = app3
        .oneshot(delete_req(&format!("/api/v1/gateways/{gateway_id}?force=true")))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn list_gateways_reflects_inserts() {
    let state = make_state();
    for (node_id, name) in [("n1", "gw1"), ("n2", "gw2")] {
        let app = build_admin_router(state.clone(), &[]);
        app.oneshot(json_req(
            Method::POST,
            "/api/v1/gateways",
            serde_json::json!({ "nodeId": node_id, "name": name }),
        ))
        .await
        .unwrap();
    }
    let app = build_admin_router(state, &[]);
    let resp = app.oneshot(get_req("/api/v1/gateways")).await.unwrap();
    let j = body_json(resp).await;
    assert_eq!(j["total"], 2);
}

#[tokio::test]
async fn deploy_bundle_publishes_deployment() {
    let state = make_state();
    let app1 = build_admin_router(state.clone(), &[]);
    let resp = app1
        .oneshot(json_req(
            Method::POST,
            "/api/v1/gateways",
            serde_json::json!({ "nodeId": "n1", "name": "gw1" }),
        ))
        .await
        .unwrap();
    let gateway_id = body_json(resp).await["gateway"]["id"].as_str().unwrap().to_string();

    let zip_bytes = build_zip(&[
        ("flowc.yaml", &manifest_for(&gateway_id)),
        ("openapi.yaml", OPENAPI),
    ]);
    let app2 = build_admin_router(state, &[]);
    let resp = app2
        .oneshot(multipart_zip_req("/api/v1/deployments", &zip_bytes, Some("orders v1")))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let j = body_json(resp).await;
    assert_eq!(j["deployment"]["status"], "deployed");
}

#[tokio::test]
async fn validate_lists_bundle_entries() {
    let zip_bytes = build_zip(&[
        ("flowc.yaml", &manifest_for("whatever")),
        ("openapi.yaml", OPENAPI),
    ]);
    let app = build_admin_router(make_state(), &[]);
    let resp = app
        .oneshot(multipart_zip_req("/api/v1/validate", &zip_bytes, None))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let j = body_json(resp).await;
    assert_eq!(j["files"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn deployment_stats_starts_at_zero() {
    let app = build_admin_router(make_state(), &[]);
    let resp = app.oneshot(get_req("/api/v1/deployments/stats")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let j = body_json(resp).await;
    assert_eq!(j["total"], 0);
}

#[tokio::test]
async fn metrics_endpoint_returns_200() {
    let app = build_admin_router(make_state(), &[]);
    let resp = app.oneshot(get_req("/metrics")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[cfg(feature = "prometheus")]
#[tokio::test]
async fn metrics_reflect_gateway_creation_and_admin_requests() {
    let repo: Arc<dyn Repository> = Arc::new(InMemoryRepository::new());
    let cache = Arc::new(SnapshotCache::new());
    let metrics = Arc::new(flowc_observability::MetricsCollector::new().unwrap());
    let environments = Arc::new(EnvironmentService::new(repo.clone(), cache.clone()).with_metrics(metrics.clone()));
    let listeners = Arc::new(
        ListenerService::new(repo.clone(), cache.clone(), environments.clone()).with_metrics(metrics.clone()),
    );
    let gateways = Arc::new(
        GatewayService::new(repo.clone(), cache.clone(), listeners.clone()).with_metrics(metrics.clone()),
    );
    let deployments = Arc::new(DeploymentService::new(
        repo.clone(),
        cache.clone(),
        flowc_bundle::ParserRegistry::with_defaults(),
        Arc::new(DefaultStrategyFactory),
        StrategyConfig::default(),
    ));
    let state = Arc::new(
        AppState::new(
            gateways,
            listeners,
            environments,
            deployments,
            Duration::from_secs(15),
            Duration::from_secs(15),
        )
        .with_metrics(metrics),
    );

    let app = build_admin_router(state, &[]);
    let resp = app
        .clone()
        .oneshot(json_req(
            Method::POST,
            "/api/v1/gateways",
            serde_json::json!({"nodeId": "n1", "name": "gw1"}),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);

    let resp = app.oneshot(get_req("/metrics")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = String::from_utf8(to_bytes(resp.into_body(), usize::MAX).await.unwrap().to_vec()).unwrap();
    assert!(body.contains("flowc_gateways_total 1"));
    assert!(body.contains("flowc_admin_requests_total"));
}
