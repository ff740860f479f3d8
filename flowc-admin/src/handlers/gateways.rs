use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{Json, Response};
use flowc_topology::{CreateGatewayRequest, UpdateGatewayRequest};
use serde::Deserialize;
use serde_json::json;

use crate::response::{ok, ApiError};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ForceQuery {
    #[serde(default)]
    pub force: bool,
}

pub async fn create_gateway(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateGatewayRequest>,
) -> Result<Response, ApiError> {
    let token = state.write_token();
    let gateway = state.gateways.create(req, &token).await?;
    Ok(ok(StatusCode::CREATED, json!({ "gateway": gateway })))
}

pub async fn list_gateways(State(state): State<Arc<AppState>>) -> Result<Response, ApiError> {
    let token = state.read_token();
    let gateways = state.gateways.list(&token).await?;
    let total = gateways.len();
    Ok(ok(StatusCode::OK, json!({ "gateways": gateways, "total": total })))
}

pub async fn get_gateway(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let token = state.read_token();
    let gateway = state.gateways.get(&id, &token).await?;
    Ok(ok(StatusCode::OK, json!({ "gateway": gateway })))
}

pub async fn update_gateway(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<UpdateGatewayRequest>,
) -> Result<Response, ApiError> {
    let token = state.write_token();
    let gateway = state.gateways.update(&id, req, &token).await?;
    Ok(ok(StatusCode::OK, json!({ "gateway": gateway })))
}

pub async fn delete_gateway(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(q): Query<ForceQuery>,
) -> Result<Response, ApiError> {
    let token = state.write_token();
    state.gateways.delete(&id, q.force, &token).await?;
    Ok(ok(StatusCode::OK, json!({ "deleted": true })))
}

pub async fn get_apis(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let token = state.read_token();
    let deployments = state.gateways.get_apis(&id, &token).await?;
    let total = deployments.len();
    Ok(ok(StatusCode::OK, json!({ "deployments": deployments, "total": total })))
}
