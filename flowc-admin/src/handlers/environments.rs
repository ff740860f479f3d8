use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{Json, Response};
use flowc_store::EnvironmentPatch;
use flowc_topology::{CreateEnvironmentSpec, UpdateEnvironmentRequest};
use serde_json::json;

use crate::handlers::gateways::ForceQuery;
use crate::response::{ok, ApiError};
use crate::state::AppState;

pub async fn create_environment(
    State(state): State<Arc<AppState>>,
    Path(listener_id): Path<String>,
    Json(spec): Json<CreateEnvironmentSpec>,
) -> Result<Response, ApiError> {
    let token = state.write_token();
    let environment = state.environments.create(&listener_id, spec, &token).await?;
    Ok(ok(StatusCode::CREATED, json!({ "environment": environment })))
}

pub async fn list_environments(
    State(state): State<Arc<AppState>>,
    Path(listener_id): Path<String>,
) -> Result<Response, ApiError> {
    let token = state.read_token();
    let environments = state.environments.list(&listener_id, &token).await?;
    let total = environments.len();
    Ok(ok(StatusCode::OK, json!({ "environments": environments, "total": total })))
}

pub async fn get_environment(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let token = state.read_token();
    let environment = state.environments.get(&id, &token).await?;
    Ok(ok(StatusCode::OK, json!({ "environment": environment })))
}

pub async fn update_environment(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<UpdateEnvironmentRequest>,
) -> Result<Response, ApiError> {
    let token = state.write_token();
    let patch = EnvironmentPatch {
        hostname: req.hostname,
        description: req.description,
        http_filters: req.http_filters,
    };
    let environment = state.environments.update(&id, patch, &token).await?;
    Ok(ok(StatusCode::OK, json!({ "environment": environment })))
}

pub async fn delete_environment(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(q): Query<ForceQuery>,
) -> Result<Response, ApiError> {
    let token = state.write_token();
    state.environments.delete(&id, q.force, &token).await?;
    Ok(ok(StatusCode::OK, json!({ "deleted": true })))
}
