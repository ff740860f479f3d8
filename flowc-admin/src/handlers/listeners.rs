use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{Json, Response};
use flowc_store::ListenerPatch;
use flowc_topology::{CreateListenerSpec, UpdateListenerRequest};
use serde_json::json;

use crate::handlers::gateways::ForceQuery;
use crate::response::{ok, ApiError};
use crate::state::AppState;

pub async fn create_listener(
    State(state): State<Arc<AppState>>,
    Path(gateway_id): Path<String>,
    Json(spec): Json<CreateListenerSpec>,
) -> Result<Response, ApiError> {
    let token = state.write_token();
    let listener = state.listeners.create(&gateway_id, spec, &token).await?;
    Ok(ok(StatusCode::CREATED, json!({ "listener": listener })))
}

pub async fn list_listeners(
    State(state): State<Arc<AppState>>,
    Path(gateway_id): Path<String>,
) -> Result<Response, ApiError> {
    let token = state.read_token();
    let listeners = state.listeners.list(&gateway_id, &token).await?;
    let total = listeners.len();
    Ok(ok(StatusCode::OK, json!({ "listeners": listeners, "total": total })))
}

pub async fn get_listener(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let token = state.read_token();
    let listener = state.listeners.get(&id, &token).await?;
    Ok(ok(StatusCode::OK, json!({ "listener": listener })))
}

pub async fn update_listener(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<UpdateListenerRequest>,
) -> Result<Response, ApiError> {
    let token = state.write_token();
    let patch = ListenerPatch {
        tls: req.tls,
        http2: req.http2,
        access_log: req.access_log,
    };
    let listener = state.listeners.update(&id, patch, &token).await?;
    Ok(ok(StatusCode::OK, json!({ "listener": listener })))
}

pub async fn delete_listener(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(q): Query<ForceQuery>,
) -> Result<Response, ApiError> {
    let token = state.write_token();
    state.listeners.delete(&id, q.force, &token).await?;
    Ok(ok(StatusCode::OK, json!({ "deleted": true })))
}
