use std::sync::Arc;

use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::response::Response;
use flowc_core::FlowcError;
use serde_json::json;

use crate::response::{ok, ApiError};
use crate::state::AppState;

struct UploadedBundle {
    bytes: Vec<u8>,
    description: Option<String>,
}

async fn read_bundle_multipart(mut multipart: Multipart) -> Result<UploadedBundle, FlowcError> {
    let mut bytes: Option<Vec<u8>> = None;
    let mut description: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| FlowcError::InvalidInput(format!("malformed multipart body: {e}")))?
    {
        match field.name().map(str::to_string).as_deref() {
            Some("file") => {
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| FlowcError::InvalidInput(format!("failed reading upload: {e}")))?;
                bytes = Some(data.to_vec());
            }
            Some("description") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| FlowcError::InvalidInput(format!("failed reading description: {e}")))?;
                description = Some(text);
            }
            _ => {}
        }
    }

    let bytes = bytes.ok_or_else(|| FlowcError::InvalidInput("missing `file` field".to_string()))?;
    Ok(UploadedBundle { bytes, description })
}

pub async fn deploy(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<Response, ApiError> {
    let uploaded = read_bundle_multipart(multipart).await?;
    let token = state.write_token();
    let deployment = state
        .deployments
        .deploy(&uploaded.bytes, uploaded.description, &token)
        .await?;
    Ok(ok(StatusCode::CREATED, json!({ "deployment": deployment })))
}

pub async fn update_deployment(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    multipart: Multipart,
) -> Result<Response, ApiError> {
    let uploaded = read_bundle_multipart(multipart).await?;
    let token = state.write_token();
    let deployment = state.deployments.update(&id, &uploaded.bytes, &token).await?;
    Ok(ok(StatusCode::OK, json!({ "deployment": deployment })))
}

pub async fn get_deployment(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let token = state.read_token();
    let deployment = state.deployments.get(&id, &token).await?;
    Ok(ok(StatusCode::OK, json!({ "deployment": deployment })))
}

pub async fn list_deployments(State(state): State<Arc<AppState>>) -> Result<Response, ApiError> {
    let token = state.read_token();
    let deployments = state.deployments.list(&token).await?;
    let total = deployments.len();
    Ok(ok(StatusCode::OK, json!({ "deployments": deployments, "total": total })))
}

pub async fn delete_deployment(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let token = state.write_token();
    state.deployments.delete(&id, &token).await?;
    Ok(ok(StatusCode::OK, json!({ "deleted": true })))
}

pub async fn stats(State(state): State<Arc<AppState>>) -> Result<Response, ApiError> {
    let token = state.read_token();
    let stats = state.deployments.stats(&token).await?;
    Ok(ok(StatusCode::OK, json!(stats)))
}

pub async fn validate(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<Response, ApiError> {
    let uploaded = read_bundle_multipart(multipart).await?;
    let entries = state.deployments.validate_bundle(&uploaded.bytes)?;
    Ok(ok(StatusCode::OK, json!({ "files": entries })))
}
