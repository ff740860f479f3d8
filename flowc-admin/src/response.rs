use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use flowc_core::FlowcError;
use serde::Serialize;
use serde_json::{json, Value};

/// Wraps a `FlowcError` so it can be returned directly from a handler.
/// Renders the shared envelope `{success: false, error: string}` at the
/// status code `FlowcError::status_code` maps to.
pub struct ApiError(pub FlowcError);

impl From<FlowcError> for ApiError {
    fn from(e: FlowcError) -> Self {
        ApiError(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.0.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(json!({"success": false, "error": self.0.to_string()}))).into_response()
    }
}

/// Success envelope: `{success: true, ...fields}` at the given status.
pub fn ok<T: Serialize>(status: StatusCode, fields: T) -> Response {
    let mut value = serde_json::to_value(fields).unwrap_or(Value::Null);
    if let Value::Object(ref mut map) = value {
        map.insert("success".to_string(), json!(true));
    }
    (status, Json(value)).into_response()
}
