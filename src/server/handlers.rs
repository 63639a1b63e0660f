//! HTTP handlers for the method channel.

use axum::{
    Json,
    extract::{Path, State},
};
use serde_json::{Value, json};
use std::sync::Arc;

use crate::channel::{MethodCall, MethodResponse};

use super::state::AppState;

/// Handle POST /api/channel - dispatch a full method call.
pub async fn call(
    State(state): State<Arc<AppState>>,
    Json(call): Json<MethodCall>,
) -> Json<MethodResponse> {
    Json(state.bridge.handle(call).await)
}

/// Handle POST /api/channel/:method - method in the path, arguments as the body.
///
/// The body may be omitted for methods that take no arguments.
pub async fn call_named(
    State(state): State<Arc<AppState>>,
    Path(method): Path<String>,
    body: Option<Json<Value>>,
) -> Json<MethodResponse> {
    let arguments = body.map(|Json(value)| value).unwrap_or(Value::Null);
    Json(state.bridge.handle(MethodCall::new(method, arguments)).await)
}

/// Handle GET /api/health - liveness plus connection state (no printer I/O).
pub async fn health(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "ok": true,
        "connected": state.bridge.is_connected().await,
        "boot_time": state.boot_time,
    }))
}
