//! The management REST surface (§6.4): thin handlers that call
//! straight through to `ConfigStore`/`OutgoingScheduler`/the metrics
//! collectors. No business logic lives here.

use crate::state::AppState;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use moxapp_config::{AuthConfig, ConfigData, ConfigError, GlobalSettings, InboundRoute, OutgoingEndpoint};
use serde::{Deserialize, Serialize};
use serde_json::json;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/metrics", get(metrics_all))
        .route("/metrics/reset", post(metrics_reset))
        .route("/metrics/outgoing", get(metrics_outgoing))
        .route("/metrics/incoming", get(metrics_incoming))
        .route("/outgoing/settings", get(get_settings).put(put_settings))
        .route("/outgoing/endpoints", get(list_endpoints).post(create_endpoint))
        .route(
            "/outgoing/endpoints/{name}",
            get(get_endpoint).put(update_endpoint).delete(delete_endpoint),
        )
        .route("/outgoing/auth-configs", get(list_auth).post(create_auth))
        .route("/outgoing/auth-configs/{name}", get(get_auth).put(update_auth).delete(delete_auth))
        .route("/outgoing/control", post(outgoing_control))
        .route("/incoming/routes", get(list_routes).post(create_route))
        .route("/incoming/routes/reload", post(reload_routes))
        .route("/incoming/routes/{name}", get(get_route).put(update_route).delete(delete_route))
        .route("/incoming/control", post(incoming_control))
        .route("/config/export", get(export_config))
        .route("/config/import", post(import_config))
}

// ---- errors ----

fn config_error_response(err: ConfigError) -> Response {
    match err {
        ConfigError::NotFound(msg) => (StatusCode::NOT_FOUND, Json(json!({ "error": msg }))).into_response(),
        ConfigError::Conflict(msg) => (StatusCode::CONFLICT, Json(json!({ "error": msg }))).into_response(),
        ConfigError::Validation(errors) => (StatusCode::BAD_REQUEST, Json(json!({ "errors": errors }))).into_response(),
        err @ (ConfigError::ReadError { .. } | ConfigError::WriteError { .. } | ConfigError::ParseError { .. }) => {
            (StatusCode::SERVICE_UNAVAILABLE, Json(json!({ "error": err.to_string() }))).into_response()
        }
    }
}

// ---- metrics ----

async fn metrics_all(State(state): State<AppState>) -> Response {
    Json(json!({
        "outgoing": state.outgoing_metrics.snapshot(),
        "incoming": state.inbound_metrics.snapshot(),
    }))
    .into_response()
}

async fn metrics_reset(State(state): State<AppState>) -> StatusCode {
    state.outgoing_metrics.reset();
    state.inbound_metrics.reset();
    StatusCode::NO_CONTENT
}

async fn metrics_outgoing(State(state): State<AppState>) -> Response {
    Json(state.outgoing_metrics.snapshot()).into_response()
}

async fn metrics_incoming(State(state): State<AppState>) -> Response {
    Json(state.inbound_metrics.snapshot()).into_response()
}

// ---- outgoing settings ----

#[derive(Deserialize)]
struct SettingsUpdate {
    #[serde(default)]
    global_multiplier: Option<f64>,
    #[serde(default)]
    concurrent_requests: Option<u32>,
    #[serde(default)]
    log_all_requests: Option<bool>,
    #[serde(default)]
    enabled: Option<bool>,
}

async fn get_settings(State(state): State<AppState>) -> Response {
    let snapshot = state.config.snapshot().await;
    Json(snapshot.global).into_response()
}

async fn put_settings(State(state): State<AppState>, Json(update): Json<SettingsUpdate>) -> Response {
    if let Some(value) = update.global_multiplier {
        state.config.set_global_multiplier(value).await;
    }
    if let Some(value) = update.concurrent_requests {
        state.config.set_concurrent_requests(value).await;
    }
    if let Some(value) = update.log_all_requests {
        state.config.set_log_all_requests(value).await;
    }
    if let Some(value) = update.enabled {
        state.config.set_enabled(value).await;
    }
    let snapshot: GlobalSettings = state.config.snapshot().await.global;
    Json(snapshot).into_response()
}

// ---- outgoing endpoints ----

async fn list_endpoints(State(state): State<AppState>) -> Response {
    Json(state.config.list_outgoing().await).into_response()
}

async fn get_endpoint(State(state): State<AppState>, Path(name): Path<String>) -> Response {
    match state.config.get_outgoing(&name).await {
        Some(endpoint) => Json(endpoint).into_response(),
        None => config_error_response(ConfigError::NotFound(format!("endpoint '{name}' not found"))),
    }
}

async fn create_endpoint(State(state): State<AppState>, Json(endpoint): Json<OutgoingEndpoint>) -> Response {
    match state.config.add_outgoing(endpoint.clone()).await {
        Ok(()) => (StatusCode::CREATED, Json(endpoint)).into_response(),
        Err(e) => config_error_response(e),
    }
}

async fn update_endpoint(State(state): State<AppState>, Path(name): Path<String>, Json(endpoint): Json<OutgoingEndpoint>) -> Response {
    match state.config.update_outgoing(&name, endpoint.clone()).await {
        Ok(()) => Json(endpoint).into_response(),
        Err(e) => config_error_response(e),
    }
}

async fn delete_endpoint(State(state): State<AppState>, Path(name): Path<String>) -> Response {
    match state.config.delete_outgoing(&name).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => config_error_response(e),
    }
}

// ---- auth configs ----

async fn list_auth(State(state): State<AppState>) -> Response {
    Json(state.config.list_auth().await).into_response()
}

async fn get_auth(State(state): State<AppState>, Path(name): Path<String>) -> Response {
    match state.config.get_auth(&name).await {
        Some(auth) => Json(auth).into_response(),
        None => config_error_response(ConfigError::NotFound(format!("auth config '{name}' not found"))),
    }
}

async fn create_auth(State(state): State<AppState>, Json(auth): Json<AuthConfig>) -> Response {
    match state.config.add_auth(auth.clone()).await {
        Ok(()) => (StatusCode::CREATED, Json(auth)).into_response(),
        Err(e) => config_error_response(e),
    }
}

async fn update_auth(State(state): State<AppState>, Path(name): Path<String>, Json(auth): Json<AuthConfig>) -> Response {
    match state.config.update_auth(&name, auth.clone()).await {
        Ok(()) => Json(auth).into_response(),
        Err(e) => config_error_response(e),
    }
}

async fn delete_auth(State(state): State<AppState>, Path(name): Path<String>) -> Response {
    match state.config.delete_auth(&name).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => config_error_response(e),
    }
}

// ---- outgoing control ----

#[derive(Deserialize)]
struct ControlRequest {
    action: String,
}

#[derive(Serialize)]
struct ControlResponse {
    action: String,
    remaining_in_flight: Option<u64>,
}

async fn outgoing_control(State(state): State<AppState>, Json(req): Json<ControlRequest>) -> Response {
    match req.action.as_str() {
        "pause" => {
            state.scheduler.pause().await;
            Json(ControlResponse { action: req.action, remaining_in_flight: None }).into_response()
        }
        "resume" => {
            state.scheduler.resume().await;
            Json(ControlResponse { action: req.action, remaining_in_flight: None }).into_response()
        }
        "emergency_stop" => {
            state.scheduler.emergency_stop().await;
            Json(ControlResponse { action: req.action, remaining_in_flight: None }).into_response()
        }
        "stop" => {
            let remaining = state.scheduler.stop().await;
            Json(ControlResponse { action: req.action, remaining_in_flight: Some(remaining) }).into_response()
        }
        "start" => {
            state.scheduler.start();
            Json(ControlResponse { action: req.action, remaining_in_flight: None }).into_response()
        }
        other => (StatusCode::BAD_REQUEST, Json(json!({ "error": format!("unknown action '{other}'") }))).into_response(),
    }
}

// ---- incoming routes ----

async fn list_routes(State(state): State<AppState>) -> Response {
    Json(state.config.list_incoming().await).into_response()
}

async fn get_route(State(state): State<AppState>, Path(name): Path<String>) -> Response {
    match state.config.get_incoming(&name).await {
        Some(route) => Json(route).into_response(),
        None => config_error_response(ConfigError::NotFound(format!("route '{name}' not found"))),
    }
}

async fn create_route(State(state): State<AppState>, Json(route): Json<InboundRoute>) -> Response {
    match state.config.add_incoming(route.clone()).await {
        Ok(()) => (StatusCode::CREATED, Json(route)).into_response(),
        Err(e) => config_error_response(e),
    }
}

async fn update_route(State(state): State<AppState>, Path(name): Path<String>, Json(route): Json<InboundRoute>) -> Response {
    match state.config.update_incoming(&name, route.clone()).await {
        Ok(()) => Json(route).into_response(),
        Err(e) => config_error_response(e),
    }
}

async fn delete_route(State(state): State<AppState>, Path(name): Path<String>) -> Response {
    match state.config.delete_incoming(&name).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => config_error_response(e),
    }
}

/// Re-read the configured YAML path, replacing the live configuration
/// in one atomic swap. The only way besides the management API itself
/// that runtime state changes (§9: no watch-on-disk).
async fn reload_routes(State(state): State<AppState>) -> Response {
    match state.config.reload().await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => config_error_response(e),
    }
}

#[derive(Deserialize)]
struct IncomingControlRequest {
    action: String,
}

async fn incoming_control(State(state): State<AppState>, Json(req): Json<IncomingControlRequest>) -> Response {
    match req.action.as_str() {
        "enable" => {
            state.config.set_incoming_enabled(true).await;
            StatusCode::NO_CONTENT.into_response()
        }
        "disable" => {
            state.config.set_incoming_enabled(false).await;
            StatusCode::NO_CONTENT.into_response()
        }
        other => (StatusCode::BAD_REQUEST, Json(json!({ "error": format!("unknown action '{other}'") }))).into_response(),
    }
}

// ---- config export/import ----

async fn export_config(State(state): State<AppState>) -> Response {
    Json(state.config.snapshot().await).into_response()
}

async fn import_config(State(state): State<AppState>, Json(data): Json<ConfigData>) -> Response {
    match state.config.replace_all(data).await {
        Ok(()) => StatusCode::OK.into_response(),
        Err(e) => config_error_response(e),
    }
}
