pub mod config;
pub mod dispatch;

use anyhow::Result;
use axum::extract::rejection::JsonRejection;
use axum::{extract::State, http::HeaderMap, routing::{get, post}, Json, Router};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use trendwatch_core::{DatasetStore, SearchEngine};

pub use config::ServerConfig;
use dispatch::{ToolCall, ToolError, ToolOutput};

#[derive(Deserialize)]
pub struct ToolRequest {
    pub name: String,
    #[serde(default)]
    pub arguments: Value,
}

#[derive(Clone)]
pub struct AppState {
    pub engine: SearchEngine,
    pub config: Arc<ServerConfig>,
}

/// Validate `config`, load its dataset and assemble the router.
pub fn build_app(config: ServerConfig) -> Result<Router> {
    config.validate()?;
    let store = DatasetStore::open(&config.data_path)?;
    let engine = SearchEngine::new(Arc::new(store));
    Ok(router(AppState { engine, config: Arc::new(config) }))
}

pub fn router(state: AppState) -> Router {
    let cors = match state.config.cors_allow_origin.as_deref() {
        Some(val) => {
            let origins: Vec<_> = val
                .split(',')
                .filter_map(|s| s.trim().parse().ok())
                .collect();
            if origins.is_empty() {
                CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
            } else {
                CorsLayer::new().allow_origin(AllowOrigin::list(origins)).allow_methods(Any).allow_headers(Any)
            }
        }
        None => CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any),
    };

    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/tools", get(list_tools))
        .route("/tools/call", post(call_tool))
        .route("/dataset", get(dataset_info))
        .route("/admin/reload", post(reload_dataset))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

async fn list_tools(State(state): State<AppState>, headers: HeaderMap) -> Result<Json<Value>, ToolError> {
    authorize_caller(&state, &headers)?;
    Ok(Json(dispatch::catalog()))
}

pub async fn call_tool(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<ToolRequest>, JsonRejection>,
) -> Result<Json<ToolOutput>, ToolError> {
    authorize_caller(&state, &headers)?;
    let Json(req) = body.map_err(|rejection| ToolError::invalid(rejection.body_text()))?;
    let start = std::time::Instant::now();
    let call = ToolCall::parse(&req.name, req.arguments, state.config.limits)?;
    let name = call.name();
    let out = dispatch::run(state.engine.clone(), call, state.config.request_timeout).await;
    let elapsed = start.elapsed();
    match &out {
        Ok(_) => tracing::debug!(tool = name, took_s = elapsed.as_secs_f64(), "tool call served"),
        Err(e) => tracing::info!(tool = name, code = e.code, took_s = elapsed.as_secs_f64(), "tool call failed"),
    }
    out.map(Json)
}

async fn dataset_info(State(state): State<AppState>, headers: HeaderMap) -> Result<Json<Value>, ToolError> {
    authorize_caller(&state, &headers)?;
    let pair = state.engine.store().current();
    Ok(Json(serde_json::json!({
        "generation": pair.generation,
        "fingerprint": pair.snapshot.fingerprint(),
        "meta": pair.snapshot.meta(),
        "num_terms": pair.index.num_terms(),
    })))
}

async fn reload_dataset(State(state): State<AppState>, headers: HeaderMap) -> Result<Json<Value>, ToolError> {
    authorize_admin(&state, &headers)?;
    let engine = state.engine.clone();
    let path = state.config.data_path.clone();
    let generation = tokio::task::spawn_blocking(move || engine.store().reload(&path))
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "reload task failed");
            ToolError::new(axum::http::StatusCode::INTERNAL_SERVER_ERROR, "internal", "reload failed")
        })?
        .map_err(|e| {
            tracing::warn!(error = %e, "reload rejected, keeping current dataset");
            ToolError::from(e)
        })?;
    let pair = state.engine.store().current();
    Ok(Json(serde_json::json!({
        "generation": generation,
        "records": pair.snapshot.len(),
        "fingerprint": pair.snapshot.fingerprint(),
    })))
}

fn authorize_caller(state: &AppState, headers: &HeaderMap) -> Result<(), ToolError> {
    let Some(required) = &state.config.api_token else {
        return Ok(());
    };
    let provided = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .unwrap_or("");
    if provided == required {
        Ok(())
    } else {
        Err(ToolError::unauthorized("missing or invalid bearer token"))
    }
}

fn authorize_admin(state: &AppState, headers: &HeaderMap) -> Result<(), ToolError> {
    let required = match &state.config.admin_token {
        Some(t) => t,
        None => return Err(ToolError::unauthorized("ADMIN_TOKEN not set")),
    };
    let provided = headers.get("X-ADMIN-TOKEN").and_then(|v| v.to_str().ok()).unwrap_or("");
    if provided == required {
        Ok(())
    } else {
        Err(ToolError::unauthorized("invalid admin token"))
    }
}
