use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use std::collections::HashMap;

use crate::core::metrics;
use crate::core::redis::RedisHealth;
use crate::core::state::AppState;
use crate::schemas::{HealthResponse, RootResponse};

pub(crate) async fn root(State(state): State<AppState>) -> Json<RootResponse> {
    let api = state.settings().api();
    Json(RootResponse {
        message: api.project_name.clone(),
        version: api.version.clone(),
        docs_url: format!("{}/docs", api.api_v1_str),
    })
}

/// Overall status is the worst component: a failing database is `unhealthy`,
/// a failing redis only `degraded` since login rate limiting fails open.
pub(crate) async fn healthz(State(state): State<AppState>) -> Json<HealthResponse> {
    let mut components = HashMap::new();

    let (redis, redis_ok) = redis_component(&state).await;
    components.insert("redis".to_string(), redis);
    let (database, database_ok) = database_component(&state).await;
    components.insert("database".to_string(), database);

    let status = match (database_ok, redis_ok) {
        (false, _) => "unhealthy",
        (true, false) => "degraded",
        (true, true) => "healthy",
    };

    Json(HealthResponse {
        service: "quizcomp-api".to_string(),
        status: status.to_string(),
        components,
    })
}

async fn redis_component(state: &AppState) -> (String, bool) {
    match state.redis().health().await {
        RedisHealth::Healthy => ("healthy".to_string(), true),
        RedisHealth::Disconnected => ("disconnected".to_string(), true),
        RedisHealth::Unhealthy(error) => (format!("unhealthy: {error}"), false),
    }
}

async fn database_component(state: &AppState) -> (String, bool) {
    match sqlx::query_scalar::<_, i32>("SELECT 1").fetch_one(state.db()).await {
        Ok(_) => ("healthy".to_string(), true),
        Err(err) => (format!("unhealthy: {err}"), false),
    }
}

pub(crate) async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    if !state.settings().telemetry().prometheus_enabled {
        return StatusCode::NOT_FOUND.into_response();
    }

    match metrics::render() {
        Some(body) => ([(axum::http::header::CONTENT_TYPE, "text/plain; version=0.0.4")], body)
            .into_response(),
        None => StatusCode::SERVICE_UNAVAILABLE.into_response(),
    }
}
