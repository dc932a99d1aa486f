pub(crate) mod api;
pub(crate) mod core;
pub(crate) mod db;
pub(crate) mod repositories;
pub(crate) mod schemas;
pub(crate) mod services;
pub(crate) mod tasks;

#[cfg(test)]
mod test_support;

use crate::core::{config::Settings, redis::RedisHandle, state::AppState, telemetry};

/// HTTP API process.
pub async fn run() -> anyhow::Result<()> {
    let state = start("api").await?;

    if let Err(err) = core::bootstrap::ensure_superuser(&state).await {
        tracing::error!(error = %err, "Failed to ensure default superuser");
    }

    let app = api::router::router(state.clone());
    let listener = tokio::net::TcpListener::bind(state.settings().server_addr()).await?;
    tracing::info!(
        host = %state.settings().server_host(),
        port = state.settings().server_port(),
        environment = state.settings().runtime().environment.as_str(),
        "{} listening",
        state.settings().api().project_name
    );

    let result = axum::serve(listener, app)
        .with_graceful_shutdown(core::shutdown::shutdown_signal("api"))
        .await;
    stop(&state).await;
    Ok(result?)
}

/// Background process that moves competitions through their status lifecycle.
pub async fn run_worker() -> anyhow::Result<()> {
    let state = start("worker").await?;
    let result = tasks::scheduler::run(state.clone()).await;
    stop(&state).await;
    result
}

/// Shared startup: settings, tracing, metrics, migrated pool and a best-effort redis.
async fn start(component: &'static str) -> anyhow::Result<AppState> {
    dotenvy::dotenv().ok();

    let settings = Settings::load()?;
    telemetry::init_tracing(&settings)?;
    core::metrics::init(&settings)?;

    let db_pool = db::init_pool(&settings).await?;
    db::run_migrations(&db_pool).await?;

    let redis = RedisHandle::new(settings.redis().redis_url());
    match redis.connect().await {
        Ok(()) => tracing::info!(component, "Redis connected"),
        Err(err) => {
            tracing::warn!(component, error = %err, "Redis unavailable; login rate limiting disabled")
        }
    }

    Ok(AppState::new(settings, db_pool, redis))
}

async fn stop(state: &AppState) {
    state.redis().disconnect().await;
    tracing::info!("Redis disconnected");
}
