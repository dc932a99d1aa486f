use axum::{
    extract::{Path, Query, State},
    routing::{get, patch},
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::api::errors::ApiError;
use crate::api::guards::{CurrentAdmin, CurrentUser};
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::repositories;
use crate::schemas::setting::{SettingResponse, SettingUpdate};

#[derive(Debug, Deserialize)]
struct SettingQuery {
    key: String,
}

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(get_setting))
        .route("/:setting_id", patch(update_setting))
}

/// Missing keys are created empty on first read.
async fn get_setting(
    Query(params): Query<SettingQuery>,
    _caller: CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<SettingResponse>, ApiError> {
    let key = params.key.trim();
    if key.is_empty() {
        return Err(ApiError::BadRequest("Setting key is required".to_string()));
    }

    let setting = repositories::app_settings::get_or_create(
        state.db(),
        &Uuid::new_v4().to_string(),
        key,
        primitive_now_utc(),
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to load setting"))?;

    Ok(Json(SettingResponse::from_db(setting)))
}

async fn update_setting(
    Path(setting_id): Path<String>,
    CurrentAdmin(admin): CurrentAdmin,
    State(state): State<AppState>,
    Json(payload): Json<SettingUpdate>,
) -> Result<Json<SettingResponse>, ApiError> {
    let setting = repositories::app_settings::update_value(
        state.db(),
        &setting_id,
        payload.value,
        primitive_now_utc(),
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to update setting"))?
    .ok_or_else(|| ApiError::NotFound("Setting not found".to_string()))?;

    tracing::info!(admin_id = %admin.id, key = %setting.key, "Setting updated");
    Ok(Json(SettingResponse::from_db(setting)))
}
