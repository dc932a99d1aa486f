use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::guards::{CurrentAdmin, CurrentStaff};
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db;
use crate::repositories;
use crate::schemas::school::{SchoolCreate, SchoolResponse, SchoolUpdate};

#[derive(Debug, Deserialize)]
struct ListSchoolsQuery {
    #[serde(default)]
    skip: i64,
    #[serde(default = "crate::api::pagination::default_limit")]
    limit: i64,
    #[serde(default)]
    search: Option<String>,
}

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_schools).post(create_school))
        .route("/:school_id", get(get_school).patch(update_school).delete(delete_school))
}

async fn list_schools(
    Query(params): Query<ListSchoolsQuery>,
    CurrentStaff(caller): CurrentStaff,
    State(state): State<AppState>,
) -> Result<Json<Vec<SchoolResponse>>, ApiError> {
    let scope = caller.staff_school_scope()?;
    let schools = repositories::schools::list(
        state.db(),
        scope.as_deref(),
        params.search.as_deref().filter(|s| !s.trim().is_empty()),
        params.skip,
        params.limit,
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to list schools"))?;

    Ok(Json(schools.into_iter().map(SchoolResponse::from_db).collect()))
}

async fn get_school(
    Path(school_id): Path<String>,
    CurrentStaff(caller): CurrentStaff,
    State(state): State<AppState>,
) -> Result<Json<SchoolResponse>, ApiError> {
    caller.ensure_school_access(Some(&school_id))?;

    let school = repositories::schools::find_by_id(state.db(), &school_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch school"))?
        .ok_or_else(|| ApiError::NotFound("School not found".to_string()))?;

    Ok(Json(SchoolResponse::from_db(school)))
}

async fn create_school(
    CurrentAdmin(admin): CurrentAdmin,
    State(state): State<AppState>,
    Json(payload): Json<SchoolCreate>,
) -> Result<(StatusCode, Json<SchoolResponse>), ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let school = repositories::schools::create(
        state.db(),
        repositories::schools::CreateSchool {
            id: &Uuid::new_v4().to_string(),
            name: payload.name.trim(),
            code: payload.code.as_deref(),
            school_type: payload.school_type,
            is_country: payload.is_country,
            address: &payload.address,
            created_at: primitive_now_utc(),
        },
    )
    .await
    .map_err(map_school_write_error)?;

    tracing::info!(admin_id = %admin.id, school_id = %school.id, "School created");

    Ok((StatusCode::CREATED, Json(SchoolResponse::from_db(school))))
}

async fn update_school(
    Path(school_id): Path<String>,
    CurrentAdmin(_admin): CurrentAdmin,
    State(state): State<AppState>,
    Json(payload): Json<SchoolUpdate>,
) -> Result<Json<SchoolResponse>, ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let school = repositories::schools::update(
        state.db(),
        &school_id,
        repositories::schools::UpdateSchool {
            name: payload.name.map(|name| name.trim().to_string()),
            code: payload.code,
            school_type: payload.school_type,
            is_country: payload.is_country,
            address: payload.address,
            updated_at: primitive_now_utc(),
        },
    )
    .await
    .map_err(map_school_write_error)?
    .ok_or_else(|| ApiError::NotFound("School not found".to_string()))?;

    Ok(Json(SchoolResponse::from_db(school)))
}

async fn delete_school(
    Path(school_id): Path<String>,
    CurrentAdmin(admin): CurrentAdmin,
    State(state): State<AppState>,
) -> Result<StatusCode, ApiError> {
    let deleted = repositories::schools::delete(state.db(), &school_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to delete school"))?;

    if !deleted {
        return Err(ApiError::NotFound("School not found".to_string()));
    }

    tracing::info!(admin_id = %admin.id, school_id = %school_id, "School deleted");
    Ok(StatusCode::NO_CONTENT)
}

fn map_school_write_error(err: sqlx::Error) -> ApiError {
    if db::is_unique_violation(&err, repositories::schools::NAME_CONSTRAINT) {
        return ApiError::BadRequest("A school with this name already exists".to_string());
    }
    if db::is_unique_violation(&err, repositories::schools::CODE_CONSTRAINT) {
        return ApiError::BadRequest("A school with this code already exists".to_string());
    }
    ApiError::internal(err, "Failed to save school")
}
