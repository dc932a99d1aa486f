use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::api::accounts;
use crate::api::errors::ApiError;
use crate::api::guards::CurrentAdmin;
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::models::{Teacher, TeacherProfile};
use crate::repositories;
use crate::schemas::teacher::{TeacherCreate, TeacherResponse, TeacherUpdate};

#[derive(Debug, Deserialize)]
struct ListTeachersQuery {
    #[serde(default)]
    skip: i64,
    #[serde(default = "crate::api::pagination::default_limit")]
    limit: i64,
    #[serde(default)]
    #[serde(alias = "schoolId")]
    school_id: Option<String>,
}

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_teachers).post(create_teacher))
        .route("/:teacher_id", get(get_teacher).patch(update_teacher).delete(delete_teacher))
}

async fn list_teachers(
    Query(params): Query<ListTeachersQuery>,
    CurrentAdmin(_admin): CurrentAdmin,
    State(state): State<AppState>,
) -> Result<Json<Vec<TeacherResponse>>, ApiError> {
    let teachers = repositories::teachers::list_profiles(
        state.db(),
        params.school_id.as_deref(),
        params.skip,
        params.limit,
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to list teachers"))?;

    Ok(Json(teachers.into_iter().map(TeacherResponse::from_profile).collect()))
}

async fn get_teacher(
    Path(teacher_id): Path<String>,
    CurrentAdmin(_admin): CurrentAdmin,
    State(state): State<AppState>,
) -> Result<Json<TeacherResponse>, ApiError> {
    let profile = fetch_profile(&state, &teacher_id).await?;
    Ok(Json(TeacherResponse::from_profile(profile)))
}

async fn create_teacher(
    CurrentAdmin(admin): CurrentAdmin,
    State(state): State<AppState>,
    Json(payload): Json<TeacherCreate>,
) -> Result<(StatusCode, Json<TeacherResponse>), ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;
    ensure_school_exists(&state, &payload.school_id).await?;

    let now = primitive_now_utc();
    let mut tx = state
        .db()
        .begin()
        .await
        .map_err(|e| ApiError::internal(e, "Failed to start transaction"))?;

    let user = accounts::create_account(&mut tx, &payload.account, now).await?;
    let teacher = repositories::teachers::create(
        &mut *tx,
        repositories::teachers::CreateTeacher {
            id: &Uuid::new_v4().to_string(),
            user_id: &user.id,
            school_id: &payload.school_id,
            phone: payload.phone.trim(),
            created_at: now,
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to create teacher"))?;

    tx.commit().await.map_err(|e| ApiError::internal(e, "Failed to commit transaction"))?;

    tracing::info!(admin_id = %admin.id, teacher_id = %teacher.id, "Teacher created");

    let profile = fetch_profile(&state, &teacher.id).await?;
    Ok((StatusCode::CREATED, Json(TeacherResponse::from_profile(profile))))
}

async fn update_teacher(
    Path(teacher_id): Path<String>,
    CurrentAdmin(_admin): CurrentAdmin,
    State(state): State<AppState>,
    Json(payload): Json<TeacherUpdate>,
) -> Result<Json<TeacherResponse>, ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let teacher = fetch_teacher(&state, &teacher_id).await?;
    if let Some(school_id) = payload.school_id.as_deref() {
        ensure_school_exists(&state, school_id).await?;
    }

    let now = primitive_now_utc();
    let mut tx = state
        .db()
        .begin()
        .await
        .map_err(|e| ApiError::internal(e, "Failed to start transaction"))?;

    accounts::update_account(&mut tx, &teacher.user_id, payload.account, now).await?;
    repositories::teachers::update(&mut *tx, &teacher.id, payload.school_id, payload.phone, now)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to update teacher"))?;

    tx.commit().await.map_err(|e| ApiError::internal(e, "Failed to commit transaction"))?;

    let profile = fetch_profile(&state, &teacher.id).await?;
    Ok(Json(TeacherResponse::from_profile(profile)))
}

async fn delete_teacher(
    Path(teacher_id): Path<String>,
    CurrentAdmin(admin): CurrentAdmin,
    State(state): State<AppState>,
) -> Result<StatusCode, ApiError> {
    let teacher = fetch_teacher(&state, &teacher_id).await?;

    repositories::users::delete(state.db(), &teacher.user_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to delete teacher"))?;

    tracing::info!(admin_id = %admin.id, teacher_id = %teacher.id, "Teacher deleted");
    Ok(StatusCode::NO_CONTENT)
}

async fn ensure_school_exists(state: &AppState, school_id: &str) -> Result<(), ApiError> {
    repositories::schools::find_by_id(state.db(), school_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch school"))?
        .map(|_| ())
        .ok_or_else(|| ApiError::BadRequest("School does not exist".to_string()))
}

async fn fetch_teacher(state: &AppState, teacher_id: &str) -> Result<Teacher, ApiError> {
    repositories::teachers::find_by_id(state.db(), teacher_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch teacher"))?
        .ok_or_else(|| ApiError::NotFound("Teacher not found".to_string()))
}

async fn fetch_profile(state: &AppState, teacher_id: &str) -> Result<TeacherProfile, ApiError> {
    repositories::teachers::find_profile(state.db(), teacher_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch teacher"))?
        .ok_or_else(|| ApiError::NotFound("Teacher not found".to_string()))
}
