use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::guards::{CurrentAdmin, MaybeUser};
use crate::core::state::AppState;
use crate::core::time::{primitive_now_utc, to_primitive_utc};
use crate::db::models::Quiz;
use crate::db::types::{QuizStatus, UserRole};
use crate::repositories;
use crate::schemas::quiz::{
    QuizCreate, QuizResponse, QuizStatusChange, QuizStatusValue, QuizUpdate,
};
use crate::services::quiz_status::validate_quiz_rules;

use super::queries::ListQuizzesQuery;

pub(super) async fn list_quizzes(
    Query(params): Query<ListQuizzesQuery>,
    caller: MaybeUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<QuizResponse>>, ApiError> {
    let status = params.status.map(resolve_status).transpose()?;
    let filter = repositories::quizzes::QuizFilter {
        visible_only: !caller.role().is_admin(),
        is_comp: params.is_comp,
        status,
    };

    let quizzes = repositories::quizzes::list(state.db(), &filter, params.skip, params.limit)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list quizzes"))?;

    Ok(Json(quizzes.into_iter().map(QuizResponse::from_db).collect()))
}

pub(super) async fn get_quiz(
    Path(quiz_id): Path<String>,
    caller: MaybeUser,
    State(state): State<AppState>,
) -> Result<Json<QuizResponse>, ApiError> {
    let quiz = fetch_visible_quiz(&state, caller.role(), &quiz_id).await?;
    Ok(Json(QuizResponse::from_db(quiz)))
}

pub(super) async fn create_quiz(
    CurrentAdmin(admin): CurrentAdmin,
    State(state): State<AppState>,
    Json(payload): Json<QuizCreate>,
) -> Result<(StatusCode, Json<QuizResponse>), ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let open_time_date = payload.open_time_date.map(to_primitive_utc);
    validate_quiz_rules(payload.is_comp, open_time_date, payload.time_limit, payload.time_window)?;

    let status = match payload.status {
        Some(value) => resolve_status(value)?,
        None if payload.is_comp => QuizStatus::Upcoming,
        None => QuizStatus::Practice,
    };

    let quiz = repositories::quizzes::create(
        state.db(),
        repositories::quizzes::CreateQuiz {
            id: &Uuid::new_v4().to_string(),
            name: payload.name.trim(),
            intro: &payload.intro,
            is_comp: payload.is_comp,
            visible: payload.visible,
            open_time_date,
            time_limit: payload.time_limit,
            time_window: payload.time_window,
            status,
            created_at: primitive_now_utc(),
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to create quiz"))?;

    tracing::info!(
        admin_id = %admin.id,
        quiz_id = %quiz.id,
        is_comp = quiz.is_comp,
        status = quiz.status.as_str(),
        "Quiz created"
    );

    Ok((StatusCode::CREATED, Json(QuizResponse::from_db(quiz))))
}

pub(super) async fn update_quiz(
    Path(quiz_id): Path<String>,
    CurrentAdmin(_admin): CurrentAdmin,
    State(state): State<AppState>,
    Json(payload): Json<QuizUpdate>,
) -> Result<Json<QuizResponse>, ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let existing = fetch_quiz(&state, &quiz_id).await?;
    let open_time_date = payload.open_time_date.map(|value| value.map(to_primitive_utc));

    // Rules apply to the quiz as it will look after the update.
    validate_quiz_rules(
        payload.is_comp.unwrap_or(existing.is_comp),
        open_time_date.unwrap_or(existing.open_time_date),
        payload.time_limit.unwrap_or(existing.time_limit),
        payload.time_window.unwrap_or(existing.time_window),
    )?;

    let status = payload.status.map(resolve_status).transpose()?;

    let quiz = repositories::quizzes::update(
        state.db(),
        &existing.id,
        repositories::quizzes::UpdateQuiz {
            name: payload.name.map(|name| name.trim().to_string()),
            intro: payload.intro,
            is_comp: payload.is_comp,
            visible: payload.visible,
            open_time_date,
            time_limit: payload.time_limit,
            time_window: payload.time_window,
            status,
        },
        primitive_now_utc(),
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to update quiz"))?
    .ok_or_else(|| ApiError::NotFound("Quiz not found".to_string()))?;

    Ok(Json(QuizResponse::from_db(quiz)))
}

pub(super) async fn delete_quiz(
    Path(quiz_id): Path<String>,
    CurrentAdmin(admin): CurrentAdmin,
    State(state): State<AppState>,
) -> Result<StatusCode, ApiError> {
    let deleted = repositories::quizzes::delete(state.db(), &quiz_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to delete quiz"))?;

    if !deleted {
        return Err(ApiError::NotFound("Quiz not found".to_string()));
    }

    tracing::info!(admin_id = %admin.id, quiz_id = %quiz_id, "Quiz deleted");
    Ok(StatusCode::NO_CONTENT)
}

pub(super) async fn change_status(
    Path(quiz_id): Path<String>,
    CurrentAdmin(admin): CurrentAdmin,
    State(state): State<AppState>,
    Json(payload): Json<QuizStatusChange>,
) -> Result<Json<QuizResponse>, ApiError> {
    let status = resolve_status(payload.status)?;

    let quiz = repositories::quizzes::update(
        state.db(),
        &quiz_id,
        repositories::quizzes::UpdateQuiz { status: Some(status), ..Default::default() },
        primitive_now_utc(),
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to update quiz status"))?
    .ok_or_else(|| ApiError::NotFound("Quiz not found".to_string()))?;

    tracing::info!(
        admin_id = %admin.id,
        quiz_id = %quiz.id,
        status = status.as_str(),
        "Quiz status changed"
    );

    Ok(Json(QuizResponse::from_db(quiz)))
}

pub(super) async fn fetch_quiz(state: &AppState, quiz_id: &str) -> Result<Quiz, ApiError> {
    repositories::quizzes::find_by_id(state.db(), quiz_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch quiz"))?
        .ok_or_else(|| ApiError::NotFound("Quiz not found".to_string()))
}

/// Hidden quizzes exist only for admins; everyone else gets a 404.
pub(super) async fn fetch_visible_quiz(
    state: &AppState,
    role: &UserRole,
    quiz_id: &str,
) -> Result<Quiz, ApiError> {
    let quiz = fetch_quiz(state, quiz_id).await?;
    if !quiz.visible && !role.is_admin() {
        return Err(ApiError::NotFound("Quiz not found".to_string()));
    }
    Ok(quiz)
}

fn resolve_status(value: QuizStatusValue) -> Result<QuizStatus, ApiError> {
    value.resolve().ok_or_else(|| ApiError::BadRequest("Unknown quiz status".to_string()))
}
