use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::guards::CurrentUser;
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::models::QuizAttempt;
use crate::db::types::{AttemptState, UserRole};
use crate::repositories;
use crate::schemas::attempt::{
    AttemptCreate, AttemptCreatedResponse, AttemptResponse, AttemptUpdate, AvailabilityResponse,
};
use crate::services::attempt_lifecycle;

#[derive(Debug, Deserialize)]
struct ListAttemptsQuery {
    #[serde(default)]
    skip: i64,
    #[serde(default = "crate::api::pagination::default_limit")]
    limit: i64,
    #[serde(default, alias = "quiz")]
    quiz_id: Option<String>,
    #[serde(default)]
    state: Option<AttemptState>,
}

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_attempts).post(create_attempt))
        .route("/:attempt_id", get(get_attempt).patch(update_attempt))
        .route("/:attempt_id/availability", get(availability))
}

async fn list_attempts(
    Query(params): Query<ListAttemptsQuery>,
    caller: CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<AttemptResponse>>, ApiError> {
    let mut filter = repositories::quiz_attempts::AttemptFilter {
        quiz_id: params.quiz_id,
        state: params.state,
        ..Default::default()
    };
    match &caller.role {
        UserRole::Student { student_id, .. } => filter.student_id = Some(student_id.clone()),
        UserRole::Teacher { school_id, .. } => filter.school_id = Some(school_id.clone()),
        UserRole::Admin => {}
        UserRole::Anonymous => return Err(ApiError::Forbidden("Not enough permissions")),
    }

    let attempts =
        repositories::quiz_attempts::list(state.db(), &filter, params.skip, params.limit)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to list quiz attempts"))?;

    Ok(Json(attempts.into_iter().map(AttemptResponse::from_db).collect()))
}

/// Starts the caller's attempt. An existing attempt is returned as-is with 200.
async fn create_attempt(
    caller: CurrentUser,
    State(state): State<AppState>,
    Json(payload): Json<AttemptCreate>,
) -> Result<(StatusCode, Json<AttemptCreatedResponse>), ApiError> {
    let student_id = caller.student_id()?;

    let quiz = repositories::quizzes::find_by_id(state.db(), &payload.quiz_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch quiz"))?
        .filter(|quiz| quiz.visible)
        .ok_or_else(|| ApiError::NotFound("Quiz not found".to_string()))?;
    let student = repositories::students::find_by_id(state.db(), student_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch student"))?
        .ok_or_else(|| ApiError::NotFound("Student not found".to_string()))?;

    let (attempt, created) =
        attempt_lifecycle::open_attempt(state.db(), &quiz, &student, primitive_now_utc()).await?;

    if created {
        Ok((
            StatusCode::CREATED,
            Json(AttemptCreatedResponse { message: None, attempt: AttemptResponse::from_db(attempt) }),
        ))
    } else {
        Ok((
            StatusCode::OK,
            Json(AttemptCreatedResponse {
                message: Some("Quiz attempt already active"),
                attempt: AttemptResponse::from_db(attempt),
            }),
        ))
    }
}

async fn get_attempt(
    Path(attempt_id): Path<String>,
    caller: CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<AttemptResponse>, ApiError> {
    let attempt = fetch_visible_attempt(&state, &caller, &attempt_id).await?;
    Ok(Json(AttemptResponse::from_db(attempt)))
}

async fn availability(
    Path(attempt_id): Path<String>,
    caller: CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<AvailabilityResponse>, ApiError> {
    let attempt = fetch_own_attempt(&state, &caller, &attempt_id).await?;
    let checked =
        attempt_lifecycle::check_availability(state.db(), &attempt.id, primitive_now_utc())
            .await?;

    Ok(Json(AvailabilityResponse::from_outcome(checked.attempt.id, &checked.outcome)))
}

async fn update_attempt(
    Path(attempt_id): Path<String>,
    caller: CurrentUser,
    State(state): State<AppState>,
    Json(payload): Json<AttemptUpdate>,
) -> Result<Json<AttemptResponse>, ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let attempt = fetch_own_attempt(&state, &caller, &attempt_id).await?;
    let now = primitive_now_utc();

    // Expired attempts are completed here before any write is considered.
    let checked = attempt_lifecycle::check_availability(state.db(), &attempt.id, now).await?;
    attempt_lifecycle::ensure_writable(checked.attempt.state)?;
    if !checked.outcome.is_available() {
        return Err(ApiError::Forbidden(checked.outcome.availability.message()));
    }

    let mut attempt = checked.attempt;
    if let Some(current_page) = payload.current_page {
        attempt =
            attempt_lifecycle::update_page(state.db(), &attempt.id, current_page, now).await?;
    }

    if payload.submit {
        attempt = attempt_lifecycle::submit(state.db(), &attempt.id, now).await?;
        tracing::info!(
            attempt_id = %attempt.id,
            student_id = %attempt.student_id,
            "Quiz attempt submitted"
        );
    }

    Ok(Json(AttemptResponse::from_db(attempt)))
}

async fn fetch_attempt(state: &AppState, attempt_id: &str) -> Result<QuizAttempt, ApiError> {
    repositories::quiz_attempts::find_by_id(state.db(), attempt_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch quiz attempt"))?
        .ok_or_else(|| ApiError::NotFound("Quiz attempt not found".to_string()))
}

/// Attempt owned by the calling student.
pub(crate) async fn fetch_own_attempt(
    state: &AppState,
    caller: &CurrentUser,
    attempt_id: &str,
) -> Result<QuizAttempt, ApiError> {
    let student_id = caller.student_id()?;
    let attempt = fetch_attempt(state, attempt_id).await?;
    if attempt.student_id != student_id {
        return Err(ApiError::Forbidden("Not enough permissions"));
    }
    Ok(attempt)
}

async fn fetch_visible_attempt(
    state: &AppState,
    caller: &CurrentUser,
    attempt_id: &str,
) -> Result<QuizAttempt, ApiError> {
    let attempt = fetch_attempt(state, attempt_id).await?;
    match &caller.role {
        UserRole::Admin => Ok(attempt),
        UserRole::Student { student_id, .. } if *student_id == attempt.student_id => Ok(attempt),
        UserRole::Teacher { .. } => {
            let student = repositories::students::find_by_id(state.db(), &attempt.student_id)
                .await
                .map_err(|e| ApiError::internal(e, "Failed to fetch student"))?
                .ok_or_else(|| ApiError::NotFound("Student not found".to_string()))?;
            caller.ensure_school_access(Some(&student.school_id))?;
            Ok(attempt)
        }
        _ => Err(ApiError::Forbidden("Not enough permissions")),
    }
}
