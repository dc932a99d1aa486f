use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::api::errors::ApiError;
use crate::api::guards::CurrentUser;
use crate::api::quiz_attempts::fetch_own_attempt;
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::types::UserRole;
use crate::repositories;
use crate::schemas::attempt::{AnswerSubmit, QuestionAttemptResponse};
use crate::services::{attempt_lifecycle, marking};

#[derive(Debug, Deserialize)]
struct ListAnswersQuery {
    #[serde(default)]
    skip: i64,
    #[serde(default = "crate::api::pagination::default_limit")]
    limit: i64,
    #[serde(default, alias = "quiz_attempt")]
    quiz_attempt_id: Option<String>,
}

pub(crate) fn router() -> Router<AppState> {
    Router::new().route("/", get(list_answers).post(submit_answer))
}

async fn list_answers(
    Query(params): Query<ListAnswersQuery>,
    caller: CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<QuestionAttemptResponse>>, ApiError> {
    let mut filter = repositories::question_attempts::AnswerFilter {
        quiz_attempt_id: params.quiz_attempt_id,
        ..Default::default()
    };
    match &caller.role {
        UserRole::Student { student_id, .. } => filter.student_id = Some(student_id.clone()),
        UserRole::Teacher { school_id, .. } => filter.school_id = Some(school_id.clone()),
        UserRole::Admin => {}
        UserRole::Anonymous => return Err(ApiError::Forbidden("Not enough permissions")),
    }

    let answers =
        repositories::question_attempts::list(state.db(), &filter, params.skip, params.limit)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to list question attempts"))?;

    Ok(Json(answers.into_iter().map(QuestionAttemptResponse::from_db).collect()))
}

/// Records the caller's answer. Practice quizzes are marked immediately;
/// competition answers stay unmarked until the marking pass.
async fn submit_answer(
    caller: CurrentUser,
    State(state): State<AppState>,
    Json(payload): Json<AnswerSubmit>,
) -> Result<(StatusCode, Json<QuestionAttemptResponse>), ApiError> {
    let attempt = fetch_own_attempt(&state, &caller, &payload.quiz_attempt_id).await?;
    let now = primitive_now_utc();

    let checked = attempt_lifecycle::check_availability(state.db(), &attempt.id, now).await?;
    attempt_lifecycle::ensure_writable(checked.attempt.state)?;
    if !checked.outcome.is_available() {
        return Err(ApiError::Forbidden(checked.outcome.availability.message()));
    }
    let attempt = checked.attempt;

    let in_quiz = repositories::quiz_slots::quiz_contains_question(
        state.db(),
        &attempt.quiz_id,
        &payload.question_id,
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to check quiz slots"))?;
    if !in_quiz {
        return Err(ApiError::BadRequest("Question is not part of this quiz".to_string()));
    }

    let quiz = repositories::quizzes::find_by_id(state.db(), &attempt.quiz_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch quiz"))?
        .ok_or_else(|| ApiError::NotFound("Quiz not found".to_string()))?;

    let is_correct = if quiz.is_comp {
        None
    } else {
        let keys = repositories::questions::answer_keys(
            state.db(),
            std::slice::from_ref(&payload.question_id),
        )
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load answer key"))?;
        keys.get(&payload.question_id)
            .map(|key| marking::mark_answer(payload.answer_student, &key.answers))
    };

    let (answer, inserted) = attempt_lifecycle::record_answer(
        state.db(),
        repositories::question_attempts::UpsertAnswer {
            id: &Uuid::new_v4().to_string(),
            quiz_attempt_id: &attempt.id,
            question_id: &payload.question_id,
            student_id: &attempt.student_id,
            answer_student: payload.answer_student,
            is_correct,
            now,
        },
    )
    .await?;

    tracing::debug!(
        attempt_id = %attempt.id,
        question_id = %answer.question_id,
        inserted,
        "Answer recorded"
    );

    let status = if inserted { StatusCode::CREATED } else { StatusCode::OK };
    Ok((status, Json(QuestionAttemptResponse::from_db(answer))))
}
