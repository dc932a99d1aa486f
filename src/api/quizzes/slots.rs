use axum::{
    extract::{Path, State},
    Json,
};

use crate::api::errors::ApiError;
use crate::api::guards::{CurrentAdmin, CurrentUser};
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::models::Quiz;
use crate::db::types::UserRole;
use crate::repositories;
use crate::schemas::attempt::AttemptResponse;
use crate::schemas::quiz::{
    MarkingResponse, QuizSlotResponse, QuizSlotsResponse, ReplacedSlotsResponse,
    SlotQuestionResponse, SlotsPayload,
};
use crate::services::{attempt_lifecycle, slot_assembly};

use super::handlers::{fetch_quiz, fetch_visible_quiz};

/// Students get their own shuffled paper (opening the attempt on first access);
/// staff get the slots in `slot_index` order, with answers for admins only.
pub(super) async fn get_slots(
    Path(quiz_id): Path<String>,
    caller: CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<QuizSlotsResponse>, ApiError> {
    let quiz = fetch_visible_quiz(&state, &caller.role, &quiz_id).await?;

    match &caller.role {
        UserRole::Student { student_id, .. } => student_paper(&state, quiz, student_id).await,
        UserRole::Admin | UserRole::Teacher { .. } => {
            let slots = repositories::quiz_slots::list_with_questions(state.db(), &quiz.id)
                .await
                .map_err(|e| ApiError::internal(e, "Failed to load quiz slots"))?;
            let with_answers = caller.role.is_admin();

            Ok(Json(QuizSlotsResponse {
                quiz_id: quiz.id,
                attempt: None,
                slots: slots
                    .into_iter()
                    .map(|slot| SlotQuestionResponse::from_db(slot, with_answers))
                    .collect(),
            }))
        }
        UserRole::Anonymous => Err(ApiError::Forbidden("Not enough permissions")),
    }
}

async fn student_paper(
    state: &AppState,
    quiz: Quiz,
    student_id: &str,
) -> Result<Json<QuizSlotsResponse>, ApiError> {
    let now = primitive_now_utc();
    let student = repositories::students::find_by_id(state.db(), student_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch student"))?
        .ok_or_else(|| ApiError::NotFound("Student not found".to_string()))?;

    let (attempt, _) = attempt_lifecycle::open_attempt(state.db(), &quiz, &student, now).await?;
    let checked = attempt_lifecycle::check_availability(state.db(), &attempt.id, now).await?;
    if !checked.outcome.is_available() {
        return Err(ApiError::Forbidden(checked.outcome.availability.message()));
    }

    let slots = repositories::quiz_slots::list_with_questions(state.db(), &quiz.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load quiz slots"))?;
    let ordered = slot_assembly::order_for_attempt(slots, checked.attempt.shuffle_seed);

    Ok(Json(QuizSlotsResponse {
        quiz_id: quiz.id,
        attempt: Some(AttemptResponse::from_db(checked.attempt)),
        slots: ordered.into_iter().map(|slot| SlotQuestionResponse::from_db(slot, false)).collect(),
    }))
}

pub(super) async fn replace_slots(
    Path(quiz_id): Path<String>,
    CurrentAdmin(admin): CurrentAdmin,
    State(state): State<AppState>,
    Json(payload): Json<SlotsPayload>,
) -> Result<Json<ReplacedSlotsResponse>, ApiError> {
    let inputs: Vec<slot_assembly::SlotInput> = payload
        .into_items()
        .into_iter()
        .map(|item| slot_assembly::SlotInput {
            question_id: item.question_id,
            slot_index: item.slot_index,
            block: item.block,
        })
        .collect();

    let replaced =
        slot_assembly::replace_slots(state.db(), &quiz_id, &inputs, primitive_now_utc()).await?;

    tracing::info!(
        admin_id = %admin.id,
        quiz_id = %quiz_id,
        slots = replaced.slots.len(),
        "Quiz slots replaced by admin"
    );

    Ok(Json(ReplacedSlotsResponse {
        quiz_id,
        total_marks: replaced.total_marks,
        slots: replaced.slots.into_iter().map(QuizSlotResponse::from_db).collect(),
    }))
}

pub(super) async fn run_marking(
    Path(quiz_id): Path<String>,
    CurrentAdmin(admin): CurrentAdmin,
    State(state): State<AppState>,
) -> Result<Json<MarkingResponse>, ApiError> {
    let quiz = fetch_quiz(&state, &quiz_id).await?;
    let summary = crate::services::marking::run_marking_pass(state.db(), &quiz.id).await?;

    tracing::info!(
        admin_id = %admin.id,
        quiz_id = %quiz.id,
        attempts = summary.attempts,
        correct = summary.correct,
        "Quiz marked"
    );

    Ok(Json(MarkingResponse::from_summary(quiz.id, summary)))
}
