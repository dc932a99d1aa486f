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
use crate::api::guards::CurrentAdmin;
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db;
use crate::repositories;
use crate::schemas::question::{QuestionCreate, QuestionResponse, QuestionUpdate};

#[derive(Debug, Deserialize)]
struct ListQuestionsQuery {
    #[serde(default)]
    skip: i64,
    #[serde(default = "crate::api::pagination::default_limit")]
    limit: i64,
    #[serde(default)]
    #[serde(alias = "categoryId")]
    category_id: Option<String>,
    #[serde(default)]
    #[serde(alias = "yearLevel")]
    year_level: Option<i32>,
    #[serde(default)]
    search: Option<String>,
    #[serde(default)]
    answer: Option<i64>,
    #[serde(default)]
    mark: Option<i32>,
}

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_questions).post(create_question))
        .route(
            "/:question_id",
            get(get_question).patch(update_question).delete(delete_question),
        )
}

async fn list_questions(
    Query(params): Query<ListQuestionsQuery>,
    CurrentAdmin(_admin): CurrentAdmin,
    State(state): State<AppState>,
) -> Result<Json<Vec<QuestionResponse>>, ApiError> {
    let filter = repositories::questions::QuestionFilter {
        category_id: params.category_id,
        year_level: params.year_level,
        search: params.search.filter(|s| !s.trim().is_empty()),
        answer: params.answer,
        mark: params.mark,
    };
    let questions =
        repositories::questions::list(state.db(), &filter, params.skip, params.limit)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to list questions"))?;

    Ok(Json(questions.into_iter().map(QuestionResponse::from_db).collect()))
}

async fn get_question(
    Path(question_id): Path<String>,
    CurrentAdmin(_admin): CurrentAdmin,
    State(state): State<AppState>,
) -> Result<Json<QuestionResponse>, ApiError> {
    let question = repositories::questions::find_by_id(state.db(), &question_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch question"))?
        .ok_or_else(|| ApiError::NotFound("Question not found".to_string()))?;

    Ok(Json(QuestionResponse::from_db(question)))
}

async fn create_question(
    CurrentAdmin(admin): CurrentAdmin,
    State(state): State<AppState>,
    Json(payload): Json<QuestionCreate>,
) -> Result<(StatusCode, Json<QuestionResponse>), ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;
    if let Some(category_id) = payload.category_id.as_deref() {
        ensure_category_exists(&state, category_id).await?;
    }

    let question = repositories::questions::create(
        state.db(),
        repositories::questions::CreateQuestion {
            id: &Uuid::new_v4().to_string(),
            name: payload.name.trim(),
            category_id: payload.category_id.as_deref(),
            year: payload.year,
            year_level: payload.year_level,
            question_text: &payload.question_text,
            image: payload.image.as_deref(),
            mark: payload.mark,
            answers: payload.answers,
            solution_text: &payload.solution_text,
            created_at: primitive_now_utc(),
        },
    )
    .await
    .map_err(map_question_write_error)?;

    tracing::info!(admin_id = %admin.id, question_id = %question.id, "Question created");

    Ok((StatusCode::CREATED, Json(QuestionResponse::from_db(question))))
}

async fn update_question(
    Path(question_id): Path<String>,
    CurrentAdmin(_admin): CurrentAdmin,
    State(state): State<AppState>,
    Json(payload): Json<QuestionUpdate>,
) -> Result<Json<QuestionResponse>, ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;
    if let Some(category_id) = payload.category_id.as_deref() {
        ensure_category_exists(&state, category_id).await?;
    }

    let question = repositories::questions::update(
        state.db(),
        &question_id,
        repositories::questions::UpdateQuestion {
            name: payload.name.map(|name| name.trim().to_string()),
            category_id: payload.category_id,
            year: payload.year,
            year_level: payload.year_level,
            question_text: payload.question_text,
            image: payload.image,
            mark: payload.mark,
            answers: payload.answers,
            solution_text: payload.solution_text,
        },
        primitive_now_utc(),
    )
    .await
    .map_err(map_question_write_error)?
    .ok_or_else(|| ApiError::NotFound("Question not found".to_string()))?;

    Ok(Json(QuestionResponse::from_db(question)))
}

async fn delete_question(
    Path(question_id): Path<String>,
    CurrentAdmin(_admin): CurrentAdmin,
    State(state): State<AppState>,
) -> Result<StatusCode, ApiError> {
    let deleted = repositories::questions::delete(state.db(), &question_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to delete question"))?;

    if deleted {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound("Question not found".to_string()))
    }
}

async fn ensure_category_exists(state: &AppState, category_id: &str) -> Result<(), ApiError> {
    repositories::categories::find_by_id(state.db(), category_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch category"))?
        .map(|_| ())
        .ok_or_else(|| ApiError::BadRequest("Category does not exist".to_string()))
}

fn map_question_write_error(err: sqlx::Error) -> ApiError {
    if db::is_unique_violation(&err, repositories::questions::NAME_CONSTRAINT) {
        return ApiError::BadRequest("A question with this name already exists".to_string());
    }
    ApiError::internal(err, "Failed to save question")
}
