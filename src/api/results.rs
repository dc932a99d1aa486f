use std::collections::BTreeSet;

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use crate::api::errors::ApiError;
use crate::api::guards::CurrentStaff;
use crate::core::state::AppState;
use crate::repositories;
use crate::repositories::results::ResultScope;
use crate::schemas::results::{
    insights, AnswerResultResponse, AttemptResultResponse, InsightCounts,
};

/// Upper bound on answers loaded to build per-slot responses for one page of attempts.
const ANSWERS_PER_PAGE: i64 = 10_000;

#[derive(Debug, Deserialize)]
struct ResultsQuery {
    #[serde(default)]
    skip: i64,
    #[serde(default = "crate::api::pagination::default_limit")]
    limit: i64,
    #[serde(default, alias = "quiz")]
    quiz_id: Option<String>,
}

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/insights", get(get_insights))
        .route("/quiz-attempts", get(attempt_results))
        .route("/question-attempts", get(answer_results))
}

fn scope_for(caller: &CurrentStaff, quiz_id: Option<String>) -> Result<ResultScope, ApiError> {
    Ok(ResultScope { quiz_id, school_id: caller.0.staff_school_scope()? })
}

async fn get_insights(
    Query(params): Query<ResultsQuery>,
    caller: CurrentStaff,
    State(state): State<AppState>,
) -> Result<Json<Vec<InsightCounts>>, ApiError> {
    let scope = scope_for(&caller, params.quiz_id)?;

    let students = repositories::results::student_insights(state.db(), &scope)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load student insights"))?;
    let teams = repositories::results::team_insights(state.db(), &scope)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load team insights"))?;

    Ok(Json(insights(&students, &teams)))
}

async fn attempt_results(
    Query(params): Query<ResultsQuery>,
    caller: CurrentStaff,
    State(state): State<AppState>,
) -> Result<Json<Vec<AttemptResultResponse>>, ApiError> {
    let scope = scope_for(&caller, params.quiz_id)?;

    let rows = repositories::results::attempts(state.db(), &scope, params.skip, params.limit)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load quiz attempt results"))?;
    if rows.is_empty() {
        return Ok(Json(Vec::new()));
    }

    let attempt_ids: Vec<String> = rows.iter().map(|row| row.id.clone()).collect();
    let answers = repositories::results::answers(
        state.db(),
        &scope,
        Some(&attempt_ids),
        0,
        ANSWERS_PER_PAGE,
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to load answers"))?;

    let quiz_ids: BTreeSet<&str> = rows.iter().map(|row| row.quiz_id.as_str()).collect();
    let mut slots = Vec::new();
    for quiz_id in quiz_ids {
        let quiz_slots = repositories::quiz_slots::list_by_quiz(state.db(), quiz_id)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to load quiz slots"))?;
        slots.extend(quiz_slots);
    }

    Ok(Json(
        rows.into_iter()
            .map(|row| AttemptResultResponse::from_row(row, &slots, &answers))
            .collect(),
    ))
}

async fn answer_results(
    Query(params): Query<ResultsQuery>,
    caller: CurrentStaff,
    State(state): State<AppState>,
) -> Result<Json<Vec<AnswerResultResponse>>, ApiError> {
    let scope = scope_for(&caller, params.quiz_id)?;

    let rows = repositories::results::answers(state.db(), &scope, None, params.skip, params.limit)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load question attempt results"))?;

    Ok(Json(rows.into_iter().map(AnswerResultResponse::from_row).collect()))
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use tower::ServiceExt;

    use crate::db::models::{Quiz, Student};
    use crate::repositories;
    use crate::test_support;

    async fn attempt_for(db: &sqlx::PgPool, quiz: &Quiz, student: &Student) -> String {
        repositories::quiz_attempts::create(
            db,
            repositories::quiz_attempts::CreateAttempt {
                id: &format!("attempt-{}", student.id),
                quiz_id: &quiz.id,
                student_id: &student.id,
                team_id: None,
                shuffle_seed: 5,
                time_start: quiz.created_at,
            },
        )
        .await
        .expect("insert attempt")
        .expect("new attempt")
        .id
    }

    #[tokio::test]
    async fn teachers_only_see_their_own_school() {
        let Some(ctx) = test_support::setup_test_context().await else { return };
        let db = ctx.state.db();
        let home = test_support::insert_school(db, "Home High").await;
        let away = test_support::insert_school(db, "Away High").await;
        let (_home_user, home_student) =
            test_support::insert_student(db, "local", &home.id, 8).await;
        let (_away_user, away_student) =
            test_support::insert_student(db, "visitor", &away.id, 8).await;
        let teacher = test_support::insert_teacher(db, "coach", &home.id).await;
        let admin = test_support::insert_admin(db, "overseer").await;
        let quiz = test_support::insert_quiz(db, "Shared", true).await;
        let home_attempt = attempt_for(db, &quiz, &home_student).await;
        attempt_for(db, &quiz, &away_student).await;

        let teacher_token = test_support::bearer_token(&teacher.id, ctx.state.settings());
        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::GET,
                "/api/v1/results/quiz-attempts",
                Some(&teacher_token),
                None,
            ))
            .await
            .expect("teacher results");
        assert_eq!(response.status(), StatusCode::OK);
        let body = test_support::read_json(response).await;
        let rows = body.as_array().expect("result rows");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["id"], home_attempt);
        assert_eq!(rows[0]["school"], "Home High");

        let admin_token = test_support::bearer_token(&admin.id, ctx.state.settings());
        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::GET,
                "/api/v1/results/quiz-attempts",
                Some(&admin_token),
                None,
            ))
            .await
            .expect("admin results");
        let body = test_support::read_json(response).await;
        assert_eq!(body.as_array().expect("result rows").len(), 2);
    }

    #[tokio::test]
    async fn students_cannot_read_results() {
        let Some(ctx) = test_support::setup_test_context().await else { return };
        let db = ctx.state.db();
        let school = test_support::insert_school(db, "Curious").await;
        let (user, _student) = test_support::insert_student(db, "nosy", &school.id, 7).await;
        let token = test_support::bearer_token(&user.id, ctx.state.settings());

        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::GET,
                "/api/v1/results/quiz-attempts",
                Some(&token),
                None,
            ))
            .await
            .expect("student results");
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }
}
