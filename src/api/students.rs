use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::api::accounts;
use crate::api::errors::ApiError;
use crate::api::guards::{CurrentStaff, CurrentUser};
use crate::api::pagination::PaginatedResponse;
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::models::{Student, StudentProfile};
use crate::db::types::UserRole;
use crate::repositories;
use crate::schemas::student::{ExtensionGrant, StudentCreate, StudentResponse, StudentUpdate};

#[derive(Debug, Deserialize)]
struct ListStudentsQuery {
    #[serde(default)]
    skip: i64,
    #[serde(default = "crate::api::pagination::default_limit")]
    limit: i64,
    #[serde(default)]
    #[serde(alias = "schoolId")]
    school_id: Option<String>,
    #[serde(default)]
    #[serde(alias = "yearLevel")]
    year_level: Option<i32>,
    #[serde(default)]
    search: Option<String>,
}

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_students).post(create_student))
        .route("/:student_id", get(get_student).patch(update_student).delete(delete_student))
        .route("/:student_id/extension", post(grant_extension))
}

async fn list_students(
    Query(params): Query<ListStudentsQuery>,
    CurrentStaff(caller): CurrentStaff,
    State(state): State<AppState>,
) -> Result<Json<PaginatedResponse<StudentResponse>>, ApiError> {
    let school_id = match caller.staff_school_scope()? {
        Some(own) => Some(own),
        None => params.school_id,
    };
    let filter = repositories::students::StudentFilter {
        school_id,
        year_level: params.year_level,
        search: params.search.filter(|s| !s.trim().is_empty()),
    };

    let total_count = repositories::students::count_profiles(state.db(), &filter)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to count students"))?;
    let students =
        repositories::students::list_profiles(state.db(), &filter, params.skip, params.limit)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to list students"))?;

    Ok(Json(PaginatedResponse::new(
        students.into_iter().map(StudentResponse::from_profile).collect(),
        total_count,
        params.skip,
        params.limit,
    )))
}

async fn get_student(
    Path(student_id): Path<String>,
    caller: CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<StudentResponse>, ApiError> {
    let profile = fetch_profile(&state, &student_id).await?;

    let own_record = matches!(
        &caller.role,
        UserRole::Student { student_id: own, .. } if own == &profile.id
    );
    if !own_record {
        caller.ensure_school_access(Some(&profile.school_id))?;
    }

    Ok(Json(StudentResponse::from_profile(profile)))
}

async fn create_student(
    CurrentStaff(caller): CurrentStaff,
    State(state): State<AppState>,
    Json(payload): Json<StudentCreate>,
) -> Result<(StatusCode, Json<StudentResponse>), ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let school_id = match caller.staff_school_scope()? {
        Some(own) => own,
        None => payload
            .school_id
            .clone()
            .ok_or_else(|| ApiError::BadRequest("school_id is required".to_string()))?,
    };

    let school = repositories::schools::find_by_id(state.db(), &school_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch school"))?;
    if school.is_none() {
        return Err(ApiError::BadRequest("School does not exist".to_string()));
    }

    let now = primitive_now_utc();
    let mut tx = state
        .db()
        .begin()
        .await
        .map_err(|e| ApiError::internal(e, "Failed to start transaction"))?;

    let user = accounts::create_account(&mut tx, &payload.account, now).await?;
    let student = repositories::students::create(
        &mut *tx,
        repositories::students::CreateStudent {
            id: &Uuid::new_v4().to_string(),
            user_id: &user.id,
            school_id: &school_id,
            attendant_year: payload.attendant_year,
            year_level: payload.year_level,
            created_at: now,
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to create student"))?;

    tx.commit().await.map_err(|e| ApiError::internal(e, "Failed to commit transaction"))?;

    tracing::info!(
        caller_id = %caller.user.id,
        student_id = %student.id,
        school_id = %school_id,
        "Student created"
    );

    let profile = fetch_profile(&state, &student.id).await?;
    Ok((StatusCode::CREATED, Json(StudentResponse::from_profile(profile))))
}

async fn update_student(
    Path(student_id): Path<String>,
    CurrentStaff(caller): CurrentStaff,
    State(state): State<AppState>,
    Json(payload): Json<StudentUpdate>,
) -> Result<Json<StudentResponse>, ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let student = fetch_student(&state, &student_id).await?;
    caller.ensure_school_access(Some(&student.school_id))?;

    if let Some(target) = payload.school_id.as_deref() {
        caller.ensure_school_access(Some(target))?;
    }

    let now = primitive_now_utc();
    let mut tx = state
        .db()
        .begin()
        .await
        .map_err(|e| ApiError::internal(e, "Failed to start transaction"))?;

    accounts::update_account(&mut tx, &student.user_id, payload.account, now).await?;
    repositories::students::update(
        &mut *tx,
        &student.id,
        repositories::students::UpdateStudent {
            school_id: payload.school_id,
            attendant_year: payload.attendant_year,
            year_level: payload.year_level,
            extension_time: None,
            status: payload.status,
        },
        now,
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to update student"))?;

    tx.commit().await.map_err(|e| ApiError::internal(e, "Failed to commit transaction"))?;

    let profile = fetch_profile(&state, &student.id).await?;
    Ok(Json(StudentResponse::from_profile(profile)))
}

async fn delete_student(
    Path(student_id): Path<String>,
    CurrentStaff(caller): CurrentStaff,
    State(state): State<AppState>,
) -> Result<StatusCode, ApiError> {
    let student = fetch_student(&state, &student_id).await?;
    caller.ensure_school_access(Some(&student.school_id))?;

    // The student row goes with its user.
    repositories::users::delete(state.db(), &student.user_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to delete student"))?;

    tracing::info!(caller_id = %caller.user.id, student_id = %student.id, "Student deleted");
    Ok(StatusCode::NO_CONTENT)
}

async fn grant_extension(
    Path(student_id): Path<String>,
    CurrentStaff(caller): CurrentStaff,
    State(state): State<AppState>,
    Json(payload): Json<ExtensionGrant>,
) -> Result<Json<StudentResponse>, ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let student = fetch_student(&state, &student_id).await?;
    caller.ensure_school_access(Some(&student.school_id))?;

    repositories::students::set_extension(
        state.db(),
        &student.id,
        payload.minutes,
        primitive_now_utc(),
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to grant extension"))?;

    tracing::info!(
        caller_id = %caller.user.id,
        student_id = %student.id,
        minutes = payload.minutes,
        "Extension granted"
    );

    let profile = fetch_profile(&state, &student.id).await?;
    Ok(Json(StudentResponse::from_profile(profile)))
}

async fn fetch_student(state: &AppState, student_id: &str) -> Result<Student, ApiError> {
    repositories::students::find_by_id(state.db(), student_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch student"))?
        .ok_or_else(|| ApiError::NotFound("Student not found".to_string()))
}

async fn fetch_profile(state: &AppState, student_id: &str) -> Result<StudentProfile, ApiError> {
    repositories::students::find_profile(state.db(), student_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch student"))?
        .ok_or_else(|| ApiError::NotFound("Student not found".to_string()))
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use serde_json::json;
    use tower::ServiceExt;

    use crate::test_support;

    fn student_payload(username: &str, school_id: Option<&str>) -> serde_json::Value {
        json!({
            "username": username,
            "password": "long-enough-pass",
            "first_name": "Ada",
            "last_name": "Lovelace",
            "school_id": school_id,
            "attendant_year": 2025,
            "year_level": 8
        })
    }

    #[tokio::test]
    async fn teacher_enrols_students_into_own_school() {
        let Some(ctx) = test_support::setup_test_context().await else { return };
        let db = ctx.state.db();
        let own = test_support::insert_school(db, "Home School").await;
        let other = test_support::insert_school(db, "Other School").await;
        let teacher = test_support::insert_teacher(db, "homeroom", &own.id).await;
        let token = test_support::bearer_token(&teacher.id, ctx.state.settings());

        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::POST,
                "/api/v1/students",
                Some(&token),
                Some(student_payload("ada", Some(&other.id))),
            ))
            .await
            .expect("create student");

        assert_eq!(response.status(), StatusCode::CREATED);
        let body = test_support::read_json(response).await;
        assert_eq!(body["school_id"], own.id);
        assert_eq!(body["year_level"], 8);

        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::POST,
                "/api/v1/students",
                Some(&token),
                Some(student_payload("ADA", None)),
            ))
            .await
            .expect("duplicate username");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn teachers_cannot_read_other_schools_students() {
        let Some(ctx) = test_support::setup_test_context().await else { return };
        let db = ctx.state.db();
        let own = test_support::insert_school(db, "Maple").await;
        let other = test_support::insert_school(db, "Birch").await;
        let teacher = test_support::insert_teacher(db, "maple-teacher", &own.id).await;
        let (_user, outsider) = test_support::insert_student(db, "birch-kid", &other.id, 7).await;
        let token = test_support::bearer_token(&teacher.id, ctx.state.settings());

        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::GET,
                &format!("/api/v1/students/{}", outsider.id),
                Some(&token),
                None,
            ))
            .await
            .expect("get student");

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }
}
