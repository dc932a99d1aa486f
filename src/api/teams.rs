use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::guards::{CurrentStaff, CurrentUser};
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::models::Team;
use crate::repositories;
use crate::schemas::team::{TeamCreate, TeamMemberAdd, TeamResponse, TeamUpdate};

#[derive(Debug, Deserialize)]
struct ListTeamsQuery {
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
        .route("/", get(list_teams).post(create_team))
        .route("/:team_id", get(get_team).patch(update_team).delete(delete_team))
        .route("/:team_id/members", post(add_member))
        .route("/:team_id/members/:student_id", delete(remove_member))
}

async fn list_teams(
    Query(params): Query<ListTeamsQuery>,
    CurrentStaff(caller): CurrentStaff,
    State(state): State<AppState>,
) -> Result<Json<Vec<TeamResponse>>, ApiError> {
    let school_id = match caller.staff_school_scope()? {
        Some(own) => Some(own),
        None => params.school_id,
    };

    let teams =
        repositories::teams::list(state.db(), school_id.as_deref(), params.skip, params.limit)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to list teams"))?;

    let team_ids: Vec<String> = teams.iter().map(|team| team.id.clone()).collect();
    let members = repositories::teams::list_members(state.db(), &team_ids)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list team members"))?;

    Ok(Json(teams.into_iter().map(|team| TeamResponse::from_db(team, &members)).collect()))
}

async fn get_team(
    Path(team_id): Path<String>,
    CurrentStaff(caller): CurrentStaff,
    State(state): State<AppState>,
) -> Result<Json<TeamResponse>, ApiError> {
    let team = fetch_team(&state, &caller, &team_id).await?;
    team_response(&state, team).await.map(Json)
}

async fn create_team(
    CurrentStaff(caller): CurrentStaff,
    State(state): State<AppState>,
    Json(payload): Json<TeamCreate>,
) -> Result<(StatusCode, Json<TeamResponse>), ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let school_id = match caller.staff_school_scope()? {
        Some(own) => Some(own),
        None => payload.school_id,
    };

    let team = repositories::teams::create(
        state.db(),
        repositories::teams::CreateTeam {
            id: &Uuid::new_v4().to_string(),
            name: payload.name.trim(),
            school_id: school_id.as_deref(),
            description: &payload.description,
            created_at: primitive_now_utc(),
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to create team"))?;

    tracing::info!(caller_id = %caller.user.id, team_id = %team.id, "Team created");

    Ok((StatusCode::CREATED, Json(TeamResponse::from_db(team, &[]))))
}

async fn update_team(
    Path(team_id): Path<String>,
    CurrentStaff(caller): CurrentStaff,
    State(state): State<AppState>,
    Json(payload): Json<TeamUpdate>,
) -> Result<Json<TeamResponse>, ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;
    fetch_team(&state, &caller, &team_id).await?;

    let team = repositories::teams::update(
        state.db(),
        &team_id,
        payload.name.map(|name| name.trim().to_string()),
        payload.description,
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to update team"))?
    .ok_or_else(|| ApiError::NotFound("Team not found".to_string()))?;

    team_response(&state, team).await.map(Json)
}

async fn delete_team(
    Path(team_id): Path<String>,
    CurrentStaff(caller): CurrentStaff,
    State(state): State<AppState>,
) -> Result<StatusCode, ApiError> {
    fetch_team(&state, &caller, &team_id).await?;

    repositories::teams::delete(state.db(), &team_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to delete team"))?;

    tracing::info!(caller_id = %caller.user.id, team_id = %team_id, "Team deleted");
    Ok(StatusCode::NO_CONTENT)
}

async fn add_member(
    Path(team_id): Path<String>,
    CurrentStaff(caller): CurrentStaff,
    State(state): State<AppState>,
    Json(payload): Json<TeamMemberAdd>,
) -> Result<(StatusCode, Json<TeamResponse>), ApiError> {
    let team = fetch_team(&state, &caller, &team_id).await?;

    let student = repositories::students::find_by_id(state.db(), &payload.student_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch student"))?
        .ok_or_else(|| ApiError::BadRequest("Student does not exist".to_string()))?;
    caller.ensure_school_access(Some(&student.school_id))?;

    let added =
        repositories::teams::add_member(state.db(), &team.id, &student.id, primitive_now_utc())
            .await
            .map_err(|e| ApiError::internal(e, "Failed to add team member"))?;
    if !added {
        return Err(ApiError::BadRequest("Student is already a member of this team".to_string()));
    }

    Ok((StatusCode::CREATED, Json(team_response(&state, team).await?)))
}

async fn remove_member(
    Path((team_id, student_id)): Path<(String, String)>,
    CurrentStaff(caller): CurrentStaff,
    State(state): State<AppState>,
) -> Result<StatusCode, ApiError> {
    fetch_team(&state, &caller, &team_id).await?;

    let removed = repositories::teams::remove_member(state.db(), &team_id, &student_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to remove team member"))?;
    if !removed {
        return Err(ApiError::NotFound("Team member not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}

/// Loads the team and checks that the caller may manage it.
async fn fetch_team(state: &AppState, caller: &CurrentUser, team_id: &str) -> Result<Team, ApiError> {
    let team = repositories::teams::find_by_id(state.db(), team_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch team"))?
        .ok_or_else(|| ApiError::NotFound("Team not found".to_string()))?;

    caller.ensure_school_access(team.school_id.as_deref())?;
    Ok(team)
}

async fn team_response(state: &AppState, team: Team) -> Result<TeamResponse, ApiError> {
    let members = repositories::teams::list_members(state.db(), std::slice::from_ref(&team.id))
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list team members"))?;
    Ok(TeamResponse::from_db(team, &members))
}
