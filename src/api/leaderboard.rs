use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use crate::api::errors::ApiError;
use crate::core::state::AppState;
use crate::db::types::SchoolType;
use crate::repositories;
use crate::schemas::leaderboard::{IndividualEntry, TeamEntry};

#[derive(Debug, Deserialize)]
struct LeaderboardQuery {
    #[serde(default)]
    skip: i64,
    #[serde(default = "crate::api::pagination::default_limit")]
    limit: i64,
    #[serde(default, alias = "quiz")]
    quiz_id: Option<String>,
    #[serde(default)]
    year_level: Option<i32>,
    #[serde(default)]
    school_type: Option<SchoolType>,
    #[serde(default)]
    search: Option<String>,
    #[serde(default)]
    ordering: Option<String>,
}

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/individual", get(individual))
        .route("/teams", get(teams))
}

fn reject_unknown_ordering(
    ordering: Option<&str>,
    resolve: fn(&str) -> Option<String>,
) -> Result<(), ApiError> {
    match ordering {
        Some(key) if resolve(key).is_none() => {
            Err(ApiError::BadRequest(format!("Unsupported ordering: {key}")))
        }
        _ => Ok(()),
    }
}

async fn individual(
    Query(params): Query<LeaderboardQuery>,
    State(state): State<AppState>,
) -> Result<Json<Vec<IndividualEntry>>, ApiError> {
    let ordering = params.ordering.as_deref();
    reject_unknown_ordering(ordering, repositories::leaderboard::individual_order)?;
    let filter = repositories::leaderboard::IndividualFilter {
        quiz_id: params.quiz_id,
        year_level: params.year_level,
        school_type: params.school_type,
        search: params.search.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()),
        ordering: params.ordering,
    };

    let rows = repositories::leaderboard::individual(state.db(), &filter, params.skip, params.limit)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load individual leaderboard"))?;

    Ok(Json(rows.into_iter().map(IndividualEntry::from_row).collect()))
}

async fn teams(
    Query(params): Query<LeaderboardQuery>,
    State(state): State<AppState>,
) -> Result<Json<Vec<TeamEntry>>, ApiError> {
    reject_unknown_ordering(params.ordering.as_deref(), repositories::leaderboard::team_order)?;
    let filter = repositories::leaderboard::TeamFilter {
        quiz_id: params.quiz_id,
        school_type: params.school_type,
        ordering: params.ordering,
    };

    let rows = repositories::leaderboard::teams(state.db(), &filter, params.skip, params.limit)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load team leaderboard"))?;

    let team_ids: Vec<String> = rows.iter().map(|row| row.team_id.clone()).collect();
    let members = repositories::teams::list_members(state.db(), &team_ids)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load team members"))?;

    Ok(Json(rows.into_iter().map(|row| TeamEntry::from_row(row, &members)).collect()))
}
