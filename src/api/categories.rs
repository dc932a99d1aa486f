use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use uuid::Uuid;
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::guards::{CurrentAdmin, CurrentUser};
use crate::core::state::AppState;
use crate::db;
use crate::repositories;
use crate::schemas::category::{CategoryCreate, CategoryResponse, CategoryUpdate};

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_categories).post(create_category))
        .route(
            "/:category_id",
            get(get_category).patch(update_category).delete(delete_category),
        )
}

async fn list_categories(
    _caller: CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<CategoryResponse>>, ApiError> {
    let categories = repositories::categories::list(state.db())
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list categories"))?;

    Ok(Json(categories.into_iter().map(CategoryResponse::from_db).collect()))
}

async fn get_category(
    Path(category_id): Path<String>,
    _caller: CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<CategoryResponse>, ApiError> {
    let category = repositories::categories::find_by_id(state.db(), &category_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch category"))?
        .ok_or_else(|| ApiError::NotFound("Category not found".to_string()))?;

    Ok(Json(CategoryResponse::from_db(category)))
}

async fn create_category(
    CurrentAdmin(_admin): CurrentAdmin,
    State(state): State<AppState>,
    Json(payload): Json<CategoryCreate>,
) -> Result<(StatusCode, Json<CategoryResponse>), ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let category = repositories::categories::create(
        state.db(),
        &Uuid::new_v4().to_string(),
        payload.genre.trim(),
        &payload.info,
    )
    .await
    .map_err(map_category_write_error)?;

    Ok((StatusCode::CREATED, Json(CategoryResponse::from_db(category))))
}

async fn update_category(
    Path(category_id): Path<String>,
    CurrentAdmin(_admin): CurrentAdmin,
    State(state): State<AppState>,
    Json(payload): Json<CategoryUpdate>,
) -> Result<Json<CategoryResponse>, ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let category = repositories::categories::update(
        state.db(),
        &category_id,
        payload.genre.map(|genre| genre.trim().to_string()),
        payload.info,
    )
    .await
    .map_err(map_category_write_error)?
    .ok_or_else(|| ApiError::NotFound("Category not found".to_string()))?;

    Ok(Json(CategoryResponse::from_db(category)))
}

async fn delete_category(
    Path(category_id): Path<String>,
    CurrentAdmin(_admin): CurrentAdmin,
    State(state): State<AppState>,
) -> Result<StatusCode, ApiError> {
    let deleted = repositories::categories::delete(state.db(), &category_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to delete category"))?;

    if deleted {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound("Category not found".to_string()))
    }
}

fn map_category_write_error(err: sqlx::Error) -> ApiError {
    if db::is_unique_violation(&err, repositories::categories::GENRE_CONSTRAINT) {
        return ApiError::BadRequest("A category with this genre already exists".to_string());
    }
    ApiError::internal(err, "Failed to save category")
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use serde_json::json;
    use tower::ServiceExt;

    use crate::test_support;

    #[tokio::test]
    async fn duplicate_genre_is_a_bad_request() {
        let Some(ctx) = test_support::setup_test_context().await else { return };
        let admin = test_support::insert_admin(ctx.state.db(), "curator").await;
        let token = test_support::bearer_token(&admin.id, ctx.state.settings());

        for expected in [StatusCode::CREATED, StatusCode::BAD_REQUEST] {
            let response = ctx
                .app
                .clone()
                .oneshot(test_support::json_request(
                    Method::POST,
                    "/api/v1/categories",
                    Some(&token),
                    Some(json!({ "genre": "Geometry" })),
                ))
                .await
                .expect("create category");
            assert_eq!(response.status(), expected);
        }
    }
}
