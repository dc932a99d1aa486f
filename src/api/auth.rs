use axum::{
    extract::{Form, State},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::guards::{resolve_role, CurrentUser};
use crate::core::redis::login_rate_key;
use crate::core::security;
use crate::core::state::AppState;
use crate::db::models::User;
use crate::repositories;
use crate::schemas::auth::{MeResponse, TokenResponse};
use crate::schemas::user::{UserLogin, UserResponse};

#[derive(Debug, Deserialize)]
struct OAuth2PasswordForm {
    username: String,
    password: String,
}

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/login", post(login))
        .route("/token", post(token))
        .route("/me", get(me))
}

async fn login(
    State(state): State<AppState>,
    Json(payload): Json<UserLogin>,
) -> Result<Json<TokenResponse>, ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;
    authenticate(&state, &payload.username, &payload.password).await.map(Json)
}

async fn token(
    State(state): State<AppState>,
    Form(payload): Form<OAuth2PasswordForm>,
) -> Result<Json<TokenResponse>, ApiError> {
    authenticate(&state, &payload.username, &payload.password).await.map(Json)
}

async fn me(current: CurrentUser) -> Json<MeResponse> {
    Json(MeResponse { user: UserResponse::from_db(current.user), role: current.role })
}

async fn authenticate(
    state: &AppState,
    username: &str,
    password: &str,
) -> Result<TokenResponse, ApiError> {
    let limits = state.settings().security();
    let allowed = state
        .redis()
        .rate_limit(&login_rate_key(username), limits.login_rate_limit, limits.login_rate_window_seconds)
        .await
        .unwrap_or(true);
    if !allowed {
        metrics::counter!("auth_login_total", "outcome" => "rate_limited").increment(1);
        return Err(ApiError::TooManyRequests("Too many login attempts, try again later"));
    }

    let user = fetch_user_by_username(state, username).await?;

    let verified = security::verify_password(password, &user.hashed_password)
        .map_err(|_| ApiError::Unauthorized("Incorrect username or password"))?;

    if !verified {
        metrics::counter!("auth_login_total", "outcome" => "rejected").increment(1);
        return Err(ApiError::Unauthorized("Incorrect username or password"));
    }

    if !user.is_active {
        return Err(ApiError::BadRequest("Inactive user".to_string()));
    }

    let role = resolve_role(state.db(), &user)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to resolve user role"))?;

    let token = security::create_access_token(&user.id, state.settings(), None)
        .map_err(|e| ApiError::internal(e, "Failed to create access token"))?;

    metrics::counter!("auth_login_total", "outcome" => "success").increment(1);
    tracing::info!(user_id = %user.id, role = role.as_str(), "User logged in");

    Ok(TokenResponse {
        access_token: token,
        token_type: "bearer".to_string(),
        user: UserResponse::from_db(user),
        role,
    })
}

async fn fetch_user_by_username(state: &AppState, username: &str) -> Result<User, ApiError> {
    repositories::users::find_by_username(state.db(), username.trim())
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load user"))?
        .ok_or(ApiError::Unauthorized("Incorrect username or password"))
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use serde_json::json;
    use tower::ServiceExt;

    use crate::test_support;

    #[tokio::test]
    async fn login_returns_token_and_role() {
        let Some(ctx) = test_support::setup_test_context().await else { return };
        let school = test_support::insert_school(ctx.state.db(), "Ridgeway").await;
        test_support::insert_student(ctx.state.db(), "learner", &school.id, 7).await;

        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::POST,
                "/api/v1/auth/login",
                None,
                Some(json!({ "username": "LEARNER", "password": test_support::TEST_PASSWORD })),
            ))
            .await
            .expect("login");

        assert_eq!(response.status(), StatusCode::OK);
        let body = test_support::read_json(response).await;
        assert_eq!(body["token_type"], "bearer");
        assert_eq!(body["role"]["kind"], "student");
        let token = body["access_token"].as_str().expect("token").to_string();

        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(Method::GET, "/api/v1/auth/me", Some(&token), None))
            .await
            .expect("me");
        assert_eq!(response.status(), StatusCode::OK);
        let me = test_support::read_json(response).await;
        assert_eq!(me["user"]["username"], "learner");
        assert_eq!(me["role"]["school_id"], school.id);
    }

    #[tokio::test]
    async fn wrong_password_is_unauthorized() {
        let Some(ctx) = test_support::setup_test_context().await else { return };
        test_support::insert_admin(ctx.state.db(), "keeper").await;

        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::POST,
                "/api/v1/auth/login",
                None,
                Some(json!({ "username": "keeper", "password": "not-the-password" })),
            ))
            .await
            .expect("login");

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = test_support::read_json(response).await;
        assert_eq!(body["detail"], "Incorrect username or password");
    }
}
