use async_trait::async_trait;
use axum::extract::{FromRequestParts, State};
use axum::http::{header, request::Parts};
use sqlx::PgPool;

use crate::api::errors::ApiError;
use crate::core::{security, state::AppState};
use crate::db::models::User;
use crate::db::types::UserRole;
use crate::repositories;

/// Authenticated caller with the role resolved for this request.
#[derive(Debug, Clone)]
pub(crate) struct CurrentUser {
    pub(crate) user: User,
    pub(crate) role: UserRole,
}

pub(crate) struct CurrentAdmin(pub(crate) User);

/// Admin or teacher.
pub(crate) struct CurrentStaff(pub(crate) CurrentUser);

/// Caller on a public endpoint; `None` when no credentials were sent.
pub(crate) struct MaybeUser(pub(crate) Option<CurrentUser>);

impl MaybeUser {
    pub(crate) fn role(&self) -> &UserRole {
        self.0.as_ref().map_or(&UserRole::Anonymous, |caller| &caller.role)
    }
}

impl CurrentUser {
    /// The caller's student id, or 403 for any other role.
    pub(crate) fn student_id(&self) -> Result<&str, ApiError> {
        match &self.role {
            UserRole::Student { student_id, .. } => Ok(student_id),
            _ => Err(ApiError::Forbidden("Only students can do this")),
        }
    }

    /// School restriction for staff listings: `None` for admins, the own school for
    /// teachers.
    pub(crate) fn staff_school_scope(&self) -> Result<Option<String>, ApiError> {
        match &self.role {
            UserRole::Admin => Ok(None),
            UserRole::Teacher { school_id, .. } => Ok(Some(school_id.clone())),
            _ => Err(ApiError::Forbidden("Not enough permissions")),
        }
    }

    /// Allows admins anywhere and teachers inside their own school.
    pub(crate) fn ensure_school_access(&self, school_id: Option<&str>) -> Result<(), ApiError> {
        match &self.role {
            UserRole::Admin => Ok(()),
            UserRole::Teacher { school_id: own, .. } if school_id == Some(own.as_str()) => Ok(()),
            _ => Err(ApiError::Forbidden("Not enough permissions")),
        }
    }
}

/// Student profile first, then teacher profile, then the staff flag.
pub(crate) async fn resolve_role(pool: &PgPool, user: &User) -> Result<UserRole, sqlx::Error> {
    if let Some(student) = repositories::students::find_by_user_id(pool, &user.id).await? {
        return Ok(UserRole::Student { student_id: student.id, school_id: student.school_id });
    }
    if let Some(teacher) = repositories::teachers::find_by_user_id(pool, &user.id).await? {
        return Ok(UserRole::Teacher { teacher_id: teacher.id, school_id: teacher.school_id });
    }
    if user.is_staff {
        return Ok(UserRole::Admin);
    }
    Ok(UserRole::Anonymous)
}

async fn authenticate(state: &AppState, token: &str) -> Result<CurrentUser, ApiError> {
    let claims = security::verify_token(token, state.settings())
        .map_err(|_| ApiError::Unauthorized("Invalid authentication credentials"))?;

    let user = repositories::users::find_by_id(state.db(), &claims.sub)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load user"))?;

    let Some(user) = user else {
        return Err(ApiError::Unauthorized("User not found"));
    };

    if !user.is_active {
        return Err(ApiError::Unauthorized("Invalid authentication credentials"));
    }

    let role = resolve_role(state.db(), &user)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to resolve user role"))?;

    Ok(CurrentUser { user, role })
}

fn bearer_token(parts: &Parts) -> Result<Option<&str>, ApiError> {
    let Some(value) = parts.headers.get(header::AUTHORIZATION) else {
        return Ok(None);
    };

    value
        .to_str()
        .ok()
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(Some)
        .ok_or(ApiError::Unauthorized("Invalid authentication credentials"))
}

async fn app_state(parts: &mut Parts, state: &AppState) -> Result<AppState, ApiError> {
    let State(app_state) = State::<AppState>::from_request_parts(parts, state)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to access application state"))?;
    Ok(app_state)
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let app_state = app_state(parts, state).await?;
        let token = bearer_token(parts)?
            .ok_or(ApiError::Unauthorized("Invalid authentication credentials"))?;

        authenticate(&app_state, token).await
    }
}

#[async_trait]
impl FromRequestParts<AppState> for MaybeUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let app_state = app_state(parts, state).await?;
        match bearer_token(parts)? {
            Some(token) => Ok(MaybeUser(Some(authenticate(&app_state, token).await?))),
            None => Ok(MaybeUser(None)),
        }
    }
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentAdmin {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let current = CurrentUser::from_request_parts(parts, state).await?;

        if current.role.is_admin() {
            Ok(CurrentAdmin(current.user))
        } else {
            Err(ApiError::Forbidden("Admin access required"))
        }
    }
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentStaff {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let current = CurrentUser::from_request_parts(parts, state).await?;

        if current.role.is_staff_facing() {
            Ok(CurrentStaff(current))
        } else {
            Err(ApiError::Forbidden("Staff access required"))
        }
    }
}
