//! User-account plumbing shared by the student and teacher endpoints.

use sqlx::{Postgres, Transaction};
use uuid::Uuid;

use crate::api::errors::ApiError;
use crate::core::security;
use crate::db::models::User;
use crate::repositories;
use crate::schemas::user::{AccountCreate, AccountUpdate};

/// Creates the login account behind a student or teacher profile.
pub(crate) async fn create_account(
    tx: &mut Transaction<'_, Postgres>,
    account: &AccountCreate,
    now: time::PrimitiveDateTime,
) -> Result<User, ApiError> {
    let username = account.username.trim();
    let taken = repositories::users::exists_by_username(&mut **tx, username)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to check existing user"))?;
    if taken {
        return Err(ApiError::BadRequest("A user with this username already exists".to_string()));
    }

    let hashed_password = security::hash_password(&account.password)
        .map_err(|e| ApiError::internal(e, "Failed to hash password"))?;

    repositories::users::create(
        &mut **tx,
        repositories::users::CreateUser {
            id: &Uuid::new_v4().to_string(),
            username,
            hashed_password,
            first_name: account.first_name.trim(),
            last_name: account.last_name.trim(),
            email: account.email.as_deref().unwrap_or_default(),
            is_staff: false,
            is_active: true,
            created_at: now,
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to create user"))
}

/// Applies account changes; a no-op when the payload carries none.
pub(crate) async fn update_account(
    tx: &mut Transaction<'_, Postgres>,
    user_id: &str,
    account: AccountUpdate,
    now: time::PrimitiveDateTime,
) -> Result<(), ApiError> {
    if account.is_empty() {
        return Ok(());
    }

    let hashed_password = match account.password.as_deref() {
        Some(password) => Some(
            security::hash_password(password)
                .map_err(|e| ApiError::internal(e, "Failed to hash password"))?,
        ),
        None => None,
    };

    repositories::users::update(
        &mut **tx,
        user_id,
        repositories::users::UpdateUser {
            first_name: account.first_name,
            last_name: account.last_name,
            email: account.email,
            is_staff: None,
            is_active: account.is_active,
            hashed_password,
        },
        now,
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to update user"))
}
