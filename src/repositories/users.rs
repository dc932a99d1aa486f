use sqlx::PgPool;

use crate::db::models::User;

pub(crate) const COLUMNS: &str = "\
    id, username, hashed_password, first_name, last_name, email, \
    is_staff, is_active, created_at, updated_at";

pub(crate) async fn find_by_id(pool: &PgPool, id: &str) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!("SELECT {COLUMNS} FROM users WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub(crate) async fn find_by_username(
    pool: &PgPool,
    username: &str,
) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!("SELECT {COLUMNS} FROM users WHERE lower(username) = lower($1)"))
        .bind(username)
        .fetch_optional(pool)
        .await
}

pub(crate) async fn exists_by_username(
    executor: impl sqlx::PgExecutor<'_>,
    username: &str,
) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM users WHERE lower(username) = lower($1))",
    )
    .bind(username)
    .fetch_one(executor)
    .await
}

pub(crate) struct CreateUser<'a> {
    pub(crate) id: &'a str,
    pub(crate) username: &'a str,
    pub(crate) hashed_password: String,
    pub(crate) first_name: &'a str,
    pub(crate) last_name: &'a str,
    pub(crate) email: &'a str,
    pub(crate) is_staff: bool,
    pub(crate) is_active: bool,
    pub(crate) created_at: time::PrimitiveDateTime,
}

pub(crate) async fn create(
    executor: impl sqlx::PgExecutor<'_>,
    params: CreateUser<'_>,
) -> Result<User, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!(
        "INSERT INTO users (
            id, username, hashed_password, first_name, last_name, email,
            is_staff, is_active, created_at, updated_at
        ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$9)
        RETURNING {COLUMNS}",
    ))
    .bind(params.id)
    .bind(params.username)
    .bind(params.hashed_password)
    .bind(params.first_name)
    .bind(params.last_name)
    .bind(params.email)
    .bind(params.is_staff)
    .bind(params.is_active)
    .bind(params.created_at)
    .fetch_one(executor)
    .await
}

#[derive(Default)]
pub(crate) struct UpdateUser {
    pub(crate) first_name: Option<String>,
    pub(crate) last_name: Option<String>,
    pub(crate) email: Option<String>,
    pub(crate) is_staff: Option<bool>,
    pub(crate) is_active: Option<bool>,
    pub(crate) hashed_password: Option<String>,
}

pub(crate) async fn update(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
    params: UpdateUser,
    now: time::PrimitiveDateTime,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE users SET
            first_name = COALESCE($1, first_name),
            last_name = COALESCE($2, last_name),
            email = COALESCE($3, email),
            is_staff = COALESCE($4, is_staff),
            is_active = COALESCE($5, is_active),
            hashed_password = COALESCE($6, hashed_password),
            updated_at = $7
         WHERE id = $8",
    )
    .bind(params.first_name)
    .bind(params.last_name)
    .bind(params.email)
    .bind(params.is_staff)
    .bind(params.is_active)
    .bind(params.hashed_password)
    .bind(now)
    .bind(id)
    .execute(executor)
    .await?;
    Ok(())
}

pub(crate) async fn delete(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM users WHERE id = $1").bind(id).execute(executor).await?;
    Ok(result.rows_affected() > 0)
}
