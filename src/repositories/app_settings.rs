use sqlx::types::Json;
use sqlx::PgPool;

use crate::db::models::AppSetting;

pub(crate) const COLUMNS: &str = "id, key, value, updated_at";

pub(crate) async fn find_by_key(
    pool: &PgPool,
    key: &str,
) -> Result<Option<AppSetting>, sqlx::Error> {
    sqlx::query_as::<_, AppSetting>(&format!("SELECT {COLUMNS} FROM app_settings WHERE key = $1"))
        .bind(key)
        .fetch_optional(pool)
        .await
}

/// Returns the setting for `key`, creating it with an empty object first.
pub(crate) async fn get_or_create(
    pool: &PgPool,
    id: &str,
    key: &str,
    now: time::PrimitiveDateTime,
) -> Result<AppSetting, sqlx::Error> {
    sqlx::query(
        "INSERT INTO app_settings (id, key, value, updated_at)
         VALUES ($1, $2, '{}'::jsonb, $3)
         ON CONFLICT (key) DO NOTHING",
    )
    .bind(id)
    .bind(key)
    .bind(now)
    .execute(pool)
    .await?;

    sqlx::query_as::<_, AppSetting>(&format!("SELECT {COLUMNS} FROM app_settings WHERE key = $1"))
        .bind(key)
        .fetch_one(pool)
        .await
}

pub(crate) async fn update_value(
    pool: &PgPool,
    id: &str,
    value: serde_json::Value,
    now: time::PrimitiveDateTime,
) -> Result<Option<AppSetting>, sqlx::Error> {
    sqlx::query_as::<_, AppSetting>(&format!(
        "UPDATE app_settings SET value = $1, updated_at = $2 WHERE id = $3 RETURNING {COLUMNS}",
    ))
    .bind(Json(value))
    .bind(now)
    .bind(id)
    .fetch_optional(pool)
    .await
}
