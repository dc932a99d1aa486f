use sqlx::PgPool;

use crate::db::models::Category;

const COLUMNS: &str = "id, genre, info";

pub(crate) const GENRE_CONSTRAINT: &str = "categories_genre_key";

pub(crate) async fn create(
    pool: &PgPool,
    id: &str,
    genre: &str,
    info: &str,
) -> Result<Category, sqlx::Error> {
    sqlx::query_as::<_, Category>(&format!(
        "INSERT INTO categories (id, genre, info) VALUES ($1,$2,$3) RETURNING {COLUMNS}"
    ))
    .bind(id)
    .bind(genre)
    .bind(info)
    .fetch_one(pool)
    .await
}

pub(crate) async fn find_by_id(pool: &PgPool, id: &str) -> Result<Option<Category>, sqlx::Error> {
    sqlx::query_as::<_, Category>(&format!("SELECT {COLUMNS} FROM categories WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub(crate) async fn list(pool: &PgPool) -> Result<Vec<Category>, sqlx::Error> {
    sqlx::query_as::<_, Category>(&format!("SELECT {COLUMNS} FROM categories ORDER BY genre ASC"))
        .fetch_all(pool)
        .await
}

pub(crate) async fn update(
    pool: &PgPool,
    id: &str,
    genre: Option<String>,
    info: Option<String>,
) -> Result<Option<Category>, sqlx::Error> {
    sqlx::query_as::<_, Category>(&format!(
        "UPDATE categories SET genre = COALESCE($1, genre), info = COALESCE($2, info)
         WHERE id = $3
         RETURNING {COLUMNS}",
    ))
    .bind(genre)
    .bind(info)
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn delete(pool: &PgPool, id: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM categories WHERE id = $1").bind(id).execute(pool).await?;
    Ok(result.rows_affected() > 0)
}
