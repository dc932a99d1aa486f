use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::db::models::School;
use crate::db::types::SchoolType;

pub(crate) const COLUMNS: &str =
    "id, name, code, school_type, is_country, address, created_at, updated_at";

pub(crate) const NAME_CONSTRAINT: &str = "schools_name_key";
pub(crate) const CODE_CONSTRAINT: &str = "schools_code_key";

pub(crate) struct CreateSchool<'a> {
    pub(crate) id: &'a str,
    pub(crate) name: &'a str,
    pub(crate) code: Option<&'a str>,
    pub(crate) school_type: SchoolType,
    pub(crate) is_country: bool,
    pub(crate) address: &'a str,
    pub(crate) created_at: time::PrimitiveDateTime,
}

pub(crate) struct UpdateSchool {
    pub(crate) name: Option<String>,
    pub(crate) code: Option<String>,
    pub(crate) school_type: Option<SchoolType>,
    pub(crate) is_country: Option<bool>,
    pub(crate) address: Option<String>,
    pub(crate) updated_at: time::PrimitiveDateTime,
}

pub(crate) async fn create(pool: &PgPool, params: CreateSchool<'_>) -> Result<School, sqlx::Error> {
    sqlx::query_as::<_, School>(&format!(
        "INSERT INTO schools (id, name, code, school_type, is_country, address, created_at, updated_at)
         VALUES ($1,$2,$3,$4,$5,$6,$7,$7)
         RETURNING {COLUMNS}",
    ))
    .bind(params.id)
    .bind(params.name)
    .bind(params.code)
    .bind(params.school_type)
    .bind(params.is_country)
    .bind(params.address)
    .bind(params.created_at)
    .fetch_one(pool)
    .await
}

pub(crate) async fn find_by_id(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
) -> Result<Option<School>, sqlx::Error> {
    sqlx::query_as::<_, School>(&format!("SELECT {COLUMNS} FROM schools WHERE id = $1"))
        .bind(id)
        .fetch_optional(executor)
        .await
}

pub(crate) async fn list(
    pool: &PgPool,
    only_id: Option<&str>,
    search: Option<&str>,
    skip: i64,
    limit: i64,
) -> Result<Vec<School>, sqlx::Error> {
    let mut builder = QueryBuilder::<Postgres>::new(format!("SELECT {COLUMNS} FROM schools WHERE 1=1"));
    if let Some(id) = only_id {
        builder.push(" AND id = ").push_bind(id.to_string());
    }
    if let Some(search) = search {
        builder.push(" AND name ILIKE ").push_bind(format!("%{search}%"));
    }
    builder.push(" ORDER BY name ASC OFFSET ");
    builder.push_bind(skip.max(0));
    builder.push(" LIMIT ");
    builder.push_bind(limit.clamp(1, 1000));

    builder.build_query_as::<School>().fetch_all(pool).await
}

pub(crate) async fn update(
    pool: &PgPool,
    id: &str,
    params: UpdateSchool,
) -> Result<Option<School>, sqlx::Error> {
    sqlx::query_as::<_, School>(&format!(
        "UPDATE schools SET
            name = COALESCE($1, name),
            code = COALESCE($2, code),
            school_type = COALESCE($3, school_type),
            is_country = COALESCE($4, is_country),
            address = COALESCE($5, address),
            updated_at = $6
         WHERE id = $7
         RETURNING {COLUMNS}",
    ))
    .bind(params.name)
    .bind(params.code)
    .bind(params.school_type)
    .bind(params.is_country)
    .bind(params.address)
    .bind(params.updated_at)
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn delete(pool: &PgPool, id: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM schools WHERE id = $1").bind(id).execute(pool).await?;
    Ok(result.rows_affected() > 0)
}

pub(crate) async fn count_students(
    executor: impl sqlx::PgExecutor<'_>,
    school_id: &str,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM students WHERE school_id = $1")
        .bind(school_id)
        .fetch_one(executor)
        .await
}
