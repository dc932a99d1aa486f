use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::db::models::{Teacher, TeacherProfile};

pub(crate) const COLUMNS: &str = "id, user_id, school_id, phone, created_at, updated_at";

const PROFILE_SELECT: &str = "\
    SELECT t.id, t.user_id, u.username, u.first_name, u.last_name, u.email, \
           t.school_id, sc.name AS school_name, t.phone, t.created_at \
    FROM teachers t \
    JOIN users u ON u.id = t.user_id \
    JOIN schools sc ON sc.id = t.school_id";

pub(crate) struct CreateTeacher<'a> {
    pub(crate) id: &'a str,
    pub(crate) user_id: &'a str,
    pub(crate) school_id: &'a str,
    pub(crate) phone: &'a str,
    pub(crate) created_at: time::PrimitiveDateTime,
}

pub(crate) async fn create(
    executor: impl sqlx::PgExecutor<'_>,
    params: CreateTeacher<'_>,
) -> Result<Teacher, sqlx::Error> {
    sqlx::query_as::<_, Teacher>(&format!(
        "INSERT INTO teachers (id, user_id, school_id, phone, created_at, updated_at)
         VALUES ($1,$2,$3,$4,$5,$5)
         RETURNING {COLUMNS}",
    ))
    .bind(params.id)
    .bind(params.user_id)
    .bind(params.school_id)
    .bind(params.phone)
    .bind(params.created_at)
    .fetch_one(executor)
    .await
}

pub(crate) async fn find_by_id(pool: &PgPool, id: &str) -> Result<Option<Teacher>, sqlx::Error> {
    sqlx::query_as::<_, Teacher>(&format!("SELECT {COLUMNS} FROM teachers WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub(crate) async fn find_by_user_id(
    executor: impl sqlx::PgExecutor<'_>,
    user_id: &str,
) -> Result<Option<Teacher>, sqlx::Error> {
    sqlx::query_as::<_, Teacher>(&format!("SELECT {COLUMNS} FROM teachers WHERE user_id = $1"))
        .bind(user_id)
        .fetch_optional(executor)
        .await
}

pub(crate) async fn find_profile(
    pool: &PgPool,
    id: &str,
) -> Result<Option<TeacherProfile>, sqlx::Error> {
    sqlx::query_as::<_, TeacherProfile>(&format!("{PROFILE_SELECT} WHERE t.id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub(crate) async fn list_profiles(
    pool: &PgPool,
    school_id: Option<&str>,
    skip: i64,
    limit: i64,
) -> Result<Vec<TeacherProfile>, sqlx::Error> {
    let mut builder = QueryBuilder::<Postgres>::new(format!("{PROFILE_SELECT} WHERE 1=1"));
    if let Some(school_id) = school_id {
        builder.push(" AND t.school_id = ").push_bind(school_id.to_string());
    }
    builder.push(" ORDER BY u.last_name ASC, u.first_name ASC OFFSET ");
    builder.push_bind(skip.max(0));
    builder.push(" LIMIT ");
    builder.push_bind(limit.clamp(1, 1000));

    builder.build_query_as::<TeacherProfile>().fetch_all(pool).await
}

pub(crate) async fn update(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
    school_id: Option<String>,
    phone: Option<String>,
    now: time::PrimitiveDateTime,
) -> Result<Option<Teacher>, sqlx::Error> {
    sqlx::query_as::<_, Teacher>(&format!(
        "UPDATE teachers SET
            school_id = COALESCE($1, school_id),
            phone = COALESCE($2, phone),
            updated_at = $3
         WHERE id = $4
         RETURNING {COLUMNS}",
    ))
    .bind(school_id)
    .bind(phone)
    .bind(now)
    .bind(id)
    .fetch_optional(executor)
    .await
}
