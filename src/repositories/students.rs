use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::db::models::{Student, StudentProfile};
use crate::db::types::StudentStatus;

pub(crate) const COLUMNS: &str = "\
    id, user_id, school_id, attendant_year, year_level, extension_time, \
    status, created_at, updated_at";

const PROFILE_SELECT: &str = "\
    SELECT st.id, st.user_id, u.username, u.first_name, u.last_name, u.email, \
           st.school_id, sc.name AS school_name, st.attendant_year, st.year_level, \
           st.extension_time, st.status, st.created_at \
    FROM students st \
    JOIN users u ON u.id = st.user_id \
    JOIN schools sc ON sc.id = st.school_id";

pub(crate) struct CreateStudent<'a> {
    pub(crate) id: &'a str,
    pub(crate) user_id: &'a str,
    pub(crate) school_id: &'a str,
    pub(crate) attendant_year: i32,
    pub(crate) year_level: i32,
    pub(crate) created_at: time::PrimitiveDateTime,
}

#[derive(Default)]
pub(crate) struct UpdateStudent {
    pub(crate) school_id: Option<String>,
    pub(crate) attendant_year: Option<i32>,
    pub(crate) year_level: Option<i32>,
    pub(crate) extension_time: Option<i32>,
    pub(crate) status: Option<StudentStatus>,
}

#[derive(Default)]
pub(crate) struct StudentFilter {
    pub(crate) school_id: Option<String>,
    pub(crate) year_level: Option<i32>,
    pub(crate) search: Option<String>,
}

pub(crate) async fn create(
    executor: impl sqlx::PgExecutor<'_>,
    params: CreateStudent<'_>,
) -> Result<Student, sqlx::Error> {
    sqlx::query_as::<_, Student>(&format!(
        "INSERT INTO students (
            id, user_id, school_id, attendant_year, year_level, extension_time, status,
            created_at, updated_at
        ) VALUES ($1,$2,$3,$4,$5,0,$6,$7,$7)
        RETURNING {COLUMNS}",
    ))
    .bind(params.id)
    .bind(params.user_id)
    .bind(params.school_id)
    .bind(params.attendant_year)
    .bind(params.year_level)
    .bind(StudentStatus::Active)
    .bind(params.created_at)
    .fetch_one(executor)
    .await
}

pub(crate) async fn find_by_id(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
) -> Result<Option<Student>, sqlx::Error> {
    sqlx::query_as::<_, Student>(&format!("SELECT {COLUMNS} FROM students WHERE id = $1"))
        .bind(id)
        .fetch_optional(executor)
        .await
}

pub(crate) async fn find_by_user_id(
    executor: impl sqlx::PgExecutor<'_>,
    user_id: &str,
) -> Result<Option<Student>, sqlx::Error> {
    sqlx::query_as::<_, Student>(&format!("SELECT {COLUMNS} FROM students WHERE user_id = $1"))
        .bind(user_id)
        .fetch_optional(executor)
        .await
}

/// Row-locks the student for the rest of the transaction.
pub(crate) async fn lock_by_id(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
) -> Result<Option<Student>, sqlx::Error> {
    sqlx::query_as::<_, Student>(&format!(
        "SELECT {COLUMNS} FROM students WHERE id = $1 FOR UPDATE"
    ))
    .bind(id)
    .fetch_optional(executor)
    .await
}

pub(crate) async fn find_profile(
    pool: &PgPool,
    id: &str,
) -> Result<Option<StudentProfile>, sqlx::Error> {
    sqlx::query_as::<_, StudentProfile>(&format!("{PROFILE_SELECT} WHERE st.id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub(crate) async fn list_profiles(
    pool: &PgPool,
    filter: &StudentFilter,
    skip: i64,
    limit: i64,
) -> Result<Vec<StudentProfile>, sqlx::Error> {
    let mut builder = QueryBuilder::<Postgres>::new(format!("{PROFILE_SELECT} WHERE 1=1"));
    push_filter(&mut builder, filter);
    builder.push(" ORDER BY u.last_name ASC, u.first_name ASC, st.id ASC OFFSET ");
    builder.push_bind(skip.max(0));
    builder.push(" LIMIT ");
    builder.push_bind(limit.clamp(1, 1000));

    builder.build_query_as::<StudentProfile>().fetch_all(pool).await
}

pub(crate) async fn count_profiles(pool: &PgPool, filter: &StudentFilter) -> Result<i64, sqlx::Error> {
    let mut builder = QueryBuilder::<Postgres>::new(
        "SELECT COUNT(*) FROM students st JOIN users u ON u.id = st.user_id WHERE 1=1",
    );
    push_filter(&mut builder, filter);
    builder.build_query_scalar::<i64>().fetch_one(pool).await
}

fn push_filter(builder: &mut QueryBuilder<'_, Postgres>, filter: &StudentFilter) {
    if let Some(school_id) = &filter.school_id {
        builder.push(" AND st.school_id = ").push_bind(school_id.clone());
    }
    if let Some(year_level) = filter.year_level {
        builder.push(" AND st.year_level = ").push_bind(year_level);
    }
    if let Some(search) = &filter.search {
        let pattern = format!("%{search}%");
        builder
            .push(" AND (u.first_name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR u.last_name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR u.username ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
}

pub(crate) async fn update(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
    params: UpdateStudent,
    now: time::PrimitiveDateTime,
) -> Result<Option<Student>, sqlx::Error> {
    sqlx::query_as::<_, Student>(&format!(
        "UPDATE students SET
            school_id = COALESCE($1, school_id),
            attendant_year = COALESCE($2, attendant_year),
            year_level = COALESCE($3, year_level),
            extension_time = COALESCE($4, extension_time),
            status = COALESCE($5, status),
            updated_at = $6
         WHERE id = $7
         RETURNING {COLUMNS}",
    ))
    .bind(params.school_id)
    .bind(params.attendant_year)
    .bind(params.year_level)
    .bind(params.extension_time)
    .bind(params.status)
    .bind(now)
    .bind(id)
    .fetch_optional(executor)
    .await
}

pub(crate) async fn set_extension(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
    minutes: i32,
    now: time::PrimitiveDateTime,
) -> Result<bool, sqlx::Error> {
    let result =
        sqlx::query("UPDATE students SET extension_time = $1, updated_at = $2 WHERE id = $3")
            .bind(minutes)
            .bind(now)
            .bind(id)
            .execute(executor)
            .await?;
    Ok(result.rows_affected() > 0)
}

pub(crate) async fn primary_team_id(
    executor: impl sqlx::PgExecutor<'_>,
    student_id: &str,
) -> Result<Option<String>, sqlx::Error> {
    sqlx::query_scalar::<_, String>(
        "SELECT team_id FROM team_members WHERE student_id = $1 ORDER BY joined_at ASC LIMIT 1",
    )
    .bind(student_id)
    .fetch_optional(executor)
    .await
}
