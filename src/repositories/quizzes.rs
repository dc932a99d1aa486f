use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::db::models::Quiz;
use crate::db::types::QuizStatus;

pub(crate) const COLUMNS: &str = "\
    id, name, intro, total_marks, is_comp, visible, open_time_date, time_limit, time_window, \
    status, created_at, updated_at";

pub(crate) const COMPETITION_CONSTRAINT: &str = "quizzes_competition_timing";

pub(crate) struct CreateQuiz<'a> {
    pub(crate) id: &'a str,
    pub(crate) name: &'a str,
    pub(crate) intro: &'a str,
    pub(crate) is_comp: bool,
    pub(crate) visible: bool,
    pub(crate) open_time_date: Option<time::PrimitiveDateTime>,
    pub(crate) time_limit: i32,
    pub(crate) time_window: Option<i32>,
    pub(crate) status: QuizStatus,
    pub(crate) created_at: time::PrimitiveDateTime,
}

/// Column updates. `open_time_date`/`time_window` use a nested option so
/// that `Some(None)` clears the column.
#[derive(Default)]
pub(crate) struct UpdateQuiz {
    pub(crate) name: Option<String>,
    pub(crate) intro: Option<String>,
    pub(crate) is_comp: Option<bool>,
    pub(crate) visible: Option<bool>,
    pub(crate) open_time_date: Option<Option<time::PrimitiveDateTime>>,
    pub(crate) time_limit: Option<i32>,
    pub(crate) time_window: Option<Option<i32>>,
    pub(crate) status: Option<QuizStatus>,
}

#[derive(Default)]
pub(crate) struct QuizFilter {
    pub(crate) visible_only: bool,
    pub(crate) is_comp: Option<bool>,
    pub(crate) status: Option<QuizStatus>,
}

pub(crate) async fn create(pool: &PgPool, params: CreateQuiz<'_>) -> Result<Quiz, sqlx::Error> {
    sqlx::query_as::<_, Quiz>(&format!(
        "INSERT INTO quizzes (
            id, name, intro, total_marks, is_comp, visible, open_time_date, time_limit,
            time_window, status, created_at, updated_at
        ) VALUES ($1,$2,$3,0,$4,$5,$6,$7,$8,$9,$10,$10)
        RETURNING {COLUMNS}",
    ))
    .bind(params.id)
    .bind(params.name)
    .bind(params.intro)
    .bind(params.is_comp)
    .bind(params.visible)
    .bind(params.open_time_date)
    .bind(params.time_limit)
    .bind(params.time_window)
    .bind(params.status)
    .bind(params.created_at)
    .fetch_one(pool)
    .await
}

pub(crate) async fn find_by_id(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
) -> Result<Option<Quiz>, sqlx::Error> {
    sqlx::query_as::<_, Quiz>(&format!("SELECT {COLUMNS} FROM quizzes WHERE id = $1"))
        .bind(id)
        .fetch_optional(executor)
        .await
}

/// Row lock held until the surrounding transaction ends.
pub(crate) async fn lock_by_id(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
) -> Result<Option<Quiz>, sqlx::Error> {
    sqlx::query_as::<_, Quiz>(&format!("SELECT {COLUMNS} FROM quizzes WHERE id = $1 FOR UPDATE"))
        .bind(id)
        .fetch_optional(executor)
        .await
}

pub(crate) async fn list(
    pool: &PgPool,
    filter: &QuizFilter,
    skip: i64,
    limit: i64,
) -> Result<Vec<Quiz>, sqlx::Error> {
    let mut builder =
        QueryBuilder::<Postgres>::new(format!("SELECT {COLUMNS} FROM quizzes WHERE 1=1"));
    if filter.visible_only {
        builder.push(" AND visible = TRUE");
    }
    if let Some(is_comp) = filter.is_comp {
        builder.push(" AND is_comp = ").push_bind(is_comp);
    }
    if let Some(status) = filter.status {
        builder.push(" AND status = ").push_bind(status);
    }
    builder.push(" ORDER BY open_time_date DESC NULLS LAST, created_at DESC OFFSET ");
    builder.push_bind(skip.max(0));
    builder.push(" LIMIT ");
    builder.push_bind(limit.clamp(1, 1000));

    builder.build_query_as::<Quiz>().fetch_all(pool).await
}

pub(crate) async fn update(
    pool: &PgPool,
    id: &str,
    params: UpdateQuiz,
    now: time::PrimitiveDateTime,
) -> Result<Option<Quiz>, sqlx::Error> {
    sqlx::query_as::<_, Quiz>(&format!(
        "UPDATE quizzes SET
            name = COALESCE($1, name),
            intro = COALESCE($2, intro),
            is_comp = COALESCE($3, is_comp),
            visible = COALESCE($4, visible),
            open_time_date = CASE WHEN $5 THEN $6 ELSE open_time_date END,
            time_limit = COALESCE($7, time_limit),
            time_window = CASE WHEN $8 THEN $9 ELSE time_window END,
            status = COALESCE($10, status),
            updated_at = $11
         WHERE id = $12
         RETURNING {COLUMNS}",
    ))
    .bind(params.name)
    .bind(params.intro)
    .bind(params.is_comp)
    .bind(params.visible)
    .bind(params.open_time_date.is_some())
    .bind(params.open_time_date.flatten())
    .bind(params.time_limit)
    .bind(params.time_window.is_some())
    .bind(params.time_window.flatten())
    .bind(params.status)
    .bind(now)
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn delete(pool: &PgPool, id: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM quizzes WHERE id = $1").bind(id).execute(pool).await?;
    Ok(result.rows_affected() > 0)
}

pub(crate) async fn set_total_marks(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
    total_marks: i32,
    now: time::PrimitiveDateTime,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE quizzes SET total_marks = $1, updated_at = $2 WHERE id = $3")
        .bind(total_marks)
        .bind(now)
        .bind(id)
        .execute(executor)
        .await?;
    Ok(())
}

/// Moves the quiz to `to` only while it is still in `from`, so concurrent
/// workers never apply the same transition twice.
pub(crate) async fn transition_status(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
    from: QuizStatus,
    to: QuizStatus,
    now: time::PrimitiveDateTime,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE quizzes SET status = $1, updated_at = $2 WHERE id = $3 AND status = $4",
    )
    .bind(to)
    .bind(now)
    .bind(id)
    .bind(from)
    .execute(executor)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Scheduled quizzes the status job still has to look at.
pub(crate) async fn list_scheduled(pool: &PgPool) -> Result<Vec<Quiz>, sqlx::Error> {
    sqlx::query_as::<_, Quiz>(&format!(
        "SELECT {COLUMNS} FROM quizzes
         WHERE status IN ('upcoming', 'ongoing') AND open_time_date IS NOT NULL
         ORDER BY open_time_date ASC",
    ))
    .fetch_all(pool)
    .await
}
