use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::db::models::QuizAttempt;
use crate::db::types::AttemptState;

pub(crate) const COLUMNS: &str = "\
    id, quiz_id, student_id, team_id, current_page, state, shuffle_seed, time_start, \
    time_finish, time_modified, total_marks, dead_line";

pub(crate) struct CreateAttempt<'a> {
    pub(crate) id: &'a str,
    pub(crate) quiz_id: &'a str,
    pub(crate) student_id: &'a str,
    pub(crate) team_id: Option<&'a str>,
    pub(crate) shuffle_seed: i64,
    pub(crate) time_start: time::PrimitiveDateTime,
}

/// Visibility scope plus optional filters for attempt listings.
#[derive(Default)]
pub(crate) struct AttemptFilter {
    pub(crate) student_id: Option<String>,
    pub(crate) school_id: Option<String>,
    pub(crate) quiz_id: Option<String>,
    pub(crate) state: Option<AttemptState>,
}

/// Inserts a fresh attempt. Returns `None` when the student already has
/// one for the quiz; callers then load the existing row.
pub(crate) async fn create(
    executor: impl sqlx::PgExecutor<'_>,
    params: CreateAttempt<'_>,
) -> Result<Option<QuizAttempt>, sqlx::Error> {
    sqlx::query_as::<_, QuizAttempt>(&format!(
        "INSERT INTO quiz_attempts (
            id, quiz_id, student_id, team_id, current_page, state, shuffle_seed,
            time_start, time_modified, total_marks
        ) VALUES ($1,$2,$3,$4,0,'unattempted',$5,$6,$6,0)
        ON CONFLICT ON CONSTRAINT quiz_attempts_quiz_student_key DO NOTHING
        RETURNING {COLUMNS}",
    ))
    .bind(params.id)
    .bind(params.quiz_id)
    .bind(params.student_id)
    .bind(params.team_id)
    .bind(params.shuffle_seed)
    .bind(params.time_start)
    .fetch_optional(executor)
    .await
}

pub(crate) async fn find_by_id(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
) -> Result<Option<QuizAttempt>, sqlx::Error> {
    sqlx::query_as::<_, QuizAttempt>(&format!("SELECT {COLUMNS} FROM quiz_attempts WHERE id = $1"))
        .bind(id)
        .fetch_optional(executor)
        .await
}

pub(crate) async fn find_by_quiz_student(
    executor: impl sqlx::PgExecutor<'_>,
    quiz_id: &str,
    student_id: &str,
) -> Result<Option<QuizAttempt>, sqlx::Error> {
    sqlx::query_as::<_, QuizAttempt>(&format!(
        "SELECT {COLUMNS} FROM quiz_attempts WHERE quiz_id = $1 AND student_id = $2",
    ))
    .bind(quiz_id)
    .bind(student_id)
    .fetch_optional(executor)
    .await
}

/// Row lock held until the surrounding transaction ends.
pub(crate) async fn lock_by_id(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
) -> Result<Option<QuizAttempt>, sqlx::Error> {
    sqlx::query_as::<_, QuizAttempt>(&format!(
        "SELECT {COLUMNS} FROM quiz_attempts WHERE id = $1 FOR UPDATE",
    ))
    .bind(id)
    .fetch_optional(executor)
    .await
}

pub(crate) async fn list(
    pool: &PgPool,
    filter: &AttemptFilter,
    skip: i64,
    limit: i64,
) -> Result<Vec<QuizAttempt>, sqlx::Error> {
    let mut builder = QueryBuilder::<Postgres>::new(
        "SELECT a.id, a.quiz_id, a.student_id, a.team_id, a.current_page, a.state, \
         a.shuffle_seed, a.time_start, a.time_finish, a.time_modified, a.total_marks, a.dead_line \
         FROM quiz_attempts a JOIN students s ON s.id = a.student_id WHERE 1=1",
    );
    if let Some(student_id) = &filter.student_id {
        builder.push(" AND a.student_id = ").push_bind(student_id.clone());
    }
    if let Some(school_id) = &filter.school_id {
        builder.push(" AND s.school_id = ").push_bind(school_id.clone());
    }
    if let Some(quiz_id) = &filter.quiz_id {
        builder.push(" AND a.quiz_id = ").push_bind(quiz_id.clone());
    }
    if let Some(state) = filter.state {
        builder.push(" AND a.state = ").push_bind(state);
    }
    builder.push(" ORDER BY a.time_start DESC, a.id ASC OFFSET ");
    builder.push_bind(skip.max(0));
    builder.push(" LIMIT ");
    builder.push_bind(limit.clamp(1, 1000));

    builder.build_query_as::<QuizAttempt>().fetch_all(pool).await
}

pub(crate) async fn list_by_quiz(
    executor: impl sqlx::PgExecutor<'_>,
    quiz_id: &str,
) -> Result<Vec<QuizAttempt>, sqlx::Error> {
    sqlx::query_as::<_, QuizAttempt>(&format!(
        "SELECT {COLUMNS} FROM quiz_attempts WHERE quiz_id = $1 ORDER BY time_start ASC",
    ))
    .bind(quiz_id)
    .fetch_all(executor)
    .await
}

/// Persists the outcome of an availability check.
pub(crate) async fn apply_availability(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
    state: AttemptState,
    dead_line: Option<time::PrimitiveDateTime>,
    now: time::PrimitiveDateTime,
) -> Result<QuizAttempt, sqlx::Error> {
    sqlx::query_as::<_, QuizAttempt>(&format!(
        "UPDATE quiz_attempts SET state = $1, dead_line = $2, time_modified = $3
         WHERE id = $4
         RETURNING {COLUMNS}",
    ))
    .bind(state)
    .bind(dead_line)
    .bind(now)
    .bind(id)
    .fetch_one(executor)
    .await
}

pub(crate) async fn submit(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
    now: time::PrimitiveDateTime,
) -> Result<QuizAttempt, sqlx::Error> {
    sqlx::query_as::<_, QuizAttempt>(&format!(
        "UPDATE quiz_attempts SET state = 'submitted', time_finish = $1, time_modified = $1
         WHERE id = $2
         RETURNING {COLUMNS}",
    ))
    .bind(now)
    .bind(id)
    .fetch_one(executor)
    .await
}

pub(crate) async fn update_current_page(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
    current_page: i32,
    now: time::PrimitiveDateTime,
) -> Result<QuizAttempt, sqlx::Error> {
    sqlx::query_as::<_, QuizAttempt>(&format!(
        "UPDATE quiz_attempts SET current_page = $1, time_modified = $2
         WHERE id = $3
         RETURNING {COLUMNS}",
    ))
    .bind(current_page)
    .bind(now)
    .bind(id)
    .fetch_one(executor)
    .await
}

pub(crate) async fn set_total_marks(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
    total_marks: i32,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE quiz_attempts SET total_marks = $1 WHERE id = $2")
        .bind(total_marks)
        .bind(id)
        .execute(executor)
        .await?;
    Ok(())
}
