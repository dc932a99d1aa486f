use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::db::models::QuestionAttempt;

pub(crate) const COLUMNS: &str = "\
    id, quiz_attempt_id, question_id, student_id, answer_student, is_correct, created_at, \
    updated_at";

pub(crate) struct UpsertAnswer<'a> {
    pub(crate) id: &'a str,
    pub(crate) quiz_attempt_id: &'a str,
    pub(crate) question_id: &'a str,
    pub(crate) student_id: &'a str,
    pub(crate) answer_student: Option<i64>,
    pub(crate) is_correct: Option<bool>,
    pub(crate) now: time::PrimitiveDateTime,
}

#[derive(Debug, sqlx::FromRow)]
struct UpsertRow {
    #[sqlx(flatten)]
    attempt: QuestionAttempt,
    inserted: bool,
}

/// Last write wins per `(quiz_attempt, question, student)`. The flag is
/// true when a new row was created.
pub(crate) async fn upsert(
    executor: impl sqlx::PgExecutor<'_>,
    params: UpsertAnswer<'_>,
) -> Result<(QuestionAttempt, bool), sqlx::Error> {
    let row = sqlx::query_as::<_, UpsertRow>(&format!(
        "INSERT INTO question_attempts (
            id, quiz_attempt_id, question_id, student_id, answer_student, is_correct,
            created_at, updated_at
        ) VALUES ($1,$2,$3,$4,$5,$6,$7,$7)
        ON CONFLICT ON CONSTRAINT question_attempts_triple_key DO UPDATE SET
            answer_student = EXCLUDED.answer_student,
            is_correct = EXCLUDED.is_correct,
            updated_at = EXCLUDED.updated_at
        RETURNING {COLUMNS}, (xmax = 0) AS inserted",
    ))
    .bind(params.id)
    .bind(params.quiz_attempt_id)
    .bind(params.question_id)
    .bind(params.student_id)
    .bind(params.answer_student)
    .bind(params.is_correct)
    .bind(params.now)
    .fetch_one(executor)
    .await?;

    Ok((row.attempt, row.inserted))
}

#[derive(Default)]
pub(crate) struct AnswerFilter {
    pub(crate) quiz_attempt_id: Option<String>,
    pub(crate) student_id: Option<String>,
    pub(crate) school_id: Option<String>,
}

pub(crate) async fn list(
    pool: &PgPool,
    filter: &AnswerFilter,
    skip: i64,
    limit: i64,
) -> Result<Vec<QuestionAttempt>, sqlx::Error> {
    let mut builder = QueryBuilder::<Postgres>::new(
        "SELECT qa.id, qa.quiz_attempt_id, qa.question_id, qa.student_id, qa.answer_student, \
         qa.is_correct, qa.created_at, qa.updated_at \
         FROM question_attempts qa JOIN students s ON s.id = qa.student_id WHERE 1=1",
    );
    if let Some(quiz_attempt_id) = &filter.quiz_attempt_id {
        builder.push(" AND qa.quiz_attempt_id = ").push_bind(quiz_attempt_id.clone());
    }
    if let Some(student_id) = &filter.student_id {
        builder.push(" AND qa.student_id = ").push_bind(student_id.clone());
    }
    if let Some(school_id) = &filter.school_id {
        builder.push(" AND s.school_id = ").push_bind(school_id.clone());
    }
    builder.push(" ORDER BY qa.created_at ASC, qa.id ASC OFFSET ");
    builder.push_bind(skip.max(0));
    builder.push(" LIMIT ");
    builder.push_bind(limit.clamp(1, 1000));

    builder.build_query_as::<QuestionAttempt>().fetch_all(pool).await
}

/// Every answer given inside attempts of the quiz.
pub(crate) async fn list_by_quiz(
    executor: impl sqlx::PgExecutor<'_>,
    quiz_id: &str,
) -> Result<Vec<QuestionAttempt>, sqlx::Error> {
    sqlx::query_as::<_, QuestionAttempt>(
        "SELECT qa.id, qa.quiz_attempt_id, qa.question_id, qa.student_id, qa.answer_student,
                qa.is_correct, qa.created_at, qa.updated_at
         FROM question_attempts qa
         JOIN quiz_attempts a ON a.id = qa.quiz_attempt_id
         WHERE a.quiz_id = $1
         ORDER BY qa.quiz_attempt_id, qa.id",
    )
    .bind(quiz_id)
    .fetch_all(executor)
    .await
}

pub(crate) async fn set_is_correct(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
    is_correct: bool,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE question_attempts SET is_correct = $1 WHERE id = $2")
        .bind(is_correct)
        .bind(id)
        .execute(executor)
        .await?;
    Ok(())
}
