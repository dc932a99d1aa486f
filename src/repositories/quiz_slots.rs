use sqlx::PgPool;

use crate::db::models::{QuizSlot, SlotQuestion};

pub(crate) const COLUMNS: &str = "id, quiz_id, question_id, slot_index, block";

pub(crate) const SLOT_INDEX_CONSTRAINT: &str = "quiz_slots_quiz_slot_index_key";

const SLOT_QUESTION_SELECT: &str = "\
    SELECT s.id AS slot_id, s.slot_index, s.block, q.id AS question_id, q.name, \
           q.question_text, q.image, q.mark, q.answers \
    FROM quiz_slots s \
    JOIN questions q ON q.id = s.question_id";

pub(crate) struct CreateSlot<'a> {
    pub(crate) id: &'a str,
    pub(crate) quiz_id: &'a str,
    pub(crate) question_id: &'a str,
    pub(crate) slot_index: i32,
    pub(crate) block: i32,
}

pub(crate) async fn delete_by_quiz(
    executor: impl sqlx::PgExecutor<'_>,
    quiz_id: &str,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM quiz_slots WHERE quiz_id = $1")
        .bind(quiz_id)
        .execute(executor)
        .await?;
    Ok(result.rows_affected())
}

pub(crate) async fn insert(
    executor: impl sqlx::PgExecutor<'_>,
    params: CreateSlot<'_>,
) -> Result<QuizSlot, sqlx::Error> {
    sqlx::query_as::<_, QuizSlot>(&format!(
        "INSERT INTO quiz_slots (id, quiz_id, question_id, slot_index, block)
         VALUES ($1,$2,$3,$4,$5)
         RETURNING {COLUMNS}",
    ))
    .bind(params.id)
    .bind(params.quiz_id)
    .bind(params.question_id)
    .bind(params.slot_index)
    .bind(params.block)
    .fetch_one(executor)
    .await
}

pub(crate) async fn list_by_quiz(
    pool: &PgPool,
    quiz_id: &str,
) -> Result<Vec<QuizSlot>, sqlx::Error> {
    sqlx::query_as::<_, QuizSlot>(&format!(
        "SELECT {COLUMNS} FROM quiz_slots WHERE quiz_id = $1 ORDER BY slot_index ASC",
    ))
    .bind(quiz_id)
    .fetch_all(pool)
    .await
}

/// Slots with their questions in `slot_index` order.
pub(crate) async fn list_with_questions(
    executor: impl sqlx::PgExecutor<'_>,
    quiz_id: &str,
) -> Result<Vec<SlotQuestion>, sqlx::Error> {
    sqlx::query_as::<_, SlotQuestion>(&format!(
        "{SLOT_QUESTION_SELECT} WHERE s.quiz_id = $1 ORDER BY s.slot_index ASC",
    ))
    .bind(quiz_id)
    .fetch_all(executor)
    .await
}

pub(crate) async fn sum_marks(
    executor: impl sqlx::PgExecutor<'_>,
    quiz_id: &str,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>(
        "SELECT COALESCE(SUM(q.mark), 0)::BIGINT
         FROM quiz_slots s
         JOIN questions q ON q.id = s.question_id
         WHERE s.quiz_id = $1",
    )
    .bind(quiz_id)
    .fetch_one(executor)
    .await
}

/// True when the question sits in one of the quiz's slots.
pub(crate) async fn quiz_contains_question(
    executor: impl sqlx::PgExecutor<'_>,
    quiz_id: &str,
    question_id: &str,
) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM quiz_slots WHERE quiz_id = $1 AND question_id = $2)",
    )
    .bind(quiz_id)
    .bind(question_id)
    .fetch_one(executor)
    .await
}
