use std::collections::HashMap;

use sqlx::types::Json;
use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::db::models::Question;

pub(crate) const COLUMNS: &str = "\
    id, name, category_id, year, year_level, question_text, image, mark, answers, \
    solution_text, created_at, updated_at";

pub(crate) const NAME_CONSTRAINT: &str = "questions_name_key";

pub(crate) struct CreateQuestion<'a> {
    pub(crate) id: &'a str,
    pub(crate) name: &'a str,
    pub(crate) category_id: Option<&'a str>,
    pub(crate) year: i32,
    pub(crate) year_level: i32,
    pub(crate) question_text: &'a str,
    pub(crate) image: Option<&'a str>,
    pub(crate) mark: i32,
    pub(crate) answers: Vec<i64>,
    pub(crate) solution_text: &'a str,
    pub(crate) created_at: time::PrimitiveDateTime,
}

#[derive(Default)]
pub(crate) struct UpdateQuestion {
    pub(crate) name: Option<String>,
    pub(crate) category_id: Option<String>,
    pub(crate) year: Option<i32>,
    pub(crate) year_level: Option<i32>,
    pub(crate) question_text: Option<String>,
    pub(crate) image: Option<String>,
    pub(crate) mark: Option<i32>,
    pub(crate) answers: Option<Vec<i64>>,
    pub(crate) solution_text: Option<String>,
}

#[derive(Default)]
pub(crate) struct QuestionFilter {
    pub(crate) category_id: Option<String>,
    pub(crate) year_level: Option<i32>,
    pub(crate) search: Option<String>,
    /// Matches questions that accept this answer.
    pub(crate) answer: Option<i64>,
    pub(crate) mark: Option<i32>,
}

/// Mark and accepted answers of one question, as used by marking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct AnswerKey {
    pub(crate) mark: i32,
    pub(crate) answers: Vec<i64>,
}

pub(crate) async fn create(
    pool: &PgPool,
    params: CreateQuestion<'_>,
) -> Result<Question, sqlx::Error> {
    sqlx::query_as::<_, Question>(&format!(
        "INSERT INTO questions (
            id, name, category_id, year, year_level, question_text, image, mark, answers,
            solution_text, created_at, updated_at
        ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$11)
        RETURNING {COLUMNS}",
    ))
    .bind(params.id)
    .bind(params.name)
    .bind(params.category_id)
    .bind(params.year)
    .bind(params.year_level)
    .bind(params.question_text)
    .bind(params.image)
    .bind(params.mark)
    .bind(Json(params.answers))
    .bind(params.solution_text)
    .bind(params.created_at)
    .fetch_one(pool)
    .await
}

pub(crate) async fn find_by_id(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
) -> Result<Option<Question>, sqlx::Error> {
    sqlx::query_as::<_, Question>(&format!("SELECT {COLUMNS} FROM questions WHERE id = $1"))
        .bind(id)
        .fetch_optional(executor)
        .await
}

pub(crate) async fn list(
    pool: &PgPool,
    filter: &QuestionFilter,
    skip: i64,
    limit: i64,
) -> Result<Vec<Question>, sqlx::Error> {
    let mut builder =
        QueryBuilder::<Postgres>::new(format!("SELECT {COLUMNS} FROM questions WHERE 1=1"));
    if let Some(category_id) = &filter.category_id {
        builder.push(" AND category_id = ").push_bind(category_id.clone());
    }
    if let Some(year_level) = filter.year_level {
        builder.push(" AND year_level = ").push_bind(year_level);
    }
    if let Some(answer) = filter.answer {
        builder.push(" AND answers @> jsonb_build_array(").push_bind(answer).push(")");
    }
    if let Some(mark) = filter.mark {
        builder.push(" AND mark = ").push_bind(mark);
    }
    if let Some(search) = &filter.search {
        let pattern = format!("%{search}%");
        builder
            .push(" AND (name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR question_text ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
    builder.push(" ORDER BY created_at DESC, id ASC OFFSET ");
    builder.push_bind(skip.max(0));
    builder.push(" LIMIT ");
    builder.push_bind(limit.clamp(1, 1000));

    builder.build_query_as::<Question>().fetch_all(pool).await
}

pub(crate) async fn update(
    pool: &PgPool,
    id: &str,
    params: UpdateQuestion,
    now: time::PrimitiveDateTime,
) -> Result<Option<Question>, sqlx::Error> {
    sqlx::query_as::<_, Question>(&format!(
        "UPDATE questions SET
            name = COALESCE($1, name),
            category_id = COALESCE($2, category_id),
            year = COALESCE($3, year),
            year_level = COALESCE($4, year_level),
            question_text = COALESCE($5, question_text),
            image = COALESCE($6, image),
            mark = COALESCE($7, mark),
            answers = COALESCE($8, answers),
            solution_text = COALESCE($9, solution_text),
            updated_at = $10
         WHERE id = $11
         RETURNING {COLUMNS}",
    ))
    .bind(params.name)
    .bind(params.category_id)
    .bind(params.year)
    .bind(params.year_level)
    .bind(params.question_text)
    .bind(params.image)
    .bind(params.mark)
    .bind(params.answers.map(Json))
    .bind(params.solution_text)
    .bind(now)
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn delete(pool: &PgPool, id: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM questions WHERE id = $1").bind(id).execute(pool).await?;
    Ok(result.rows_affected() > 0)
}

/// Ids from `ids` that exist, for validating slot submissions.
pub(crate) async fn existing_ids(
    executor: impl sqlx::PgExecutor<'_>,
    ids: &[String],
) -> Result<Vec<String>, sqlx::Error> {
    sqlx::query_scalar::<_, String>("SELECT id FROM questions WHERE id = ANY($1)")
        .bind(ids)
        .fetch_all(executor)
        .await
}

/// Mark and accepted answers for each of the given questions.
pub(crate) async fn answer_keys(
    executor: impl sqlx::PgExecutor<'_>,
    ids: &[String],
) -> Result<HashMap<String, AnswerKey>, sqlx::Error> {
    let rows: Vec<(String, i32, Json<Vec<i64>>)> =
        sqlx::query_as("SELECT id, mark, answers FROM questions WHERE id = ANY($1)")
            .bind(ids)
            .fetch_all(executor)
            .await?;

    Ok(rows
        .into_iter()
        .map(|(id, mark, answers)| (id, AnswerKey { mark, answers: answers.0 }))
        .collect())
}
