use serde::Serialize;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};

use crate::db::types::{AttemptState, SchoolType};

#[derive(Debug, Clone, FromRow)]
pub(crate) struct StudentInsightRow {
    pub(crate) year_level: i32,
    pub(crate) school_type: SchoolType,
    pub(crate) is_country: bool,
    pub(crate) scored: bool,
}

#[derive(Debug, Clone, FromRow)]
pub(crate) struct TeamInsightRow {
    pub(crate) school_type: Option<SchoolType>,
    pub(crate) is_country: Option<bool>,
    pub(crate) year_levels: Vec<i32>,
    pub(crate) scored: bool,
}

#[derive(Debug, Clone, FromRow)]
pub(crate) struct AttemptResultRow {
    pub(crate) id: String,
    pub(crate) quiz_id: String,
    pub(crate) quiz_name: String,
    pub(crate) student_id: String,
    pub(crate) first_name: String,
    pub(crate) last_name: String,
    pub(crate) year_level: i32,
    pub(crate) school_name: String,
    pub(crate) state: AttemptState,
    pub(crate) time_start: time::PrimitiveDateTime,
    pub(crate) time_finish: Option<time::PrimitiveDateTime>,
    pub(crate) time_modified: time::PrimitiveDateTime,
    pub(crate) total_marks: i32,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub(crate) struct AnswerResultRow {
    pub(crate) quiz_attempt_id: String,
    pub(crate) quiz_name: String,
    pub(crate) student_id: String,
    pub(crate) first_name: String,
    pub(crate) last_name: String,
    pub(crate) year_level: i32,
    pub(crate) question_id: String,
    pub(crate) question_name: String,
    pub(crate) question_text: String,
    pub(crate) slot_index: Option<i32>,
    pub(crate) answer_student: Option<i64>,
    pub(crate) is_correct: Option<bool>,
    pub(crate) mark: i32,
}

/// Scope of a results query: the quiz and, for teachers, their school.
#[derive(Default)]
pub(crate) struct ResultScope {
    pub(crate) quiz_id: Option<String>,
    pub(crate) school_id: Option<String>,
}

pub(crate) async fn student_insights(
    pool: &PgPool,
    scope: &ResultScope,
) -> Result<Vec<StudentInsightRow>, sqlx::Error> {
    sqlx::query_as::<_, StudentInsightRow>(
        "SELECT st.year_level, sc.school_type, sc.is_country,
                EXISTS (
                    SELECT 1 FROM quiz_attempts a
                    WHERE a.student_id = st.id AND a.total_marks > 0
                      AND ($1::TEXT IS NULL OR a.quiz_id = $1)
                ) AS scored
         FROM students st
         JOIN schools sc ON sc.id = st.school_id
         WHERE ($1::TEXT IS NULL OR EXISTS (
                    SELECT 1 FROM quiz_attempts a WHERE a.student_id = st.id AND a.quiz_id = $1
               ))
           AND ($2::TEXT IS NULL OR st.school_id = $2)",
    )
    .bind(scope.quiz_id.as_deref())
    .bind(scope.school_id.as_deref())
    .fetch_all(pool)
    .await
}

pub(crate) async fn team_insights(
    pool: &PgPool,
    scope: &ResultScope,
) -> Result<Vec<TeamInsightRow>, sqlx::Error> {
    sqlx::query_as::<_, TeamInsightRow>(
        "SELECT sc.school_type, sc.is_country,
                ARRAY(
                    SELECT st.year_level FROM team_members m
                    JOIN students st ON st.id = m.student_id
                    WHERE m.team_id = t.id
                ) AS year_levels,
                EXISTS (
                    SELECT 1 FROM team_members m
                    JOIN quiz_attempts a ON a.student_id = m.student_id
                    WHERE m.team_id = t.id AND a.total_marks > 0
                      AND ($1::TEXT IS NULL OR a.quiz_id = $1)
                ) AS scored
         FROM teams t
         LEFT JOIN schools sc ON sc.id = t.school_id
         WHERE ($1::TEXT IS NULL OR EXISTS (
                    SELECT 1 FROM quiz_attempts a WHERE a.team_id = t.id AND a.quiz_id = $1
               ))
           AND ($2::TEXT IS NULL OR t.school_id = $2)",
    )
    .bind(scope.quiz_id.as_deref())
    .bind(scope.school_id.as_deref())
    .fetch_all(pool)
    .await
}

pub(crate) async fn attempts(
    pool: &PgPool,
    scope: &ResultScope,
    skip: i64,
    limit: i64,
) -> Result<Vec<AttemptResultRow>, sqlx::Error> {
    let mut builder = QueryBuilder::<Postgres>::new(
        "SELECT a.id, a.quiz_id, qz.name AS quiz_name, st.id AS student_id, u.first_name, \
                u.last_name, st.year_level, sc.name AS school_name, a.state, a.time_start, \
                a.time_finish, a.time_modified, a.total_marks \
         FROM quiz_attempts a \
         JOIN quizzes qz ON qz.id = a.quiz_id \
         JOIN students st ON st.id = a.student_id \
         JOIN users u ON u.id = st.user_id \
         JOIN schools sc ON sc.id = st.school_id \
         WHERE 1=1",
    );
    push_scope(&mut builder, scope);
    builder.push(" ORDER BY a.total_marks DESC, a.id ASC OFFSET ");
    builder.push_bind(skip.max(0));
    builder.push(" LIMIT ");
    builder.push_bind(limit.clamp(1, 1000));

    builder.build_query_as::<AttemptResultRow>().fetch_all(pool).await
}

pub(crate) async fn answers(
    pool: &PgPool,
    scope: &ResultScope,
    attempt_ids: Option<&[String]>,
    skip: i64,
    limit: i64,
) -> Result<Vec<AnswerResultRow>, sqlx::Error> {
    let mut builder = QueryBuilder::<Postgres>::new(
        "SELECT qa.quiz_attempt_id, qz.name AS quiz_name, st.id AS student_id, u.first_name, \
                u.last_name, st.year_level, q.id AS question_id, q.name AS question_name, \
                q.question_text, \
                (SELECT MIN(s.slot_index) FROM quiz_slots s \
                 WHERE s.quiz_id = a.quiz_id AND s.question_id = q.id) AS slot_index, \
                qa.answer_student, qa.is_correct, q.mark \
         FROM question_attempts qa \
         JOIN quiz_attempts a ON a.id = qa.quiz_attempt_id \
         JOIN quizzes qz ON qz.id = a.quiz_id \
         JOIN questions q ON q.id = qa.question_id \
         JOIN students st ON st.id = qa.student_id \
         JOIN users u ON u.id = st.user_id \
         WHERE 1=1",
    );
    push_scope(&mut builder, scope);
    if let Some(ids) = attempt_ids {
        builder.push(" AND qa.quiz_attempt_id = ANY(").push_bind(ids.to_vec()).push(")");
    }
    builder.push(" ORDER BY qa.quiz_attempt_id, slot_index NULLS LAST, qa.id OFFSET ");
    builder.push_bind(skip.max(0));
    builder.push(" LIMIT ");
    builder.push_bind(limit.clamp(1, 10_000));

    builder.build_query_as::<AnswerResultRow>().fetch_all(pool).await
}

fn push_scope(builder: &mut QueryBuilder<'_, Postgres>, scope: &ResultScope) {
    if let Some(quiz_id) = &scope.quiz_id {
        builder.push(" AND a.quiz_id = ").push_bind(quiz_id.clone());
    }
    if let Some(school_id) = &scope.school_id {
        builder.push(" AND st.school_id = ").push_bind(school_id.clone());
    }
}
