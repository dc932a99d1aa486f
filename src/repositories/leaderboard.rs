use serde::Serialize;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};

use crate::db::types::SchoolType;

#[derive(Debug, Clone, Serialize, FromRow)]
pub(crate) struct IndividualRow {
    pub(crate) attempt_id: String,
    pub(crate) quiz_id: String,
    pub(crate) student_id: String,
    pub(crate) first_name: String,
    pub(crate) last_name: String,
    pub(crate) year_level: i32,
    pub(crate) school_name: String,
    pub(crate) school_type: SchoolType,
    pub(crate) is_country: bool,
    pub(crate) total_marks: i32,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub(crate) struct TeamRow {
    pub(crate) team_id: String,
    pub(crate) team_name: String,
    pub(crate) school_name: Option<String>,
    pub(crate) is_country: Option<bool>,
    pub(crate) total_marks: i64,
    pub(crate) max_year: Option<i32>,
}

#[derive(Default)]
pub(crate) struct IndividualFilter {
    pub(crate) quiz_id: Option<String>,
    pub(crate) year_level: Option<i32>,
    pub(crate) school_type: Option<SchoolType>,
    pub(crate) search: Option<String>,
    pub(crate) ordering: Option<String>,
}

#[derive(Default)]
pub(crate) struct TeamFilter {
    pub(crate) quiz_id: Option<String>,
    pub(crate) school_type: Option<SchoolType>,
    pub(crate) ordering: Option<String>,
}

/// Maps a client ordering key (optionally prefixed with `-`) onto an
/// ORDER BY expression. Unknown keys yield `None`.
pub(crate) fn individual_order(ordering: &str) -> Option<String> {
    let (key, direction) = split_direction(ordering);
    let column = match key {
        "year_level" => "st.year_level",
        "total_marks" => "a.total_marks",
        "school" => "sc.name",
        "school_type" => "sc.school_type",
        "name" => "u.first_name",
        _ => return None,
    };
    Some(format!("{column} {direction}"))
}

pub(crate) fn team_order(ordering: &str) -> Option<String> {
    let (key, direction) = split_direction(ordering);
    let column = match key {
        "total_marks" => "total_marks",
        "max_year" => "max_year",
        "id" => "team_id",
        "school" => "school_name",
        _ => return None,
    };
    Some(format!("{column} {direction} NULLS LAST"))
}

fn split_direction(ordering: &str) -> (&str, &'static str) {
    let ordering = ordering.trim();
    match ordering.strip_prefix('-') {
        Some(key) => (key, "DESC"),
        None => (ordering, "ASC"),
    }
}

pub(crate) async fn individual(
    pool: &PgPool,
    filter: &IndividualFilter,
    skip: i64,
    limit: i64,
) -> Result<Vec<IndividualRow>, sqlx::Error> {
    let mut builder = QueryBuilder::<Postgres>::new(
        "SELECT a.id AS attempt_id, a.quiz_id, st.id AS student_id, u.first_name, u.last_name, \
                st.year_level, sc.name AS school_name, sc.school_type, sc.is_country, a.total_marks \
         FROM quiz_attempts a \
         JOIN students st ON st.id = a.student_id \
         JOIN users u ON u.id = st.user_id \
         JOIN schools sc ON sc.id = st.school_id \
         WHERE 1=1",
    );
    if let Some(quiz_id) = &filter.quiz_id {
        builder.push(" AND a.quiz_id = ").push_bind(quiz_id.clone());
    }
    if let Some(year_level) = filter.year_level {
        builder.push(" AND st.year_level = ").push_bind(year_level);
    }
    if let Some(school_type) = filter.school_type {
        builder.push(" AND sc.school_type = ").push_bind(school_type);
    }
    if let Some(search) = &filter.search {
        let pattern = format!("%{search}%");
        builder
            .push(" AND (u.first_name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR u.last_name ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
    let order = filter
        .ordering
        .as_deref()
        .and_then(individual_order)
        .unwrap_or_else(|| "st.year_level DESC".to_string());
    builder.push(format!(" ORDER BY {order}, a.id ASC OFFSET "));
    builder.push_bind(skip.max(0));
    builder.push(" LIMIT ");
    builder.push_bind(limit.clamp(1, 1000));

    builder.build_query_as::<IndividualRow>().fetch_all(pool).await
}

pub(crate) async fn teams(
    pool: &PgPool,
    filter: &TeamFilter,
    skip: i64,
    limit: i64,
) -> Result<Vec<TeamRow>, sqlx::Error> {
    let mut builder = QueryBuilder::<Postgres>::new(
        "SELECT * FROM (SELECT t.id AS team_id, t.name AS team_name, sc.name AS school_name, \
                sc.is_country, \
                COALESCE((SELECT SUM(a.total_marks) FROM quiz_attempts a WHERE a.team_id = t.id",
    );
    if let Some(quiz_id) = &filter.quiz_id {
        builder.push(" AND a.quiz_id = ").push_bind(quiz_id.clone());
    }
    builder.push(
        "), 0)::BIGINT AS total_marks, \
                (SELECT MAX(st.year_level) FROM team_members m \
                 JOIN students st ON st.id = m.student_id WHERE m.team_id = t.id) AS max_year \
         FROM teams t LEFT JOIN schools sc ON sc.id = t.school_id WHERE 1=1",
    );
    if let Some(quiz_id) = &filter.quiz_id {
        builder
            .push(" AND EXISTS (SELECT 1 FROM quiz_attempts a WHERE a.team_id = t.id AND a.quiz_id = ")
            .push_bind(quiz_id.clone())
            .push(")");
    }
    if let Some(school_type) = filter.school_type {
        builder.push(" AND sc.school_type = ").push_bind(school_type);
    }
    let order = filter
        .ordering
        .as_deref()
        .and_then(team_order)
        .unwrap_or_else(|| "total_marks DESC NULLS LAST".to_string());
    builder.push(format!(") ranked ORDER BY {order}, team_id ASC OFFSET "));
    builder.push_bind(skip.max(0));
    builder.push(" LIMIT ");
    builder.push_bind(limit.clamp(1, 1000));

    builder.build_query_as::<TeamRow>().fetch_all(pool).await
}
