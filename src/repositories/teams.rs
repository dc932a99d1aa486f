use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::db::models::{Team, TeamMember};

pub(crate) const COLUMNS: &str = "id, name, school_id, description, created_at";

pub(crate) struct CreateTeam<'a> {
    pub(crate) id: &'a str,
    pub(crate) name: &'a str,
    pub(crate) school_id: Option<&'a str>,
    pub(crate) description: &'a str,
    pub(crate) created_at: time::PrimitiveDateTime,
}

pub(crate) async fn create(pool: &PgPool, params: CreateTeam<'_>) -> Result<Team, sqlx::Error> {
    sqlx::query_as::<_, Team>(&format!(
        "INSERT INTO teams (id, name, school_id, description, created_at)
         VALUES ($1,$2,$3,$4,$5)
         RETURNING {COLUMNS}",
    ))
    .bind(params.id)
    .bind(params.name)
    .bind(params.school_id)
    .bind(params.description)
    .bind(params.created_at)
    .fetch_one(pool)
    .await
}

pub(crate) async fn find_by_id(pool: &PgPool, id: &str) -> Result<Option<Team>, sqlx::Error> {
    sqlx::query_as::<_, Team>(&format!("SELECT {COLUMNS} FROM teams WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub(crate) async fn list(
    pool: &PgPool,
    school_id: Option<&str>,
    skip: i64,
    limit: i64,
) -> Result<Vec<Team>, sqlx::Error> {
    let mut builder = QueryBuilder::<Postgres>::new(format!("SELECT {COLUMNS} FROM teams WHERE 1=1"));
    if let Some(school_id) = school_id {
        builder.push(" AND school_id = ").push_bind(school_id.to_string());
    }
    builder.push(" ORDER BY created_at DESC, id ASC OFFSET ");
    builder.push_bind(skip.max(0));
    builder.push(" LIMIT ");
    builder.push_bind(limit.clamp(1, 1000));

    builder.build_query_as::<Team>().fetch_all(pool).await
}

pub(crate) async fn update(
    pool: &PgPool,
    id: &str,
    name: Option<String>,
    description: Option<String>,
) -> Result<Option<Team>, sqlx::Error> {
    sqlx::query_as::<_, Team>(&format!(
        "UPDATE teams SET
            name = COALESCE($1, name),
            description = COALESCE($2, description)
         WHERE id = $3
         RETURNING {COLUMNS}",
    ))
    .bind(name)
    .bind(description)
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn delete(pool: &PgPool, id: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM teams WHERE id = $1").bind(id).execute(pool).await?;
    Ok(result.rows_affected() > 0)
}

/// Returns `false` when the student already belongs to the team.
pub(crate) async fn add_member(
    pool: &PgPool,
    team_id: &str,
    student_id: &str,
    joined_at: time::PrimitiveDateTime,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "INSERT INTO team_members (team_id, student_id, joined_at) VALUES ($1,$2,$3)
         ON CONFLICT (team_id, student_id) DO NOTHING",
    )
    .bind(team_id)
    .bind(student_id)
    .bind(joined_at)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

pub(crate) async fn remove_member(
    pool: &PgPool,
    team_id: &str,
    student_id: &str,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM team_members WHERE team_id = $1 AND student_id = $2")
        .bind(team_id)
        .bind(student_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub(crate) async fn list_members(
    pool: &PgPool,
    team_ids: &[String],
) -> Result<Vec<TeamMember>, sqlx::Error> {
    if team_ids.is_empty() {
        return Ok(Vec::new());
    }

    sqlx::query_as::<_, TeamMember>(
        "SELECT tm.team_id, tm.student_id, u.first_name, u.last_name, st.year_level, tm.joined_at
         FROM team_members tm
         JOIN students st ON st.id = tm.student_id
         JOIN users u ON u.id = st.user_id
         WHERE tm.team_id = ANY($1)
         ORDER BY tm.team_id, st.id",
    )
    .bind(team_ids)
    .fetch_all(pool)
    .await
}
