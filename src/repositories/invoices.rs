use sqlx::PgPool;

use crate::db::models::Invoice;

pub(crate) const COLUMNS: &str = "\
    id, school_id, issued_on, address, student_count, cost, subject, created_at";

pub(crate) struct CreateInvoice<'a> {
    pub(crate) id: &'a str,
    pub(crate) school_id: &'a str,
    pub(crate) issued_on: time::Date,
    pub(crate) address: &'a str,
    pub(crate) student_count: i32,
    pub(crate) cost: i64,
    pub(crate) subject: &'a str,
    pub(crate) created_at: time::PrimitiveDateTime,
}

#[derive(Default)]
pub(crate) struct UpdateInvoice {
    pub(crate) issued_on: Option<time::Date>,
    pub(crate) address: Option<String>,
    pub(crate) student_count: Option<i32>,
    pub(crate) cost: Option<i64>,
    pub(crate) subject: Option<String>,
}

pub(crate) async fn create(pool: &PgPool, params: CreateInvoice<'_>) -> Result<Invoice, sqlx::Error> {
    sqlx::query_as::<_, Invoice>(&format!(
        "INSERT INTO invoices (
            id, school_id, issued_on, address, student_count, cost, subject, created_at
        ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8)
        RETURNING {COLUMNS}",
    ))
    .bind(params.id)
    .bind(params.school_id)
    .bind(params.issued_on)
    .bind(params.address)
    .bind(params.student_count)
    .bind(params.cost)
    .bind(params.subject)
    .bind(params.created_at)
    .fetch_one(pool)
    .await
}

pub(crate) async fn find_by_id(pool: &PgPool, id: &str) -> Result<Option<Invoice>, sqlx::Error> {
    sqlx::query_as::<_, Invoice>(&format!("SELECT {COLUMNS} FROM invoices WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub(crate) async fn list(
    pool: &PgPool,
    school_id: Option<&str>,
    skip: i64,
    limit: i64,
) -> Result<Vec<Invoice>, sqlx::Error> {
    sqlx::query_as::<_, Invoice>(&format!(
        "SELECT {COLUMNS} FROM invoices
         WHERE ($1::TEXT IS NULL OR school_id = $1)
         ORDER BY issued_on DESC, created_at DESC
         OFFSET $2 LIMIT $3",
    ))
    .bind(school_id)
    .bind(skip.max(0))
    .bind(limit.clamp(1, 1000))
    .fetch_all(pool)
    .await
}

pub(crate) async fn update(
    pool: &PgPool,
    id: &str,
    params: UpdateInvoice,
) -> Result<Option<Invoice>, sqlx::Error> {
    sqlx::query_as::<_, Invoice>(&format!(
        "UPDATE invoices SET
            issued_on = COALESCE($1, issued_on),
            address = COALESCE($2, address),
            student_count = COALESCE($3, student_count),
            cost = COALESCE($4, cost),
            subject = COALESCE($5, subject)
         WHERE id = $6
         RETURNING {COLUMNS}",
    ))
    .bind(params.issued_on)
    .bind(params.address)
    .bind(params.student_count)
    .bind(params.cost)
    .bind(params.subject)
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn delete(pool: &PgPool, id: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM invoices WHERE id = $1").bind(id).execute(pool).await?;
    Ok(result.rows_affected() > 0)
}
