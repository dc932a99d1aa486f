use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use time::OffsetDateTime;
use uuid::Uuid;
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::guards::{CurrentAdmin, CurrentStaff};
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::types::UserRole;
use crate::repositories;
use crate::schemas::invoice::{InvoiceCreate, InvoiceResponse, InvoiceUpdate};
use crate::services::invoice_docx::{self, InvoiceSchool, InvoiceValues, DOCX_CONTENT_TYPE};

const INVOICE_SETTING_KEY: &str = "invoice";

#[derive(Debug, Deserialize)]
struct ListInvoicesQuery {
    #[serde(default)]
    skip: i64,
    #[serde(default = "crate::api::pagination::default_limit")]
    limit: i64,
    #[serde(default, alias = "school")]
    school_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DocxQuery {
    #[serde(default, alias = "school")]
    school_id: Option<String>,
}

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_invoices).post(create_invoice))
        .route("/docx", get(download_docx))
        .route(
            "/:invoice_id",
            get(get_invoice).patch(update_invoice).delete(delete_invoice),
        )
}

async fn list_invoices(
    Query(params): Query<ListInvoicesQuery>,
    CurrentAdmin(_admin): CurrentAdmin,
    State(state): State<AppState>,
) -> Result<Json<Vec<InvoiceResponse>>, ApiError> {
    let invoices = repositories::invoices::list(
        state.db(),
        params.school_id.as_deref(),
        params.skip,
        params.limit,
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to list invoices"))?;

    Ok(Json(invoices.into_iter().map(InvoiceResponse::from_db).collect()))
}

async fn get_invoice(
    Path(invoice_id): Path<String>,
    CurrentAdmin(_admin): CurrentAdmin,
    State(state): State<AppState>,
) -> Result<Json<InvoiceResponse>, ApiError> {
    let invoice = repositories::invoices::find_by_id(state.db(), &invoice_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch invoice"))?
        .ok_or_else(|| ApiError::NotFound("Invoice not found".to_string()))?;

    Ok(Json(InvoiceResponse::from_db(invoice)))
}

async fn create_invoice(
    CurrentAdmin(admin): CurrentAdmin,
    State(state): State<AppState>,
    Json(payload): Json<InvoiceCreate>,
) -> Result<(StatusCode, Json<InvoiceResponse>), ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let school = repositories::schools::find_by_id(state.db(), &payload.school_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch school"))?;
    if school.is_none() {
        return Err(ApiError::BadRequest("School not found".to_string()));
    }

    let invoice = repositories::invoices::create(
        state.db(),
        repositories::invoices::CreateInvoice {
            id: &Uuid::new_v4().to_string(),
            school_id: &payload.school_id,
            issued_on: payload.issued_on,
            address: &payload.address,
            student_count: payload.student_count,
            cost: payload.cost,
            subject: &payload.subject,
            created_at: primitive_now_utc(),
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to create invoice"))?;

    tracing::info!(
        admin_id = %admin.id,
        invoice_id = %invoice.id,
        school_id = %invoice.school_id,
        "Invoice created"
    );

    Ok((StatusCode::CREATED, Json(InvoiceResponse::from_db(invoice))))
}

async fn update_invoice(
    Path(invoice_id): Path<String>,
    CurrentAdmin(_admin): CurrentAdmin,
    State(state): State<AppState>,
    Json(payload): Json<InvoiceUpdate>,
) -> Result<Json<InvoiceResponse>, ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let invoice = repositories::invoices::update(
        state.db(),
        &invoice_id,
        repositories::invoices::UpdateInvoice {
            issued_on: payload.issued_on,
            address: payload.address,
            student_count: payload.student_count,
            cost: payload.cost,
            subject: payload.subject,
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to update invoice"))?
    .ok_or_else(|| ApiError::NotFound("Invoice not found".to_string()))?;

    Ok(Json(InvoiceResponse::from_db(invoice)))
}

async fn delete_invoice(
    Path(invoice_id): Path<String>,
    CurrentAdmin(_admin): CurrentAdmin,
    State(state): State<AppState>,
) -> Result<StatusCode, ApiError> {
    let deleted = repositories::invoices::delete(state.db(), &invoice_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to delete invoice"))?;

    if !deleted {
        return Err(ApiError::NotFound("Invoice not found".to_string()));
    }
    Ok(StatusCode::NO_CONTENT)
}

/// Renders the invoice document for a school. Teachers always get their own
/// school; admins pick one or get a sample preview.
async fn download_docx(
    Query(params): Query<DocxQuery>,
    CurrentStaff(caller): CurrentStaff,
    State(state): State<AppState>,
) -> Result<Response, ApiError> {
    let school_id = match &caller.role {
        UserRole::Teacher { school_id, .. } => Some(school_id.clone()),
        _ => params.school_id.filter(|id| !id.trim().is_empty()),
    };

    let school = match school_id {
        Some(school_id) => {
            let school = repositories::schools::find_by_id(state.db(), &school_id)
                .await
                .map_err(|e| ApiError::internal(e, "Failed to fetch school"))?
                .ok_or_else(|| ApiError::NotFound("School not found".to_string()))?;
            let student_count = repositories::schools::count_students(state.db(), &school.id)
                .await
                .map_err(|e| ApiError::internal(e, "Failed to count students"))?;
            Some(InvoiceSchool { name: school.name, address: school.address, student_count })
        }
        None => None,
    };

    let setting = repositories::app_settings::find_by_key(state.db(), INVOICE_SETTING_KEY)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load invoice setting"))?
        .ok_or_else(|| ApiError::Internal("Setting not found".to_string()))?;

    let values =
        InvoiceValues::from_setting(&setting.value.0, school.as_ref(), OffsetDateTime::now_utc().date());
    let template =
        invoice_docx::load_template(state.settings().invoice().template_path.as_deref()).await?;
    let document = invoice_docx::render(&template, &values)?;

    let disposition = format!("attachment; filename=\"{}\"", values.file_name().replace('"', "'"));
    let disposition = HeaderValue::from_str(&disposition)
        .map_err(|e| ApiError::internal(e, "Failed to build invoice file name"))?;

    tracing::info!(
        user_id = %caller.user.id,
        school = %values.school_name,
        bytes = document.len(),
        "Invoice document rendered"
    );

    Ok((
        [
            (header::CONTENT_TYPE, HeaderValue::from_static(DOCX_CONTENT_TYPE)),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        document,
    )
        .into_response())
}

#[cfg(test)]
mod tests {
    use axum::body::to_bytes;
    use axum::http::{header, Method, StatusCode};
    use serde_json::json;
    use tower::ServiceExt;

    use crate::core::time::primitive_now_utc;
    use crate::repositories;
    use crate::services::invoice_docx::DOCX_CONTENT_TYPE;
    use crate::test_support;

    #[tokio::test]
    async fn teacher_downloads_invoice_for_own_school() {
        let Some(ctx) = test_support::setup_test_context().await else { return };
        let db = ctx.state.db();
        let school = test_support::insert_school(db, "Greenfield").await;
        let teacher = test_support::insert_teacher(db, "bursar", &school.id).await;
        test_support::insert_student(db, "payer", &school.id, 7).await;

        let setting = repositories::app_settings::get_or_create(
            db,
            "setting-invoice",
            "invoice",
            primitive_now_utc(),
        )
        .await
        .expect("invoice setting");
        repositories::app_settings::update_value(
            db,
            &setting.id,
            json!({ "fees": 25, "accountName": "Quiz Club" }),
            primitive_now_utc(),
        )
        .await
        .expect("update setting");

        let token = test_support::bearer_token(&teacher.id, ctx.state.settings());
        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::GET,
                "/api/v1/invoices/docx",
                Some(&token),
                None,
            ))
            .await
            .expect("download");

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], DOCX_CONTENT_TYPE);
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"Greenfield Invoice.docx\""
        );
        let body = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        assert!(body.starts_with(b"PK"));
    }

    #[tokio::test]
    async fn missing_invoice_setting_is_a_server_error() {
        let Some(ctx) = test_support::setup_test_context().await else { return };
        let admin = test_support::insert_admin(ctx.state.db(), "root").await;
        let token = test_support::bearer_token(&admin.id, ctx.state.settings());

        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::GET,
                "/api/v1/invoices/docx",
                Some(&token),
                None,
            ))
            .await
            .expect("download");

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = test_support::read_json(response).await;
        assert_eq!(body["detail"], "Setting not found");
    }
}
