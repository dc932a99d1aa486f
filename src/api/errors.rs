use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::services::attempt_lifecycle::AttemptError;
use crate::services::invoice_docx::InvoiceError;
use crate::services::marking::MarkingError;
use crate::services::quiz_status::QuizRuleError;
use crate::services::slot_assembly::SlotAssemblyError;

#[derive(Debug, Serialize)]
struct ErrorResponse {
    status: u16,
    detail: String,
}

#[derive(Debug)]
pub(crate) enum ApiError {
    Unauthorized(&'static str),
    Forbidden(&'static str),
    BadRequest(String),
    NotFound(String),
    Conflict(String),
    TooManyRequests(&'static str),
    #[allow(dead_code)]
    ServiceUnavailable(String),
    Internal(String),
}

impl ApiError {
    /// Log the underlying error with context and return an `Internal` variant.
    pub(crate) fn internal(err: impl std::fmt::Display, context: &str) -> Self {
        tracing::error!(error = %err, "{context}");
        Self::Internal(context.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Unauthorized(message) => {
                let status = StatusCode::UNAUTHORIZED;
                let mut response = (
                    status,
                    Json(ErrorResponse { status: status.as_u16(), detail: message.to_string() }),
                )
                    .into_response();
                response
                    .headers_mut()
                    .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
                response
            }
            ApiError::Forbidden(message) => {
                let status = StatusCode::FORBIDDEN;
                (
                    status,
                    Json(ErrorResponse { status: status.as_u16(), detail: message.to_string() }),
                )
                    .into_response()
            }
            ApiError::BadRequest(message) => {
                let status = StatusCode::BAD_REQUEST;
                (status, Json(ErrorResponse { status: status.as_u16(), detail: message }))
                    .into_response()
            }
            ApiError::NotFound(message) => {
                let status = StatusCode::NOT_FOUND;
                (status, Json(ErrorResponse { status: status.as_u16(), detail: message }))
                    .into_response()
            }
            ApiError::Conflict(message) => {
                let status = StatusCode::CONFLICT;
                (status, Json(ErrorResponse { status: status.as_u16(), detail: message }))
                    .into_response()
            }
            ApiError::TooManyRequests(message) => {
                let status = StatusCode::TOO_MANY_REQUESTS;
                (
                    status,
                    Json(ErrorResponse { status: status.as_u16(), detail: message.to_string() }),
                )
                    .into_response()
            }
            ApiError::ServiceUnavailable(message) => {
                tracing::error!(error = %message, "Service unavailable");
                let status = StatusCode::SERVICE_UNAVAILABLE;
                (status, Json(ErrorResponse { status: status.as_u16(), detail: message }))
                    .into_response()
            }
            ApiError::Internal(message) => {
                tracing::error!(error = %message, "Internal server error");
                let status = StatusCode::INTERNAL_SERVER_ERROR;
                (status, Json(ErrorResponse { status: status.as_u16(), detail: message }))
                    .into_response()
            }
        }
    }
}

impl From<AttemptError> for ApiError {
    fn from(err: AttemptError) -> Self {
        match err {
            AttemptError::AttemptNotFound
            | AttemptError::QuizNotFound
            | AttemptError::StudentNotFound => ApiError::NotFound(err.to_string()),
            AttemptError::StudentInactive => ApiError::Forbidden("Student account is inactive"),
            AttemptError::AlreadySubmitted => {
                ApiError::Forbidden("Quiz attempt has already been submitted")
            }
            AttemptError::AlreadyCompleted => {
                ApiError::Forbidden("Quiz attempt has already been completed")
            }
            AttemptError::Unavailable(availability) => ApiError::Forbidden(availability.message()),
            AttemptError::Database(e) => ApiError::internal(e, "Failed to update quiz attempt"),
        }
    }
}

impl From<SlotAssemblyError> for ApiError {
    fn from(err: SlotAssemblyError) -> Self {
        match err {
            SlotAssemblyError::QuizNotFound => ApiError::NotFound(err.to_string()),
            SlotAssemblyError::Database(e) => ApiError::internal(e, "Failed to replace quiz slots"),
            SlotAssemblyError::Empty
            | SlotAssemblyError::DuplicateSlotIndex(_)
            | SlotAssemblyError::NegativeBlock(_)
            | SlotAssemblyError::UnknownQuestion(_) => ApiError::BadRequest(err.to_string()),
        }
    }
}

impl From<MarkingError> for ApiError {
    fn from(err: MarkingError) -> Self {
        match err {
            MarkingError::QuizNotFound => ApiError::NotFound(err.to_string()),
            MarkingError::Database(e) => ApiError::internal(e, "Failed to mark quiz"),
        }
    }
}

impl From<QuizRuleError> for ApiError {
    fn from(err: QuizRuleError) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

impl From<InvoiceError> for ApiError {
    fn from(err: InvoiceError) -> Self {
        ApiError::internal(err, "Failed to render invoice")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::quiz_timing::Availability;

    #[test]
    fn unavailable_attempts_are_forbidden() {
        let err: ApiError = AttemptError::Unavailable(Availability::Finished).into();
        assert!(matches!(err, ApiError::Forbidden("Quiz has finished")));
    }

    #[test]
    fn slot_collisions_are_bad_requests() {
        let err: ApiError = SlotAssemblyError::DuplicateSlotIndex(1).into();
        match err {
            ApiError::BadRequest(detail) => assert!(detail.contains("slot_index 1")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn missing_quiz_is_not_found() {
        let err: ApiError = MarkingError::QuizNotFound.into();
        assert!(matches!(err, ApiError::NotFound(_)));
    }
}
