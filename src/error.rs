use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use utoipa::ToSchema;

use crate::services::ServiceError;
use crate::storage::StorageError;

/// Error body returned by every endpoint.
#[derive(Serialize, ToSchema)]
pub struct ErrorBody {
    pub code: &'static str,
    pub error: String,
}

#[derive(Debug)]
pub enum AppError {
    DatabaseError(sea_orm::DbErr),
    NotFound(String),
    BadRequest(String),
    Conflict(String),
    PayloadTooLarge(String),
    InternalServerError(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, error_message) = match self {
            AppError::DatabaseError(e) => {
                tracing::error!(error = %e, "database error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "Internal server error".to_string(),
                )
            }
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg),
            AppError::PayloadTooLarge(msg) => {
                (StatusCode::PAYLOAD_TOO_LARGE, "PAYLOAD_TOO_LARGE", msg)
            }
            AppError::InternalServerError(msg) => {
                tracing::error!(error = %msg, "internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "Internal server error".to_string(),
                )
            }
        };

        let body = Json(ErrorBody {
            code,
            error: error_message,
        });

        (status, body).into_response()
    }
}

impl From<axum::extract::multipart::MultipartError> for AppError {
    fn from(err: axum::extract::multipart::MultipartError) -> Self {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            AppError::PayloadTooLarge(err.body_text())
        } else {
            AppError::BadRequest(err.body_text())
        }
    }
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::NotFound(_) => AppError::NotFound(err.to_string()),
            ServiceError::AlreadyComplete
            | ServiceError::AlreadyExists(_)
            | ServiceError::AlreadyAttached => AppError::Conflict(err.to_string()),
            ServiceError::NotComplete | ServiceError::Validation(_) => {
                AppError::BadRequest(err.to_string())
            }
            ServiceError::Storage(e) => e.into(),
            ServiceError::Database(e) => AppError::DatabaseError(e),
        }
    }
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(_) => AppError::NotFound("file content not found".to_string()),
            StorageError::InvalidKey { .. } => AppError::BadRequest(err.to_string()),
            other => AppError::InternalServerError(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_of(err: ServiceError) -> StatusCode {
        AppError::from(err).into_response().status()
    }

    #[test]
    fn service_errors_map_to_status_codes() {
        assert_eq!(status_of(ServiceError::NotFound("file")), StatusCode::NOT_FOUND);
        assert_eq!(status_of(ServiceError::AlreadyComplete), StatusCode::CONFLICT);
        assert_eq!(status_of(ServiceError::AlreadyAttached), StatusCode::CONFLICT);
        assert_eq!(
            status_of(ServiceError::AlreadyExists("dup".into())),
            StatusCode::CONFLICT
        );
        assert_eq!(status_of(ServiceError::NotComplete), StatusCode::BAD_REQUEST);
        assert_eq!(
            status_of(ServiceError::Validation("bad".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(ServiceError::Storage(StorageError::NotFound("files/x".into()))),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(ServiceError::Storage(StorageError::InvalidKey {
                key: "../x".into(),
                reason: "parent directory segments are not allowed",
            })),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(ServiceError::Database(sea_orm::DbErr::Custom("boom".into()))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
