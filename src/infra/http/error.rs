use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::application::error::{AppError, ErrorReport};
use crate::application::repos::RepoError;
use crate::domain::error::DomainError;
use crate::infra::error::InfraError;
use crate::infra::uploads::UploadStorageError;

const SOURCE: &str = "infra::http";

#[derive(Debug, Serialize)]
pub struct ApiErrorBody {
    pub error: ApiErrorMessage,
}

pub mod codes {
    pub const BAD_REQUEST: &str = "bad_request";
    pub const UNAUTHORIZED: &str = "unauthorized";
    pub const FORBIDDEN: &str = "forbidden";
    pub const NOT_FOUND: &str = "not_found";
    pub const CONFLICT: &str = "conflict";
    pub const DUPLICATE: &str = "duplicate";
    pub const INVALID_INPUT: &str = "invalid_input";
    pub const INTEGRITY: &str = "integrity_error";
    pub const DB_TIMEOUT: &str = "db_timeout";
    pub const UNAVAILABLE: &str = "unavailable";
    pub const UPLOAD: &str = "upload_error";
    pub const INTERNAL: &str = "internal_error";
}

#[derive(Debug, Serialize)]
pub struct ApiErrorMessage {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: String,
    hint: Option<String>,
    report: Option<ErrorReport>,
}

impl ApiError {
    pub fn new(
        status: StatusCode,
        code: &'static str,
        message: impl Into<String>,
        hint: Option<String>,
    ) -> Self {
        Self {
            status,
            code,
            message: message.into(),
            hint,
            report: None,
        }
    }

    pub fn bad_request(message: impl Into<String>, hint: Option<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, codes::BAD_REQUEST, message, hint)
    }

    pub fn unauthorized() -> Self {
        Self::new(
            StatusCode::UNAUTHORIZED,
            codes::UNAUTHORIZED,
            "Authentication required",
            None,
        )
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, codes::NOT_FOUND, message, None)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn code(&self) -> &'static str {
        self.code
    }
}

fn code_for(error: &AppError) -> &'static str {
    match error {
        AppError::Domain(DomainError::NotFound { .. }) | AppError::Repo(RepoError::NotFound) => {
            codes::NOT_FOUND
        }
        AppError::Domain(DomainError::Validation { .. }) | AppError::Validation(_) => {
            codes::BAD_REQUEST
        }
        AppError::Domain(DomainError::Conflict { .. }) => codes::CONFLICT,
        AppError::Repo(RepoError::Duplicate { .. }) => codes::DUPLICATE,
        AppError::Repo(RepoError::InvalidInput { .. }) => codes::INVALID_INPUT,
        AppError::Repo(RepoError::Integrity { .. }) => codes::INTEGRITY,
        AppError::Repo(RepoError::Timeout) => codes::DB_TIMEOUT,
        AppError::Infra(InfraError::Database { .. }) | AppError::Infra(InfraError::Cache { .. }) => {
            codes::UNAVAILABLE
        }
        AppError::Unauthorized => codes::UNAUTHORIZED,
        AppError::Forbidden(_) => codes::FORBIDDEN,
        AppError::Repo(RepoError::Persistence(_))
        | AppError::Infra(_)
        | AppError::Unexpected(_) => codes::INTERNAL,
    }
}

impl From<AppError> for ApiError {
    fn from(error: AppError) -> Self {
        let status = error.status_code();
        let hint = match &error {
            AppError::Repo(RepoError::Duplicate { constraint }) => Some(constraint.clone()),
            AppError::Repo(RepoError::InvalidInput { message }) => Some(message.clone()),
            _ => None,
        };
        Self {
            status,
            code: code_for(&error),
            message: error.presentation_message(),
            hint,
            report: Some(ErrorReport::from_error(SOURCE, status, &error)),
        }
    }
}

impl From<UploadStorageError> for ApiError {
    fn from(error: UploadStorageError) -> Self {
        let status = match &error {
            UploadStorageError::UnsupportedType(_)
            | UploadStorageError::EmptyPayload
            | UploadStorageError::Stream(_) => StatusCode::BAD_REQUEST,
            UploadStorageError::TooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            UploadStorageError::InvalidPath => StatusCode::NOT_FOUND,
            UploadStorageError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let message = if status.is_server_error() {
            "Upload could not be stored".to_string()
        } else {
            error.to_string()
        };
        Self {
            status,
            code: codes::UPLOAD,
            message,
            hint: None,
            report: Some(ErrorReport::from_error(SOURCE, status, &error)),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let report = self.report.unwrap_or_else(|| {
            ErrorReport::from_message(
                SOURCE,
                self.status,
                format!(
                    "{}: {}",
                    self.code,
                    self.hint.as_deref().unwrap_or(&self.message)
                ),
            )
        });
        let body = ApiErrorBody {
            error: ApiErrorMessage {
                code: self.code.to_string(),
                message: self.message,
                hint: self.hint,
            },
        };
        let mut response = (self.status, Json(body)).into_response();
        report.attach(&mut response);
        response
    }
}
