use std::error::Error as StdError;

use axum::{http::StatusCode, response::Response};
use thiserror::Error;

use crate::{application::repos::RepoError, domain::error::DomainError, infra::error::InfraError};

/// Diagnostic chain attached to failed responses for the logging middleware.
#[derive(Debug, Clone)]
pub struct ErrorReport {
    pub source: &'static str,
    pub status: StatusCode,
    pub messages: Vec<String>,
}

impl ErrorReport {
    pub fn from_error(source: &'static str, status: StatusCode, error: &dyn StdError) -> Self {
        let mut messages = vec![error.to_string()];
        let mut current = error.source();
        while let Some(inner) = current {
            messages.push(inner.to_string());
            current = inner.source();
        }
        Self {
            source,
            status,
            messages,
        }
    }

    pub fn from_message(
        source: &'static str,
        status: StatusCode,
        message: impl Into<String>,
    ) -> Self {
        Self {
            source,
            status,
            messages: vec![message.into()],
        }
    }

    pub fn attach(self, response: &mut Response) {
        response.extensions_mut().insert(self);
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Repo(#[from] RepoError),
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error("authentication required")]
    Unauthorized,
    #[error("forbidden: {0}")]
    Forbidden(&'static str),
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected(message.into())
    }

    pub fn not_found(entity: &'static str) -> Self {
        Self::Domain(DomainError::not_found(entity))
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Domain(DomainError::conflict(message))
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Domain(DomainError::NotFound { .. }) | AppError::Repo(RepoError::NotFound) => {
                StatusCode::NOT_FOUND
            }
            AppError::Domain(DomainError::Validation { .. })
            | AppError::Validation(_)
            | AppError::Repo(RepoError::InvalidInput { .. }) => StatusCode::BAD_REQUEST,
            AppError::Domain(DomainError::Conflict { .. })
            | AppError::Repo(RepoError::Duplicate { .. })
            | AppError::Repo(RepoError::Integrity { .. }) => StatusCode::CONFLICT,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::Repo(RepoError::Timeout)
            | AppError::Infra(InfraError::Database { .. })
            | AppError::Infra(InfraError::Cache { .. }) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Repo(RepoError::Persistence(_))
            | AppError::Infra(InfraError::Io(_))
            | AppError::Infra(InfraError::Configuration { .. })
            | AppError::Infra(InfraError::Telemetry(_))
            | AppError::Unexpected(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to show to clients; internal detail stays in the report.
    pub fn presentation_message(&self) -> String {
        match self {
            AppError::Domain(DomainError::NotFound { entity }) => format!("{entity} not found"),
            AppError::Repo(RepoError::NotFound) => "Resource not found".to_string(),
            AppError::Domain(DomainError::Validation { message })
            | AppError::Domain(DomainError::Conflict { message })
            | AppError::Validation(message) => message.clone(),
            AppError::Repo(RepoError::InvalidInput { .. }) => "Invalid input".to_string(),
            AppError::Repo(RepoError::Duplicate { .. }) => "Duplicate record".to_string(),
            AppError::Repo(RepoError::Integrity { .. }) => {
                "Integrity constraint violated".to_string()
            }
            AppError::Unauthorized => "Authentication required".to_string(),
            AppError::Forbidden(reason) => (*reason).to_string(),
            AppError::Repo(RepoError::Timeout)
            | AppError::Infra(InfraError::Database { .. })
            | AppError::Infra(InfraError::Cache { .. }) => {
                "Service temporarily unavailable".to_string()
            }
            AppError::Infra(InfraError::Configuration { .. }) => "Service misconfigured".to_string(),
            AppError::Infra(InfraError::Telemetry(_)) => {
                "Logging subsystem could not start".to_string()
            }
            AppError::Infra(InfraError::Io(_)) => "I/O failure during request".to_string(),
            AppError::Repo(RepoError::Persistence(_)) | AppError::Unexpected(_) => {
                "Unexpected error occurred".to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn taxonomy_maps_to_http_statuses() {
        assert_eq!(
            AppError::not_found("post").status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::conflict("already viewed").status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::Repo(RepoError::Duplicate {
                constraint: "users_email_key".to_string()
            })
            .status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(AppError::Unauthorized.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            AppError::Forbidden("admin only").status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            AppError::validation("title must not be empty").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::Repo(RepoError::from_persistence("boom")).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn conflict_message_is_presented_verbatim() {
        assert_eq!(
            AppError::conflict("already viewed").presentation_message(),
            "already viewed"
        );
        assert_eq!(
            AppError::not_found("event").presentation_message(),
            "event not found"
        );
    }

    #[test]
    fn report_collects_error_chain() {
        let error = AppError::from(InfraError::from(std::io::Error::other("disk full")));
        let report = ErrorReport::from_error("test", StatusCode::INTERNAL_SERVER_ERROR, &error);
        assert_eq!(report.messages.first().map(String::as_str), Some("io error: disk full"));
    }
}
