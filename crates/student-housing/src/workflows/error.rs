use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use super::accounts::PasswordHashError;

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    /// A compare-and-set transition found the record in a different state.
    #[error("record is no longer {expected}")]
    StaleState { expected: &'static str },
    /// Every room of the accommodation is held by a current lease.
    #[error("no rooms available")]
    NoVacancy,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Error raised by every portal workflow and rendered as a JSON body.
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error("you must be logged in to access this resource")]
    Unauthorized,
    #[error("your session has expired, please log in again")]
    SessionExpired,
    #[error("invalid username or password")]
    InvalidCredentials,
    #[error("{0}")]
    Forbidden(String),
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),
    #[error("{0}")]
    Conflict(String),
    /// Request could not be parsed into the expected shape.
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    UnsupportedMediaType(String),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Credentials(#[from] PasswordHashError),
}

impl WorkflowError {
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    /// Turns a list of collected field errors into a result.
    pub fn check(errors: Vec<String>) -> Result<(), Self> {
        if errors.is_empty() {
            Ok(())
        } else {
            Err(Self::Validation(errors))
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            WorkflowError::Unauthorized
            | WorkflowError::SessionExpired
            | WorkflowError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            WorkflowError::Forbidden(_) => StatusCode::FORBIDDEN,
            WorkflowError::NotFound(_) | WorkflowError::Repository(RepositoryError::NotFound) => {
                StatusCode::NOT_FOUND
            }
            WorkflowError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            WorkflowError::BadRequest(_) => StatusCode::BAD_REQUEST,
            WorkflowError::UnsupportedMediaType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            WorkflowError::Conflict(_)
            | WorkflowError::Repository(RepositoryError::Conflict)
            | WorkflowError::Repository(RepositoryError::StaleState { .. })
            | WorkflowError::Repository(RepositoryError::NoVacancy) => StatusCode::CONFLICT,
            WorkflowError::Repository(RepositoryError::Unavailable(_))
            | WorkflowError::Credentials(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for WorkflowError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "workflow failed");
        }

        let body = match &self {
            WorkflowError::Validation(details) => json!({
                "error": "validation failed",
                "details": details,
            }),
            other => json!({ "error": other.to_string() }),
        };

        (status, Json(body)).into_response()
    }
}
