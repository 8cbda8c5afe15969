//! HTTP error responses.
//!
//! Workflow errors map onto status codes with a `{ "error", "message" }`
//! body. Messages are the user-safe text; storage details are logged only.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use pmo_tracker_core::ParseIdError;
use pmo_tracker_workflow::{AuditError, ErrorKind, WorkflowError};
use serde::Serialize;
use std::fmt;

/// Errors returned by API handlers.
#[derive(Debug)]
pub enum ApiError {
    /// A workflow operation failed.
    Workflow(WorkflowError),
    /// A path or body identifier could not be parsed.
    InvalidId(ParseIdError),
    /// Audit history could not be read.
    AuditHistory(AuditError),
}

/// JSON error body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
    pub message: String,
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Workflow(e) => write!(f, "{e}"),
            Self::InvalidId(e) => write!(f, "{e}"),
            Self::AuditHistory(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for ApiError {}

impl From<WorkflowError> for ApiError {
    fn from(e: WorkflowError) -> Self {
        Self::Workflow(e)
    }
}

impl From<ParseIdError> for ApiError {
    fn from(e: ParseIdError) -> Self {
        Self::InvalidId(e)
    }
}

impl From<AuditError> for ApiError {
    fn from(e: AuditError) -> Self {
        Self::AuditHistory(e)
    }
}

/// Status code for a workflow error kind.
#[must_use]
pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Unauthorized => StatusCode::FORBIDDEN,
        ErrorKind::InvalidStateTransition | ErrorKind::Conflict => StatusCode::CONFLICT,
        ErrorKind::Validation => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorKind::Storage => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            Self::Workflow(e) => {
                let kind = e.kind();
                match kind {
                    ErrorKind::Storage => tracing::error!(error = %e, "workflow storage failure"),
                    ErrorKind::Unauthorized => {
                        tracing::warn!(error = %e, "workflow request denied");
                    }
                    _ => tracing::debug!(error = %e, "workflow request refused"),
                }
                (
                    status_for(kind),
                    ErrorBody {
                        error: kind.as_str(),
                        message: e.user_message(),
                    },
                )
            }
            Self::InvalidId(e) => (
                StatusCode::BAD_REQUEST,
                ErrorBody {
                    error: "invalid_id",
                    message: e.to_string(),
                },
            ),
            Self::AuditHistory(e) => {
                tracing::error!(error = %e, "audit history read failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorBody {
                        error: ErrorKind::Storage.as_str(),
                        message: "Audit history could not be loaded".to_string(),
                    },
                )
            }
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pmo_tracker_core::ProjectId;

    #[test]
    fn kinds_map_to_statuses() {
        assert_eq!(status_for(ErrorKind::NotFound), StatusCode::NOT_FOUND);
        assert_eq!(status_for(ErrorKind::Unauthorized), StatusCode::FORBIDDEN);
        assert_eq!(status_for(ErrorKind::InvalidStateTransition), StatusCode::CONFLICT);
        assert_eq!(status_for(ErrorKind::Validation), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(status_for(ErrorKind::Conflict), StatusCode::CONFLICT);
        assert_eq!(status_for(ErrorKind::Storage), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn storage_errors_hide_details() {
        let response = ApiError::from(WorkflowError::Storage {
            details: "pool timed out".to_string(),
        })
        .into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn not_found_is_404() {
        let response = ApiError::from(WorkflowError::NotFound {
            project_id: ProjectId::new(),
        })
        .into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
