//! Error types for the workflow crate.
//!
//! - `WorkflowError`: the outcome of a rejected transition, returned to callers
//! - `StoreError`, `AuditError`, `NotifyError`: collaborator failures
//!
//! Store and user directory failures fail a transition. Audit and
//! notification errors are logged and reported on the receipt.

use crate::project::ProjectStatus;
use pmo_tracker_access::DirectoryError;
use pmo_tracker_core::{ProjectId, UserId};
use std::fmt;

/// The category of a transition failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    Unauthorized,
    InvalidStateTransition,
    Validation,
    Conflict,
    Storage,
}

impl ErrorKind {
    /// Returns the wire name of this kind.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::Unauthorized => "unauthorized",
            Self::InvalidStateTransition => "invalid_state_transition",
            Self::Validation => "validation",
            Self::Conflict => "conflict",
            Self::Storage => "storage",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a workflow operation did not commit.
///
/// Every variant is produced before the project is saved, except
/// `Conflict` and `Storage`, which can come from the save itself. In all
/// cases no audit entry is written and no notification is sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkflowError {
    /// The project does not exist.
    NotFound { project_id: ProjectId },
    /// The acting user does not exist.
    ActorNotFound { actor_id: UserId },
    /// The actor may not perform the operation.
    Unauthorized { actor_id: UserId, requirement: String },
    /// The project's status does not allow the operation.
    InvalidStateTransition {
        project_id: ProjectId,
        status: ProjectStatus,
        reason: String,
    },
    /// Required free text was missing.
    Validation { reason: String },
    /// Another transition committed first.
    Conflict { project_id: ProjectId },
    /// The project store or user directory failed.
    Storage { details: String },
}

impl WorkflowError {
    /// Returns the category of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } | Self::ActorNotFound { .. } => ErrorKind::NotFound,
            Self::Unauthorized { .. } => ErrorKind::Unauthorized,
            Self::InvalidStateTransition { .. } => ErrorKind::InvalidStateTransition,
            Self::Validation { .. } => ErrorKind::Validation,
            Self::Conflict { .. } => ErrorKind::Conflict,
            Self::Storage { .. } => ErrorKind::Storage,
        }
    }

    /// Returns a message safe to show to the caller.
    ///
    /// Storage details and internal identifiers are left out.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::NotFound { .. } => "Project not found".to_string(),
            Self::ActorNotFound { .. } => "User not found".to_string(),
            Self::Unauthorized { requirement, .. } => {
                format!("Not authorized: {requirement}")
            }
            Self::InvalidStateTransition { reason, .. } => reason.clone(),
            Self::Validation { reason } => reason.clone(),
            Self::Conflict { .. } => {
                "The project was changed by someone else; reload and try again".to_string()
            }
            Self::Storage { .. } => "The request could not be completed".to_string(),
        }
    }
}

impl fmt::Display for WorkflowError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound { project_id } => write!(f, "project not found: {project_id}"),
            Self::ActorNotFound { actor_id } => write!(f, "user not found: {actor_id}"),
            Self::Unauthorized {
                actor_id,
                requirement,
            } => write!(f, "actor {actor_id} unauthorized: {requirement}"),
            Self::InvalidStateTransition {
                project_id,
                status,
                reason,
            } => write!(
                f,
                "invalid transition for project {project_id} in status {status}: {reason}"
            ),
            Self::Validation { reason } => write!(f, "validation failed: {reason}"),
            Self::Conflict { project_id } => {
                write!(f, "project {project_id} was modified concurrently")
            }
            Self::Storage { details } => write!(f, "project storage failed: {details}"),
        }
    }
}

impl std::error::Error for WorkflowError {}

/// Errors from the project store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The project to save does not exist.
    NotFound { project_id: ProjectId },
    /// The stored version no longer matches the expected one.
    Conflict {
        project_id: ProjectId,
        expected_version: i64,
    },
    /// The backing store failed.
    Backend { details: String },
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound { project_id } => write!(f, "project not found: {project_id}"),
            Self::Conflict {
                project_id,
                expected_version,
            } => write!(
                f,
                "project {project_id} is no longer at version {expected_version}"
            ),
            Self::Backend { details } => write!(f, "project store failed: {details}"),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<StoreError> for WorkflowError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound { project_id } => Self::NotFound { project_id },
            StoreError::Conflict { project_id, .. } => Self::Conflict { project_id },
            StoreError::Backend { details } => Self::Storage { details },
        }
    }
}

impl From<DirectoryError> for WorkflowError {
    fn from(e: DirectoryError) -> Self {
        Self::Storage {
            details: e.to_string(),
        }
    }
}

/// Errors from the audit recorder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuditError {
    /// The entry could not be appended.
    WriteFailed { details: String },
    /// The trail could not be read.
    ReadFailed { details: String },
}

impl fmt::Display for AuditError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WriteFailed { details } => write!(f, "audit write failed: {details}"),
            Self::ReadFailed { details } => write!(f, "audit read failed: {details}"),
        }
    }
}

impl std::error::Error for AuditError {}

/// Errors from notification delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotifyError {
    /// The addressed user does not exist.
    UnknownRecipient { user_id: UserId },
    /// Delivery failed.
    DeliveryFailed { details: String },
}

impl fmt::Display for NotifyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownRecipient { user_id } => {
                write!(f, "unknown notification recipient: {user_id}")
            }
            Self::DeliveryFailed { details } => {
                write!(f, "notification delivery failed: {details}")
            }
        }
    }
}

impl std::error::Error for NotifyError {}
