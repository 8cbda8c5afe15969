//! Collaborator traits the engine depends on.
//!
//! Production implementations live in the server crate (PostgreSQL);
//! in-process ones live in [`crate::memory`].

use crate::effects::{AuditRecord, Notification};
use crate::error::{AuditError, NotifyError, StoreError};
use crate::project::Project;
use async_trait::async_trait;
use pmo_tracker_access::Role;
use pmo_tracker_core::{AuditEntryId, ProjectId, UserId};

/// Durable project storage with optimistic concurrency.
#[async_trait]
pub trait ProjectStore: Send + Sync {
    /// Loads a project by ID.
    async fn find_project(&self, id: ProjectId) -> Result<Option<Project>, StoreError>;

    /// Saves a project if its stored version still equals `expected_version`.
    ///
    /// Returns the saved project with its new version. A stale version is a
    /// [`StoreError::Conflict`] and leaves the stored project untouched.
    async fn save_project(
        &self,
        project: &Project,
        expected_version: i64,
    ) -> Result<Project, StoreError>;
}

/// Append-only audit log.
#[async_trait]
pub trait AuditRecorder: Send + Sync {
    /// Appends one entry.
    async fn record(&self, record: &AuditRecord) -> Result<AuditEntryId, AuditError>;
}

/// Notification delivery.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Delivers a notification to one user. Returns the number delivered.
    async fn notify(
        &self,
        user_id: UserId,
        notification: &Notification,
    ) -> Result<usize, NotifyError>;

    /// Delivers a notification to every holder of a role.
    async fn notify_role(
        &self,
        role: Role,
        notification: &Notification,
    ) -> Result<usize, NotifyError>;
}
