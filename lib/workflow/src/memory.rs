//! In-process collaborators for tests and local runs.

use crate::effects::{AuditEntry, AuditRecord, Notification};
use crate::error::{AuditError, NotifyError, StoreError};
use crate::ports::{AuditRecorder, Notifier, ProjectStore};
use crate::project::Project;
use async_trait::async_trait;
use pmo_tracker_access::{Role, UserDirectory};
use pmo_tracker_core::{AuditEntryId, ProjectId, UserId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

/// Project store kept in a map.
///
/// Cloning shares the underlying map.
#[derive(Debug, Clone, Default)]
pub struct InMemoryProjectStore {
    projects: Arc<Mutex<HashMap<ProjectId, Project>>>,
}

impl InMemoryProjectStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a project, replacing any stored under the same ID.
    pub fn insert(&self, project: Project) {
        self.projects
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(project.id, project);
    }

    /// Returns the stored copy of a project.
    #[must_use]
    pub fn get(&self, id: ProjectId) -> Option<Project> {
        self.projects
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
            .cloned()
    }
}

#[async_trait]
impl ProjectStore for InMemoryProjectStore {
    async fn find_project(&self, id: ProjectId) -> Result<Option<Project>, StoreError> {
        Ok(self.get(id))
    }

    async fn save_project(
        &self,
        project: &Project,
        expected_version: i64,
    ) -> Result<Project, StoreError> {
        let mut projects = self.projects.lock().unwrap_or_else(PoisonError::into_inner);
        let stored = projects
            .get_mut(&project.id)
            .ok_or(StoreError::NotFound {
                project_id: project.id,
            })?;

        if stored.version != expected_version {
            return Err(StoreError::Conflict {
                project_id: project.id,
                expected_version,
            });
        }

        let mut saved = project.clone();
        saved.version = expected_version + 1;
        *stored = saved.clone();
        Ok(saved)
    }
}

/// Audit log kept in a vector, oldest first.
#[derive(Debug, Clone, Default)]
pub struct InMemoryAuditLog {
    entries: Arc<Mutex<Vec<AuditEntry>>>,
}

impl InMemoryAuditLog {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns every entry.
    #[must_use]
    pub fn entries(&self) -> Vec<AuditEntry> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Returns the entries for one entity, oldest first.
    #[must_use]
    pub fn entries_for(&self, entity_type: &str, entity_id: &str) -> Vec<AuditEntry> {
        self.entries()
            .into_iter()
            .filter(|e| e.record.entity_type == entity_type && e.record.entity_id == entity_id)
            .collect()
    }
}

#[async_trait]
impl AuditRecorder for InMemoryAuditLog {
    async fn record(&self, record: &AuditRecord) -> Result<AuditEntryId, AuditError> {
        let id = AuditEntryId::new();
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(AuditEntry {
                id,
                record: record.clone(),
            });
        Ok(id)
    }
}

/// A notification as delivered to one user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub user_id: UserId,
    /// The user's email, or username when no email is on file.
    pub address: String,
    pub notification: Notification,
}

/// Notifier that resolves recipients through a directory and keeps the
/// deliveries in memory.
#[derive(Debug, Clone)]
pub struct InMemoryNotifier<D> {
    directory: D,
    deliveries: Arc<Mutex<Vec<Delivery>>>,
}

impl<D: UserDirectory> InMemoryNotifier<D> {
    /// Creates a notifier over the given directory.
    pub fn new(directory: D) -> Self {
        Self {
            directory,
            deliveries: Arc::default(),
        }
    }

    /// Returns every delivery so far.
    #[must_use]
    pub fn deliveries(&self) -> Vec<Delivery> {
        self.deliveries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Returns the deliveries made to one user.
    #[must_use]
    pub fn deliveries_to(&self, user_id: UserId) -> Vec<Delivery> {
        self.deliveries()
            .into_iter()
            .filter(|d| d.user_id == user_id)
            .collect()
    }

    fn push(&self, delivery: Delivery) {
        self.deliveries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(delivery);
    }
}

#[async_trait]
impl<D: UserDirectory> Notifier for InMemoryNotifier<D> {
    async fn notify(
        &self,
        user_id: UserId,
        notification: &Notification,
    ) -> Result<usize, NotifyError> {
        let user = self
            .directory
            .find_user(user_id)
            .await
            .map_err(|e| NotifyError::DeliveryFailed {
                details: e.to_string(),
            })?
            .ok_or(NotifyError::UnknownRecipient { user_id })?;

        self.push(Delivery {
            user_id,
            address: user.address().to_string(),
            notification: notification.clone(),
        });
        Ok(1)
    }

    async fn notify_role(
        &self,
        role: Role,
        notification: &Notification,
    ) -> Result<usize, NotifyError> {
        let users = self
            .directory
            .users_with_role(role)
            .await
            .map_err(|e| NotifyError::DeliveryFailed {
                details: e.to_string(),
            })?;

        for user in &users {
            self.push(Delivery {
                user_id: user.id(),
                address: user.address().to_string(),
                notification: notification.clone(),
            });
        }
        Ok(users.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effects::{AuditAction, NotificationKind, PROJECT_ENTITY};
    use chrono::Utc;
    use pmo_tracker_access::{InMemoryDirectory, User};

    #[tokio::test]
    async fn save_bumps_version() {
        let store = InMemoryProjectStore::new();
        let project = Project::new("Intranet refresh", UserId::new());
        store.insert(project.clone());

        let saved = store.save_project(&project, 0).await.unwrap();
        assert_eq!(saved.version, 1);
        assert_eq!(store.get(project.id).unwrap().version, 1);
    }

    #[tokio::test]
    async fn stale_save_conflicts_and_keeps_stored_copy() {
        let store = InMemoryProjectStore::new();
        let project = Project::new("Intranet refresh", UserId::new());
        store.insert(project.clone());
        store.save_project(&project, 0).await.unwrap();

        let mut stale = project.clone();
        stale.name = "Renamed".to_string();
        let err = store.save_project(&stale, 0).await.unwrap_err();

        assert_eq!(
            err,
            StoreError::Conflict {
                project_id: project.id,
                expected_version: 0
            }
        );
        assert_eq!(store.get(project.id).unwrap().name, "Intranet refresh");
    }

    #[tokio::test]
    async fn saving_unknown_project_is_not_found() {
        let store = InMemoryProjectStore::new();
        let project = Project::new("Ghost", UserId::new());
        let err = store.save_project(&project, 0).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    #[tokio::test]
    async fn audit_log_filters_by_entity() {
        let log = InMemoryAuditLog::new();
        let record = |entity_id: &str| AuditRecord {
            entity_type: PROJECT_ENTITY.to_string(),
            entity_id: entity_id.to_string(),
            action: AuditAction::SubmitForApproval,
            summary: "Submitted".to_string(),
            actor_id: UserId::new(),
            recorded_at: Utc::now(),
        };

        log.record(&record("a")).await.unwrap();
        log.record(&record("b")).await.unwrap();
        log.record(&record("a")).await.unwrap();

        assert_eq!(log.entries().len(), 3);
        assert_eq!(log.entries_for(PROJECT_ENTITY, "a").len(), 2);
    }

    #[tokio::test]
    async fn notifier_fans_out_to_role_holders() {
        let directory = InMemoryDirectory::new();
        directory.insert(User::new("sub-one", Role::SubPmo));
        directory.insert(User::new("sub-two", Role::SubPmo));
        directory.insert(User::new("pm", Role::ProjectManager));
        let notifier = InMemoryNotifier::new(directory);

        let notification = Notification::new(NotificationKind::ApprovalRequested, "t", "m");
        let delivered = notifier.notify_role(Role::SubPmo, &notification).await.unwrap();

        assert_eq!(delivered, 2);
        assert_eq!(notifier.deliveries().len(), 2);
    }

    #[tokio::test]
    async fn notifier_rejects_unknown_user() {
        let notifier = InMemoryNotifier::new(InMemoryDirectory::new());
        let user_id = UserId::new();
        let notification = Notification::new(NotificationKind::ProjectApproved, "t", "m");

        let err = notifier.notify(user_id, &notification).await.unwrap_err();
        assert_eq!(err, NotifyError::UnknownRecipient { user_id });
    }

    #[tokio::test]
    async fn delivery_address_prefers_email() {
        let directory = InMemoryDirectory::new();
        let mut user = User::new("pm", Role::ProjectManager);
        user.set_email(Some("pm@example.com".to_string()));
        let user_id = user.id();
        directory.insert(user);
        let notifier = InMemoryNotifier::new(directory);

        let notification = Notification::new(NotificationKind::ProjectApproved, "t", "m");
        notifier.notify(user_id, &notification).await.unwrap();

        assert_eq!(notifier.deliveries_to(user_id)[0].address, "pm@example.com");
    }
}
