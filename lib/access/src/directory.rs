//! User lookup contract.
//!
//! Recipient resolution ("everyone holding the Sub PMO role") and the
//! role-based capability oracle both go through a `UserDirectory`.

use crate::error::DirectoryError;
use crate::role::Role;
use crate::user::User;
use async_trait::async_trait;
use pmo_tracker_core::UserId;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

/// Read access to the organization's users.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Finds a user by ID.
    async fn find_user(&self, id: UserId) -> Result<Option<User>, DirectoryError>;

    /// Lists every user holding the given role.
    async fn users_with_role(&self, role: Role) -> Result<Vec<User>, DirectoryError>;
}

/// Directory kept in process memory.
///
/// Cloning shares the underlying map.
#[derive(Debug, Clone, Default)]
pub struct InMemoryDirectory {
    users: Arc<RwLock<HashMap<UserId, User>>>,
}

impl InMemoryDirectory {
    /// Creates an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a user.
    pub fn insert(&self, user: User) {
        self.users
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(user.id(), user);
    }

    /// Returns the users holding a role, ordered by username.
    #[must_use]
    pub fn snapshot_role(&self, role: Role) -> Vec<User> {
        let mut users: Vec<User> = self
            .users
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .filter(|u| u.role() == role)
            .cloned()
            .collect();
        users.sort_by(|a, b| a.username().cmp(b.username()));
        users
    }
}

#[async_trait]
impl UserDirectory for InMemoryDirectory {
    async fn find_user(&self, id: UserId) -> Result<Option<User>, DirectoryError> {
        Ok(self
            .users
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
            .cloned())
    }

    async fn users_with_role(&self, role: Role) -> Result<Vec<User>, DirectoryError> {
        Ok(self.snapshot_role(role))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn find_user_returns_inserted_user() {
        let directory = InMemoryDirectory::new();
        let user = User::new("amara", Role::ProjectManager);
        directory.insert(user.clone());

        let found = directory.find_user(user.id()).await.unwrap();
        assert_eq!(found, Some(user));
        assert!(directory.find_user(UserId::new()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn users_with_role_filters_and_sorts() {
        let directory = InMemoryDirectory::new();
        directory.insert(User::new("zeno", Role::SubPmo));
        directory.insert(User::new("ada", Role::SubPmo));
        directory.insert(User::new("max", Role::MainPmo));

        let reviewers = directory.users_with_role(Role::SubPmo).await.unwrap();
        let names: Vec<&str> = reviewers.iter().map(User::username).collect();
        assert_eq!(names, vec!["ada", "zeno"]);
    }

    #[tokio::test]
    async fn clones_share_state() {
        let directory = InMemoryDirectory::new();
        let handle = directory.clone();
        handle.insert(User::new("ola", Role::Admin));

        assert_eq!(directory.users_with_role(Role::Admin).await.unwrap().len(), 1);
    }
}
