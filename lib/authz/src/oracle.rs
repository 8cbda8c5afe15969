//! The capability question and its role-based answer.

use crate::error::AuthzError;
use crate::types::Capability;
use async_trait::async_trait;
use pmo_tracker_access::{Role, UserDirectory};
use pmo_tracker_core::UserId;
use rootcause::prelude::Report;
use tracing::{debug, instrument};

/// Answers whether an actor holds a named capability.
///
/// Callers must treat both `Ok(false)` and `Err(_)` as a denial.
#[async_trait]
pub trait PermissionOracle: Send + Sync {
    /// Checks a single capability for an actor.
    async fn has_capability(
        &self,
        actor: UserId,
        capability: Capability,
    ) -> Result<bool, Report<AuthzError>>;
}

/// Returns the capabilities granted to a role.
#[must_use]
pub fn capabilities_for(role: Role) -> &'static [Capability] {
    match role {
        Role::ProjectManager => &[Capability::EditProjects, Capability::CompleteProjects],
        Role::SubPmo => &[Capability::ApproveRequests],
        Role::MainPmo | Role::Admin => &[
            Capability::ApproveRequests,
            Capability::CompleteProjects,
            Capability::EditProjects,
        ],
        Role::Executive => &[],
    }
}

/// Oracle that grants capabilities by the actor's directory role.
///
/// Unknown actors hold no capabilities.
pub struct RoleCapabilityOracle<D> {
    directory: D,
}

impl<D: UserDirectory> RoleCapabilityOracle<D> {
    /// Creates an oracle over the given directory.
    pub fn new(directory: D) -> Self {
        Self { directory }
    }
}

#[async_trait]
impl<D: UserDirectory> PermissionOracle for RoleCapabilityOracle<D> {
    #[instrument(skip(self), fields(actor = %actor, capability = %capability))]
    async fn has_capability(
        &self,
        actor: UserId,
        capability: Capability,
    ) -> Result<bool, Report<AuthzError>> {
        let user = self
            .directory
            .find_user(actor)
            .await
            .map_err(|e| AuthzError::RequestFailed {
                details: e.to_string(),
            })?;

        let granted = user.is_some_and(|u| capabilities_for(u.role()).contains(&capability));
        debug!(granted, "role capability check");
        Ok(granted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pmo_tracker_access::{DirectoryError, InMemoryDirectory, User};

    struct BrokenDirectory;

    #[async_trait]
    impl UserDirectory for BrokenDirectory {
        async fn find_user(&self, _id: UserId) -> Result<Option<User>, DirectoryError> {
            Err(DirectoryError::LookupFailed {
                reason: "connection reset".to_string(),
            })
        }

        async fn users_with_role(&self, _role: Role) -> Result<Vec<User>, DirectoryError> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn executives_hold_nothing() {
        assert!(capabilities_for(Role::Executive).is_empty());
    }

    #[test]
    fn only_reviewers_and_admins_approve() {
        for role in Role::ALL {
            let approves = capabilities_for(role).contains(&Capability::ApproveRequests);
            assert_eq!(approves, role.is_reviewer() || role == Role::Admin, "{role}");
        }
    }

    #[tokio::test]
    async fn grants_by_role() {
        let directory = InMemoryDirectory::new();
        let reviewer = User::new("sana", Role::SubPmo);
        let manager = User::new("amara", Role::ProjectManager);
        directory.insert(reviewer.clone());
        directory.insert(manager.clone());
        let oracle = RoleCapabilityOracle::new(directory);

        assert!(
            oracle
                .has_capability(reviewer.id(), Capability::ApproveRequests)
                .await
                .unwrap()
        );
        assert!(
            !oracle
                .has_capability(reviewer.id(), Capability::CompleteProjects)
                .await
                .unwrap()
        );
        assert!(
            !oracle
                .has_capability(manager.id(), Capability::ApproveRequests)
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn unknown_actor_is_denied() {
        let oracle = RoleCapabilityOracle::new(InMemoryDirectory::new());
        let granted = oracle
            .has_capability(UserId::new(), Capability::EditProjects)
            .await
            .unwrap();
        assert!(!granted);
    }

    #[tokio::test]
    async fn directory_failure_is_an_error() {
        let oracle = RoleCapabilityOracle::new(BrokenDirectory);
        let result = oracle
            .has_capability(UserId::new(), Capability::ApproveRequests)
            .await;
        let err = result.expect_err("lookup failure must not grant");
        assert!(err.to_string().contains("connection reset"));
    }
}
