//! Capability and SpiceDB model types.

use pmo_tracker_access::Role;
use pmo_tracker_core::UserId;
use std::fmt;

/// SpiceDB schema for the PMO tracker.
///
/// Roles are relations on the single `platform:main` object; each
/// capability is a permission computed from those relations.
pub const SCHEMA: &str = r#"
definition user {}

definition platform {
    relation project_manager: user
    relation sub_pmo: user
    relation main_pmo: user
    relation admin: user
    relation executive: user

    permission approve_requests = sub_pmo + main_pmo + admin
    permission complete_projects = project_manager + main_pmo + admin
    permission edit_projects = project_manager + main_pmo + admin
}
"#;

/// A named permission checked before a workflow transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    /// Approve or reject projects under review.
    ApproveRequests,
    /// Mark active projects as completed.
    CompleteProjects,
    /// Edit and resubmit projects, including ones the actor does not manage.
    EditProjects,
}

impl Capability {
    /// Returns the capability name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ApproveRequests => "ApproveRequests",
            Self::CompleteProjects => "CompleteProjects",
            Self::EditProjects => "EditProjects",
        }
    }

    /// Returns the SpiceDB permission name.
    #[must_use]
    pub fn spicedb_permission(&self) -> &'static str {
        match self {
            Self::ApproveRequests => "approve_requests",
            Self::CompleteProjects => "complete_projects",
            Self::EditProjects => "edit_projects",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Resource types in the SpiceDB model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceType {
    /// The platform itself; carries the role relations.
    Platform,
}

impl ResourceType {
    /// Returns the SpiceDB type name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Platform => "platform",
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A resource in the SpiceDB model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    /// The type of resource.
    pub resource_type: ResourceType,
    /// The resource ID.
    pub id: String,
}

impl Resource {
    /// Creates a new resource.
    #[must_use]
    pub fn new(resource_type: ResourceType, id: impl Into<String>) -> Self {
        Self {
            resource_type,
            id: id.into(),
        }
    }

    /// The platform resource that holds role relations.
    #[must_use]
    pub fn platform() -> Self {
        Self::new(ResourceType::Platform, "main")
    }
}

/// A subject (actor) in the SpiceDB model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subject {
    /// Subject type (always "user").
    pub subject_type: String,
    /// Subject ID.
    pub id: String,
}

impl Subject {
    /// Creates a user subject.
    #[must_use]
    pub fn user(id: UserId) -> Self {
        Self {
            subject_type: "user".to_string(),
            id: id.to_string(),
        }
    }
}

/// A relationship between a resource and a subject.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relationship {
    /// The resource.
    pub resource: Resource,
    /// The relation name.
    pub relation: String,
    /// The subject.
    pub subject: Subject,
}

impl Relationship {
    /// Creates a new relationship.
    #[must_use]
    pub fn new(resource: Resource, relation: impl Into<String>, subject: Subject) -> Self {
        Self {
            resource,
            relation: relation.into(),
            subject,
        }
    }

    /// Grants a role to a user on the platform.
    #[must_use]
    pub fn platform_role(role: Role, user_id: UserId) -> Self {
        let relation = match role {
            Role::ProjectManager => "project_manager",
            Role::SubPmo => "sub_pmo",
            Role::MainPmo => "main_pmo",
            Role::Admin => "admin",
            Role::Executive => "executive",
        };
        Self::new(Resource::platform(), relation, Subject::user(user_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capability_names() {
        assert_eq!(Capability::ApproveRequests.as_str(), "ApproveRequests");
        assert_eq!(Capability::ApproveRequests.spicedb_permission(), "approve_requests");
        assert_eq!(Capability::EditProjects.to_string(), "EditProjects");
    }

    #[test]
    fn every_capability_is_a_schema_permission() {
        for capability in [
            Capability::ApproveRequests,
            Capability::CompleteProjects,
            Capability::EditProjects,
        ] {
            let line = format!("permission {} =", capability.spicedb_permission());
            assert!(SCHEMA.contains(&line), "missing {line}");
        }
    }

    #[test]
    fn platform_role_relationship() {
        let user_id = UserId::new();
        let rel = Relationship::platform_role(Role::SubPmo, user_id);
        assert_eq!(rel.resource, Resource::platform());
        assert_eq!(rel.relation, "sub_pmo");
        assert_eq!(rel.subject.id, user_id.to_string());
        assert!(SCHEMA.contains("relation sub_pmo: user"));
    }
}
