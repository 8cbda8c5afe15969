//! Organizational roles of PMO tracker users.
//!
//! Every user holds exactly one role. Roles name who a person is in the
//! organization; what they may do is decided by capability checks.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A user's organizational role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    /// Owns and delivers projects.
    ProjectManager,
    /// First-line reviewer in a department's PMO.
    #[serde(rename = "SubPMO")]
    SubPmo,
    /// Head of the PMO and final approval authority.
    #[serde(rename = "MainPMO")]
    MainPmo,
    /// Platform administrator.
    Admin,
    /// Executive stakeholder, informed of approved projects.
    Executive,
}

impl Role {
    /// All roles, in a stable order.
    pub const ALL: [Role; 5] = [
        Self::ProjectManager,
        Self::SubPmo,
        Self::MainPmo,
        Self::Admin,
        Self::Executive,
    ];

    /// Returns the stored name of this role.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ProjectManager => "ProjectManager",
            Self::SubPmo => "SubPMO",
            Self::MainPmo => "MainPMO",
            Self::Admin => "Admin",
            Self::Executive => "Executive",
        }
    }

    /// Returns true if this role sits on one of the PMO review boards.
    #[must_use]
    pub fn is_reviewer(&self) -> bool {
        matches!(self, Self::SubPmo | Self::MainPmo)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a role name is not recognized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseRoleError {
    /// The name that failed to parse.
    pub name: String,
}

impl fmt::Display for ParseRoleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown role '{}'", self.name)
    }
}

impl std::error::Error for ParseRoleError {}

impl FromStr for Role {
    type Err = ParseRoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|role| role.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| ParseRoleError {
                name: s.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reviewers_are_pmo_roles() {
        assert!(Role::SubPmo.is_reviewer());
        assert!(Role::MainPmo.is_reviewer());
        assert!(!Role::ProjectManager.is_reviewer());
        assert!(!Role::Admin.is_reviewer());
        assert!(!Role::Executive.is_reviewer());
    }

    #[test]
    fn parse_matches_stored_names() {
        for role in Role::ALL {
            assert_eq!(role.as_str().parse::<Role>(), Ok(role));
        }
    }

    #[test]
    fn parse_ignores_case() {
        assert_eq!("subpmo".parse::<Role>(), Ok(Role::SubPmo));
        assert_eq!("MAINPMO".parse::<Role>(), Ok(Role::MainPmo));
    }

    #[test]
    fn parse_unknown_role() {
        let err = "Intern".parse::<Role>().unwrap_err();
        assert_eq!(err.name, "Intern");
        assert!(err.to_string().contains("unknown role"));
    }

    #[test]
    fn role_serialization_format() {
        let json = serde_json::to_string(&Role::SubPmo).expect("serialize");
        assert_eq!(json, "\"SubPMO\"");

        let json = serde_json::to_string(&Role::ProjectManager).expect("serialize");
        assert_eq!(json, "\"ProjectManager\"");

        let parsed: Role = serde_json::from_str("\"MainPMO\"").expect("deserialize");
        assert_eq!(parsed, Role::MainPmo);
    }
}
