//! PostgreSQL repositories for the PMO tracker.
//!
//! This module provides data access for:
//! - Projects, with version-checked saves
//! - The append-only audit trail
//! - In-app notifications
//! - The user directory

pub mod audit;
pub mod notification;
pub mod project;
pub mod user;

pub use audit::AuditRepository;
pub use notification::NotificationRepository;
pub use project::ProjectRepository;
pub use user::UserRepository;

use std::fmt::Display;

/// Wraps a column that failed to parse into a decode error.
fn invalid_column(what: &str, value: &str, reason: impl Display) -> sqlx::Error {
    sqlx::Error::Decode(Box::new(std::io::Error::new(
        std::io::ErrorKind::InvalidData,
        format!("invalid {what} '{value}': {reason}"),
    )))
}
