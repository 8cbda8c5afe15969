//! Actors and roles for the PMO tracker.
//!
//! This crate provides:
//! - `User`: an actor who submits, reviews, or completes projects
//! - `Role`: the fixed set of organizational roles
//! - `UserDirectory`: lookup of users by id or by role
//!
//! The approval workflow never branches on `Role` directly. Roles are
//! mapped to capabilities by the authorization crate and are used here
//! only to resolve notification recipients.
//!
//! # Example
//!
//! ```
//! use pmo_tracker_access::{InMemoryDirectory, Role, User};
//!
//! let reviewer = User::new("sana", Role::SubPmo);
//! let directory = InMemoryDirectory::new();
//! directory.insert(reviewer.clone());
//!
//! assert_eq!(directory.snapshot_role(Role::SubPmo), vec![reviewer]);
//! ```

pub mod directory;
pub mod error;
pub mod role;
pub mod user;

pub use directory::{InMemoryDirectory, UserDirectory};
pub use error::DirectoryError;
pub use role::{ParseRoleError, Role};
pub use user::User;
