//! Core domain types and utilities for the PMO tracker.
//!
//! This crate provides the strongly-typed identifiers and the shared
//! error alias used by every other crate in the workspace.

pub mod error;
pub mod id;

pub use error::Result;
pub use id::{AuditEntryId, NotificationId, ParseIdError, ProjectId, UserId};
