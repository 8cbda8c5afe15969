//! Capability checks for the PMO tracker.
//!
//! The approval workflow asks one question: "does actor X hold capability
//! Y?". This crate defines that question (`PermissionOracle`) and two ways
//! of answering it:
//!
//! - `RoleCapabilityOracle` maps each user's role to a fixed capability set
//!   using the user directory.
//! - `AuthzClient` delegates to SpiceDB, where roles are relationships on
//!   the `platform` resource (see [`SCHEMA`]).

mod client;
mod error;
mod oracle;
mod types;

pub use client::AuthzClient;
pub use error::AuthzError;
pub use oracle::{PermissionOracle, RoleCapabilityOracle, capabilities_for};
pub use types::{Capability, Relationship, Resource, ResourceType, SCHEMA, Subject};
