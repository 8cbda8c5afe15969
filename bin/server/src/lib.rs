//! PMO tracker server.
//!
//! JSON API over the approval workflow, with PostgreSQL-backed storage,
//! audit trail, notifications, and user directory.

pub mod config;
pub mod db;
pub mod error;
pub mod oracle;
pub mod routes;
pub mod state;

pub use routes::router;
pub use state::AppState;
