//! Project approval workflow for the PMO tracker.
//!
//! This crate provides the approval state machine and the engine that runs it:
//!
//! - **Projects**: [`Project`], its [`ProjectStatus`] and derived [`StatusColor`]
//! - **Transitions**: the pure [`plan`] function over [`Transition`]s, under an
//!   [`ApprovalPolicy`]
//! - **Effects**: audit entries and notifications produced by a transition
//! - **Engine**: [`WorkflowEngine`] validates, authorizes, saves with
//!   optimistic concurrency, then applies the effects
//! - **Ports**: the storage, audit, and notification traits, with in-memory
//!   implementations in [`memory`]

pub mod effects;
pub mod engine;
pub mod error;
pub mod memory;
pub mod ports;
pub mod project;
pub mod transition;

pub use effects::{
    AuditAction, AuditEntry, AuditRecord, Effects, Notification, NotificationCommand,
    NotificationKind, NotificationPriority, PROJECT_ENTITY, Recipient,
};
pub use engine::{DispatchReport, TransitionReceipt, WorkflowEngine};
pub use error::{AuditError, ErrorKind, NotifyError, StoreError, WorkflowError};
pub use ports::{AuditRecorder, Notifier, ProjectStore};
pub use project::{
    ON_TRACK_THRESHOLD, ParseStatusError, Project, ProjectStatus, StatusColor, status_color,
};
pub use transition::{ApprovalPolicy, Planned, Transition, plan};
