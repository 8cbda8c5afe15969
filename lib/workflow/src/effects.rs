//! Side effects produced by a committed transition.
//!
//! A transition does not call the audit log or the notifier itself. It
//! returns an [`Effects`] value that the engine applies once the new
//! project state is saved.

use chrono::{DateTime, Utc};
use pmo_tracker_access::Role;
use pmo_tracker_core::{AuditEntryId, UserId};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Entity type recorded for project audit entries.
pub const PROJECT_ENTITY: &str = "Project";

/// The audited workflow actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AuditAction {
    SubmitForApproval,
    #[serde(rename = "SubPMOApproval")]
    SubPmoApproval,
    #[serde(rename = "SubPMORejection")]
    SubPmoRejection,
    #[serde(rename = "MainPMOApproval")]
    MainPmoApproval,
    #[serde(rename = "MainPMORejection")]
    MainPmoRejection,
    ProjectCompletion,
    ProjectResubmission,
}

impl AuditAction {
    const ALL: [AuditAction; 7] = [
        Self::SubmitForApproval,
        Self::SubPmoApproval,
        Self::SubPmoRejection,
        Self::MainPmoApproval,
        Self::MainPmoRejection,
        Self::ProjectCompletion,
        Self::ProjectResubmission,
    ];

    /// Returns the stored action name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SubmitForApproval => "SubmitForApproval",
            Self::SubPmoApproval => "SubPMOApproval",
            Self::SubPmoRejection => "SubPMORejection",
            Self::MainPmoApproval => "MainPMOApproval",
            Self::MainPmoRejection => "MainPMORejection",
            Self::ProjectCompletion => "ProjectCompletion",
            Self::ProjectResubmission => "ProjectResubmission",
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuditAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|action| action.as_str() == s)
            .ok_or_else(|| format!("unknown audit action '{s}'"))
    }
}

/// An audit entry waiting to be appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditRecord {
    /// Type of the audited entity.
    pub entity_type: String,
    /// Display form of the audited entity's ID.
    pub entity_id: String,
    /// What happened.
    pub action: AuditAction,
    /// Free-text description of the change.
    pub summary: String,
    /// Who did it.
    pub actor_id: UserId,
    /// When it happened.
    pub recorded_at: DateTime<Utc>,
}

/// An appended audit entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Entry ID assigned on append.
    pub id: AuditEntryId,
    #[serde(flatten)]
    pub record: AuditRecord,
}

/// What a notification is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// A reviewer is asked to act.
    ApprovalRequested,
    /// A project passed a review stage without yet being approved.
    ReviewAdvanced,
    ProjectApproved,
    ProjectRejected,
    ProjectCompleted,
}

impl NotificationKind {
    /// Returns the stored name of this kind.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ApprovalRequested => "approval_requested",
            Self::ReviewAdvanced => "review_advanced",
            Self::ProjectApproved => "project_approved",
            Self::ProjectRejected => "project_rejected",
            Self::ProjectCompleted => "project_completed",
        }
    }
}

/// Delivery priority of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationPriority {
    Normal,
    High,
}

impl NotificationPriority {
    /// Returns the stored name of this priority.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::High => "high",
        }
    }
}

/// Message content of a notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub title: String,
    pub message: String,
    pub kind: NotificationKind,
    pub priority: NotificationPriority,
}

impl Notification {
    /// Creates a normal-priority notification.
    #[must_use]
    pub fn new(
        kind: NotificationKind,
        title: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            kind,
            priority: NotificationPriority::Normal,
        }
    }

    /// Raises the notification to high priority.
    #[must_use]
    pub fn urgent(mut self) -> Self {
        self.priority = NotificationPriority::High;
        self
    }
}

/// Who receives a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum Recipient {
    /// A single user, such as the project manager.
    User(UserId),
    /// Everyone holding a role; resolved by the notifier.
    Role(Role),
}

/// A notification addressed to a recipient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationCommand {
    pub recipient: Recipient,
    pub notification: Notification,
}

/// Everything a committed transition asks the outside world to do.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Effects {
    /// Exactly one audit entry per transition.
    pub audit: AuditRecord,
    /// Zero or more notifications.
    pub notifications: Vec<NotificationCommand>,
}

impl Effects {
    /// Returns the recipients in dispatch order.
    #[must_use]
    pub fn recipients(&self) -> Vec<Recipient> {
        self.notifications.iter().map(|c| c.recipient).collect()
    }
}
