//! The approval state machine.
//!
//! [`plan`] is a pure function: given the current project, the acting user,
//! and a [`Transition`], it either rejects the transition or returns the next
//! project state together with the [`Effects`] to apply after the save.
//! Authorization is not decided here; the engine checks capabilities before
//! calling `plan`.
//!
//! ```text
//!            submit                 sub approve            main approve
//!   Draft ───────────▶ PendingSub ─────────────▶ PendingMain ─────────────▶ Active ──▶ Completed
//!                       │   ▲                      │                                complete
//!            sub reject │   │ resubmit  main reject│
//!                       ▼   │                      │
//!                      Rejected ◀──────────────────┘
//! ```
//!
//! Under [`ApprovalPolicy::SingleStage`] the `PendingMain` stage is skipped:
//! either authority approves or rejects straight from `PendingSub`.

use crate::effects::{
    AuditAction, AuditRecord, Effects, Notification, NotificationCommand, NotificationKind,
    PROJECT_ENTITY, Recipient,
};
use crate::error::WorkflowError;
use crate::project::{Project, ProjectStatus, StatusColor};
use chrono::{DateTime, Utc};
use pmo_tracker_access::Role;
use pmo_tracker_authz::Capability;
use pmo_tracker_core::UserId;
use serde::{Deserialize, Serialize};

/// How many review stages a submitted project goes through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalPolicy {
    /// Sub PMO review, then Main PMO approval.
    #[default]
    TwoStage,
    /// One review; Sub PMO or Main PMO approval activates the project.
    SingleStage,
}

impl ApprovalPolicy {
    /// Status a project enters when the Sub PMO approves it.
    #[must_use]
    pub fn after_sub_pmo_approval(&self) -> ProjectStatus {
        match self {
            Self::TwoStage => ProjectStatus::PendingMainPmoReview,
            Self::SingleStage => ProjectStatus::Active,
        }
    }

    /// Status a project must be in for the Main PMO to act on it.
    #[must_use]
    pub fn main_pmo_stage(&self) -> ProjectStatus {
        match self {
            Self::TwoStage => ProjectStatus::PendingMainPmoReview,
            Self::SingleStage => ProjectStatus::PendingSubPmoReview,
        }
    }
}

/// A requested workflow transition and its caller-supplied text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "operation", rename_all = "snake_case")]
pub enum Transition {
    SubmitForApproval,
    ApproveBySubPmo { comments: Option<String> },
    RejectBySubPmo { reason: String },
    ApproveByMainPmo { comments: Option<String> },
    RejectByMainPmo { reason: String },
    Complete { notes: Option<String> },
    Resubmit { changes: String },
}

impl Transition {
    /// Returns the operation name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::SubmitForApproval => "SubmitForApproval",
            Self::ApproveBySubPmo { .. } => "ApproveBySubPMO",
            Self::RejectBySubPmo { .. } => "RejectBySubPMO",
            Self::ApproveByMainPmo { .. } => "ApproveByMainPMO",
            Self::RejectByMainPmo { .. } => "RejectByMainPMO",
            Self::Complete { .. } => "CompleteProject",
            Self::Resubmit { .. } => "ResubmitProject",
        }
    }

    /// Returns the audit action recorded when this transition commits.
    #[must_use]
    pub fn audit_action(&self) -> AuditAction {
        match self {
            Self::SubmitForApproval => AuditAction::SubmitForApproval,
            Self::ApproveBySubPmo { .. } => AuditAction::SubPmoApproval,
            Self::RejectBySubPmo { .. } => AuditAction::SubPmoRejection,
            Self::ApproveByMainPmo { .. } => AuditAction::MainPmoApproval,
            Self::RejectByMainPmo { .. } => AuditAction::MainPmoRejection,
            Self::Complete { .. } => AuditAction::ProjectCompletion,
            Self::Resubmit { .. } => AuditAction::ProjectResubmission,
        }
    }

    /// Returns the capability the actor must hold.
    ///
    /// Submission has none: only the project's own manager may submit.
    /// Resubmission is also open to the manager without the capability.
    #[must_use]
    pub fn required_capability(&self) -> Option<Capability> {
        match self {
            Self::SubmitForApproval => None,
            Self::ApproveBySubPmo { .. }
            | Self::RejectBySubPmo { .. }
            | Self::ApproveByMainPmo { .. }
            | Self::RejectByMainPmo { .. } => Some(Capability::ApproveRequests),
            Self::Complete { .. } => Some(Capability::CompleteProjects),
            Self::Resubmit { .. } => Some(Capability::EditProjects),
        }
    }

    /// Checks the caller-supplied text.
    ///
    /// # Errors
    ///
    /// Returns `Validation` when a rejection reason or a resubmission
    /// change description is empty or whitespace.
    pub fn validate(&self) -> Result<(), WorkflowError> {
        let (text, what) = match self {
            Self::RejectBySubPmo { reason } | Self::RejectByMainPmo { reason } => {
                (reason, "A rejection reason is required")
            }
            Self::Resubmit { changes } => (changes, "A description of the changes is required"),
            _ => return Ok(()),
        };
        if text.trim().is_empty() {
            return Err(WorkflowError::Validation {
                reason: what.to_string(),
            });
        }
        Ok(())
    }
}

/// The outcome of a successful [`plan`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Planned {
    /// The project as it should be saved.
    pub project: Project,
    /// What to do once it is saved.
    pub effects: Effects,
}

/// Computes the next state of a project.
///
/// The input project is never modified. The returned project keeps the
/// input's `version`; the store bumps it on save.
///
/// # Errors
///
/// Returns `Validation` for missing text and `InvalidStateTransition` when
/// the project's status does not allow the transition.
pub fn plan(
    project: &Project,
    actor_id: UserId,
    transition: &Transition,
    policy: ApprovalPolicy,
    now: DateTime<Utc>,
) -> Result<Planned, WorkflowError> {
    transition.validate()?;

    let today = now.date_naive();
    let name = project.name.as_str();
    let manager = Recipient::User(project.project_manager_id);
    let mut next = project.clone();
    next.updated_at = now;

    let (summary, notifications) = match transition {
        Transition::SubmitForApproval => {
            require(
                project,
                ProjectStatus::Draft,
                "Only draft projects can be submitted for approval",
            )?;
            next.status = ProjectStatus::PendingSubPmoReview;
            (
                format!("Submitted '{name}' for approval"),
                reviewers(
                    policy,
                    &Notification::new(
                        NotificationKind::ApprovalRequested,
                        "Project awaiting review",
                        format!("Project '{name}' was submitted for approval and awaits review."),
                    ),
                ),
            )
        }
        Transition::ApproveBySubPmo { comments } => {
            require(
                project,
                ProjectStatus::PendingSubPmoReview,
                "Only projects awaiting Sub PMO review can be approved by the Sub PMO",
            )?;
            let status = policy.after_sub_pmo_approval();
            let summary = with_note(
                format!("Sub PMO approved '{name}'; status is now {}", status.label()),
                "Comments",
                comments.as_deref(),
            );
            if status == ProjectStatus::Active {
                activate(&mut next, now);
                (
                    summary,
                    vec![to(
                        manager,
                        Notification::new(
                            NotificationKind::ProjectApproved,
                            "Project approved",
                            with_note(
                                format!("Your project '{name}' was approved and is now active."),
                                "Comments",
                                comments.as_deref(),
                            ),
                        ),
                    )],
                )
            } else {
                next.status = status;
                let advanced = format!(
                    "Your project '{name}' passed Sub PMO review and awaits Main PMO approval."
                );
                let awaiting =
                    format!("Project '{name}' passed Sub PMO review and awaits your approval.");
                (
                    summary,
                    vec![
                        to(
                            manager,
                            Notification::new(
                                NotificationKind::ReviewAdvanced,
                                "Project passed Sub PMO review",
                                with_note(advanced, "Comments", comments.as_deref()),
                            ),
                        ),
                        to(
                            Recipient::Role(Role::MainPmo),
                            Notification::new(
                                NotificationKind::ApprovalRequested,
                                "Project awaiting final approval",
                                awaiting,
                            ),
                        ),
                    ],
                )
            }
        }
        Transition::RejectBySubPmo { reason } => {
            require(
                project,
                ProjectStatus::PendingSubPmoReview,
                "Only projects awaiting Sub PMO review can be rejected by the Sub PMO",
            )?;
            reject(&mut next);
            let reason = reason.trim();
            let rejected =
                format!("Your project '{name}' was rejected by the Sub PMO. Reason: {reason}");
            (
                format!("Sub PMO rejected '{name}'. Reason: {reason}"),
                vec![to(
                    manager,
                    Notification::new(
                        NotificationKind::ProjectRejected,
                        "Project rejected",
                        rejected,
                    )
                    .urgent(),
                )],
            )
        }
        Transition::ApproveByMainPmo { comments } => {
            require(
                project,
                policy.main_pmo_stage(),
                "Only projects awaiting Main PMO review can be approved by the Main PMO",
            )?;
            activate(&mut next, now);
            let approved =
                format!("Your project '{name}' was approved by the PMO head and is now active.");
            (
                with_note(
                    format!("Main PMO approved '{name}'; project is now active"),
                    "Comments",
                    comments.as_deref(),
                ),
                vec![
                    to(
                        manager,
                        Notification::new(
                            NotificationKind::ProjectApproved,
                            "Project approved",
                            with_note(approved, "Comments", comments.as_deref()),
                        ),
                    ),
                    to(
                        Recipient::Role(Role::Executive),
                        Notification::new(
                            NotificationKind::ProjectApproved,
                            "New active project",
                            format!("Project '{name}' was approved and is now active."),
                        ),
                    ),
                ],
            )
        }
        Transition::RejectByMainPmo { reason } => {
            require(
                project,
                policy.main_pmo_stage(),
                "Only projects awaiting Main PMO review can be rejected by the Main PMO",
            )?;
            reject(&mut next);
            let reason = reason.trim();
            let rejected =
                format!("Your project '{name}' was rejected by the PMO head. Reason: {reason}");
            (
                format!("Main PMO rejected '{name}'. Reason: {reason}"),
                vec![to(
                    manager,
                    Notification::new(
                        NotificationKind::ProjectRejected,
                        "Project rejected",
                        rejected,
                    )
                    .urgent(),
                )],
            )
        }
        Transition::Complete { notes } => {
            require(
                project,
                ProjectStatus::Active,
                "Only active projects can be completed",
            )?;
            next.status = ProjectStatus::Completed;
            next.status_color = StatusColor::Green;
            next.percent_complete = 100;
            let message = with_note(
                format!("Project '{name}' was marked completed."),
                "Notes",
                notes.as_deref(),
            );
            (
                with_note(format!("Completed '{name}'"), "Notes", notes.as_deref()),
                vec![
                    to(
                        Recipient::Role(Role::MainPmo),
                        Notification::new(
                            NotificationKind::ProjectCompleted,
                            "Project completed",
                            message.clone(),
                        ),
                    ),
                    to(
                        manager,
                        Notification::new(
                            NotificationKind::ProjectCompleted,
                            "Project completed",
                            message,
                        ),
                    ),
                ],
            )
        }
        Transition::Resubmit { changes } => {
            require(
                project,
                ProjectStatus::Rejected,
                "Only rejected projects can be resubmitted",
            )?;
            next.status = ProjectStatus::PendingSubPmoReview;
            next.status_color = StatusColor::Yellow;
            let changes = changes.trim();
            (
                format!("Resubmitted '{name}'. Changes: {changes}"),
                reviewers(
                    policy,
                    &Notification::new(
                        NotificationKind::ApprovalRequested,
                        "Project resubmitted",
                        format!(
                            "Project '{name}' was resubmitted after rejection and awaits review. \
                             Changes: {changes}"
                        ),
                    ),
                ),
            )
        }
    };

    // Approvals recompute the color; the other transitions set it or leave it.
    if matches!(
        transition,
        Transition::ApproveBySubPmo { .. } | Transition::ApproveByMainPmo { .. }
    ) {
        next.recompute_color(today);
    }

    let effects = Effects {
        audit: AuditRecord {
            entity_type: PROJECT_ENTITY.to_string(),
            entity_id: project.id.to_string(),
            action: transition.audit_action(),
            summary,
            actor_id,
            recorded_at: now,
        },
        notifications,
    };

    Ok(Planned {
        project: next,
        effects,
    })
}

fn require(project: &Project, expected: ProjectStatus, reason: &str) -> Result<(), WorkflowError> {
    if project.status != expected {
        return Err(WorkflowError::InvalidStateTransition {
            project_id: project.id,
            status: project.status,
            reason: reason.to_string(),
        });
    }
    Ok(())
}

fn activate(project: &mut Project, now: DateTime<Utc>) {
    project.status = ProjectStatus::Active;
    project.approved_date = Some(now);
}

fn reject(project: &mut Project) {
    project.status = ProjectStatus::Rejected;
    project.status_color = StatusColor::Red;
}

/// Addresses a review request to every role that may act on it.
fn reviewers(policy: ApprovalPolicy, notification: &Notification) -> Vec<NotificationCommand> {
    let mut commands = vec![to(Recipient::Role(Role::SubPmo), notification.clone())];
    if policy == ApprovalPolicy::SingleStage {
        commands.push(to(Recipient::Role(Role::MainPmo), notification.clone()));
    }
    commands
}

fn to(recipient: Recipient, notification: Notification) -> NotificationCommand {
    NotificationCommand {
        recipient,
        notification,
    }
}

fn with_note(text: String, label: &str, note: Option<&str>) -> String {
    match note.map(str::trim).filter(|n| !n.is_empty()) {
        Some(note) => format!("{text}. {label}: {note}"),
        None => text,
    }
}
