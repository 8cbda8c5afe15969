//! The workflow engine.
//!
//! Each operation runs the same pipeline:
//!
//! 1. validate caller-supplied text
//! 2. load the project (`NotFound`)
//! 3. resolve the actor (`ActorNotFound`)
//! 4. authorize the actor (`Unauthorized`)
//! 5. plan the transition (`InvalidStateTransition`)
//! 6. save with the version read in step 2 (`Conflict`)
//! 7. append the audit entry, then deliver the notifications
//!
//! Nothing is written before step 6. Step 7 runs on its own task, so it
//! finishes even if the caller stops waiting after the save. Its failures
//! are logged and reported on the [`TransitionReceipt`]; they never undo
//! the save.

use crate::effects::{Effects, NotificationCommand, Recipient};
use crate::error::{NotifyError, WorkflowError};
use crate::ports::{AuditRecorder, Notifier, ProjectStore};
use crate::project::Project;
use crate::transition::{ApprovalPolicy, Transition, plan};
use chrono::Utc;
use futures::future::join_all;
use pmo_tracker_access::{User, UserDirectory};
use pmo_tracker_authz::{Capability, PermissionOracle};
use pmo_tracker_core::{ProjectId, UserId};
use std::sync::Arc;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{Instrument, debug, info, instrument, warn};

/// Outcome of delivering a transition's notifications.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Notifications delivered, counting each user of a role separately.
    pub delivered: usize,
    /// Notification commands that failed.
    pub failed: usize,
}

/// Result of a committed transition.
#[derive(Debug)]
pub struct TransitionReceipt {
    /// The project as saved.
    pub project: Project,
    /// The audit entry and notifications produced.
    pub effects: Effects,
    /// Set when the audit entry could not be written.
    pub audit_error: Option<String>,
    dispatch: JoinHandle<DispatchReport>,
}

impl TransitionReceipt {
    /// Waits for notification delivery to finish.
    ///
    /// Dropping the receipt instead leaves delivery running in the
    /// background.
    pub async fn notifications(self) -> DispatchReport {
        let pending = self.effects.notifications.len();
        match self.dispatch.await {
            Ok(report) => report,
            Err(e) => {
                warn!(error = %e, "notification task did not finish");
                DispatchReport {
                    delivered: 0,
                    failed: pending,
                }
            }
        }
    }
}

/// Runs approval workflow transitions against the configured collaborators.
#[derive(Clone)]
pub struct WorkflowEngine {
    store: Arc<dyn ProjectStore>,
    directory: Arc<dyn UserDirectory>,
    audit: Arc<dyn AuditRecorder>,
    notifier: Arc<dyn Notifier>,
    oracle: Arc<dyn PermissionOracle>,
    policy: ApprovalPolicy,
}

impl WorkflowEngine {
    /// Creates an engine using the two-stage approval policy.
    pub fn new(
        store: Arc<dyn ProjectStore>,
        directory: Arc<dyn UserDirectory>,
        audit: Arc<dyn AuditRecorder>,
        notifier: Arc<dyn Notifier>,
        oracle: Arc<dyn PermissionOracle>,
    ) -> Self {
        Self {
            store,
            directory,
            audit,
            notifier,
            oracle,
            policy: ApprovalPolicy::default(),
        }
    }

    /// Sets the approval policy.
    #[must_use]
    pub fn with_policy(mut self, policy: ApprovalPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Returns the approval policy in use.
    #[must_use]
    pub fn policy(&self) -> ApprovalPolicy {
        self.policy
    }

    /// Loads a project.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for unknown IDs and `Storage` on backend failure.
    pub async fn project(&self, project_id: ProjectId) -> Result<Project, WorkflowError> {
        self.store
            .find_project(project_id)
            .await?
            .ok_or(WorkflowError::NotFound { project_id })
    }

    /// Moves a draft project into Sub PMO review. Only the project's
    /// manager may submit.
    pub async fn submit_for_approval(
        &self,
        project_id: ProjectId,
        actor_id: UserId,
    ) -> Result<TransitionReceipt, WorkflowError> {
        self.execute(project_id, actor_id, Transition::SubmitForApproval)
            .await
    }

    /// Records the Sub PMO's approval.
    ///
    /// # Errors
    ///
    /// `Unauthorized` without `ApproveRequests`; `InvalidStateTransition`
    /// unless the project awaits Sub PMO review.
    pub async fn approve_by_sub_pmo(
        &self,
        project_id: ProjectId,
        actor_id: UserId,
        comments: Option<String>,
    ) -> Result<TransitionReceipt, WorkflowError> {
        self.execute(project_id, actor_id, Transition::ApproveBySubPmo { comments })
            .await
    }

    /// Rejects a project under Sub PMO review.
    ///
    /// # Errors
    ///
    /// `Validation` for a blank reason, otherwise as
    /// [`approve_by_sub_pmo`](Self::approve_by_sub_pmo).
    pub async fn reject_by_sub_pmo(
        &self,
        project_id: ProjectId,
        actor_id: UserId,
        reason: impl Into<String>,
    ) -> Result<TransitionReceipt, WorkflowError> {
        let reason = reason.into();
        self.execute(project_id, actor_id, Transition::RejectBySubPmo { reason })
            .await
    }

    /// Records the Main PMO's approval, activating the project.
    ///
    /// # Errors
    ///
    /// `Unauthorized` without `ApproveRequests`; `InvalidStateTransition`
    /// unless the policy allows Main PMO review in the current status.
    pub async fn approve_by_main_pmo(
        &self,
        project_id: ProjectId,
        actor_id: UserId,
        comments: Option<String>,
    ) -> Result<TransitionReceipt, WorkflowError> {
        self.execute(project_id, actor_id, Transition::ApproveByMainPmo { comments })
            .await
    }

    /// Rejects a project under Main PMO review.
    ///
    /// # Errors
    ///
    /// `Validation` for a blank reason, otherwise as
    /// [`approve_by_main_pmo`](Self::approve_by_main_pmo).
    pub async fn reject_by_main_pmo(
        &self,
        project_id: ProjectId,
        actor_id: UserId,
        reason: impl Into<String>,
    ) -> Result<TransitionReceipt, WorkflowError> {
        let reason = reason.into();
        self.execute(project_id, actor_id, Transition::RejectByMainPmo { reason })
            .await
    }

    /// Marks an active project completed.
    pub async fn complete_project(
        &self,
        project_id: ProjectId,
        actor_id: UserId,
        notes: Option<String>,
    ) -> Result<TransitionReceipt, WorkflowError> {
        self.execute(project_id, actor_id, Transition::Complete { notes })
            .await
    }

    /// Sends a rejected project back to Sub PMO review.
    pub async fn resubmit_project(
        &self,
        project_id: ProjectId,
        actor_id: UserId,
        changes: impl Into<String>,
    ) -> Result<TransitionReceipt, WorkflowError> {
        let changes = changes.into();
        self.execute(project_id, actor_id, Transition::Resubmit { changes })
            .await
    }

    /// Runs one transition.
    ///
    /// # Errors
    ///
    /// Returns the first failing check: `Validation`, `NotFound`,
    /// `ActorNotFound`, `Unauthorized`, `InvalidStateTransition`, then
    /// `Conflict` or `Storage` from the save. On error nothing was written.
    #[instrument(
        skip(self, transition),
        fields(project_id = %project_id, actor_id = %actor_id, operation = transition.name())
    )]
    pub async fn execute(
        &self,
        project_id: ProjectId,
        actor_id: UserId,
        transition: Transition,
    ) -> Result<TransitionReceipt, WorkflowError> {
        transition.validate()?;

        let current = self.project(project_id).await?;
        let actor = self.actor(actor_id).await?;
        self.authorize(&current, &actor, &transition).await?;

        let planned = plan(&current, actor_id, &transition, self.policy, Utc::now())?;
        let saved = self
            .store
            .save_project(&planned.project, current.version)
            .await
            .inspect_err(|e| warn!(error = %e, "project save failed"))?;

        info!(
            from = %current.status,
            to = %saved.status,
            color = %saved.status_color,
            version = saved.version,
            "transition committed"
        );

        // Spawned before the first await below, so a dropped caller cannot
        // cancel the audit entry or the notifications.
        let (audit_tx, audit_rx) = oneshot::channel();
        let dispatch = self.apply_effects(planned.effects.clone(), audit_tx);
        let audit_error = audit_rx
            .await
            .unwrap_or_else(|_| Some("audit task stopped before recording".to_string()));

        Ok(TransitionReceipt {
            project: saved,
            effects: planned.effects,
            audit_error,
            dispatch,
        })
    }

    async fn actor(&self, actor_id: UserId) -> Result<User, WorkflowError> {
        self.directory
            .find_user(actor_id)
            .await?
            .ok_or(WorkflowError::ActorNotFound { actor_id })
    }

    async fn authorize(
        &self,
        project: &Project,
        actor: &User,
        transition: &Transition,
    ) -> Result<(), WorkflowError> {
        let actor_id = actor.id();
        match transition {
            Transition::SubmitForApproval => {
                if project.is_managed_by(actor_id) {
                    Ok(())
                } else {
                    Err(WorkflowError::Unauthorized {
                        actor_id,
                        requirement: "only the project manager can submit a project".to_string(),
                    })
                }
            }
            // The owning manager may always resubmit their own project.
            Transition::Resubmit { .. } if project.is_managed_by(actor_id) => Ok(()),
            _ => match transition.required_capability() {
                Some(capability) => self.require_capability(actor_id, capability).await,
                None => Ok(()),
            },
        }
    }

    async fn require_capability(
        &self,
        actor_id: UserId,
        capability: Capability,
    ) -> Result<(), WorkflowError> {
        let denied = || WorkflowError::Unauthorized {
            actor_id,
            requirement: format!("requires the {capability} capability"),
        };

        match self.oracle.has_capability(actor_id, capability).await {
            Ok(true) => Ok(()),
            Ok(false) => Err(denied()),
            Err(report) => {
                warn!(error = %report, capability = %capability, "permission check failed");
                Err(denied())
            }
        }
    }

    /// Records the audit entry, reports its outcome on `audit_done`, then
    /// delivers the notifications.
    fn apply_effects(
        &self,
        effects: Effects,
        audit_done: oneshot::Sender<Option<String>>,
    ) -> JoinHandle<DispatchReport> {
        let audit = Arc::clone(&self.audit);
        let notifier = Arc::clone(&self.notifier);
        tokio::spawn(
            async move {
                let outcome = match audit.record(&effects.audit).await {
                    Ok(entry_id) => {
                        debug!(entry_id = %entry_id, "audit entry recorded");
                        None
                    }
                    Err(e) => {
                        warn!(error = %e, "audit entry not recorded");
                        Some(e.to_string())
                    }
                };
                // The receiver is gone when the caller stopped waiting.
                let _ = audit_done.send(outcome);

                dispatch(notifier.as_ref(), &effects.notifications).await
            }
            .in_current_span(),
        )
    }
}

async fn dispatch(notifier: &dyn Notifier, commands: &[NotificationCommand]) -> DispatchReport {
    let results = join_all(commands.iter().map(|command| deliver(notifier, command))).await;

    let mut report = DispatchReport::default();
    for (command, result) in commands.iter().zip(results) {
        match result {
            Ok(count) => report.delivered += count,
            Err(e) => {
                warn!(
                    recipient = ?command.recipient,
                    error = %e,
                    "notification not delivered"
                );
                report.failed += 1;
            }
        }
    }
    debug!(
        delivered = report.delivered,
        failed = report.failed,
        "notifications dispatched"
    );
    report
}

async fn deliver(
    notifier: &dyn Notifier,
    command: &NotificationCommand,
) -> Result<usize, NotifyError> {
    match command.recipient {
        Recipient::User(user_id) => notifier.notify(user_id, &command.notification).await,
        Recipient::Role(role) => notifier.notify_role(role, &command.notification).await,
    }
}
