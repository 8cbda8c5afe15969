//! Shared application state.

use async_trait::async_trait;
use pmo_tracker_core::ProjectId;
use pmo_tracker_workflow::{AuditEntry, AuditError, WorkflowEngine};
use std::sync::Arc;

/// Read access to a project's audit trail.
#[async_trait]
pub trait AuditHistory: Send + Sync {
    /// Lists a project's audit entries, newest first.
    async fn project_history(
        &self,
        project_id: ProjectId,
    ) -> Result<Vec<AuditEntry>, AuditError>;
}

/// State shared by every handler.
#[derive(Clone)]
pub struct AppState {
    /// The approval workflow.
    pub engine: WorkflowEngine,
    /// Audit trail reads.
    pub history: Arc<dyn AuditHistory>,
}

impl AppState {
    /// Creates a new application state.
    pub fn new(engine: WorkflowEngine, history: Arc<dyn AuditHistory>) -> Self {
        Self { engine, history }
    }
}
