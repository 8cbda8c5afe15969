//! JSON API routes.

use crate::error::ApiError;
use crate::state::AppState;
use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post},
};
use pmo_tracker_core::{ProjectId, UserId};
use pmo_tracker_workflow::{AuditEntry, Project, TransitionReceipt};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tower_http::trace::TraceLayer;

/// Body of every workflow action.
#[derive(Debug, Deserialize)]
pub struct ActionRequest {
    /// The acting user, with or without the `usr_` prefix.
    pub actor_id: String,
    /// Comments, rejection reason, completion notes, or change description,
    /// depending on the action.
    #[serde(default)]
    pub note: Option<String>,
}

/// Response to a committed workflow action.
#[derive(Debug, Serialize)]
pub struct TransitionResponse {
    pub project: Project,
    pub audit_recorded: bool,
    /// Notification commands queued for delivery.
    pub notifications_queued: usize,
}

impl From<TransitionReceipt> for TransitionResponse {
    fn from(receipt: TransitionReceipt) -> Self {
        // Dropping the receipt leaves delivery running in the background.
        Self {
            audit_recorded: receipt.audit_error.is_none(),
            notifications_queued: receipt.effects.notifications.len(),
            project: receipt.project,
        }
    }
}

#[derive(Debug, Serialize)]
struct Health {
    status: &'static str,
}

/// Builds the API router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/projects/{id}", get(get_project))
        .route("/api/projects/{id}/audit", get(get_audit))
        .route("/api/projects/{id}/submit", post(submit))
        .route("/api/projects/{id}/sub-pmo/approve", post(sub_pmo_approve))
        .route("/api/projects/{id}/sub-pmo/reject", post(sub_pmo_reject))
        .route("/api/projects/{id}/main-pmo/approve", post(main_pmo_approve))
        .route("/api/projects/{id}/main-pmo/reject", post(main_pmo_reject))
        .route("/api/projects/{id}/complete", post(complete))
        .route("/api/projects/{id}/resubmit", post(resubmit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> Json<Health> {
    Json(Health { status: "ok" })
}

fn ids(project_id: &str, body: &ActionRequest) -> Result<(ProjectId, UserId), ApiError> {
    Ok((ProjectId::from_str(project_id)?, UserId::from_str(&body.actor_id)?))
}

async fn get_project(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Project>, ApiError> {
    let project = state.engine.project(ProjectId::from_str(&id)?).await?;
    Ok(Json(project))
}

async fn get_audit(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<AuditEntry>>, ApiError> {
    let project_id = ProjectId::from_str(&id)?;
    // 404 for unknown projects rather than an empty trail.
    state.engine.project(project_id).await?;
    let entries = state.history.project_history(project_id).await?;
    Ok(Json(entries))
}

async fn submit(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<ActionRequest>,
) -> Result<Json<TransitionResponse>, ApiError> {
    let (project_id, actor_id) = ids(&id, &body)?;
    let receipt = state
        .engine
        .submit_for_approval(project_id, actor_id)
        .await?;
    Ok(Json(receipt.into()))
}

async fn sub_pmo_approve(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<ActionRequest>,
) -> Result<Json<TransitionResponse>, ApiError> {
    let (project_id, actor_id) = ids(&id, &body)?;
    let receipt = state
        .engine
        .approve_by_sub_pmo(project_id, actor_id, body.note)
        .await?;
    Ok(Json(receipt.into()))
}

async fn sub_pmo_reject(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<ActionRequest>,
) -> Result<Json<TransitionResponse>, ApiError> {
    let (project_id, actor_id) = ids(&id, &body)?;
    let receipt = state
        .engine
        .reject_by_sub_pmo(project_id, actor_id, body.note.unwrap_or_default())
        .await?;
    Ok(Json(receipt.into()))
}

async fn main_pmo_approve(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<ActionRequest>,
) -> Result<Json<TransitionResponse>, ApiError> {
    let (project_id, actor_id) = ids(&id, &body)?;
    let receipt = state
        .engine
        .approve_by_main_pmo(project_id, actor_id, body.note)
        .await?;
    Ok(Json(receipt.into()))
}

async fn main_pmo_reject(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<ActionRequest>,
) -> Result<Json<TransitionResponse>, ApiError> {
    let (project_id, actor_id) = ids(&id, &body)?;
    let receipt = state
        .engine
        .reject_by_main_pmo(project_id, actor_id, body.note.unwrap_or_default())
        .await?;
    Ok(Json(receipt.into()))
}

async fn complete(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<ActionRequest>,
) -> Result<Json<TransitionResponse>, ApiError> {
    let (project_id, actor_id) = ids(&id, &body)?;
    let receipt = state
        .engine
        .complete_project(project_id, actor_id, body.note)
        .await?;
    Ok(Json(receipt.into()))
}

async fn resubmit(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<ActionRequest>,
) -> Result<Json<TransitionResponse>, ApiError> {
    let (project_id, actor_id) = ids(&id, &body)?;
    let receipt = state
        .engine
        .resubmit_project(project_id, actor_id, body.note.unwrap_or_default())
        .await?;
    Ok(Json(receipt.into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::AuditHistory;
    use async_trait::async_trait;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode, header};
    use pmo_tracker_access::{InMemoryDirectory, Role, User};
    use pmo_tracker_authz::RoleCapabilityOracle;
    use pmo_tracker_workflow::memory::{InMemoryAuditLog, InMemoryNotifier, InMemoryProjectStore};
    use pmo_tracker_workflow::{
        ApprovalPolicy, AuditError, PROJECT_ENTITY, ProjectStatus, WorkflowEngine,
    };
    use serde_json::{Value, json};
    use std::sync::Arc;
    use tower::ServiceExt;

    #[async_trait]
    impl AuditHistory for InMemoryAuditLog {
        async fn project_history(
            &self,
            project_id: ProjectId,
        ) -> Result<Vec<AuditEntry>, AuditError> {
            let mut entries = self.entries_for(PROJECT_ENTITY, &project_id.to_string());
            entries.reverse();
            Ok(entries)
        }
    }

    struct TestApp {
        router: Router,
        store: InMemoryProjectStore,
        manager: User,
        sub_pmo: User,
        main_pmo: User,
        project_id: ProjectId,
    }

    fn app(policy: ApprovalPolicy) -> TestApp {
        let directory = InMemoryDirectory::new();
        let manager = User::new("amara", Role::ProjectManager);
        let sub_pmo = User::new("sana", Role::SubPmo);
        let main_pmo = User::new("mateo", Role::MainPmo);
        for user in [&manager, &sub_pmo, &main_pmo] {
            directory.insert(user.clone());
        }

        let store = InMemoryProjectStore::new();
        let project = Project::new("Branch network upgrade", manager.id()).with_progress(90);
        let project_id = project.id;
        store.insert(project);

        let audit = InMemoryAuditLog::new();
        let engine = WorkflowEngine::new(
            Arc::new(store.clone()),
            Arc::new(directory.clone()),
            Arc::new(audit.clone()),
            Arc::new(InMemoryNotifier::new(directory.clone())),
            Arc::new(RoleCapabilityOracle::new(directory)),
        )
        .with_policy(policy);

        TestApp {
            router: router(AppState::new(engine, Arc::new(audit))),
            store,
            manager,
            sub_pmo,
            main_pmo,
            project_id,
        }
    }

    async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    async fn post_action(router: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
        let request = Request::post(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        send(router, request).await
    }

    async fn get_json(router: &Router, uri: &str) -> (StatusCode, Value) {
        send(router, Request::get(uri).body(Body::empty()).unwrap()).await
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let t = app(ApprovalPolicy::TwoStage);
        let (status, body) = get_json(&t.router, "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn get_project_accepts_prefixed_id() {
        let t = app(ApprovalPolicy::TwoStage);
        let (status, body) = get_json(&t.router, &format!("/api/projects/{}", t.project_id)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "draft");
        assert_eq!(body["id"], t.project_id.as_ulid().to_string());
    }

    #[tokio::test]
    async fn unknown_project_is_404() {
        let t = app(ApprovalPolicy::TwoStage);
        let uri = format!("/api/projects/{}", ProjectId::new());
        let (status, body) = get_json(&t.router, &uri).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "not_found");
    }

    #[tokio::test]
    async fn malformed_id_is_400() {
        let t = app(ApprovalPolicy::TwoStage);
        let (status, body) = get_json(&t.router, "/api/projects/not-an-id").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "invalid_id");
    }

    #[tokio::test]
    async fn submit_then_approve_single_stage() {
        let t = app(ApprovalPolicy::SingleStage);
        let base = format!("/api/projects/{}", t.project_id);

        let (status, body) = post_action(
            &t.router,
            &format!("{base}/submit"),
            json!({ "actor_id": t.manager.id().to_string() }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["project"]["status"], "pending_sub_pmo_review");
        assert_eq!(body["audit_recorded"], true);
        assert_eq!(body["notifications_queued"], 2);

        let (status, body) = post_action(
            &t.router,
            &format!("{base}/main-pmo/approve"),
            json!({ "actor_id": t.main_pmo.id().as_ulid().to_string(), "note": "go" }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["project"]["status"], "active");
        assert_eq!(body["project"]["status_color"], "green");

        let (status, body) = get_json(&t.router, &format!("{base}/audit")).await;
        assert_eq!(status, StatusCode::OK);
        let actions: Vec<&str> = body
            .as_array()
            .unwrap()
            .iter()
            .map(|e| e["action"].as_str().unwrap())
            .collect();
        assert_eq!(actions, vec!["MainPMOApproval", "SubmitForApproval"]);
    }

    #[tokio::test]
    async fn wrong_actor_is_403() {
        let t = app(ApprovalPolicy::TwoStage);
        let (status, body) = post_action(
            &t.router,
            &format!("/api/projects/{}/submit", t.project_id),
            json!({ "actor_id": t.sub_pmo.id().to_string() }),
        )
        .await;

        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"], "unauthorized");
    }

    #[tokio::test]
    async fn unknown_actor_is_404() {
        let t = app(ApprovalPolicy::TwoStage);
        let (status, body) = post_action(
            &t.router,
            &format!("/api/projects/{}/submit", t.project_id),
            json!({ "actor_id": UserId::new().to_string() }),
        )
        .await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "not_found");
        assert_eq!(body["message"], "User not found");
        assert_eq!(t.store.get(t.project_id).unwrap().status, ProjectStatus::Draft);
    }

    #[tokio::test]
    async fn blank_reason_is_422() {
        let t = app(ApprovalPolicy::TwoStage);
        let (status, body) = post_action(
            &t.router,
            &format!("/api/projects/{}/sub-pmo/reject", t.project_id),
            json!({ "actor_id": t.sub_pmo.id().to_string(), "note": "   " }),
        )
        .await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"], "validation");
        assert_eq!(body["message"], "A rejection reason is required");
    }

    #[tokio::test]
    async fn invalid_transition_is_409_with_reason() {
        let t = app(ApprovalPolicy::TwoStage);
        let (status, body) = post_action(
            &t.router,
            &format!("/api/projects/{}/complete", t.project_id),
            json!({ "actor_id": t.manager.id().to_string() }),
        )
        .await;

        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"], "invalid_state_transition");
        assert_eq!(body["message"], "Only active projects can be completed");
        assert_eq!(t.store.get(t.project_id).unwrap().status, ProjectStatus::Draft);
    }

    #[tokio::test]
    async fn rejection_and_resubmission() {
        let t = app(ApprovalPolicy::TwoStage);
        let base = format!("/api/projects/{}", t.project_id);
        let manager = json!({ "actor_id": t.manager.id().to_string() });

        post_action(&t.router, &format!("{base}/submit"), manager).await;
        let (status, body) = post_action(
            &t.router,
            &format!("{base}/sub-pmo/reject"),
            json!({ "actor_id": t.sub_pmo.id().to_string(), "note": "no budget" }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["project"]["status_color"], "red");

        let (status, body) = post_action(
            &t.router,
            &format!("{base}/resubmit"),
            json!({ "actor_id": t.manager.id().to_string(), "note": "budget attached" }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["project"]["status"], "pending_sub_pmo_review");
        assert_eq!(body["project"]["status_color"], "yellow");
        assert_eq!(t.store.get(t.project_id).unwrap().version, 3);
    }
}
