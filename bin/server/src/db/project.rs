//! Project repository.

use super::invalid_column;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use pmo_tracker_core::{ProjectId, UserId};
use pmo_tracker_workflow::{Project, ProjectStatus, ProjectStore, StatusColor, StoreError};
use sqlx::{FromRow, PgPool};
use std::str::FromStr;
use tracing::instrument;

const PROJECT_COLUMNS: &str = "id, name, description, project_manager_id, status, status_color, \
     percent_complete, start_date, end_date, approved_date, version, created_at, updated_at";

/// Row type for project queries.
#[derive(FromRow)]
struct ProjectRow {
    id: String,
    name: String,
    description: Option<String>,
    project_manager_id: String,
    status: String,
    status_color: String,
    percent_complete: i16,
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
    approved_date: Option<DateTime<Utc>>,
    version: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ProjectRow {
    fn try_into_project(self) -> Result<Project, sqlx::Error> {
        let id = ProjectId::from_str(&self.id)
            .map_err(|e| invalid_column("project id", &self.id, e))?;
        let project_manager_id = UserId::from_str(&self.project_manager_id)
            .map_err(|e| invalid_column("user id", &self.project_manager_id, e))?;
        let status = ProjectStatus::from_str(&self.status)
            .map_err(|e| invalid_column("status", &self.status, e))?;
        let status_color = StatusColor::from_str(&self.status_color)
            .map_err(|e| invalid_column("status color", &self.status_color, e))?;
        let percent_complete = u8::try_from(self.percent_complete).map_err(|e| {
            invalid_column("percent complete", &self.percent_complete.to_string(), e)
        })?;

        Ok(Project {
            id,
            name: self.name,
            description: self.description,
            project_manager_id,
            status,
            status_color,
            percent_complete,
            start_date: self.start_date,
            end_date: self.end_date,
            approved_date: self.approved_date,
            version: self.version,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

fn backend(e: sqlx::Error) -> StoreError {
    StoreError::Backend {
        details: e.to_string(),
    }
}

/// Repository for project operations.
#[derive(Clone)]
pub struct ProjectRepository {
    pool: PgPool,
}

impl ProjectRepository {
    /// Creates a new repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Finds a project by ID.
    pub async fn find_by_id(&self, id: ProjectId) -> Result<Option<Project>, sqlx::Error> {
        let row: Option<ProjectRow> =
            sqlx::query_as(&format!("SELECT {PROJECT_COLUMNS} FROM projects WHERE id = $1"))
                .bind(id.to_string())
                .fetch_optional(&self.pool)
                .await?;

        row.map(ProjectRow::try_into_project).transpose()
    }

    /// Saves the project if the stored version matches, returning the
    /// saved row. `None` means no row matched.
    async fn update_if_version(
        &self,
        project: &Project,
        expected_version: i64,
    ) -> Result<Option<Project>, sqlx::Error> {
        let row: Option<ProjectRow> = sqlx::query_as(&format!(
            r#"
            UPDATE projects
            SET name = $3, description = $4, status = $5, status_color = $6,
                percent_complete = $7, start_date = $8, end_date = $9,
                approved_date = $10, updated_at = $11, version = version + 1
            WHERE id = $1 AND version = $2
            RETURNING {PROJECT_COLUMNS}
            "#
        ))
        .bind(project.id.to_string())
        .bind(expected_version)
        .bind(&project.name)
        .bind(&project.description)
        .bind(project.status.as_str())
        .bind(project.status_color.as_str())
        .bind(i16::from(project.percent_complete))
        .bind(project.start_date)
        .bind(project.end_date)
        .bind(project.approved_date)
        .bind(project.updated_at)
        .fetch_optional(&self.pool)
        .await?;

        row.map(ProjectRow::try_into_project).transpose()
    }

    async fn exists(&self, id: ProjectId) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM projects WHERE id = $1)")
            .bind(id.to_string())
            .fetch_one(&self.pool)
            .await
    }
}

#[async_trait]
impl ProjectStore for ProjectRepository {
    #[instrument(skip(self), fields(project_id = %id))]
    async fn find_project(&self, id: ProjectId) -> Result<Option<Project>, StoreError> {
        self.find_by_id(id).await.map_err(backend)
    }

    #[instrument(skip(self, project), fields(project_id = %project.id))]
    async fn save_project(
        &self,
        project: &Project,
        expected_version: i64,
    ) -> Result<Project, StoreError> {
        if let Some(saved) = self
            .update_if_version(project, expected_version)
            .await
            .map_err(backend)?
        {
            return Ok(saved);
        }

        if self.exists(project.id).await.map_err(backend)? {
            Err(StoreError::Conflict {
                project_id: project.id,
                expected_version,
            })
        } else {
            Err(StoreError::NotFound {
                project_id: project.id,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(status: &str, percent_complete: i16) -> ProjectRow {
        let now = Utc::now();
        ProjectRow {
            id: ProjectId::new().to_string(),
            name: "Branch network upgrade".to_string(),
            description: None,
            project_manager_id: UserId::new().to_string(),
            status: status.to_string(),
            status_color: "blue".to_string(),
            percent_complete,
            start_date: None,
            end_date: None,
            approved_date: None,
            version: 4,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn row_converts_to_project() {
        let project = row("pending_main_pmo_review", 80).try_into_project().unwrap();
        assert_eq!(project.status, ProjectStatus::PendingMainPmoReview);
        assert_eq!(project.status_color, StatusColor::Blue);
        assert_eq!(project.percent_complete, 80);
        assert_eq!(project.version, 4);
    }

    #[test]
    fn unknown_status_is_a_decode_error() {
        let err = row("archived", 10).try_into_project().unwrap_err();
        assert!(err.to_string().contains("archived"));
    }

    #[test]
    fn negative_progress_is_a_decode_error() {
        assert!(row("draft", -1).try_into_project().is_err());
    }
}
