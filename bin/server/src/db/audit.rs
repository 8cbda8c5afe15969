//! Audit trail repository.

use super::invalid_column;
use crate::state::AuditHistory;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pmo_tracker_core::{AuditEntryId, ProjectId, UserId};
use pmo_tracker_workflow::{
    AuditAction, AuditEntry, AuditError, AuditRecord, AuditRecorder, PROJECT_ENTITY,
};
use sqlx::{FromRow, PgPool};
use std::str::FromStr;
use tracing::instrument;

/// Row type for audit queries.
#[derive(FromRow)]
struct AuditRow {
    id: String,
    entity_type: String,
    entity_id: String,
    action: String,
    summary: String,
    actor_id: String,
    recorded_at: DateTime<Utc>,
}

impl AuditRow {
    fn try_into_entry(self) -> Result<AuditEntry, sqlx::Error> {
        let id = AuditEntryId::from_str(&self.id)
            .map_err(|e| invalid_column("audit entry id", &self.id, e))?;
        let action = AuditAction::from_str(&self.action)
            .map_err(|e| invalid_column("audit action", &self.action, e))?;
        let actor_id = UserId::from_str(&self.actor_id)
            .map_err(|e| invalid_column("user id", &self.actor_id, e))?;

        Ok(AuditEntry {
            id,
            record: AuditRecord {
                entity_type: self.entity_type,
                entity_id: self.entity_id,
                action,
                summary: self.summary,
                actor_id,
                recorded_at: self.recorded_at,
            },
        })
    }
}

/// Repository for the append-only audit trail.
#[derive(Clone)]
pub struct AuditRepository {
    pool: PgPool,
}

impl AuditRepository {
    /// Creates a new repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Appends an entry.
    pub async fn create(&self, id: AuditEntryId, record: &AuditRecord) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO audit_entries (id, entity_type, entity_id, action, summary, actor_id, recorded_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(id.to_string())
        .bind(&record.entity_type)
        .bind(&record.entity_id)
        .bind(record.action.as_str())
        .bind(&record.summary)
        .bind(record.actor_id.to_string())
        .bind(record.recorded_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Lists the entries for one entity, newest first.
    pub async fn list_for_entity(
        &self,
        entity_type: &str,
        entity_id: &str,
    ) -> Result<Vec<AuditEntry>, sqlx::Error> {
        let rows: Vec<AuditRow> = sqlx::query_as(
            r#"
            SELECT id, entity_type, entity_id, action, summary, actor_id, recorded_at
            FROM audit_entries
            WHERE entity_type = $1 AND entity_id = $2
            ORDER BY recorded_at DESC, id DESC
            "#,
        )
        .bind(entity_type)
        .bind(entity_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(AuditRow::try_into_entry).collect()
    }
}

#[async_trait]
impl AuditRecorder for AuditRepository {
    #[instrument(skip(self, record), fields(action = %record.action, entity_id = %record.entity_id))]
    async fn record(&self, record: &AuditRecord) -> Result<AuditEntryId, AuditError> {
        let id = AuditEntryId::new();
        self.create(id, record)
            .await
            .map_err(|e| AuditError::WriteFailed {
                details: e.to_string(),
            })?;
        Ok(id)
    }
}

#[async_trait]
impl AuditHistory for AuditRepository {
    async fn project_history(&self, project_id: ProjectId) -> Result<Vec<AuditEntry>, AuditError> {
        self.list_for_entity(PROJECT_ENTITY, &project_id.to_string())
            .await
            .map_err(|e| AuditError::ReadFailed {
                details: e.to_string(),
            })
    }
}
