//! In-app notification repository.

use async_trait::async_trait;
use chrono::Utc;
use pmo_tracker_access::Role;
use pmo_tracker_core::{NotificationId, UserId};
use pmo_tracker_workflow::{Notification, NotifyError, Notifier};
use sqlx::{PgPool, Postgres, Transaction};
use tracing::{debug, instrument};

fn delivery_failed(e: sqlx::Error) -> NotifyError {
    NotifyError::DeliveryFailed {
        details: e.to_string(),
    }
}

/// Repository that delivers notifications as rows in the `notifications`
/// table, read by the front end.
#[derive(Clone)]
pub struct NotificationRepository {
    pool: PgPool,
}

impl NotificationRepository {
    /// Creates a new repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Inserts one notification for a user, if the user exists.
    ///
    /// Returns the number of rows written (0 or 1).
    async fn insert_for(
        tx: &mut Transaction<'_, Postgres>,
        user_id: &str,
        notification: &Notification,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            INSERT INTO notifications (id, user_id, title, message, kind, priority, created_at)
            SELECT $1, id, $3, $4, $5, $6, $7
            FROM users
            WHERE id = $2
            "#,
        )
        .bind(NotificationId::new().to_string())
        .bind(user_id)
        .bind(&notification.title)
        .bind(&notification.message)
        .bind(notification.kind.as_str())
        .bind(notification.priority.as_str())
        .bind(Utc::now())
        .execute(&mut **tx)
        .await?;

        Ok(result.rows_affected())
    }
}

#[async_trait]
impl Notifier for NotificationRepository {
    #[instrument(skip(self, notification), fields(user_id = %user_id, kind = notification.kind.as_str()))]
    async fn notify(
        &self,
        user_id: UserId,
        notification: &Notification,
    ) -> Result<usize, NotifyError> {
        let mut tx = self.pool.begin().await.map_err(delivery_failed)?;
        let written = Self::insert_for(&mut tx, &user_id.to_string(), notification)
            .await
            .map_err(delivery_failed)?;
        if written == 0 {
            return Err(NotifyError::UnknownRecipient { user_id });
        }
        tx.commit().await.map_err(delivery_failed)?;
        Ok(1)
    }

    #[instrument(skip(self, notification), fields(role = %role, kind = notification.kind.as_str()))]
    async fn notify_role(
        &self,
        role: Role,
        notification: &Notification,
    ) -> Result<usize, NotifyError> {
        let mut tx = self.pool.begin().await.map_err(delivery_failed)?;

        let user_ids: Vec<String> = sqlx::query_scalar("SELECT id FROM users WHERE role = $1")
            .bind(role.as_str())
            .fetch_all(&mut *tx)
            .await
            .map_err(delivery_failed)?;

        let mut delivered = 0;
        for user_id in &user_ids {
            let written = Self::insert_for(&mut tx, user_id, notification)
                .await
                .map_err(delivery_failed)?;
            delivered += usize::try_from(written).unwrap_or(0);
        }

        tx.commit().await.map_err(delivery_failed)?;
        debug!(delivered, "role notification written");
        Ok(delivered)
    }
}
