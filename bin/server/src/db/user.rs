//! User directory repository.

use super::invalid_column;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pmo_tracker_access::{DirectoryError, Role, User, UserDirectory};
use pmo_tracker_core::UserId;
use sqlx::{FromRow, PgPool};
use std::str::FromStr;
use tracing::instrument;

/// Row type for user queries.
#[derive(FromRow)]
struct UserRow {
    id: String,
    username: String,
    email: Option<String>,
    display_name: Option<String>,
    role: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl UserRow {
    fn try_into_user(self) -> Result<User, sqlx::Error> {
        let id = UserId::from_str(&self.id).map_err(|e| invalid_column("user id", &self.id, e))?;
        let role = Role::from_str(&self.role).map_err(|e| invalid_column("role", &self.role, e))?;
        Ok(User::with_all_fields(
            id,
            self.username,
            self.email,
            self.display_name,
            role,
            self.created_at,
            self.updated_at,
        ))
    }
}

fn lookup_failed(e: sqlx::Error) -> DirectoryError {
    DirectoryError::LookupFailed {
        reason: e.to_string(),
    }
}

/// Repository for user operations.
#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    /// Creates a new user repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Finds a user by their internal ID.
    pub async fn find_by_id(&self, id: UserId) -> Result<Option<User>, sqlx::Error> {
        let row: Option<UserRow> = sqlx::query_as(
            r#"
            SELECT id, username, email, display_name, role, created_at, updated_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.map(UserRow::try_into_user).transpose()
    }

    /// Lists the users holding a role, ordered by username.
    pub async fn list_by_role(&self, role: Role) -> Result<Vec<User>, sqlx::Error> {
        let rows: Vec<UserRow> = sqlx::query_as(
            r#"
            SELECT id, username, email, display_name, role, created_at, updated_at
            FROM users
            WHERE role = $1
            ORDER BY username
            "#,
        )
        .bind(role.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(UserRow::try_into_user).collect()
    }

    /// Lists every user, ordered by username.
    pub async fn list_all(&self) -> Result<Vec<User>, sqlx::Error> {
        let rows: Vec<UserRow> = sqlx::query_as(
            r#"
            SELECT id, username, email, display_name, role, created_at, updated_at
            FROM users
            ORDER BY username
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(UserRow::try_into_user).collect()
    }
}

#[async_trait]
impl UserDirectory for UserRepository {
    #[instrument(skip(self), fields(user_id = %id))]
    async fn find_user(&self, id: UserId) -> Result<Option<User>, DirectoryError> {
        self.find_by_id(id).await.map_err(lookup_failed)
    }

    #[instrument(skip(self), fields(role = %role))]
    async fn users_with_role(&self, role: Role) -> Result<Vec<User>, DirectoryError> {
        self.list_by_role(role).await.map_err(lookup_failed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(role: &str) -> UserRow {
        UserRow {
            id: UserId::new().to_string(),
            username: "sana".to_string(),
            email: Some("sana@example.com".to_string()),
            display_name: None,
            role: role.to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn stored_role_names_parse() {
        assert_eq!(row("SubPMO").try_into_user().unwrap().role(), Role::SubPmo);
        assert_eq!(row("MainPMO").try_into_user().unwrap().role(), Role::MainPmo);
    }

    #[test]
    fn unknown_role_is_a_decode_error() {
        let err = row("Intern").try_into_user().unwrap_err();
        assert!(err.to_string().contains("Intern"));
    }
}
