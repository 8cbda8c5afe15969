//! Permission oracle selection.

use crate::config::SpicedbSettings;
use crate::db::UserRepository;
use pmo_tracker_authz::{
    AuthzClient, AuthzError, PermissionOracle, Relationship, RoleCapabilityOracle, SCHEMA,
};
use pmo_tracker_core::Result;
use std::sync::Arc;
use tracing::info;

/// Builds the permission oracle.
///
/// Without SpiceDB settings, capabilities follow each user's stored role.
/// With them, the schema is written and every user's role is mirrored as a
/// platform relationship before the client is returned.
///
/// # Errors
///
/// Returns an error if SpiceDB cannot be reached or the users cannot be read.
pub async fn build_oracle(
    spicedb: Option<SpicedbSettings>,
    users: UserRepository,
) -> Result<Arc<dyn PermissionOracle>, AuthzError> {
    let Some(settings) = spicedb else {
        info!("using role-based capability checks");
        return Ok(Arc::new(RoleCapabilityOracle::new(users)));
    };

    let client = AuthzClient::new(settings.endpoint, settings.preshared_key).await?;
    client.write_schema(SCHEMA).await?;
    let synced = sync_roles(&client, &users).await?;
    info!(synced, "using SpiceDB capability checks");
    Ok(Arc::new(client))
}

/// Writes one platform relationship per user for their role.
///
/// Runs at startup only; relationships for roles a user no longer holds
/// are left in place.
async fn sync_roles(client: &AuthzClient, users: &UserRepository) -> Result<usize, AuthzError> {
    let all = users
        .list_all()
        .await
        .map_err(|e| AuthzError::RequestFailed {
            details: format!("failed to list users: {e}"),
        })?;

    for user in &all {
        client
            .write_relationship(&Relationship::platform_role(user.role(), user.id()))
            .await?;
    }
    Ok(all.len())
}
