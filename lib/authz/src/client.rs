//! SpiceDB client for capability checks.

use crate::error::AuthzError;
use crate::oracle::PermissionOracle;
use crate::types::{Capability, Relationship, Resource, Subject};
use async_trait::async_trait;
use pmo_tracker_core::UserId;
use rootcause::prelude::Report;
use spicedb_client::SpicedbClient;
use spicedb_grpc::authzed::api::v1::{
    CheckPermissionRequest, Consistency, ObjectReference, RelationshipUpdate, SubjectReference,
    WriteRelationshipsRequest, check_permission_response::Permissionship, relationship_update,
};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, instrument};

/// SpiceDB authorization client wrapper.
///
/// The underlying client needs `&mut` access per call, so a single
/// connection is shared behind a mutex.
#[derive(Clone)]
pub struct AuthzClient {
    inner: Arc<Mutex<SpicedbClient>>,
}

impl AuthzClient {
    /// Connects to SpiceDB.
    ///
    /// # Arguments
    ///
    /// * `endpoint` - The SpiceDB gRPC endpoint (e.g., "http://localhost:50051")
    /// * `preshared_key` - The preshared key for authentication
    ///
    /// The endpoint and key are leaked to satisfy the `'static` bounds of
    /// the gRPC client; one client lives for the whole process.
    pub async fn new(endpoint: String, preshared_key: String) -> Result<Self, Report<AuthzError>> {
        let endpoint: &'static str = Box::leak(endpoint.into_boxed_str());
        let preshared_key: &'static str = Box::leak(preshared_key.into_boxed_str());

        let client = SpicedbClient::from_url_and_preshared_key(endpoint, preshared_key)
            .await
            .map_err(|e| AuthzError::ConnectionFailed {
                details: e.to_string(),
            })?;

        Ok(Self {
            inner: Arc::new(Mutex::new(client)),
        })
    }

    /// Checks a permission for a subject on a resource.
    #[instrument(skip(self), fields(resource = %resource.resource_type, permission = %permission))]
    pub async fn check_permission(
        &self,
        resource: &Resource,
        permission: &str,
        subject: &Subject,
    ) -> Result<bool, Report<AuthzError>> {
        let request = CheckPermissionRequest {
            resource: Some(ObjectReference {
                object_type: resource.resource_type.as_str().to_string(),
                object_id: resource.id.clone(),
            }),
            permission: permission.to_string(),
            subject: Some(SubjectReference {
                object: Some(ObjectReference {
                    object_type: subject.subject_type.clone(),
                    object_id: subject.id.clone(),
                }),
                optional_relation: String::new(),
            }),
            consistency: Some(Consistency {
                requirement: Some(
                    spicedb_grpc::authzed::api::v1::consistency::Requirement::FullyConsistent(true),
                ),
            }),
            ..Default::default()
        };

        let mut client = self.inner.lock().await;
        let response =
            client
                .check_permission(request)
                .await
                .map_err(|e| AuthzError::RequestFailed {
                    details: e.to_string(),
                })?;

        let has_permission = response.permissionship() == Permissionship::HasPermission;
        debug!(has_permission, "permission check result");

        Ok(has_permission)
    }

    /// Writes (touches) a relationship.
    #[instrument(skip(self), fields(resource = %relationship.resource.resource_type, relation = %relationship.relation))]
    pub async fn write_relationship(
        &self,
        relationship: &Relationship,
    ) -> Result<(), Report<AuthzError>> {
        let update = RelationshipUpdate {
            operation: relationship_update::Operation::Touch as i32,
            relationship: Some(spicedb_grpc::authzed::api::v1::Relationship {
                resource: Some(ObjectReference {
                    object_type: relationship.resource.resource_type.as_str().to_string(),
                    object_id: relationship.resource.id.clone(),
                }),
                relation: relationship.relation.clone(),
                subject: Some(SubjectReference {
                    object: Some(ObjectReference {
                        object_type: relationship.subject.subject_type.clone(),
                        object_id: relationship.subject.id.clone(),
                    }),
                    optional_relation: String::new(),
                }),
                optional_caveat: None,
            }),
        };

        let request = WriteRelationshipsRequest {
            updates: vec![update],
            ..Default::default()
        };

        let mut client = self.inner.lock().await;
        client
            .write_relationships(request)
            .await
            .map_err(|e| AuthzError::RequestFailed {
                details: e.to_string(),
            })?;

        debug!("relationship written");
        Ok(())
    }

    /// Writes the authorization schema to SpiceDB.
    ///
    /// Called once on server startup.
    #[instrument(skip(self, schema))]
    pub async fn write_schema(&self, schema: &str) -> Result<(), Report<AuthzError>> {
        let mut client = self.inner.lock().await;
        client
            .write_schema(schema)
            .await
            .map_err(|e| AuthzError::RequestFailed {
                details: e.to_string(),
            })?;

        debug!("schema written");
        Ok(())
    }
}

#[async_trait]
impl PermissionOracle for AuthzClient {
    async fn has_capability(
        &self,
        actor: UserId,
        capability: Capability,
    ) -> Result<bool, Report<AuthzError>> {
        self.check_permission(
            &Resource::platform(),
            capability.spicedb_permission(),
            &Subject::user(actor),
        )
        .await
    }
}
