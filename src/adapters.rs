//! Abstract collaborator interfaces
//!
//! The federation core talks to its host through these traits: the content
//! store (entity snapshots and lifecycle state), the actor/follower
//! directory, the signing-key store, and the outbound transport. The
//! SQLite-backed implementations live here too; tests substitute mocks.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::data::{
    ContentKind, Database, Entity, EntityState, FollowerError, FollowerRecord, LocalActor,
};
use crate::error::AppError;
use crate::transform::TransformError;

/// Read access to the host CMS's content
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Resolve an entity snapshot.
    async fn get_entity(&self, kind: ContentKind, id: i64) -> Result<Entity, AppError>;

    /// Lifecycle state of an entity (status, visibility, federation state).
    async fn get_entity_state(&self, kind: ContentKind, id: i64) -> Result<EntityState, AppError>;
}

/// Directory of local actors and their followers
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ActorDirectory: Send + Sync {
    async fn get_actor_by_id(&self, actor_id: &str) -> Result<LocalActor, AppError>;

    async fn list_followers(&self, actor_id: &str) -> Result<Vec<FollowerRecord>, AppError>;

    /// Persist a follower; invalid followers are rejected, duplicates by
    /// IRI update in place. Returns the record key.
    async fn save_follower(&self, follower: &FollowerRecord) -> Result<String, AppError>;

    async fn record_follower_error(
        &self,
        follower_id: &str,
        error: &FollowerError,
    ) -> Result<(), AppError>;

    async fn clear_follower_errors(&self, follower_id: &str) -> Result<(), AppError>;
}

/// Access to local actors' signing keys
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait KeyStore: Send + Sync {
    /// PEM-encoded private key for the actor.
    async fn get_private_key(&self, actor_id: &str) -> Result<String, AppError>;
}

/// Response from an outbound POST
#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: u16,
}

impl TransportResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Outbound wire protocol
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Transport: Send + Sync {
    /// POST a signed body to a remote inbox with the given timeout.
    async fn http_post(
        &self,
        url: &str,
        headers: Vec<(String, String)>,
        body: Vec<u8>,
        timeout: Duration,
    ) -> Result<TransportResponse, AppError>;
}

// =============================================================================
// Concrete implementations
// =============================================================================

/// Content store backed by the snapshot table the CMS pushes into
pub struct SnapshotContentStore {
    db: Arc<Database>,
}

impl SnapshotContentStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ContentStore for SnapshotContentStore {
    async fn get_entity(&self, kind: ContentKind, id: i64) -> Result<Entity, AppError> {
        self.db
            .get_content_snapshot(kind, id)
            .await?
            .ok_or_else(|| {
                AppError::Transform(TransformError::EntityVanished {
                    kind: kind.as_str().to_string(),
                    id,
                })
            })
    }

    async fn get_entity_state(&self, kind: ContentKind, id: i64) -> Result<EntityState, AppError> {
        self.db
            .get_snapshot_state(kind, id)
            .await?
            .ok_or_else(|| {
                AppError::Transform(TransformError::EntityVanished {
                    kind: kind.as_str().to_string(),
                    id,
                })
            })
    }
}

#[async_trait]
impl ActorDirectory for Database {
    async fn get_actor_by_id(&self, actor_id: &str) -> Result<LocalActor, AppError> {
        self.get_local_actor(actor_id)
            .await?
            .ok_or(AppError::NotFound)
    }

    async fn list_followers(&self, actor_id: &str) -> Result<Vec<FollowerRecord>, AppError> {
        Database::list_followers(self, actor_id).await
    }

    async fn save_follower(&self, follower: &FollowerRecord) -> Result<String, AppError> {
        Database::save_follower(self, follower).await
    }

    async fn record_follower_error(
        &self,
        follower_id: &str,
        error: &FollowerError,
    ) -> Result<(), AppError> {
        Database::record_follower_error(self, follower_id, error).await
    }

    async fn clear_follower_errors(&self, follower_id: &str) -> Result<(), AppError> {
        Database::clear_follower_errors(self, follower_id).await
    }
}

#[async_trait]
impl KeyStore for Database {
    async fn get_private_key(&self, actor_id: &str) -> Result<String, AppError> {
        let actor = self
            .get_local_actor(actor_id)
            .await?
            .ok_or(AppError::NotFound)?;

        if actor.private_key_pem.is_empty() {
            return Err(AppError::Signing(format!(
                "actor {} has no private key",
                actor_id
            )));
        }

        Ok(actor.private_key_pem)
    }
}

/// Transport backed by reqwest
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn http_post(
        &self,
        url: &str,
        headers: Vec<(String, String)>,
        body: Vec<u8>,
        timeout: Duration,
    ) -> Result<TransportResponse, AppError> {
        let mut request = self.client.post(url).timeout(timeout);
        for (name, value) in headers {
            request = request.header(name, value);
        }

        let response = request.body(body).send().await?;

        Ok(TransportResponse {
            status: response.status().as_u16(),
        })
    }
}
