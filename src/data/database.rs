//! SQLite database operations
//!
//! All database access goes through this module.
//! Uses SQLx with runtime queries and embedded migrations.

use chrono::{DateTime, Utc};
use sqlx::{Pool, Sqlite, SqlitePool};
use std::path::Path;

use super::models::*;
use crate::error::AppError;

/// Database connection pool wrapper.
pub struct Database {
    pool: Pool<Sqlite>,
}

/// Follower row as stored; `errors` is a JSON text column.
#[derive(sqlx::FromRow)]
struct FollowerRow {
    id: String,
    actor_id: String,
    iri: String,
    preferred_username: String,
    name: Option<String>,
    summary: Option<String>,
    inbox: String,
    shared_inbox: Option<String>,
    public_key_id: String,
    public_key_pem: String,
    icon_url: Option<String>,
    errors: String,
    published: DateTime<Utc>,
    updated: DateTime<Utc>,
}

impl FollowerRow {
    fn into_record(self) -> FollowerRecord {
        let errors = serde_json::from_str(&self.errors).unwrap_or_else(|e| {
            tracing::warn!(follower = %self.iri, error = %e, "Discarding unreadable error list");
            Vec::new()
        });

        FollowerRecord {
            id: self.id,
            actor_id: self.actor_id,
            iri: self.iri,
            preferred_username: self.preferred_username,
            name: self.name,
            summary: self.summary,
            inbox: self.inbox,
            shared_inbox: self.shared_inbox,
            public_key_id: self.public_key_id,
            public_key_pem: self.public_key_pem,
            icon_url: self.icon_url,
            errors,
            published: self.published,
            updated: self.updated,
        }
    }
}

impl Database {
    /// Open (creating if necessary) the SQLite database and run migrations.
    pub async fn connect(path: &Path) -> Result<Self, AppError> {
        // Create parent directory if it doesn't exist
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| AppError::Database(sqlx::Error::Io(e)))?;
        }

        let connection_string = format!("sqlite:{}?mode=rwc", path.display());
        let pool = SqlitePool::connect(&connection_string).await?;

        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(Self { pool })
    }

    // =========================================================================
    // Local actors
    // =========================================================================

    /// Insert or update a local actor, keyed by username.
    pub async fn upsert_local_actor(&self, actor: &LocalActor) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO local_actors
                (id, username, display_name, summary, icon_url, actor_type,
                 private_key_pem, public_key_pem, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (username) DO UPDATE SET
                display_name = excluded.display_name,
                summary = excluded.summary,
                icon_url = excluded.icon_url,
                actor_type = excluded.actor_type,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&actor.id)
        .bind(&actor.username)
        .bind(&actor.display_name)
        .bind(&actor.summary)
        .bind(&actor.icon_url)
        .bind(&actor.actor_type)
        .bind(&actor.private_key_pem)
        .bind(&actor.public_key_pem)
        .bind(actor.created_at)
        .bind(actor.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn get_local_actor(&self, id: &str) -> Result<Option<LocalActor>, AppError> {
        let actor = sqlx::query_as::<_, LocalActor>("SELECT * FROM local_actors WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(actor)
    }

    pub async fn get_local_actor_by_username(
        &self,
        username: &str,
    ) -> Result<Option<LocalActor>, AppError> {
        let actor =
            sqlx::query_as::<_, LocalActor>("SELECT * FROM local_actors WHERE username = ?")
                .bind(username)
                .fetch_optional(&self.pool)
                .await?;

        Ok(actor)
    }

    // =========================================================================
    // Followers
    // =========================================================================

    /// Persist a follower, deduplicating by the remote actor IRI.
    ///
    /// A second save for the same `(actor_id, iri)` pair updates the mirrored
    /// profile fields in place; the record key, error list, and `published`
    /// timestamp of the original row are retained.
    ///
    /// # Errors
    /// Returns a validation error (and persists nothing) when required
    /// follower attributes are missing.
    pub async fn save_follower(&self, follower: &FollowerRecord) -> Result<String, AppError> {
        if !follower.is_valid() {
            return Err(AppError::Validation(format!(
                "Follower {} is missing required attributes",
                follower.iri
            )));
        }

        let errors_json = serde_json::to_string(&follower.errors)
            .map_err(|e| AppError::Validation(format!("Unserializable error list: {}", e)))?;

        let id: String = sqlx::query_scalar(
            r#"
            INSERT INTO followers
                (id, actor_id, iri, preferred_username, name, summary, inbox,
                 shared_inbox, public_key_id, public_key_pem, icon_url, errors,
                 published, updated)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (actor_id, iri) DO UPDATE SET
                preferred_username = excluded.preferred_username,
                name = excluded.name,
                summary = excluded.summary,
                inbox = excluded.inbox,
                shared_inbox = excluded.shared_inbox,
                public_key_id = excluded.public_key_id,
                public_key_pem = excluded.public_key_pem,
                icon_url = excluded.icon_url,
                updated = excluded.updated
            RETURNING id
            "#,
        )
        .bind(&follower.id)
        .bind(&follower.actor_id)
        .bind(&follower.iri)
        .bind(&follower.preferred_username)
        .bind(&follower.name)
        .bind(&follower.summary)
        .bind(&follower.inbox)
        .bind(&follower.shared_inbox)
        .bind(&follower.public_key_id)
        .bind(&follower.public_key_pem)
        .bind(&follower.icon_url)
        .bind(&errors_json)
        .bind(follower.published)
        .bind(follower.updated)
        .fetch_one(&self.pool)
        .await?;

        Ok(id)
    }

    pub async fn list_followers(&self, actor_id: &str) -> Result<Vec<FollowerRecord>, AppError> {
        let rows = sqlx::query_as::<_, FollowerRow>(
            "SELECT * FROM followers WHERE actor_id = ? ORDER BY published",
        )
        .bind(actor_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(FollowerRow::into_record).collect())
    }

    pub async fn get_follower(&self, id: &str) -> Result<Option<FollowerRecord>, AppError> {
        let row = sqlx::query_as::<_, FollowerRow>("SELECT * FROM followers WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(FollowerRow::into_record))
    }

    pub async fn delete_follower(&self, id: &str) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM followers WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Append a delivery-error descriptor to a follower's error list.
    ///
    /// Implemented as a single JSON append statement so that concurrent
    /// delivery outcomes for the same follower cannot lose updates.
    pub async fn record_follower_error(
        &self,
        follower_id: &str,
        error: &FollowerError,
    ) -> Result<(), AppError> {
        let descriptor = serde_json::to_string(error)
            .map_err(|e| AppError::Validation(format!("Unserializable error descriptor: {}", e)))?;

        sqlx::query(
            "UPDATE followers SET errors = json_insert(errors, '$[#]', json(?)), updated = ? WHERE id = ?",
        )
        .bind(&descriptor)
        .bind(Utc::now())
        .bind(follower_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Reset a follower's error list after a successful delivery.
    pub async fn clear_follower_errors(&self, follower_id: &str) -> Result<(), AppError> {
        sqlx::query("UPDATE followers SET errors = '[]', updated = ? WHERE id = ? AND errors != '[]'")
            .bind(Utc::now())
            .bind(follower_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Followers whose accumulated error count has reached the threshold.
    ///
    /// Removal/backoff is external policy; this only surfaces candidates.
    pub async fn list_followers_over_error_threshold(
        &self,
        threshold: usize,
    ) -> Result<Vec<FollowerRecord>, AppError> {
        let rows = sqlx::query_as::<_, FollowerRow>(
            "SELECT * FROM followers WHERE json_array_length(errors) >= ? ORDER BY updated",
        )
        .bind(threshold as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(FollowerRow::into_record).collect())
    }

    // =========================================================================
    // Outbox
    // =========================================================================

    /// Persist a new outbox item in `pending` state.
    pub async fn insert_outbox_item(&self, item: &OutboxItem) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO outbox
                (id, actor_id, activity_type, activity_json, status,
                 attempt_count, last_error, entity_kind, entity_id,
                 created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&item.id)
        .bind(&item.actor_id)
        .bind(&item.activity_type)
        .bind(&item.activity_json)
        .bind(&item.status)
        .bind(item.attempt_count)
        .bind(&item.last_error)
        .bind(&item.entity_kind)
        .bind(item.entity_id)
        .bind(item.created_at)
        .bind(item.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Atomically claim up to `max_items` pending outbox items.
    ///
    /// The claim is a single conditional UPDATE guarded by the current
    /// status, so concurrent dispatchers can never both claim the same
    /// item; a loser simply observes fewer (or zero) returned rows.
    pub async fn dequeue_outbox_batch(&self, max_items: usize) -> Result<Vec<OutboxItem>, AppError> {
        let items = sqlx::query_as::<_, OutboxItem>(
            r#"
            UPDATE outbox
            SET status = 'processing',
                attempt_count = attempt_count + 1,
                updated_at = ?
            WHERE status = 'pending'
              AND id IN (
                  SELECT id FROM outbox
                  WHERE status = 'pending'
                  ORDER BY created_at, id
                  LIMIT ?
              )
            RETURNING *
            "#,
        )
        .bind(Utc::now())
        .bind(max_items as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    /// Finalize a processing item as delivered.
    pub async fn mark_outbox_complete(&self, id: &str) -> Result<(), AppError> {
        sqlx::query(
            "UPDATE outbox SET status = 'complete', last_error = NULL, updated_at = ? WHERE id = ?",
        )
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Finalize a processing item as failed, keeping it queryable.
    pub async fn mark_outbox_failed(&self, id: &str, error: &str) -> Result<(), AppError> {
        sqlx::query("UPDATE outbox SET status = 'failed', last_error = ?, updated_at = ? WHERE id = ?")
            .bind(error)
            .bind(Utc::now())
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    pub async fn get_outbox_item(&self, id: &str) -> Result<Option<OutboxItem>, AppError> {
        let item = sqlx::query_as::<_, OutboxItem>("SELECT * FROM outbox WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(item)
    }

    pub async fn list_outbox_items(
        &self,
        status: Option<OutboxStatus>,
        limit: usize,
    ) -> Result<Vec<OutboxItem>, AppError> {
        let items = match status {
            Some(status) => {
                sqlx::query_as::<_, OutboxItem>(
                    "SELECT * FROM outbox WHERE status = ? ORDER BY created_at DESC, id DESC LIMIT ?",
                )
                .bind(status.as_str())
                .bind(limit as i64)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, OutboxItem>(
                    "SELECT * FROM outbox ORDER BY created_at DESC, id DESC LIMIT ?",
                )
                .bind(limit as i64)
                .fetch_all(&self.pool)
                .await?
            }
        };

        Ok(items)
    }

    pub async fn count_outbox_pending(&self) -> Result<i64, AppError> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM outbox WHERE status = 'pending'")
                .fetch_one(&self.pool)
                .await?;

        Ok(count)
    }

    /// Delete completed items older than the cutoff. Retention policy is
    /// external; failed items are kept for diagnostics.
    pub async fn prune_completed_outbox(
        &self,
        before: DateTime<Utc>,
    ) -> Result<u64, AppError> {
        let result =
            sqlx::query("DELETE FROM outbox WHERE status = 'complete' AND updated_at < ?")
                .bind(before)
                .execute(&self.pool)
                .await?;

        Ok(result.rows_affected())
    }

    // =========================================================================
    // Federation state
    // =========================================================================

    /// Federation state of an entity; unfederated when never recorded.
    pub async fn federation_state(
        &self,
        kind: ContentKind,
        entity_id: i64,
    ) -> Result<FederationState, AppError> {
        let state: Option<String> = sqlx::query_scalar(
            "SELECT state FROM federation_state WHERE entity_kind = ? AND entity_id = ?",
        )
        .bind(kind.as_str())
        .bind(entity_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(state
            .as_deref()
            .and_then(FederationState::parse)
            .unwrap_or(FederationState::Unfederated))
    }

    pub async fn set_federation_state(
        &self,
        kind: ContentKind,
        entity_id: i64,
        state: FederationState,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO federation_state (entity_kind, entity_id, state, updated_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT (entity_kind, entity_id) DO UPDATE SET
                state = excluded.state,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(kind.as_str())
        .bind(entity_id)
        .bind(state.as_str())
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    // =========================================================================
    // Content snapshots
    // =========================================================================

    /// Store the latest snapshot of a content entity.
    pub async fn upsert_content_snapshot(
        &self,
        entity: &Entity,
        status: ContentStatus,
        visibility: Visibility,
    ) -> Result<(), AppError> {
        let payload = serde_json::to_string(entity)
            .map_err(|e| AppError::Validation(format!("Unserializable entity: {}", e)))?;

        sqlx::query(
            r#"
            INSERT INTO content_snapshots (entity_kind, entity_id, payload, status, visibility, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT (entity_kind, entity_id) DO UPDATE SET
                payload = excluded.payload,
                status = excluded.status,
                visibility = excluded.visibility,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(entity.kind().as_str())
        .bind(entity.id())
        .bind(&payload)
        .bind(status.as_str())
        .bind(visibility.as_str())
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn get_content_snapshot(
        &self,
        kind: ContentKind,
        entity_id: i64,
    ) -> Result<Option<Entity>, AppError> {
        let payload: Option<String> = sqlx::query_scalar(
            "SELECT payload FROM content_snapshots WHERE entity_kind = ? AND entity_id = ?",
        )
        .bind(kind.as_str())
        .bind(entity_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(payload) = payload else {
            return Ok(None);
        };

        let entity = serde_json::from_str(&payload)
            .map_err(|e| AppError::Validation(format!("Unreadable entity snapshot: {}", e)))?;
        Ok(Some(entity))
    }

    /// Lifecycle state of an entity as last reported by the content store.
    pub async fn get_snapshot_state(
        &self,
        kind: ContentKind,
        entity_id: i64,
    ) -> Result<Option<EntityState>, AppError> {
        let row: Option<(String, String)> = sqlx::query_as(
            "SELECT status, visibility FROM content_snapshots WHERE entity_kind = ? AND entity_id = ?",
        )
        .bind(kind.as_str())
        .bind(entity_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some((status, visibility)) = row else {
            return Ok(None);
        };

        let status: ContentStatus = serde_json::from_value(serde_json::Value::String(status))
            .map_err(|e| AppError::Validation(format!("Unknown content status: {}", e)))?;
        let visibility: Visibility = serde_json::from_value(serde_json::Value::String(visibility))
            .map_err(|e| AppError::Validation(format!("Unknown visibility: {}", e)))?;
        let federation_state = self.federation_state(kind, entity_id).await?;

        Ok(Some(EntityState {
            status,
            visibility,
            federation_state,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::EntityId;
    use tempfile::TempDir;

    async fn test_db() -> (Database, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db = Database::connect(&temp_dir.path().join("test.db"))
            .await
            .unwrap();
        (db, temp_dir)
    }

    fn follower(actor_id: &str, iri: &str) -> FollowerRecord {
        FollowerRecord {
            id: EntityId::new().0,
            actor_id: actor_id.to_string(),
            iri: iri.to_string(),
            preferred_username: "alice".to_string(),
            name: Some("Alice".to_string()),
            summary: None,
            inbox: format!("{}/inbox", iri),
            shared_inbox: None,
            public_key_id: format!("{}#main-key", iri),
            public_key_pem: "-----BEGIN PUBLIC KEY-----\ntest\n-----END PUBLIC KEY-----".to_string(),
            icon_url: None,
            errors: Vec::new(),
            published: Utc::now(),
            updated: Utc::now(),
        }
    }

    fn outbox_item(created_at: DateTime<Utc>) -> OutboxItem {
        OutboxItem {
            id: EntityId::new().0,
            actor_id: "actor-1".to_string(),
            activity_type: "Create".to_string(),
            activity_json: r#"{"type":"Create"}"#.to_string(),
            status: "pending".to_string(),
            attempt_count: 0,
            last_error: None,
            entity_kind: Some("post".to_string()),
            entity_id: Some(1),
            created_at,
            updated_at: created_at,
        }
    }

    #[tokio::test]
    async fn save_follower_twice_with_same_iri_updates_in_place() {
        let (db, _tmp) = test_db().await;
        let iri = "https://remote.example/users/alice";

        let first = follower("actor-1", iri);
        let first_id = db.save_follower(&first).await.unwrap();

        let mut second = follower("actor-1", iri);
        second.name = Some("Alice Renamed".to_string());
        let second_id = db.save_follower(&second).await.unwrap();

        assert_eq!(first_id, second_id, "second save must update in place");

        let followers = db.list_followers("actor-1").await.unwrap();
        assert_eq!(followers.len(), 1);
        assert_eq!(followers[0].name.as_deref(), Some("Alice Renamed"));
        assert_eq!(followers[0].published, first.published);
    }

    #[tokio::test]
    async fn save_follower_rejects_missing_public_key_pem() {
        let (db, _tmp) = test_db().await;

        let mut invalid = follower("actor-1", "https://remote.example/users/bob");
        invalid.public_key_pem = String::new();

        let result = db.save_follower(&invalid).await;
        assert!(matches!(result, Err(AppError::Validation(_))));
        assert!(db.list_followers("actor-1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn record_and_clear_follower_errors() {
        let (db, _tmp) = test_db().await;
        let id = db
            .save_follower(&follower("actor-1", "https://remote.example/users/alice"))
            .await
            .unwrap();

        let error = FollowerError {
            at: Utc::now(),
            status: Some(502),
            message: "Bad Gateway".to_string(),
        };
        db.record_follower_error(&id, &error).await.unwrap();
        db.record_follower_error(&id, &error).await.unwrap();

        let record = db.get_follower(&id).await.unwrap().unwrap();
        assert_eq!(record.errors.len(), 2);
        assert_eq!(record.errors[0].status, Some(502));

        let flagged = db.list_followers_over_error_threshold(2).await.unwrap();
        assert_eq!(flagged.len(), 1);

        db.clear_follower_errors(&id).await.unwrap();
        let record = db.get_follower(&id).await.unwrap().unwrap();
        assert!(record.errors.is_empty());
    }

    #[tokio::test]
    async fn dequeue_claims_items_exclusively() {
        let (db, _tmp) = test_db().await;

        let item = outbox_item(Utc::now());
        db.insert_outbox_item(&item).await.unwrap();

        let first = db.dequeue_outbox_batch(10).await.unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].status, "processing");
        assert_eq!(first[0].attempt_count, 1);

        // The item is already claimed; a second dispatcher gets nothing.
        let second = db.dequeue_outbox_batch(10).await.unwrap();
        assert!(second.is_empty());
    }

    #[tokio::test]
    async fn dequeue_respects_batch_limit_and_enqueue_order() {
        let (db, _tmp) = test_db().await;

        let base = Utc::now();
        for offset in 0..3 {
            let mut item = outbox_item(base + chrono::Duration::seconds(offset));
            item.entity_id = Some(offset);
            db.insert_outbox_item(&item).await.unwrap();
        }

        let claimed = db.dequeue_outbox_batch(2).await.unwrap();
        assert_eq!(claimed.len(), 2);
        assert_eq!(claimed[0].entity_id, Some(0));
        assert_eq!(claimed[1].entity_id, Some(1));

        let rest = db.dequeue_outbox_batch(2).await.unwrap();
        assert_eq!(rest.len(), 1);
        assert_eq!(rest[0].entity_id, Some(2));
    }

    #[tokio::test]
    async fn mark_complete_and_failed_finalize_status() {
        let (db, _tmp) = test_db().await;

        let first = outbox_item(Utc::now());
        let second = outbox_item(Utc::now() + chrono::Duration::seconds(1));
        db.insert_outbox_item(&first).await.unwrap();
        db.insert_outbox_item(&second).await.unwrap();
        db.dequeue_outbox_batch(10).await.unwrap();

        db.mark_outbox_complete(&first.id).await.unwrap();
        db.mark_outbox_failed(&second.id, "signing key missing")
            .await
            .unwrap();

        let complete = db.get_outbox_item(&first.id).await.unwrap().unwrap();
        assert_eq!(complete.status, "complete");

        let failed = db.get_outbox_item(&second.id).await.unwrap().unwrap();
        assert_eq!(failed.status, "failed");
        assert_eq!(failed.last_error.as_deref(), Some("signing key missing"));

        // Failed items stay queryable for diagnostics.
        let failed_items = db
            .list_outbox_items(Some(OutboxStatus::Failed), 10)
            .await
            .unwrap();
        assert_eq!(failed_items.len(), 1);
    }

    #[tokio::test]
    async fn prune_removes_only_old_completed_items() {
        let (db, _tmp) = test_db().await;

        let completed = outbox_item(Utc::now());
        let failed = outbox_item(Utc::now());
        db.insert_outbox_item(&completed).await.unwrap();
        db.insert_outbox_item(&failed).await.unwrap();
        db.dequeue_outbox_batch(10).await.unwrap();
        db.mark_outbox_complete(&completed.id).await.unwrap();
        db.mark_outbox_failed(&failed.id, "unreachable").await.unwrap();

        let pruned = db
            .prune_completed_outbox(Utc::now() + chrono::Duration::hours(1))
            .await
            .unwrap();
        assert_eq!(pruned, 1);

        assert!(db.get_outbox_item(&completed.id).await.unwrap().is_none());
        assert!(db.get_outbox_item(&failed.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn federation_state_defaults_to_unfederated() {
        let (db, _tmp) = test_db().await;

        let state = db.federation_state(ContentKind::Post, 42).await.unwrap();
        assert_eq!(state, FederationState::Unfederated);

        db.set_federation_state(ContentKind::Post, 42, FederationState::Federated)
            .await
            .unwrap();
        let state = db.federation_state(ContentKind::Post, 42).await.unwrap();
        assert_eq!(state, FederationState::Federated);
    }

    #[tokio::test]
    async fn content_snapshot_round_trips() {
        let (db, _tmp) = test_db().await;

        let entity = Entity::Term(TermEntity {
            id: 7,
            taxonomy: "category".to_string(),
            name: "Announcements".to_string(),
            slug: "announcements".to_string(),
            description: None,
        });
        db.upsert_content_snapshot(&entity, ContentStatus::Publish, Visibility::Public)
            .await
            .unwrap();

        let loaded = db
            .get_content_snapshot(ContentKind::Term, 7)
            .await
            .unwrap()
            .expect("snapshot should exist");
        assert!(matches!(loaded, Entity::Term(term) if term.name == "Announcements"));

        let state = db
            .get_snapshot_state(ContentKind::Term, 7)
            .await
            .unwrap()
            .expect("state should exist");
        assert_eq!(state.status, ContentStatus::Publish);
        assert_eq!(state.federation_state, FederationState::Unfederated);
    }
}
