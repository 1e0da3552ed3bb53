//! Durable outbox queue
//!
//! Callers enqueue activities and return immediately; a background
//! dispatcher claims batches and hands them to the delivery engine. The
//! claim is the system's one hard mutual-exclusion point and is delegated
//! to a conditional UPDATE in the database layer.

use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;

use crate::activitypub::{Activity, ActivityType, audience_for_visibility};
use crate::adapters::ContentStore;
use crate::data::{ContentKind, Database, Entity, EntityId, OutboxItem, OutboxStatus, Visibility};
use crate::error::AppError;
use crate::metrics::{ACTIVITIES_ENQUEUED_TOTAL, OUTBOX_PENDING};
use crate::site::Site;
use crate::transform::transformer_for;

/// What to enqueue: a content entity to transform, or a pre-built activity
#[derive(Debug, Clone)]
pub enum OutboxInput {
    Entity { kind: ContentKind, id: i64 },
    Activity(Value),
}

/// The outbox service
#[derive(Clone)]
pub struct Outbox {
    db: Arc<Database>,
    content: Arc<dyn ContentStore>,
    site: Site,
}

fn entity_visibility(entity: &Entity) -> Visibility {
    match entity {
        Entity::Post(post) => post.visibility,
        _ => Visibility::Public,
    }
}

impl Outbox {
    pub fn new(db: Arc<Database>, content: Arc<dyn ContentStore>, site: Site) -> Self {
        Self { db, content, site }
    }

    /// Queue an activity for delivery. Never blocks on delivery.
    ///
    /// Given raw content, the entity is transformed into an object (or a
    /// tombstone for Delete) and wrapped in an activity envelope; a
    /// pre-built activity is accepted as-is.
    pub async fn add(
        &self,
        input: OutboxInput,
        activity_type: ActivityType,
        actor_id: &str,
    ) -> Result<OutboxItem, AppError> {
        let actor = self
            .db
            .get_local_actor(actor_id)
            .await?
            .ok_or(AppError::NotFound)?;

        let (activity_json, entity_ref) = match input {
            OutboxInput::Activity(value) => {
                if !value.is_object() {
                    return Err(AppError::Validation(
                        "Pre-built activity must be a JSON object".to_string(),
                    ));
                }
                (value, None)
            }
            OutboxInput::Entity { kind, id } => {
                let activity = self
                    .build_entity_activity(kind, id, activity_type, &actor.username)
                    .await?;
                (activity, Some((kind, id)))
            }
        };

        let now = Utc::now();
        let item = OutboxItem {
            id: EntityId::new().0,
            actor_id: actor_id.to_string(),
            activity_type: activity_type.as_str().to_string(),
            activity_json: activity_json.to_string(),
            status: OutboxStatus::Pending.as_str().to_string(),
            attempt_count: 0,
            last_error: None,
            entity_kind: entity_ref.map(|(kind, _)| kind.as_str().to_string()),
            entity_id: entity_ref.map(|(_, id)| id),
            created_at: now,
            updated_at: now,
        };

        self.db.insert_outbox_item(&item).await?;

        ACTIVITIES_ENQUEUED_TOTAL
            .with_label_values(&[activity_type.as_str()])
            .inc();
        self.refresh_pending_gauge().await;

        tracing::debug!(
            item = %item.id,
            activity_type = %activity_type,
            actor = %actor.username,
            "Activity enqueued"
        );

        Ok(item)
    }

    /// Transform a content entity into a complete activity envelope.
    async fn build_entity_activity(
        &self,
        kind: ContentKind,
        id: i64,
        activity_type: ActivityType,
        username: &str,
    ) -> Result<Value, AppError> {
        let actor_iri = self.site.actor_iri(username);
        let entity = self.content.get_entity(kind, id).await?;
        let transformer = transformer_for(&entity, &self.site);
        let visibility = entity_visibility(&entity);
        let (to, cc) = audience_for_visibility(&actor_iri, visibility);

        let activity = match activity_type {
            ActivityType::Delete => {
                // Deletes carry a tombstone; the entity's other fields may
                // already be gone.
                let tombstone = transformer.to_tombstone().to_json()?;
                Activity::new(ActivityType::Delete, &actor_iri, tombstone).with_audience(to, cc)
            }
            ActivityType::Add | ActivityType::Remove => {
                // Featured-collection membership changes reference the
                // entity by IRI and name the collection as target.
                Activity::new(activity_type, &actor_iri, Value::String(transformer.to_id()))
                    .with_target(self.site.featured_collection_iri(username))
                    .with_audience(to, cc)
            }
            _ => {
                let object = transformer.to_object()?.to_json()?;
                Activity::new(activity_type, &actor_iri, object).with_audience(to, cc)
            }
        };

        activity.to_json()
    }

    /// Atomically claim up to `max_items` pending items for delivery.
    ///
    /// Claims are exclusive across concurrent dispatchers; an empty result
    /// under contention is a normal skip, not an error.
    pub async fn dequeue_batch(&self, max_items: usize) -> Result<Vec<OutboxItem>, AppError> {
        let items = self.db.dequeue_outbox_batch(max_items).await?;
        if !items.is_empty() {
            self.refresh_pending_gauge().await;
        }
        Ok(items)
    }

    pub async fn mark_complete(&self, item: &OutboxItem) -> Result<(), AppError> {
        self.db.mark_outbox_complete(&item.id).await
    }

    pub async fn mark_failed(&self, item: &OutboxItem, error: &str) -> Result<(), AppError> {
        self.db.mark_outbox_failed(&item.id, error).await
    }

    pub async fn get(&self, id: &str) -> Result<Option<OutboxItem>, AppError> {
        self.db.get_outbox_item(id).await
    }

    pub async fn list(
        &self,
        status: Option<OutboxStatus>,
        limit: usize,
    ) -> Result<Vec<OutboxItem>, AppError> {
        self.db.list_outbox_items(status, limit).await
    }

    /// Remove completed items older than the retention cutoff.
    pub async fn prune_completed(&self, before: chrono::DateTime<Utc>) -> Result<u64, AppError> {
        self.db.prune_completed_outbox(before).await
    }

    async fn refresh_pending_gauge(&self) {
        if let Ok(pending) = self.db.count_outbox_pending().await {
            OUTBOX_PENDING.set(pending);
        }
    }
}
