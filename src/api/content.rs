//! Content lifecycle endpoint
//!
//! The host CMS publishes entity snapshots and typed lifecycle transitions
//! here; the scheduler consumes them from the event channel. This replaces
//! in-process framework hooks with explicit message passing.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;

use crate::AppState;
use crate::data::{ContentStatus, Entity, Visibility};
use crate::error::AppError;
use crate::scheduler::LifecycleEvent;

/// A lifecycle notification from the content store
#[derive(Debug, Deserialize)]
pub struct ContentEventRequest {
    /// Latest entity snapshot; omitted for deletions of vanished entities
    pub snapshot: Option<Entity>,
    /// The transition that occurred
    pub transition: LifecycleEvent,
}

fn snapshot_state(entity: &Entity) -> (ContentStatus, Visibility) {
    match entity {
        Entity::Post(post) => (post.status, post.visibility),
        _ => (ContentStatus::Publish, Visibility::Public),
    }
}

/// POST /content/events
async fn publish_event(
    State(state): State<AppState>,
    Json(request): Json<ContentEventRequest>,
) -> Result<StatusCode, AppError> {
    // 1. Store the snapshot so transformation sees the entity's new state.
    if let Some(entity) = &request.snapshot {
        let (status, visibility) = snapshot_state(entity);
        state
            .db
            .upsert_content_snapshot(entity, status, visibility)
            .await?;
    }

    // 2. Hand the transition to the scheduler. Enqueue is fast; triage and
    //    delivery happen off this request.
    state
        .events_tx
        .send(request.transition)
        .await
        .map_err(|_| AppError::Internal(anyhow::anyhow!("scheduler channel closed")))?;

    Ok(StatusCode::ACCEPTED)
}

/// Create the content events router
pub fn content_router() -> Router<AppState> {
    Router::new().route("/content/events", post(publish_event))
}
