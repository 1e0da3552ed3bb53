//! Outbox endpoints
//!
//! `POST /outbox` is the primary entry point (`add_to_outbox`): it accepts
//! either a content-entity reference or a pre-built activity, enqueues it,
//! and returns without waiting for delivery. The GET endpoints expose
//! queued items for inspection.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::AppState;
use crate::activitypub::ActivityType;
use crate::data::{ContentKind, OutboxItem, OutboxStatus};
use crate::error::AppError;
use crate::outbox::OutboxInput;

/// Reference to a content entity
#[derive(Debug, Deserialize)]
pub struct EntityRef {
    pub kind: ContentKind,
    pub id: i64,
}

/// `add_to_outbox` request: exactly one of `entity` or `activity`
#[derive(Debug, Deserialize)]
pub struct AddToOutboxRequest {
    pub actor_id: String,
    /// Activity type; optional for pre-built activities carrying a `type`
    #[serde(rename = "type")]
    pub activity_type: Option<String>,
    pub entity: Option<EntityRef>,
    pub activity: Option<Value>,
}

/// Outbox item as exposed for inspection
#[derive(Debug, Serialize)]
pub struct OutboxItemView {
    pub id: String,
    pub activity_json: Value,
    pub actor_id: String,
    pub status: String,
    pub attempt_count: i64,
    pub created_at: DateTime<Utc>,
}

impl OutboxItemView {
    fn from_item(item: OutboxItem) -> Self {
        let activity_json = match serde_json::from_str(&item.activity_json) {
            Ok(value) => value,
            Err(_) => Value::String(item.activity_json.clone()),
        };

        Self {
            id: item.id,
            activity_json,
            actor_id: item.actor_id,
            status: item.status,
            attempt_count: item.attempt_count,
            created_at: item.created_at,
        }
    }
}

fn resolve_activity_type(request: &AddToOutboxRequest) -> Result<ActivityType, AppError> {
    let named = request
        .activity_type
        .as_deref()
        .or_else(|| {
            request
                .activity
                .as_ref()
                .and_then(|activity| activity.get("type"))
                .and_then(Value::as_str)
        })
        .ok_or_else(|| AppError::Validation("Missing activity type".to_string()))?;

    ActivityType::parse(named)
        .ok_or_else(|| AppError::Validation(format!("Unsupported activity type: {}", named)))
}

/// POST /outbox
async fn add_to_outbox(
    State(state): State<AppState>,
    Json(request): Json<AddToOutboxRequest>,
) -> Result<(StatusCode, Json<OutboxItemView>), AppError> {
    let activity_type = resolve_activity_type(&request)?;

    let input = match (request.entity, request.activity) {
        (Some(entity), None) => OutboxInput::Entity {
            kind: entity.kind,
            id: entity.id,
        },
        (None, Some(activity)) => OutboxInput::Activity(activity),
        _ => {
            return Err(AppError::Validation(
                "Provide exactly one of entity or activity".to_string(),
            ));
        }
    };

    let item = state
        .outbox
        .add(input, activity_type, &request.actor_id)
        .await?;

    Ok((StatusCode::ACCEPTED, Json(OutboxItemView::from_item(item))))
}

#[derive(Debug, Deserialize)]
struct ListQuery {
    status: Option<String>,
    limit: Option<usize>,
}

/// GET /outbox
async fn list_outbox(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<OutboxItemView>>, AppError> {
    let status = match query.status.as_deref() {
        Some(raw) => Some(
            OutboxStatus::parse(raw)
                .ok_or_else(|| AppError::Validation(format!("Unknown status: {}", raw)))?,
        ),
        None => None,
    };
    let limit = query.limit.unwrap_or(50).min(500);

    let items = state.outbox.list(status, limit).await?;
    Ok(Json(
        items.into_iter().map(OutboxItemView::from_item).collect(),
    ))
}

/// GET /outbox/:id
async fn get_outbox_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<OutboxItemView>, AppError> {
    let item = state.outbox.get(&id).await?.ok_or(AppError::NotFound)?;
    Ok(Json(OutboxItemView::from_item(item)))
}

/// Create the outbox router
pub fn outbox_router() -> Router<AppState> {
    Router::new()
        .route("/outbox", post(add_to_outbox).get(list_outbox))
        .route("/outbox/:id", get(get_outbox_item))
}
