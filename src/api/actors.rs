//! Actor document endpoint
//!
//! Serves local actor documents, the dereference target for the `actor`
//! and `keyId` IRIs in everything this engine emits.

use axum::Router;
use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use http::header;

use crate::AppState;
use crate::activitypub::{Actor, ActorEndpoints};
use crate::data::LocalActor;
use crate::error::AppError;
use crate::site::Site;

/// Build the ActivityPub document for a local actor.
pub fn actor_document(actor: &LocalActor, site: &Site) -> Actor {
    let mut document = Actor::new(
        site.actor_iri(&actor.username),
        &actor.actor_type,
        &actor.username,
        &actor.public_key_pem,
    );
    document.name = actor.display_name.clone();
    document.summary = actor.summary.clone();
    document.endpoints = Some(ActorEndpoints {
        shared_inbox: Some(format!("{}/inbox", site.base_url())),
    });
    document.icon = actor.icon_url.as_deref().map(|url| {
        serde_json::json!({
            "type": "Image",
            "url": url,
        })
    });
    document
}

/// GET /users/:username
async fn get_actor(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<Response, AppError> {
    let actor = state
        .db
        .get_local_actor_by_username(&username)
        .await?
        .ok_or(AppError::NotFound)?;

    let document = actor_document(&actor, &state.site).to_json()?;

    Ok((
        [(header::CONTENT_TYPE, "application/activity+json")],
        axum::Json(document),
    )
        .into_response())
}

/// Create the actors router
pub fn actors_router() -> Router<AppState> {
    Router::new().route("/users/:username", get(get_actor))
}
