//! Entity-to-object transformation
//!
//! One transformer per content-entity kind, selected by a factory keyed on
//! the entity. Transformers are pure: given the entity snapshot they produce
//! an ActivityStreams object, a stable IRI, or a tombstone, with no side
//! effects.

mod actor;
mod attachment;
mod comment;
mod post;
mod term;

pub use actor::ActorTransformer;
pub use attachment::{AttachmentTransformer, media_object};
pub use comment::CommentTransformer;
pub use post::PostTransformer;
pub use term::TermTransformer;

use serde_json::Value;
use thiserror::Error;

use crate::activitypub::{Actor, BaseObject, Event, Tombstone};
use crate::data::Entity;
use crate::site::Site;

/// Typed transformation failure
///
/// Distinguishes "nothing to federate" from "malformed input" so triage can
/// suppress cleanly while operators still see the cause.
#[derive(Debug, Error)]
pub enum TransformError {
    #[error("No transformer for entity kind: {0}")]
    UnsupportedKind(String),

    #[error("Entity {kind}/{id} cannot be resolved")]
    EntityVanished { kind: String, id: i64 },

    #[error("Invalid entity: {0}")]
    Invalid(String),
}

/// An object produced by a transformer, ready for JSON-LD serialization
#[derive(Debug, Clone)]
pub enum FederatedObject {
    Object(Box<BaseObject>),
    Event(Box<Event>),
    Actor(Box<Actor>),
}

impl FederatedObject {
    pub fn id(&self) -> Option<&str> {
        match self {
            Self::Object(object) => object.id(),
            Self::Event(event) => event.base().id(),
            Self::Actor(actor) => Some(&actor.id),
        }
    }

    pub fn to_json(&self) -> Result<Value, crate::error::AppError> {
        match self {
            Self::Object(object) => object.to_json(),
            Self::Event(event) => event.to_json(),
            Self::Actor(actor) => actor.to_json(),
        }
    }
}

/// Capability shared by all transformers
pub trait Transform {
    /// Produce the ActivityStreams object for the entity's current state.
    fn to_object(&self) -> Result<FederatedObject, TransformError>;

    /// Stable IRI for the entity, independent of mutable slug state.
    fn to_id(&self) -> String;

    /// Minimal Tombstone for a deleted entity. Never dereferences fields
    /// that may no longer exist.
    fn to_tombstone(&self) -> Tombstone;
}

/// Select the transformer for an entity.
pub fn transformer_for<'a>(entity: &'a Entity, site: &'a Site) -> Box<dyn Transform + 'a> {
    match entity {
        Entity::Post(post) => Box::new(PostTransformer::new(post, site)),
        Entity::Attachment(attachment) => Box::new(AttachmentTransformer::new(attachment, site)),
        Entity::Term(term) => Box::new(TermTransformer::new(term, site)),
        Entity::Comment(comment) => Box::new(CommentTransformer::new(comment, site)),
        Entity::Actor(actor) => Box::new(ActorTransformer::new(actor, site)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::TermEntity;

    #[test]
    fn factory_selects_transformer_by_entity_kind() {
        let site = Site::new("https://blog.example");
        let entity = Entity::Term(TermEntity {
            id: 3,
            taxonomy: "post_tag".to_string(),
            name: "rust".to_string(),
            slug: "rust".to_string(),
            description: None,
        });

        let transformer = transformer_for(&entity, &site);
        assert_eq!(
            transformer.to_id(),
            "https://blog.example/?taxonomy=post_tag&term_id=3"
        );
    }
}
