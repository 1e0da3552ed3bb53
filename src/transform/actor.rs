//! Actor transformer
//!
//! Produces the full actor document for profile updates. The snapshot must
//! carry the public key; receivers refresh cached keys from Update
//! activities.

use super::{FederatedObject, Transform, TransformError};
use crate::activitypub::{Actor, Tombstone};
use crate::data::ActorEntity;
use crate::site::Site;

pub struct ActorTransformer<'a> {
    actor: &'a ActorEntity,
    site: &'a Site,
}

impl<'a> ActorTransformer<'a> {
    pub fn new(actor: &'a ActorEntity, site: &'a Site) -> Self {
        Self { actor, site }
    }
}

impl Transform for ActorTransformer<'_> {
    fn to_object(&self) -> Result<FederatedObject, TransformError> {
        if self.actor.username.is_empty() {
            return Err(TransformError::Invalid(format!(
                "actor {} has no username",
                self.actor.id
            )));
        }
        let Some(public_key_pem) = self.actor.public_key_pem.as_deref().filter(|s| !s.is_empty())
        else {
            return Err(TransformError::Invalid(format!(
                "actor {} snapshot is missing the public key",
                self.actor.username
            )));
        };

        let mut document = Actor::new(self.to_id(), "Person", &self.actor.username, public_key_pem);
        document.name = self.actor.display_name.clone();
        document.summary = self
            .actor
            .summary
            .as_deref()
            .map(ammonia::clean)
            .filter(|s| !s.is_empty());
        document.icon = self.actor.icon_url.as_deref().map(|url| {
            serde_json::json!({
                "type": "Image",
                "url": url,
            })
        });

        Ok(FederatedObject::Actor(Box::new(document)))
    }

    fn to_id(&self) -> String {
        self.site.actor_iri(&self.actor.username)
    }

    fn to_tombstone(&self) -> Tombstone {
        Tombstone::new(self.to_id())
    }
}
