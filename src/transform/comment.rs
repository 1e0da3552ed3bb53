//! Comment transformer
//!
//! Comments federate as Notes replying to their parent comment, or to the
//! post itself for top-level comments.

use super::{FederatedObject, Transform, TransformError};
use crate::activitypub::{BaseObject, Tombstone};
use crate::data::CommentEntity;
use crate::site::Site;

pub struct CommentTransformer<'a> {
    comment: &'a CommentEntity,
    site: &'a Site,
}

impl<'a> CommentTransformer<'a> {
    pub fn new(comment: &'a CommentEntity, site: &'a Site) -> Self {
        Self { comment, site }
    }

    fn in_reply_to_iri(&self) -> String {
        match self.comment.parent_comment_id {
            Some(parent_id) => self.site.comment_iri(parent_id),
            None => self.site.post_iri(self.comment.post_id),
        }
    }
}

impl Transform for CommentTransformer<'_> {
    fn to_object(&self) -> Result<FederatedObject, TransformError> {
        if self.comment.author.is_empty() {
            return Err(TransformError::Invalid(format!(
                "comment {} has no author",
                self.comment.id
            )));
        }

        let mut object = BaseObject::new("Note");
        object.set_id(self.to_id());
        object.set_attributed_to(self.site.actor_iri(&self.comment.author));
        object.set_content(ammonia::clean(&self.comment.content_html));
        object.set_media_type("text/html");
        object.set_in_reply_to(self.in_reply_to_iri());
        if let Some(published_at) = self.comment.published_at {
            object.set_published(published_at);
        }

        Ok(FederatedObject::Object(Box::new(object)))
    }

    fn to_id(&self) -> String {
        self.site.comment_iri(self.comment.id)
    }

    fn to_tombstone(&self) -> Tombstone {
        Tombstone::new(self.to_id())
    }
}
