//! Post transformer
//!
//! Posts federate as Article (titled) or Note (untitled); posts carrying
//! event metadata federate as Event objects instead.

use serde_json::json;

use super::attachment::media_object;
use super::{FederatedObject, Transform, TransformError};
use crate::activitypub::{BaseObject, Event, Tombstone, audience_for_visibility};
use crate::data::{EventDetails, PostEntity};
use crate::site::Site;

pub struct PostTransformer<'a> {
    post: &'a PostEntity,
    site: &'a Site,
}

impl<'a> PostTransformer<'a> {
    pub fn new(post: &'a PostEntity, site: &'a Site) -> Self {
        Self { post, site }
    }

    fn actor_iri(&self) -> String {
        self.site.actor_iri(&self.post.author)
    }

    /// Fill the fields shared by Article/Note and Event bases.
    fn populate_base(&self, object: &mut BaseObject) {
        object.set_id(self.to_id());
        object.set_attributed_to(self.actor_iri());
        object.set_content(ammonia::clean(&self.post.content_html));
        object.set_media_type("text/html");

        if !self.post.title.is_empty() {
            object.set_name(&self.post.title);
        }
        if let Some(excerpt) = self.post.excerpt.as_deref().filter(|s| !s.is_empty()) {
            object.set_summary(ammonia::clean(excerpt));
        }
        if let Some(permalink) = self.post.permalink.as_deref() {
            object.set_url(permalink);
        }
        if let Some(published_at) = self.post.published_at {
            object.set_published(published_at);
        }
        if let Some(updated_at) = self.post.updated_at {
            object.set_updated(updated_at);
        }

        let (to, cc) = audience_for_visibility(&self.actor_iri(), self.post.visibility);
        object.set_audience(to, cc);

        for attachment in &self.post.attachments {
            object.add_attachment(media_object(attachment));
        }

        for tag in &self.post.tags {
            object.add_tag(json!({
                "type": "Hashtag",
                "href": format!("{}/tags/{}", self.site.base_url(), urlencoding::encode(tag)),
                "name": format!("#{}", tag),
            }));
        }
    }

    /// Apply event metadata onto an Event object.
    ///
    /// Invalid enumerated values are refused by the setters (logged there);
    /// the field is simply left out of the outbound document.
    fn populate_event(&self, event: &mut Event, details: &EventDetails) {
        event.set_start_time(details.start_time);
        if let Some(end_time) = details.end_time {
            event.set_end_time(end_time);
        }
        if let Some(timezone) = details.timezone.as_deref() {
            event.set_timezone(timezone);
        }
        if let Some(location) = details.location.as_deref() {
            event.set_location(location);
        }
        if let Some(capacity) = details.maximum_attendee_capacity {
            event.set_maximum_attendee_capacity(capacity);
        }
        if let Some(count) = details.participant_count {
            event.set_participant_count(count);
        }
        if let Some(option) = details.replies_moderation_option.as_deref() {
            let _ = event.set_replies_moderation_option(option);
        }
        if let Some(mode) = details.join_mode.as_deref() {
            let _ = event.set_join_mode(mode);
        }
        if let Some(status) = details.ical_status.as_deref() {
            let _ = event.set_status(status);
        }
        if let Some(url) = details.external_participation_url.as_deref() {
            let _ = event.set_external_participation_url(url);
        }
    }
}

impl Transform for PostTransformer<'_> {
    fn to_object(&self) -> Result<FederatedObject, TransformError> {
        if self.post.author.is_empty() {
            return Err(TransformError::Invalid(format!(
                "post {} has no author",
                self.post.id
            )));
        }

        if let Some(details) = &self.post.event {
            let mut event = Event::new();
            self.populate_base(event.base_mut());
            self.populate_event(&mut event, details);
            return Ok(FederatedObject::Event(Box::new(event)));
        }

        let object_type = if self.post.title.is_empty() {
            "Note"
        } else {
            "Article"
        };
        let mut object = BaseObject::new(object_type);
        self.populate_base(&mut object);

        Ok(FederatedObject::Object(Box::new(object)))
    }

    fn to_id(&self) -> String {
        self.site.post_iri(self.post.id)
    }

    fn to_tombstone(&self) -> Tombstone {
        Tombstone::new(self.to_id())
    }
}
