//! Attachment transformer
//!
//! Media attachments federate as Image/Video/Audio objects depending on
//! their MIME prefix; anything else is a generic Document.

use super::{FederatedObject, Transform, TransformError};
use crate::activitypub::{BaseObject, Tombstone};
use crate::data::AttachmentEntity;
use crate::site::Site;

/// Derive the ActivityStreams media type from a MIME prefix.
fn media_object_type(mime_type: &str) -> &'static str {
    let prefix = mime_type.split('/').next().unwrap_or_default();
    match prefix {
        "image" => "Image",
        "video" => "Video",
        "audio" => "Audio",
        _ => "Document",
    }
}

/// Build the media sub-object embedded into posts (no own `@context`).
pub fn media_object(attachment: &AttachmentEntity) -> BaseObject {
    let mut object = BaseObject::nested(media_object_type(&attachment.mime_type));
    object.set_url(&attachment.url);
    object.set_media_type(&attachment.mime_type);
    if let Some(alt_text) = attachment.alt_text.as_deref().filter(|s| !s.is_empty()) {
        object.set_name(alt_text);
    }
    object
}

pub struct AttachmentTransformer<'a> {
    attachment: &'a AttachmentEntity,
    site: &'a Site,
}

impl<'a> AttachmentTransformer<'a> {
    pub fn new(attachment: &'a AttachmentEntity, site: &'a Site) -> Self {
        Self { attachment, site }
    }
}

impl Transform for AttachmentTransformer<'_> {
    fn to_object(&self) -> Result<FederatedObject, TransformError> {
        if self.attachment.url.is_empty() {
            return Err(TransformError::Invalid(format!(
                "attachment {} has no URL",
                self.attachment.id
            )));
        }

        let mut object = media_object(self.attachment);
        object.set_context(crate::activitypub::context::object_context());
        object.set_id(self.to_id());
        object.set_attributed_to(self.site.actor_iri(&self.attachment.author));

        Ok(FederatedObject::Object(Box::new(object)))
    }

    fn to_id(&self) -> String {
        self.site.attachment_iri(self.attachment.id)
    }

    fn to_tombstone(&self) -> Tombstone {
        Tombstone::new(self.to_id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attachment(mime_type: &str, alt_text: Option<&str>) -> AttachmentEntity {
        AttachmentEntity {
            id: 4,
            author: "alice".to_string(),
            url: "https://blog.example/media/logo.png".to_string(),
            mime_type: mime_type.to_string(),
            alt_text: alt_text.map(str::to_string),
            parent_post_id: Some(1),
        }
    }

    #[test]
    fn png_with_alt_text_becomes_named_image() {
        let site = Site::new("https://blog.example");
        let entity = attachment("image/png", Some("logo"));
        let transformer = AttachmentTransformer::new(&entity, &site);

        let json = transformer.to_object().unwrap().to_json().unwrap();
        assert_eq!(json["type"], "Image");
        assert_eq!(json["mediaType"], "image/png");
        assert_eq!(json["url"], "https://blog.example/media/logo.png");
        assert_eq!(json["name"], "logo");
    }

    #[test]
    fn media_type_is_derived_from_mime_prefix() {
        assert_eq!(media_object_type("image/webp"), "Image");
        assert_eq!(media_object_type("video/mp4"), "Video");
        assert_eq!(media_object_type("audio/ogg"), "Audio");
        assert_eq!(media_object_type("application/pdf"), "Document");
        assert_eq!(media_object_type("garbage"), "Document");
    }

    #[test]
    fn missing_alt_text_omits_name() {
        let site = Site::new("https://blog.example");
        let entity = attachment("image/png", None);
        let transformer = AttachmentTransformer::new(&entity, &site);

        let json = transformer.to_object().unwrap().to_json().unwrap();
        assert!(json.get("name").is_none());
    }

    #[test]
    fn attachment_without_url_is_invalid() {
        let site = Site::new("https://blog.example");
        let mut entity = attachment("image/png", None);
        entity.url = String::new();
        let transformer = AttachmentTransformer::new(&entity, &site);

        assert!(matches!(
            transformer.to_object(),
            Err(TransformError::Invalid(_))
        ));
    }

    #[test]
    fn tombstone_uses_stable_iri_only() {
        let site = Site::new("https://blog.example");
        let entity = attachment("image/png", Some("logo"));
        let transformer = AttachmentTransformer::new(&entity, &site);

        let tombstone = transformer.to_tombstone();
        assert_eq!(tombstone.id(), "https://blog.example/?attachment_id=4");
    }
}
