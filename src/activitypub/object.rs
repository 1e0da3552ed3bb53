//! Generic ActivityStreams object envelope

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use super::context;
use crate::error::AppError;

/// A generic ActivityStreams 2.0 object
///
/// Typed record with an explicit optional-field schema; serialization
/// omits unset fields. The declared `@context` travels with the object.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BaseObject {
    #[serde(rename = "@context", skip_serializing_if = "Vec::is_empty")]
    context: Vec<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    #[serde(rename = "type")]
    object_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    media_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    attributed_to: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    in_reply_to: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    published: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    updated: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    sensitive: Option<bool>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    to: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    cc: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    attachment: Vec<BaseObject>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tag: Vec<Value>,
}

impl BaseObject {
    /// Create an object of the given type with the default object context.
    pub fn new(object_type: &str) -> Self {
        Self {
            context: context::object_context(),
            id: None,
            object_type: object_type.to_string(),
            name: None,
            summary: None,
            content: None,
            media_type: None,
            attributed_to: None,
            url: None,
            in_reply_to: None,
            published: None,
            updated: None,
            sensitive: None,
            to: Vec::new(),
            cc: Vec::new(),
            attachment: Vec::new(),
            tag: Vec::new(),
        }
    }

    /// Create a nested sub-object (attachment, tag) without its own context.
    pub fn nested(object_type: &str) -> Self {
        let mut object = Self::new(object_type);
        object.context = Vec::new();
        object
    }

    pub fn set_type(&mut self, object_type: &str) {
        self.object_type = object_type.to_string();
    }

    pub fn object_type(&self) -> &str {
        &self.object_type
    }

    pub fn set_id(&mut self, id: impl Into<String>) {
        self.id = Some(id.into());
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn set_context(&mut self, context: Vec<Value>) {
        self.context = context;
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = Some(name.into());
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn set_summary(&mut self, summary: impl Into<String>) {
        self.summary = Some(summary.into());
    }

    pub fn set_content(&mut self, content: impl Into<String>) {
        self.content = Some(content.into());
    }

    pub fn content(&self) -> Option<&str> {
        self.content.as_deref()
    }

    pub fn set_media_type(&mut self, media_type: impl Into<String>) {
        self.media_type = Some(media_type.into());
    }

    pub fn media_type(&self) -> Option<&str> {
        self.media_type.as_deref()
    }

    pub fn set_attributed_to(&mut self, actor_iri: impl Into<String>) {
        self.attributed_to = Some(actor_iri.into());
    }

    pub fn set_url(&mut self, url: impl Into<String>) {
        self.url = Some(url.into());
    }

    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    pub fn set_in_reply_to(&mut self, iri: impl Into<String>) {
        self.in_reply_to = Some(iri.into());
    }

    pub fn in_reply_to(&self) -> Option<&str> {
        self.in_reply_to.as_deref()
    }

    pub fn set_published(&mut self, at: DateTime<Utc>) {
        self.published = Some(at);
    }

    pub fn set_updated(&mut self, at: DateTime<Utc>) {
        self.updated = Some(at);
    }

    pub fn set_sensitive(&mut self, sensitive: bool) {
        self.sensitive = Some(sensitive);
    }

    pub fn set_audience(&mut self, to: Vec<String>, cc: Vec<String>) {
        self.to = to;
        self.cc = cc;
    }

    pub fn add_attachment(&mut self, attachment: BaseObject) {
        self.attachment.push(attachment);
    }

    pub fn attachments(&self) -> &[BaseObject] {
        &self.attachment
    }

    pub fn add_tag(&mut self, tag: Value) {
        self.tag.push(tag);
    }

    /// Serialize to a JSON-LD document with the declared `@context`.
    pub fn to_json(&self) -> Result<Value, AppError> {
        serde_json::to_value(self)
            .map_err(|e| AppError::Validation(format!("Unserializable object: {}", e)))
    }
}

/// A deleted resource
///
/// Carries only `id` and `type`, so it can be produced for entities whose
/// other fields no longer exist.
#[derive(Debug, Clone, Serialize)]
pub struct Tombstone {
    #[serde(rename = "@context")]
    context: Vec<Value>,
    id: String,
    #[serde(rename = "type")]
    object_type: &'static str,
}

impl Tombstone {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            context: context::activity_context(),
            id: id.into(),
            object_type: "Tombstone",
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn to_json(&self) -> Result<Value, AppError> {
        serde_json::to_value(self)
            .map_err(|e| AppError::Validation(format!("Unserializable tombstone: {}", e)))
    }
}
