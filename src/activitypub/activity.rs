//! Activity envelopes

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use super::context;
use crate::data::Visibility;
use crate::error::AppError;

/// Activity types this engine emits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ActivityType {
    Create,
    Update,
    Delete,
    Add,
    Remove,
    Follow,
}

impl ActivityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "Create",
            Self::Update => "Update",
            Self::Delete => "Delete",
            Self::Add => "Add",
            Self::Remove => "Remove",
            Self::Follow => "Follow",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Create" => Some(Self::Create),
            "Update" => Some(Self::Update),
            "Delete" => Some(Self::Delete),
            "Add" => Some(Self::Add),
            "Remove" => Some(Self::Remove),
            "Follow" => Some(Self::Follow),
            _ => None,
        }
    }
}

impl std::fmt::Display for ActivityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An ActivityStreams action envelope naming actor, object, optional target
#[derive(Debug, Clone, Serialize)]
pub struct Activity {
    #[serde(rename = "@context")]
    context: Vec<Value>,
    pub id: String,
    #[serde(rename = "type")]
    pub activity_type: ActivityType,
    pub actor: String,
    pub object: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub to: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub cc: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published: Option<DateTime<Utc>>,
}

impl Activity {
    /// Build an activity envelope.
    ///
    /// The id follows the actor IRI, e.g.
    /// `https://blog.example/users/alice/create/01ARZ...`.
    pub fn new(activity_type: ActivityType, actor_iri: &str, object: Value) -> Self {
        let id = format!(
            "{}/{}/{}",
            actor_iri,
            activity_type.as_str().to_lowercase(),
            ulid::Ulid::new()
        );

        Self {
            context: context::activity_context(),
            id,
            activity_type,
            actor: actor_iri.to_string(),
            object,
            target: None,
            to: Vec::new(),
            cc: Vec::new(),
            published: Some(Utc::now()),
        }
    }

    /// Build a Follow activity for a remote actor.
    pub fn follow(actor_iri: &str, object_iri: &str) -> Self {
        let mut activity = Self::new(ActivityType::Follow, actor_iri, Value::String(object_iri.to_string()));
        activity.published = None;
        activity
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    pub fn with_audience(mut self, to: Vec<String>, cc: Vec<String>) -> Self {
        self.to = to;
        self.cc = cc;
        self
    }

    pub fn to_json(&self) -> Result<Value, AppError> {
        serde_json::to_value(self)
            .map_err(|e| AppError::Validation(format!("Unserializable activity: {}", e)))
    }
}

/// Derive `to`/`cc` audiences from an entity's visibility.
///
/// Public content addresses the public collection and carbon-copies
/// followers; unlisted swaps the two; private stays within followers.
/// Local content has no federated audience at all.
pub fn audience_for_visibility(actor_iri: &str, visibility: Visibility) -> (Vec<String>, Vec<String>) {
    let public_audience = context::PUBLIC_AUDIENCE.to_string();
    let followers_audience = format!("{}/followers", actor_iri);

    match visibility {
        Visibility::Public => (vec![public_audience], vec![followers_audience]),
        Visibility::Unlisted => (vec![followers_audience], vec![public_audience]),
        Visibility::Private => (vec![followers_audience], Vec::new()),
        Visibility::Local => (Vec::new(), Vec::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn activity_id_follows_actor_and_type() {
        let activity = Activity::new(
            ActivityType::Create,
            "https://blog.example/users/alice",
            json!({"type": "Note"}),
        );
        assert!(
            activity
                .id
                .starts_with("https://blog.example/users/alice/create/")
        );
    }

    #[test]
    fn to_json_omits_empty_audience_and_target() {
        let activity = Activity::new(
            ActivityType::Delete,
            "https://blog.example/users/alice",
            json!("https://blog.example/?p=1"),
        );

        let json = activity.to_json().unwrap();
        assert_eq!(json["type"], "Delete");
        assert!(json.get("to").is_none());
        assert!(json.get("cc").is_none());
        assert!(json.get("target").is_none());
    }

    #[test]
    fn add_activity_carries_target_collection() {
        let activity = Activity::new(
            ActivityType::Add,
            "https://blog.example/users/alice",
            json!("https://blog.example/?p=1"),
        )
        .with_target("https://blog.example/users/alice/collections/featured");

        let json = activity.to_json().unwrap();
        assert_eq!(
            json["target"],
            "https://blog.example/users/alice/collections/featured"
        );
    }

    #[test]
    fn follow_activity_names_actor_and_object() {
        let activity = Activity::follow(
            "https://blog.example/users/alice",
            "https://remote.example/users/bob",
        );

        let json = activity.to_json().unwrap();
        assert_eq!(json["type"], "Follow");
        assert_eq!(json["actor"], "https://blog.example/users/alice");
        assert_eq!(json["object"], "https://remote.example/users/bob");
    }

    #[test]
    fn audience_for_visibility_public_targets_public_then_followers() {
        let (to, cc) = audience_for_visibility(
            "https://blog.example/users/alice",
            Visibility::Public,
        );
        assert_eq!(to, vec![context::PUBLIC_AUDIENCE.to_string()]);
        assert_eq!(cc, vec!["https://blog.example/users/alice/followers".to_string()]);
    }

    #[test]
    fn audience_for_visibility_unlisted_swaps_to_and_cc() {
        let (to, cc) = audience_for_visibility(
            "https://blog.example/users/alice",
            Visibility::Unlisted,
        );
        assert_eq!(to, vec!["https://blog.example/users/alice/followers".to_string()]);
        assert_eq!(cc, vec![context::PUBLIC_AUDIENCE.to_string()]);
    }

    #[test]
    fn audience_for_visibility_local_is_empty() {
        let (to, cc) =
            audience_for_visibility("https://blog.example/users/alice", Visibility::Local);
        assert!(to.is_empty());
        assert!(cc.is_empty());
    }
}
