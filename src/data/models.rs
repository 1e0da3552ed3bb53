//! Data models
//!
//! Rust structs representing database records and the content-entity
//! snapshots the federation core consumes. All models use ULID for
//! record keys and chrono for timestamps.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// ID Types
// =============================================================================

/// Record key wrapper (ULID format, 26 characters)
///
/// Example: "01ARZ3NDEKTSV4RRFFQ69G5FAV"
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub String);

impl EntityId {
    /// Generate a new ULID
    pub fn new() -> Self {
        Self(ulid::Ulid::new().to_string())
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Content entity lifecycle
// =============================================================================

/// Kind of local content entity being federated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    Post,
    Attachment,
    Term,
    Comment,
    Actor,
}

impl ContentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Post => "post",
            Self::Attachment => "attachment",
            Self::Term => "term",
            Self::Comment => "comment",
            Self::Actor => "actor",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "post" => Some(Self::Post),
            "attachment" => Some(Self::Attachment),
            "term" => Some(Self::Term),
            "comment" => Some(Self::Comment),
            "actor" => Some(Self::Actor),
            _ => None,
        }
    }
}

/// Lifecycle status of a content entity
///
/// `New` is the no-status state of an entity that has never been saved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentStatus {
    New,
    Publish,
    Draft,
    Trash,
}

impl ContentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Publish => "publish",
            Self::Draft => "draft",
            Self::Trash => "trash",
        }
    }
}

/// Audience visibility of a content entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    Public,
    Unlisted,
    /// Visible on the local site only; never federated
    Local,
    Private,
}

impl Visibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Unlisted => "unlisted",
            Self::Local => "local",
            Self::Private => "private",
        }
    }
}

/// Whether an entity has ever been successfully federated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FederationState {
    Unfederated,
    Federated,
    Errored,
}

impl FederationState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unfederated => "unfederated",
            Self::Federated => "federated",
            Self::Errored => "errored",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "unfederated" => Some(Self::Unfederated),
            "federated" => Some(Self::Federated),
            "errored" => Some(Self::Errored),
            _ => None,
        }
    }

    /// An entity counts as federated for triage once it has been delivered,
    /// even if a later attempt errored.
    pub fn is_federated(&self) -> bool {
        !matches!(self, Self::Unfederated)
    }
}

/// Lifecycle snapshot of an entity as reported by the content store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityState {
    pub status: ContentStatus,
    pub visibility: Visibility,
    pub federation_state: FederationState,
}

// =============================================================================
// Content entity snapshots
// =============================================================================

/// A local content entity, snapshotted at the time of its last mutation
///
/// Read-only from the federation core's perspective; the owning CMS is the
/// source of truth.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Entity {
    Post(PostEntity),
    Attachment(AttachmentEntity),
    Term(TermEntity),
    Comment(CommentEntity),
    Actor(ActorEntity),
}

impl Entity {
    pub fn kind(&self) -> ContentKind {
        match self {
            Self::Post(_) => ContentKind::Post,
            Self::Attachment(_) => ContentKind::Attachment,
            Self::Term(_) => ContentKind::Term,
            Self::Comment(_) => ContentKind::Comment,
            Self::Actor(_) => ContentKind::Actor,
        }
    }

    pub fn id(&self) -> i64 {
        match self {
            Self::Post(post) => post.id,
            Self::Attachment(attachment) => attachment.id,
            Self::Term(term) => term.id,
            Self::Comment(comment) => comment.id,
            Self::Actor(actor) => actor.id,
        }
    }
}

/// A post or page
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostEntity {
    pub id: i64,
    /// Username of the authoring local actor
    pub author: String,
    pub title: String,
    /// Raw HTML content; sanitized during transformation
    pub content_html: String,
    pub excerpt: Option<String>,
    pub status: ContentStatus,
    pub visibility: Visibility,
    /// Slug-based permalink; NOT used for federated IRIs
    pub permalink: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub attachments: Vec<AttachmentEntity>,
    /// Event metadata when the post represents an event
    pub event: Option<EventDetails>,
    pub published_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Event metadata carried by event-type posts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventDetails {
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub timezone: Option<String>,
    pub location: Option<String>,
    pub join_mode: Option<String>,
    pub external_participation_url: Option<String>,
    pub replies_moderation_option: Option<String>,
    pub ical_status: Option<String>,
    pub maximum_attendee_capacity: Option<u32>,
    pub participant_count: Option<u32>,
}

/// A media attachment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttachmentEntity {
    pub id: i64,
    /// Username of the owning local actor
    pub author: String,
    pub url: String,
    /// MIME type (e.g., "image/png")
    pub mime_type: String,
    /// Alt text, becomes the object's `name`
    pub alt_text: Option<String>,
    pub parent_post_id: Option<i64>,
}

/// A taxonomy term (category, tag)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TermEntity {
    pub id: i64,
    pub taxonomy: String,
    pub name: String,
    /// Mutable slug; renames must not change the federated IRI
    pub slug: String,
    pub description: Option<String>,
}

/// A comment on a post
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentEntity {
    pub id: i64,
    pub post_id: i64,
    pub parent_comment_id: Option<i64>,
    /// Username of the authoring local actor
    pub author: String,
    pub content_html: String,
    pub published_at: Option<DateTime<Utc>>,
}

/// A local actor profile, as a content entity (for profile Update triage)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActorEntity {
    pub id: i64,
    pub username: String,
    pub display_name: Option<String>,
    pub summary: Option<String>,
    pub icon_url: Option<String>,
    /// Public key PEM; receivers refresh it from profile updates
    pub public_key_pem: Option<String>,
}

// =============================================================================
// Local actors (persisted)
// =============================================================================

/// A locally-owned federated identity with its signing keypair
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct LocalActor {
    pub id: String,
    pub username: String,
    pub display_name: Option<String>,
    pub summary: Option<String>,
    pub icon_url: Option<String>,
    /// ActivityPub actor type: Person, Application, Group, Service
    pub actor_type: String,
    /// RSA private key (PKCS#8 PEM)
    pub private_key_pem: String,
    /// RSA public key (PEM)
    pub public_key_pem: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Followers
// =============================================================================

/// A timestamped delivery-error descriptor on a follower record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FollowerError {
    pub at: DateTime<Utc>,
    /// HTTP status when the remote answered, None for transport failures
    pub status: Option<u16>,
    pub message: String,
}

/// A remote actor subscribed to a local actor's outbox
///
/// A cached mirror of the remote actor document plus local bookkeeping.
/// Deduplicated per local actor by `iri`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FollowerRecord {
    pub id: String,
    /// Local actor being followed
    pub actor_id: String,
    /// Remote actor IRI (the dedup key)
    pub iri: String,
    pub preferred_username: String,
    pub name: Option<String>,
    pub summary: Option<String>,
    pub inbox: String,
    pub shared_inbox: Option<String>,
    pub public_key_id: String,
    pub public_key_pem: String,
    pub icon_url: Option<String>,
    /// Ordered delivery-error descriptors, oldest first
    pub errors: Vec<FollowerError>,
    pub published: DateTime<Utc>,
    pub updated: DateTime<Utc>,
}

impl FollowerRecord {
    /// A follower is persistable only with a resolvable identity, a
    /// deliverable inbox, and verifiable key material.
    pub fn is_valid(&self) -> bool {
        !self.iri.is_empty()
            && !self.preferred_username.is_empty()
            && !self.inbox.is_empty()
            && !self.public_key_id.is_empty()
            && !self.public_key_pem.is_empty()
    }

    /// Inbox URL used for delivery, preferring the shared inbox
    pub fn delivery_inbox(&self) -> &str {
        self.shared_inbox
            .as_deref()
            .filter(|url| !url.is_empty())
            .unwrap_or(&self.inbox)
    }
}

// =============================================================================
// Outbox
// =============================================================================

/// Delivery status of an outbox item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutboxStatus {
    Pending,
    Processing,
    Complete,
    Failed,
}

impl OutboxStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Complete => "complete",
            Self::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "processing" => Some(Self::Processing),
            "complete" => Some(Self::Complete),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

/// A queued unit of delivery
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct OutboxItem {
    pub id: String,
    pub actor_id: String,
    /// Activity type: Create, Update, Delete, Add, Remove, Follow
    pub activity_type: String,
    /// Serialized JSON-LD activity document
    pub activity_json: String,
    /// pending | processing | complete | failed
    pub status: String,
    pub attempt_count: i64,
    pub last_error: Option<String>,
    /// Back-reference for federation-state bookkeeping, when known
    pub entity_kind: Option<String>,
    pub entity_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn follower() -> FollowerRecord {
        FollowerRecord {
            id: EntityId::new().0,
            actor_id: "actor-1".to_string(),
            iri: "https://remote.example/users/alice".to_string(),
            preferred_username: "alice".to_string(),
            name: Some("Alice".to_string()),
            summary: None,
            inbox: "https://remote.example/users/alice/inbox".to_string(),
            shared_inbox: Some("https://remote.example/inbox".to_string()),
            public_key_id: "https://remote.example/users/alice#main-key".to_string(),
            public_key_pem: "-----BEGIN PUBLIC KEY-----".to_string(),
            icon_url: None,
            errors: Vec::new(),
            published: Utc::now(),
            updated: Utc::now(),
        }
    }

    #[test]
    fn follower_with_all_required_fields_is_valid() {
        assert!(follower().is_valid());
    }

    #[test]
    fn follower_missing_public_key_pem_is_invalid() {
        let mut record = follower();
        record.public_key_pem = String::new();
        assert!(!record.is_valid());
    }

    #[test]
    fn follower_missing_inbox_is_invalid() {
        let mut record = follower();
        record.inbox = String::new();
        assert!(!record.is_valid());
    }

    #[test]
    fn delivery_inbox_prefers_shared_inbox() {
        let record = follower();
        assert_eq!(record.delivery_inbox(), "https://remote.example/inbox");
    }

    #[test]
    fn delivery_inbox_falls_back_to_personal_inbox() {
        let mut record = follower();
        record.shared_inbox = None;
        assert_eq!(
            record.delivery_inbox(),
            "https://remote.example/users/alice/inbox"
        );

        record.shared_inbox = Some(String::new());
        assert_eq!(
            record.delivery_inbox(),
            "https://remote.example/users/alice/inbox"
        );
    }

    #[test]
    fn outbox_status_round_trips_through_strings() {
        for status in [
            OutboxStatus::Pending,
            OutboxStatus::Processing,
            OutboxStatus::Complete,
            OutboxStatus::Failed,
        ] {
            assert_eq!(OutboxStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(OutboxStatus::parse("unknown"), None);
    }
}
