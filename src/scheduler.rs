//! Triage: lifecycle transitions to activities
//!
//! The content store publishes typed lifecycle events over a channel; the
//! scheduler classifies each transition against the entity's federation
//! state and either suppresses it or enqueues an activity. Triage never
//! propagates errors back to the publisher.

use std::sync::Arc;

use serde::Deserialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::activitypub::ActivityType;
use crate::data::{ContentKind, ContentStatus, Database, FederationState, Visibility};
use crate::error::AppError;
use crate::metrics::TRIAGE_SUPPRESSED_TOTAL;
use crate::outbox::{Outbox, OutboxInput};

/// Request-scoped flags passed explicitly into triage
///
/// Replaces ambient "currently importing" / "bulk edit" globals: the caller
/// states what kind of mutation this was.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TriageContext {
    /// Bulk-import mode: nothing is federated while backfilling
    #[serde(default)]
    pub is_import: bool,
    /// The mutation came from a bulk-edit request
    #[serde(default)]
    pub is_bulk_edit: bool,
    /// The bulk edit changed the author
    #[serde(default)]
    pub changed_author: bool,
    /// The bulk edit changed the lifecycle status
    #[serde(default)]
    pub changed_status: bool,
}

/// A status transition of a post, term, comment, or actor profile
#[derive(Debug, Clone, Deserialize)]
pub struct ContentTransition {
    pub kind: ContentKind,
    pub entity_id: i64,
    /// Acting local actor (record key)
    pub actor_id: String,
    pub previous_status: ContentStatus,
    pub new_status: ContentStatus,
    pub visibility: Visibility,
    /// Entity explicitly opted out of federation
    #[serde(default)]
    pub federation_disabled: bool,
    #[serde(default)]
    pub context: TriageContext,
}

/// The event that triggered an attachment mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttachmentEventKind {
    Add,
    Edit,
    Delete,
}

/// An attachment mutation
#[derive(Debug, Clone, Deserialize)]
pub struct AttachmentTransition {
    pub entity_id: i64,
    pub actor_id: String,
    pub event: AttachmentEventKind,
    /// Whether the parent post type opts into federation
    pub parent_federates: bool,
    #[serde(default)]
    pub context: TriageContext,
}

/// A sticky/featured toggle
///
/// Modeled as a notification parallel to the content transition: callers
/// that also emit an Update for the same toggle keep doing so, and both
/// must be deliverable (receivers treat them idempotently).
#[derive(Debug, Clone, Deserialize)]
pub struct FeaturedTransition {
    pub kind: ContentKind,
    pub entity_id: i64,
    pub actor_id: String,
    pub was_featured: bool,
    pub is_featured: bool,
}

/// A lifecycle event from the content store
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LifecycleEvent {
    Content(ContentTransition),
    Attachment(AttachmentTransition),
    Featured(FeaturedTransition),
}

/// Why triage suppressed an emission
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuppressionReason {
    Import,
    FederationDisabled,
    BulkEditUnchanged,
    NotFederatable,
}

impl SuppressionReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Import => "import",
            Self::FederationDisabled => "federation_disabled",
            Self::BulkEditUnchanged => "bulk_edit_unchanged",
            Self::NotFederatable => "not_federatable",
        }
    }
}

/// Outcome of classifying a transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriageDecision {
    Emit(ActivityType),
    Suppress(SuppressionReason),
}

/// Classify a content transition against the entity's federation state.
///
/// Suppression short-circuits before the transition table is consulted.
pub fn classify(transition: &ContentTransition, state: FederationState) -> TriageDecision {
    use TriageDecision::{Emit, Suppress};

    if transition.context.is_import {
        return Suppress(SuppressionReason::Import);
    }
    if transition.federation_disabled {
        return Suppress(SuppressionReason::FederationDisabled);
    }
    if transition.context.is_bulk_edit
        && !transition.context.changed_author
        && !transition.context.changed_status
    {
        return Suppress(SuppressionReason::BulkEditUnchanged);
    }

    let federated = state.is_federated();

    // A federated entity withdrawn to local/private visibility is deleted
    // remotely, overriding whatever the status transition would emit.
    if federated && matches!(transition.visibility, Visibility::Local | Visibility::Private) {
        return Emit(ActivityType::Delete);
    }

    match (transition.previous_status, transition.new_status) {
        (_, ContentStatus::Publish) if !federated => Emit(ActivityType::Create),
        (ContentStatus::Publish, ContentStatus::Publish) => Emit(ActivityType::Update),
        // Republishing a previously-federated entity announces it anew.
        (_, ContentStatus::Publish) => Emit(ActivityType::Create),
        (ContentStatus::Publish, ContentStatus::Draft) if federated => Emit(ActivityType::Update),
        (_, ContentStatus::Draft) => Suppress(SuppressionReason::NotFederatable),
        (_, ContentStatus::Trash) if federated => Emit(ActivityType::Delete),
        (_, ContentStatus::Trash) => Suppress(SuppressionReason::NotFederatable),
        _ => Suppress(SuppressionReason::NotFederatable),
    }
}

/// Classify an attachment mutation: a 1:1 event mapping, gated on the
/// parent post type opting into federation.
pub fn classify_attachment(transition: &AttachmentTransition) -> TriageDecision {
    use TriageDecision::{Emit, Suppress};

    if transition.context.is_import {
        return Suppress(SuppressionReason::Import);
    }
    if !transition.parent_federates {
        return Suppress(SuppressionReason::FederationDisabled);
    }

    Emit(match transition.event {
        AttachmentEventKind::Add => ActivityType::Create,
        AttachmentEventKind::Edit => ActivityType::Update,
        AttachmentEventKind::Delete => ActivityType::Delete,
    })
}

/// Classify a featured-collection transition: entering emits Add, leaving
/// emits Remove, a no-op toggle emits nothing.
pub fn classify_featured(was_featured: bool, is_featured: bool) -> Option<ActivityType> {
    match (was_featured, is_featured) {
        (false, true) => Some(ActivityType::Add),
        (true, false) => Some(ActivityType::Remove),
        _ => None,
    }
}

/// The scheduler task: consumes lifecycle events and feeds the outbox
pub struct Scheduler {
    outbox: Outbox,
    db: Arc<Database>,
}

impl Scheduler {
    pub fn new(outbox: Outbox, db: Arc<Database>) -> Self {
        Self { outbox, db }
    }

    /// Spawn the subscription loop. The loop ends when the channel closes.
    pub fn spawn(self, mut events: mpsc::Receiver<LifecycleEvent>) -> JoinHandle<()> {
        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                self.handle(event).await;
            }
            tracing::info!("Lifecycle event channel closed, scheduler stopping");
        })
    }

    /// Handle one lifecycle event. Failures are logged, never propagated:
    /// a triage error must not disturb the publishing request.
    pub async fn handle(&self, event: LifecycleEvent) {
        let result = match event {
            LifecycleEvent::Content(transition) => self.handle_content(transition).await,
            LifecycleEvent::Attachment(transition) => self.handle_attachment(transition).await,
            LifecycleEvent::Featured(transition) => self.handle_featured(transition).await,
        };

        if let Err(error) = result {
            tracing::warn!(%error, "Triage failed, emission suppressed");
        }
    }

    async fn handle_content(&self, transition: ContentTransition) -> Result<(), AppError> {
        let state = self
            .db
            .federation_state(transition.kind, transition.entity_id)
            .await?;

        match classify(&transition, state) {
            TriageDecision::Emit(activity_type) => {
                self.outbox
                    .add(
                        OutboxInput::Entity {
                            kind: transition.kind,
                            id: transition.entity_id,
                        },
                        activity_type,
                        &transition.actor_id,
                    )
                    .await?;
            }
            TriageDecision::Suppress(reason) => {
                TRIAGE_SUPPRESSED_TOTAL
                    .with_label_values(&[reason.as_str()])
                    .inc();
                tracing::debug!(
                    kind = transition.kind.as_str(),
                    entity_id = transition.entity_id,
                    reason = reason.as_str(),
                    "Triage suppressed emission"
                );
            }
        }

        Ok(())
    }

    async fn handle_attachment(&self, transition: AttachmentTransition) -> Result<(), AppError> {
        match classify_attachment(&transition) {
            TriageDecision::Emit(activity_type) => {
                self.outbox
                    .add(
                        OutboxInput::Entity {
                            kind: ContentKind::Attachment,
                            id: transition.entity_id,
                        },
                        activity_type,
                        &transition.actor_id,
                    )
                    .await?;
            }
            TriageDecision::Suppress(reason) => {
                TRIAGE_SUPPRESSED_TOTAL
                    .with_label_values(&[reason.as_str()])
                    .inc();
            }
        }

        Ok(())
    }

    async fn handle_featured(&self, transition: FeaturedTransition) -> Result<(), AppError> {
        let Some(activity_type) =
            classify_featured(transition.was_featured, transition.is_featured)
        else {
            return Ok(());
        };

        self.outbox
            .add(
                OutboxInput::Entity {
                    kind: transition.kind,
                    id: transition.entity_id,
                },
                activity_type,
                &transition.actor_id,
            )
            .await?;

        Ok(())
    }
}
