//! ActivityPub federation module
//!
//! Handles:
//! - Activity delivery (outbox drain, inbox fan-out)
//! - HTTP Signatures
//!
//! The dispatcher is the background consumer of the outbox: it claims
//! batches, hands them to the delivery engine, and finalizes item status
//! and entity federation state. Multiple dispatcher instances may run
//! concurrently; the outbox claim keeps them from overlapping.

mod delivery;
mod signature;

pub use delivery::{DeliveryConfig, DeliveryEngine, DeliverySummary};
pub use signature::{SignatureHeaders, generate_digest, parse_private_key, sign_request};

use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::data::{ContentKind, Database, FederationState, OutboxItem};
use crate::error::AppError;
use crate::outbox::Outbox;

/// Background outbox consumer
#[derive(Clone)]
pub struct Dispatcher {
    outbox: Outbox,
    engine: DeliveryEngine,
    db: Arc<Database>,
    batch_size: usize,
}

impl Dispatcher {
    pub fn new(outbox: Outbox, engine: DeliveryEngine, db: Arc<Database>, batch_size: usize) -> Self {
        Self {
            outbox,
            engine,
            db,
            batch_size,
        }
    }

    /// Claim and deliver one batch. Returns the number of items processed.
    ///
    /// Per-item failures are finalized on the item and never abort the
    /// pass; an empty claim under dispatcher contention is a normal skip.
    pub async fn run_once(&self) -> Result<usize, AppError> {
        let items = self.outbox.dequeue_batch(self.batch_size).await?;
        let claimed = items.len();

        for item in items {
            self.process_item(item).await;
        }

        Ok(claimed)
    }

    async fn process_item(&self, item: OutboxItem) {
        match self.engine.deliver(&item).await {
            Ok(summary) => {
                if summary.failed > 0 {
                    tracing::warn!(
                        item = %item.id,
                        failed = summary.failed,
                        delivered = summary.delivered,
                        "Item delivered with per-recipient failures"
                    );
                }

                if let Err(error) = self.outbox.mark_complete(&item).await {
                    tracing::error!(%error, item = %item.id, "Failed to finalize delivered item");
                    return;
                }
                self.update_entity_state(&item, FederationState::Federated)
                    .await;
            }
            Err(error) => {
                tracing::error!(%error, item = %item.id, "Item delivery failed");
                if let Err(mark_error) = self.outbox.mark_failed(&item, &error.to_string()).await {
                    tracing::error!(%mark_error, item = %item.id, "Failed to finalize failed item");
                }
                self.update_entity_state(&item, FederationState::Errored)
                    .await;
            }
        }
    }

    /// Record whether the referenced entity has been federated.
    async fn update_entity_state(&self, item: &OutboxItem, state: FederationState) {
        let Some(kind) = item.entity_kind.as_deref().and_then(ContentKind::parse) else {
            return;
        };
        let Some(entity_id) = item.entity_id else {
            return;
        };

        if let Err(error) = self.db.set_federation_state(kind, entity_id, state).await {
            tracing::warn!(%error, kind = kind.as_str(), entity_id, "Failed to update federation state");
        }
    }

    /// Spawn the recurring drain loop.
    pub fn spawn(self, interval: std::time::Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // The first tick fires immediately; skip it so startup work
            // settles before the first drain.
            ticker.tick().await;

            loop {
                ticker.tick().await;
                match self.run_once().await {
                    Ok(0) => {}
                    Ok(count) => tracing::debug!(count, "Outbox drain pass complete"),
                    Err(error) => tracing::error!(%error, "Outbox drain pass failed"),
                }
            }
        })
    }
}
