//! Activity delivery
//!
//! Resolves the audience of an outbox item to a de-duplicated set of inbox
//! URLs, signs the payload, and fans out over the transport. Failures are
//! bookkept per follower; one unreachable recipient never blocks the rest.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use tokio::sync::Semaphore;

use super::signature;
use crate::adapters::{ActorDirectory, KeyStore, Transport};
use crate::data::{FollowerError, FollowerRecord, OutboxItem};
use crate::error::AppError;
use crate::metrics::{DELIVERIES_TOTAL, DELIVERY_DURATION_SECONDS};
use crate::site::Site;

/// Delivery tuning knobs
#[derive(Debug, Clone)]
pub struct DeliveryConfig {
    /// Timeout for a single inbox POST
    pub request_timeout: Duration,
    /// Maximum concurrent inbox deliveries per item
    pub max_concurrent: usize,
    /// Consecutive errors before a follower is flagged for cleanup
    pub error_threshold: usize,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
            max_concurrent: 10,
            error_threshold: 5,
        }
    }
}

/// Outcome of delivering one outbox item
#[derive(Debug, Clone, Default)]
pub struct DeliverySummary {
    /// Unique inboxes attempted
    pub attempted: usize,
    /// Inboxes that accepted the activity
    pub delivered: usize,
    /// Inboxes that failed (recorded on the affected followers)
    pub failed: usize,
}

/// One delivery group: a resolved inbox URL and the followers behind it
struct InboxGroup {
    inbox_url: String,
    /// (follower record key, errors already on record)
    followers: Vec<(String, usize)>,
}

/// Group followers by their delivery inbox.
///
/// Followers sharing a shared-inbox endpoint collapse into one group, so
/// that URL receives exactly one copy of the activity.
fn group_by_inbox(followers: &[FollowerRecord]) -> Vec<InboxGroup> {
    let mut groups: BTreeMap<String, Vec<(String, usize)>> = BTreeMap::new();

    for follower in followers {
        groups
            .entry(follower.delivery_inbox().to_string())
            .or_default()
            .push((follower.id.clone(), follower.errors.len()));
    }

    groups
        .into_iter()
        .map(|(inbox_url, followers)| InboxGroup {
            inbox_url,
            followers,
        })
        .collect()
}

/// Activity delivery engine
#[derive(Clone)]
pub struct DeliveryEngine {
    directory: Arc<dyn ActorDirectory>,
    keys: Arc<dyn KeyStore>,
    transport: Arc<dyn Transport>,
    site: Site,
    config: DeliveryConfig,
}

impl DeliveryEngine {
    pub fn new(
        directory: Arc<dyn ActorDirectory>,
        keys: Arc<dyn KeyStore>,
        transport: Arc<dyn Transport>,
        site: Site,
        config: DeliveryConfig,
    ) -> Self {
        Self {
            directory,
            keys,
            transport,
            site,
            config,
        }
    }

    /// Deliver one outbox item to every follower inbox of its actor.
    ///
    /// # Errors
    /// Returns an error only for failures that are fatal for the whole
    /// item (unknown actor, unusable signing key). Per-recipient failures
    /// are recorded on the followers and reflected in the summary.
    pub async fn deliver(&self, item: &OutboxItem) -> Result<DeliverySummary, AppError> {
        // 1. Resolve the acting actor and its signing key. A bad key must
        //    fail the item before any recipient is contacted.
        let actor = self.directory.get_actor_by_id(&item.actor_id).await?;
        let private_key_pem = self.keys.get_private_key(&item.actor_id).await?;
        let private_key = signature::parse_private_key(&private_key_pem)?;
        let key_id = format!("{}#main-key", self.site.actor_iri(&actor.username));

        // 2. Resolve the audience, shared inboxes de-duplicated.
        let followers = self.directory.list_followers(&item.actor_id).await?;
        let groups = group_by_inbox(&followers);

        let mut summary = DeliverySummary {
            attempted: groups.len(),
            ..Default::default()
        };
        if groups.is_empty() {
            tracing::debug!(item = %item.id, "No followers to deliver to");
            return Ok(summary);
        }

        tracing::info!(
            item = %item.id,
            activity_type = %item.activity_type,
            inboxes = groups.len(),
            followers = followers.len(),
            "Delivering activity"
        );

        // 3. Fan out with bounded concurrency. Each group fails or
        //    succeeds independently.
        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrent.max(1)));
        let body: Arc<[u8]> = item.activity_json.as_bytes().into();

        let mut tasks = Vec::with_capacity(groups.len());
        for group in groups {
            let semaphore = semaphore.clone();
            let engine = self.clone();
            let private_key = private_key.clone();
            let key_id = key_id.clone();
            let body = body.clone();

            tasks.push(tokio::spawn(async move {
                let _permit = match semaphore.acquire().await {
                    Ok(permit) => permit,
                    Err(_) => return false,
                };
                engine
                    .deliver_to_group(&group, &private_key, &key_id, &body)
                    .await
            }));
        }

        // 4. Collect per-inbox outcomes.
        for outcome in futures::future::join_all(tasks).await {
            match outcome {
                Ok(true) => summary.delivered += 1,
                Ok(false) => summary.failed += 1,
                Err(join_error) => {
                    tracing::error!(error = %join_error, "Delivery task panicked");
                    summary.failed += 1;
                }
            }
        }

        tracing::info!(
            item = %item.id,
            delivered = summary.delivered,
            failed = summary.failed,
            "Delivery batch complete"
        );

        Ok(summary)
    }

    /// Deliver to a single resolved inbox and bookkeep the outcome on every
    /// follower behind it.
    async fn deliver_to_group(
        &self,
        group: &InboxGroup,
        private_key: &rsa::RsaPrivateKey,
        key_id: &str,
        body: &[u8],
    ) -> bool {
        let started = Instant::now();
        let outcome = self
            .post_signed(&group.inbox_url, private_key, key_id, body)
            .await;

        match outcome {
            Ok(()) => {
                DELIVERIES_TOTAL.with_label_values(&["success"]).inc();
                DELIVERY_DURATION_SECONDS
                    .with_label_values(&["success"])
                    .observe(started.elapsed().as_secs_f64());

                for (follower_id, _) in &group.followers {
                    if let Err(error) = self.directory.clear_follower_errors(follower_id).await {
                        tracing::warn!(%error, follower = %follower_id, "Failed to clear follower errors");
                    }
                }
                true
            }
            Err((status, message)) => {
                DELIVERIES_TOTAL.with_label_values(&["failure"]).inc();
                DELIVERY_DURATION_SECONDS
                    .with_label_values(&["failure"])
                    .observe(started.elapsed().as_secs_f64());

                tracing::warn!(
                    inbox = %group.inbox_url,
                    status = ?status,
                    message = %message,
                    "Delivery to inbox failed"
                );

                let descriptor = FollowerError {
                    at: Utc::now(),
                    status,
                    message,
                };
                for (follower_id, prior_errors) in &group.followers {
                    if let Err(error) = self
                        .directory
                        .record_follower_error(follower_id, &descriptor)
                        .await
                    {
                        tracing::warn!(%error, follower = %follower_id, "Failed to record follower error");
                        continue;
                    }

                    if prior_errors + 1 >= self.config.error_threshold {
                        tracing::warn!(
                            follower = %follower_id,
                            errors = prior_errors + 1,
                            "Follower reached error threshold, flagged for cleanup"
                        );
                    }
                }
                false
            }
        }
    }

    /// Sign and POST the payload to one inbox.
    async fn post_signed(
        &self,
        inbox_url: &str,
        private_key: &rsa::RsaPrivateKey,
        key_id: &str,
        body: &[u8],
    ) -> Result<(), (Option<u16>, String)> {
        let signed = signature::sign_request_with_key(private_key, "POST", inbox_url, Some(body), key_id)
            .map_err(|e| (None, e.to_string()))?;

        let mut headers = vec![
            (
                "Content-Type".to_string(),
                "application/activity+json".to_string(),
            ),
            ("Date".to_string(), signed.date),
            ("Signature".to_string(), signed.signature),
        ];
        if let Some(digest) = signed.digest {
            headers.push(("Digest".to_string(), digest));
        }

        let response = self
            .transport
            .http_post(inbox_url, headers, body.to_vec(), self.config.request_timeout)
            .await
            .map_err(|e| (None, e.to_string()))?;

        if !response.is_success() {
            return Err((
                Some(response.status),
                format!("Inbox rejected activity: HTTP {}", response.status),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{
        MockActorDirectory, MockKeyStore, MockTransport, TransportResponse,
    };
    use crate::data::{EntityId, LocalActor, OutboxItem};
    use rsa::RsaPrivateKey;
    use rsa::pkcs8::{EncodePrivateKey, LineEnding};
    use std::sync::Mutex;

    fn test_private_key_pem() -> String {
        let mut rng = rand::thread_rng();
        RsaPrivateKey::new(&mut rng, 1024)
            .expect("keygen")
            .to_pkcs8_pem(LineEnding::LF)
            .expect("pem")
            .to_string()
    }

    fn local_actor() -> LocalActor {
        LocalActor {
            id: "actor-1".to_string(),
            username: "alice".to_string(),
            display_name: None,
            summary: None,
            icon_url: None,
            actor_type: "Person".to_string(),
            private_key_pem: String::new(),
            public_key_pem: String::new(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn follower(id: &str, inbox: &str, shared_inbox: Option<&str>) -> FollowerRecord {
        FollowerRecord {
            id: id.to_string(),
            actor_id: "actor-1".to_string(),
            iri: format!("https://remote.example/users/{}", id),
            preferred_username: id.to_string(),
            name: None,
            summary: None,
            inbox: inbox.to_string(),
            shared_inbox: shared_inbox.map(str::to_string),
            public_key_id: format!("https://remote.example/users/{}#main-key", id),
            public_key_pem: "pem".to_string(),
            icon_url: None,
            errors: Vec::new(),
            published: Utc::now(),
            updated: Utc::now(),
        }
    }

    fn outbox_item() -> OutboxItem {
        OutboxItem {
            id: EntityId::new().0,
            actor_id: "actor-1".to_string(),
            activity_type: "Create".to_string(),
            activity_json: r#"{"type":"Create"}"#.to_string(),
            status: "processing".to_string(),
            attempt_count: 1,
            last_error: None,
            entity_kind: None,
            entity_id: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn engine(
        directory: MockActorDirectory,
        keys: MockKeyStore,
        transport: MockTransport,
    ) -> DeliveryEngine {
        DeliveryEngine::new(
            Arc::new(directory),
            Arc::new(keys),
            Arc::new(transport),
            Site::new("https://blog.example"),
            DeliveryConfig {
                request_timeout: Duration::from_secs(5),
                max_concurrent: 4,
                error_threshold: 2,
            },
        )
    }

    fn expect_actor_and_key(directory: &mut MockActorDirectory, keys: &mut MockKeyStore) {
        directory
            .expect_get_actor_by_id()
            .withf(|actor_id| actor_id == "actor-1")
            .returning(|_| Ok(local_actor()));
        let pem = test_private_key_pem();
        keys.expect_get_private_key()
            .withf(|actor_id| actor_id == "actor-1")
            .returning(move |_| Ok(pem.clone()));
    }

    #[tokio::test]
    async fn shared_inbox_receives_exactly_one_request() {
        let mut directory = MockActorDirectory::new();
        let mut keys = MockKeyStore::new();
        let mut transport = MockTransport::new();
        expect_actor_and_key(&mut directory, &mut keys);

        // Two followers on the same shared inbox, one with a personal inbox.
        directory.expect_list_followers().returning(|_| {
            Ok(vec![
                follower(
                    "bob",
                    "https://remote.example/users/bob/inbox",
                    Some("https://remote.example/inbox"),
                ),
                follower(
                    "carol",
                    "https://remote.example/users/carol/inbox",
                    Some("https://remote.example/inbox"),
                ),
                follower("dave", "https://other.example/users/dave/inbox", None),
            ])
        });
        directory
            .expect_clear_follower_errors()
            .times(3)
            .returning(|_| Ok(()));

        let posted_urls = Arc::new(Mutex::new(Vec::new()));
        let posted_urls_in_mock = posted_urls.clone();
        transport
            .expect_http_post()
            .times(2)
            .returning(move |url, _, _, _| {
                posted_urls_in_mock.lock().unwrap().push(url.to_string());
                Ok(TransportResponse { status: 202 })
            });

        let summary = engine(directory, keys, transport)
            .deliver(&outbox_item())
            .await
            .unwrap();

        assert_eq!(summary.attempted, 2);
        assert_eq!(summary.delivered, 2);
        assert_eq!(summary.failed, 0);

        let mut urls = posted_urls.lock().unwrap().clone();
        urls.sort();
        assert_eq!(
            urls,
            vec![
                "https://other.example/users/dave/inbox".to_string(),
                "https://remote.example/inbox".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn one_failing_recipient_does_not_block_the_rest() {
        let mut directory = MockActorDirectory::new();
        let mut keys = MockKeyStore::new();
        let mut transport = MockTransport::new();
        expect_actor_and_key(&mut directory, &mut keys);

        directory.expect_list_followers().returning(|_| {
            Ok(vec![
                follower("bob", "https://down.example/inbox", None),
                follower("carol", "https://up.example/inbox", None),
            ])
        });

        // The failing follower gets an error descriptor, the healthy one is
        // cleared.
        directory
            .expect_record_follower_error()
            .withf(|follower_id, error| follower_id == "bob" && error.status == Some(500))
            .times(1)
            .returning(|_, _| Ok(()));
        directory
            .expect_clear_follower_errors()
            .withf(|follower_id| follower_id == "carol")
            .times(1)
            .returning(|_| Ok(()));

        transport.expect_http_post().returning(|url, _, _, _| {
            if url.starts_with("https://down.example") {
                Ok(TransportResponse { status: 500 })
            } else {
                Ok(TransportResponse { status: 200 })
            }
        });

        let summary = engine(directory, keys, transport)
            .deliver(&outbox_item())
            .await
            .unwrap();

        assert_eq!(summary.attempted, 2);
        assert_eq!(summary.delivered, 1);
        assert_eq!(summary.failed, 1);
    }

    #[tokio::test]
    async fn transport_errors_are_recorded_without_status() {
        let mut directory = MockActorDirectory::new();
        let mut keys = MockKeyStore::new();
        let mut transport = MockTransport::new();
        expect_actor_and_key(&mut directory, &mut keys);

        directory
            .expect_list_followers()
            .returning(|_| Ok(vec![follower("bob", "https://down.example/inbox", None)]));
        directory
            .expect_record_follower_error()
            .withf(|_, error| error.status.is_none() && !error.message.is_empty())
            .times(1)
            .returning(|_, _| Ok(()));

        transport
            .expect_http_post()
            .returning(|_, _, _, _| Err(AppError::Delivery("connection timed out".to_string())));

        let summary = engine(directory, keys, transport)
            .deliver(&outbox_item())
            .await
            .unwrap();

        assert_eq!(summary.failed, 1);
    }

    #[tokio::test]
    async fn unusable_signing_key_fails_the_item_without_delivery() {
        let mut directory = MockActorDirectory::new();
        let mut keys = MockKeyStore::new();
        let mut transport = MockTransport::new();

        directory
            .expect_get_actor_by_id()
            .returning(|_| Ok(local_actor()));
        keys.expect_get_private_key()
            .returning(|_| Ok("not a pem".to_string()));
        // No followers listed, no POSTs sent: signing is checked first.
        directory.expect_list_followers().never();
        transport.expect_http_post().never();

        let result = engine(directory, keys, transport).deliver(&outbox_item()).await;
        assert!(matches!(result, Err(AppError::Signing(_))));
    }

    #[tokio::test]
    async fn no_followers_is_a_successful_empty_delivery() {
        let mut directory = MockActorDirectory::new();
        let mut keys = MockKeyStore::new();
        let mut transport = MockTransport::new();
        expect_actor_and_key(&mut directory, &mut keys);

        directory.expect_list_followers().returning(|_| Ok(vec![]));
        transport.expect_http_post().never();

        let summary = engine(directory, keys, transport)
            .deliver(&outbox_item())
            .await
            .unwrap();

        assert_eq!(summary.attempted, 0);
        assert_eq!(summary.delivered, 0);
        assert_eq!(summary.failed, 0);
    }

    #[tokio::test]
    async fn signed_request_carries_activity_json_headers() {
        let mut directory = MockActorDirectory::new();
        let mut keys = MockKeyStore::new();
        let mut transport = MockTransport::new();
        expect_actor_and_key(&mut directory, &mut keys);

        directory
            .expect_list_followers()
            .returning(|_| Ok(vec![follower("bob", "https://remote.example/inbox", None)]));
        directory
            .expect_clear_follower_errors()
            .returning(|_| Ok(()));

        transport
            .expect_http_post()
            .withf(|_, headers, _, _| {
                let names: Vec<&str> = headers.iter().map(|(name, _)| name.as_str()).collect();
                names.contains(&"Content-Type")
                    && names.contains(&"Date")
                    && names.contains(&"Signature")
                    && names.contains(&"Digest")
                    && headers.iter().any(|(name, value)| {
                        name == "Content-Type" && value == "application/activity+json"
                    })
                    && headers.iter().any(|(name, value)| {
                        name == "Signature"
                            && value.contains(
                                "keyId=\"https://blog.example/users/alice#main-key\"",
                            )
                    })
            })
            .times(1)
            .returning(|_, _, _, _| Ok(TransportResponse { status: 202 }));

        let summary = engine(directory, keys, transport)
            .deliver(&outbox_item())
            .await
            .unwrap();
        assert_eq!(summary.delivered, 1);
    }
}
