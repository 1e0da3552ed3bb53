//! FediPress - server-side ActivityPub federation for CMS content
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      API Layer (Axum)                        │
//! │  - add_to_outbox + outbox inspection                        │
//! │  - content lifecycle events                                 │
//! │  - actor documents                                          │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Federation Core                          │
//! │  - Scheduler (triage state machine)                         │
//! │  - Transformer (entity → ActivityStreams object)            │
//! │  - Outbox (durable queue, exclusive claims)                 │
//! │  - Delivery engine (signatures, inbox fan-out)              │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Data Layer                              │
//! │  - SQLite (sqlx): actors, followers, outbox, state          │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - `api`: HTTP handlers for the exposed surface
//! - `scheduler`: lifecycle-transition triage
//! - `transform`: per-entity-kind object transformers
//! - `outbox`: durable activity queue
//! - `federation`: delivery engine and HTTP signatures
//! - `activitypub`: typed ActivityStreams object model
//! - `adapters`: abstract collaborator interfaces
//! - `data`: database and models
//! - `config`: configuration management
//! - `error`: error types

pub mod activitypub;
pub mod adapters;
pub mod api;
pub mod config;
pub mod data;
pub mod error;
pub mod federation;
pub mod metrics;
pub mod outbox;
pub mod scheduler;
pub mod site;
pub mod transform;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use crate::adapters::{HttpTransport, SnapshotContentStore};
use crate::federation::{DeliveryConfig, DeliveryEngine};
use crate::outbox::Outbox;
use crate::scheduler::LifecycleEvent;
use crate::site::Site;

/// Application state shared across all handlers
///
/// This struct is cloned for each request and contains
/// shared resources like the database pool and outbox service.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<config::AppConfig>,

    /// Database connection pool
    pub db: Arc<data::Database>,

    /// Site identity (IRI derivation)
    pub site: Site,

    /// Outbox service
    pub outbox: Outbox,

    /// Delivery engine (used by the background dispatcher)
    pub engine: DeliveryEngine,

    /// Lifecycle event channel into the scheduler
    pub events_tx: mpsc::Sender<LifecycleEvent>,
}

impl AppState {
    /// Initialize application state
    ///
    /// # Steps
    /// 1. Connect to SQLite database
    /// 2. Provision configured local actors (generating keypairs)
    /// 3. Initialize the HTTP transport
    /// 4. Wire the outbox and delivery engine
    ///
    /// # Errors
    /// Returns error if any initialization step fails
    pub async fn new(
        config: config::AppConfig,
        events_tx: mpsc::Sender<LifecycleEvent>,
    ) -> Result<Self, error::AppError> {
        tracing::info!("Initializing application state...");

        // 1. Connect to SQLite database
        let db = Arc::new(data::Database::connect(&config.database.path).await?);
        tracing::info!("Database connected");

        // 2. Provision configured local actors
        Self::ensure_seed_actors(&db, &config).await?;

        // 3. Initialize HTTP transport
        let http_client = reqwest::Client::builder()
            .user_agent("FediPress/0.1.0")
            .timeout(Duration::from_secs(
                config.federation.request_timeout_seconds,
            ))
            .build()
            .map_err(|e| error::AppError::Internal(e.into()))?;
        let transport = Arc::new(HttpTransport::new(http_client));

        // 4. Wire the federation core
        let site = Site::new(config.server.base_url());
        let content = Arc::new(SnapshotContentStore::new(db.clone()));
        let outbox = Outbox::new(db.clone(), content, site.clone());
        let engine = DeliveryEngine::new(
            db.clone(),
            db.clone(),
            transport,
            site.clone(),
            DeliveryConfig {
                request_timeout: Duration::from_secs(config.federation.request_timeout_seconds),
                max_concurrent: config.federation.max_concurrent_deliveries,
                error_threshold: config.federation.follower_error_threshold,
            },
        );

        tracing::info!("Application state initialized successfully");

        Ok(Self {
            config: Arc::new(config),
            db,
            site,
            outbox,
            engine,
            events_tx,
        })
    }

    /// Ensure configured local actors exist with signing keypairs
    ///
    /// Creates missing actors (generating an RSA keypair) and updates
    /// profile fields of existing ones when the configuration changed.
    async fn ensure_seed_actors(
        db: &data::Database,
        config: &config::AppConfig,
    ) -> Result<(), error::AppError> {
        use rsa::pkcs8::{EncodePrivateKey, EncodePublicKey, LineEnding};
        use rsa::{RsaPrivateKey, RsaPublicKey};

        for seed in &config.actors.seed {
            if let Some(mut actor) = db.get_local_actor_by_username(&seed.username).await? {
                let mut updated = false;

                if actor.display_name.as_deref() != Some(&seed.display_name) {
                    actor.display_name = Some(seed.display_name.clone());
                    updated = true;
                }
                if actor.summary != seed.summary {
                    actor.summary = seed.summary.clone();
                    updated = true;
                }

                if updated {
                    actor.updated_at = chrono::Utc::now();
                    db.upsert_local_actor(&actor).await?;
                    tracing::info!(username = %actor.username, "Local actor updated");
                }
                continue;
            }

            tracing::info!(username = %seed.username, "Creating local actor...");

            // Generate RSA keypair for ActivityPub
            let mut rng = rand::thread_rng();
            let bits = 4096;
            let private_key = RsaPrivateKey::new(&mut rng, bits)
                .map_err(|e| error::AppError::Internal(e.into()))?;
            let public_key = RsaPublicKey::from(&private_key);

            let private_key_pem = private_key
                .to_pkcs8_pem(LineEnding::LF)
                .map_err(|e| error::AppError::Internal(e.into()))?
                .to_string();
            let public_key_pem = public_key
                .to_public_key_pem(LineEnding::LF)
                .map_err(|e| error::AppError::Internal(e.into()))?;

            let now = chrono::Utc::now();
            let actor = data::LocalActor {
                id: data::EntityId::new().0,
                username: seed.username.clone(),
                display_name: Some(seed.display_name.clone()),
                summary: seed.summary.clone(),
                icon_url: None,
                actor_type: seed.actor_type.clone(),
                private_key_pem,
                public_key_pem,
                created_at: now,
                updated_at: now,
            };
            db.upsert_local_actor(&actor).await?;

            tracing::info!(username = %actor.username, "Local actor created");
        }

        Ok(())
    }
}

/// Build the Axum router with all routes.
///
/// This is shared by the binary and integration tests to keep route
/// composition consistent across environments.
pub fn build_router(state: AppState) -> axum::Router {
    use axum::Router;
    use tower_http::{limit::RequestBodyLimitLayer, trace::TraceLayer};

    let cors_layer = build_cors_layer(&state.config.server);

    Router::new()
        .route("/health", axum::routing::get(health_check))
        .merge(api::outbox_router())
        .merge(api::content_router())
        .merge(api::actors_router())
        .layer(RequestBodyLimitLayer::new(1024 * 1024))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer)
        .with_state(state)
        .merge(api::metrics_router())
}

fn build_cors_layer(server: &config::ServerConfig) -> tower_http::cors::CorsLayer {
    use axum::http::HeaderValue;
    use tower_http::cors::{Any, CorsLayer};

    if !server.protocol.eq_ignore_ascii_case("https") {
        return CorsLayer::permissive();
    }

    let allowed_origin = server.base_url();
    match HeaderValue::from_str(&allowed_origin) {
        Ok(origin) => CorsLayer::new()
            .allow_origin([origin])
            .allow_methods(Any)
            .allow_headers(Any),
        Err(error) => {
            tracing::error!(
                %error,
                origin = %allowed_origin,
                "Failed to parse CORS origin from server base URL; denying cross-origin requests"
            );
            CorsLayer::new().allow_methods(Any).allow_headers(Any)
        }
    }
}

async fn health_check() -> &'static str {
    "OK"
}
