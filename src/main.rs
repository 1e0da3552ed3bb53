//! FediPress binary entry point

use fedipress::federation::Dispatcher;
use fedipress::scheduler::Scheduler;
use fedipress::{AppState, config};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Application entry point
///
/// # Setup
/// 1. Initialize tracing/logging
/// 2. Load configuration from file and environment
/// 3. Initialize AppState
/// 4. Spawn background tasks (scheduler, dispatcher, outbox pruning)
/// 5. Build Axum router and start the HTTP server
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Initialize tracing/logging
    let log_format =
        std::env::var("FEDIPRESS__LOGGING__FORMAT").unwrap_or_else(|_| "pretty".to_string());

    if log_format == "json" {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "fedipress=info,tower_http=debug".into()),
            )
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "fedipress=info,tower_http=debug".into()),
            )
            .with(tracing_subscriber::fmt::layer().pretty())
            .init();
    }

    tracing::info!("Starting FediPress...");

    // 2. Initialize metrics
    fedipress::metrics::init_metrics();

    // 3. Load configuration
    let config = config::AppConfig::load()?;
    tracing::info!(
        domain = %config.server.domain,
        protocol = %config.server.protocol,
        "Configuration loaded"
    );

    // 4. Initialize application state
    let (events_tx, events_rx) = tokio::sync::mpsc::channel(256);
    let state = AppState::new(config.clone(), events_tx).await?;

    // 5. Spawn background tasks
    Scheduler::new(state.outbox.clone(), state.db.clone()).spawn(events_rx);
    tracing::info!("Scheduler task spawned");

    Dispatcher::new(
        state.outbox.clone(),
        state.engine.clone(),
        state.db.clone(),
        config.federation.dispatch_batch_size,
    )
    .spawn(std::time::Duration::from_secs(
        config.federation.dispatch_interval_seconds,
    ));
    tracing::info!("Dispatcher task spawned");

    spawn_outbox_prune_task(state.clone());

    // 6. Build Axum router
    let app = fedipress::build_router(state);

    // 7. Start HTTP server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Server listening on {}", addr);
    tracing::info!("Public URL: {}", config.server.base_url());

    axum::serve(listener, app).await?;

    Ok(())
}

/// Spawn the daily retention pass over completed outbox items
fn spawn_outbox_prune_task(state: AppState) {
    tokio::spawn(async move {
        let retention_days = state.config.federation.outbox_retention_days;
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(86_400));

        loop {
            interval.tick().await;

            let cutoff = chrono::Utc::now() - chrono::Duration::days(retention_days);
            match state.outbox.prune_completed(cutoff).await {
                Ok(0) => {}
                Ok(pruned) => tracing::info!(pruned, "Pruned completed outbox items"),
                Err(error) => tracing::error!(%error, "Outbox pruning failed"),
            }
        }
    });

    tracing::info!("Outbox prune task spawned");
}
